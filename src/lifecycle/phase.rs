//! Phase definitions
//!
//! A [`Phase`] bundles a name with the behavior applied to each target, the
//! callback run once the phase has completed, and the policies that govern
//! how targets are visited and how their failures are handled.

use super::state::PhaseRecord;
use super::{Capabilities, Capability, LifecycleTarget};
use async_trait::async_trait;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr};

/// The standard phases, in lifecycle order
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, AsRefStr, IntoStaticStr,
)]
pub enum StandardPhase {
    #[strum(serialize = "not in lifecycle")]
    NotInLifecycle,
    #[strum(serialize = "initialise")]
    Initialise,
    #[strum(serialize = "start")]
    Start,
    #[strum(serialize = "stop")]
    Stop,
    #[strum(serialize = "dispose")]
    Dispose,
}

impl StandardPhase {
    /// Canonical phase name
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// The target behavior this phase invokes
    pub fn capability(self) -> Option<Capability> {
        match self {
            Self::NotInLifecycle => None,
            Self::Initialise => Some(Capability::Initialise),
            Self::Start => Some(Capability::Start),
            Self::Stop => Some(Capability::Stop),
            Self::Dispose => Some(Capability::Dispose),
        }
    }

    /// Startup phases fail fast, teardown phases are best-effort
    pub fn default_policy(self) -> ErrorPolicy {
        match self {
            Self::Stop | Self::Dispose => ErrorPolicy::BestEffort,
            _ => ErrorPolicy::FailFast,
        }
    }

    /// Phases dropped from the completed history when this one completes
    pub fn superseded(self) -> &'static [StandardPhase] {
        match self {
            Self::Start => &[Self::Stop],
            Self::Stop => &[Self::Start],
            Self::Dispose => &[Self::Initialise],
            _ => &[],
        }
    }
}

/// What happens when a target fails during a phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Stop at the first failure and return it; the phase does not complete
    FailFast,
    /// Log the failure and continue with the remaining targets
    BestEffort,
}

/// Order in which a phase visits the targets supplied for it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApplicationOrder {
    /// Supplier order
    #[default]
    Forward,
    /// Supplier order, reversed
    Reverse,
}

/// The work a phase performs on a single target
#[async_trait]
pub trait PhaseBehavior: Send + Sync {
    /// Whether targets with these capabilities are in scope for the phase
    fn applies_to(&self, _capabilities: Capabilities) -> bool {
        true
    }

    async fn apply(&self, target: &dyn LifecycleTarget) -> anyhow::Result<()>;
}

/// Invokes one of the standard target behaviors
#[derive(Debug, Clone, Copy)]
pub struct CapabilityBehavior {
    capability: Capability,
}

impl CapabilityBehavior {
    pub fn new(capability: Capability) -> Self {
        Self { capability }
    }
}

#[async_trait]
impl PhaseBehavior for CapabilityBehavior {
    fn applies_to(&self, capabilities: Capabilities) -> bool {
        capabilities.contains(self.capability)
    }

    async fn apply(&self, target: &dyn LifecycleTarget) -> anyhow::Result<()> {
        match self.capability {
            Capability::Initialise => target.initialise().await,
            Capability::Start => target.start().await,
            Capability::Stop => target.stop().await,
            Capability::Dispose => target.dispose().await,
        }
    }
}

/// Applies to nothing. Used for the not-in-lifecycle phase.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopBehavior;

#[async_trait]
impl PhaseBehavior for NoopBehavior {
    fn applies_to(&self, _capabilities: Capabilities) -> bool {
        false
    }

    async fn apply(&self, _target: &dyn LifecycleTarget) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Notified once a phase has been applied to every target in scope
#[async_trait]
pub trait PhaseCallback: Send + Sync {
    async fn on_phase_completed(&self, record: &PhaseRecord);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCallback;

#[async_trait]
impl PhaseCallback for NoopCallback {
    async fn on_phase_completed(&self, _record: &PhaseRecord) {}
}

/// A named lifecycle phase
///
/// # Example
///
/// ```
/// use phaseflow::lifecycle::{ApplicationOrder, ErrorPolicy, Phase, StandardPhase};
///
/// let dispose = Phase::standard(StandardPhase::Dispose)
///     .with_order(ApplicationOrder::Reverse)
///     .ignore_kind("transient");
///
/// assert_eq!(dispose.name(), "dispose");
/// assert_eq!(dispose.policy(), ErrorPolicy::BestEffort);
/// ```
#[derive(Clone)]
pub struct Phase {
    name: String,
    behavior: Arc<dyn PhaseBehavior>,
    callback: Arc<dyn PhaseCallback>,
    policy: ErrorPolicy,
    order: ApplicationOrder,
    ignored_kinds: HashSet<String>,
    supersedes: Vec<String>,
}

impl Phase {
    /// A custom phase. Fails fast and visits targets in supplier order.
    pub fn new(name: impl Into<String>, behavior: impl PhaseBehavior + 'static) -> Self {
        Self {
            name: name.into(),
            behavior: Arc::new(behavior),
            callback: Arc::new(NoopCallback),
            policy: ErrorPolicy::FailFast,
            order: ApplicationOrder::Forward,
            ignored_kinds: HashSet::new(),
            supersedes: Vec::new(),
        }
    }

    /// One of the standard phases with its default policy
    pub fn standard(phase: StandardPhase) -> Self {
        let mut built = match phase.capability() {
            Some(capability) => Self::new(phase.name(), CapabilityBehavior::new(capability)),
            None => Self::new(phase.name(), NoopBehavior),
        };
        built.policy = phase.default_policy();
        built.supersedes = phase
            .superseded()
            .iter()
            .map(|p| p.name().to_string())
            .collect();
        built
    }

    pub fn with_callback(mut self, callback: impl PhaseCallback + 'static) -> Self {
        self.callback = Arc::new(callback);
        self
    }

    pub fn with_policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_order(mut self, order: ApplicationOrder) -> Self {
        self.order = order;
        self
    }

    /// Never offer targets of this kind to the phase
    pub fn ignore_kind(mut self, kind: impl Into<String>) -> Self {
        self.ignored_kinds.insert(kind.into());
        self
    }

    /// Drop `phase` from the completed history when this phase completes
    pub fn supersedes(mut self, phase: impl Into<String>) -> Self {
        self.supersedes.push(phase.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn behavior(&self) -> &Arc<dyn PhaseBehavior> {
        &self.behavior
    }

    pub fn callback(&self) -> &Arc<dyn PhaseCallback> {
        &self.callback
    }

    pub fn policy(&self) -> ErrorPolicy {
        self.policy
    }

    pub(crate) fn set_policy(&mut self, policy: ErrorPolicy) {
        self.policy = policy;
    }

    pub fn order(&self) -> ApplicationOrder {
        self.order
    }

    pub fn superseded_phases(&self) -> &[String] {
        &self.supersedes
    }

    /// Whether a target of this kind and with these capabilities is in scope
    pub fn is_in_scope(&self, kind: &str, capabilities: Capabilities) -> bool {
        !self.ignored_kinds.contains(kind) && self.behavior.applies_to(capabilities)
    }
}

impl fmt::Debug for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Phase")
            .field("name", &self.name)
            .field("policy", &self.policy)
            .field("order", &self.order)
            .field("ignored_kinds", &self.ignored_kinds)
            .field("supersedes", &self.supersedes)
            .finish()
    }
}
