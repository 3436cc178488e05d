use super::LifecycleInterceptor;
use crate::container::{ObjectHandle, TargetEntry};
use crate::lifecycle::{Capability, StandardPhase};
use async_trait::async_trait;
use std::collections::HashSet;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct TrackingState {
    failed: HashSet<ObjectHandle>,
    processed: HashSet<ObjectHandle>,
    /// An initial phase has started but not yet completed across all objects
    cycle_open: bool,
}

/// Gates a *final* phase on the success of a paired *initial* phase
///
/// While tracking is live, the final phase is skipped for an object that
/// failed the initial phase, and for an object the initial phase never
/// reached (because it aborted on an earlier object). Tracking is cleared
/// when the initial phase completes across all objects.
///
/// Only objects that have the tracked capability take part; everything else
/// passes straight through.
///
/// # Example
///
/// ```
/// use phaseflow::interceptor::PairedPhaseInterceptor;
/// use phaseflow::lifecycle::StandardPhase;
///
/// let interceptor = PairedPhaseInterceptor::standard(StandardPhase::Initialise, StandardPhase::Dispose);
/// assert_eq!(interceptor.initial_phase(), "initialise");
/// assert_eq!(interceptor.final_phase(), "dispose");
/// ```
#[derive(Debug)]
pub struct PairedPhaseInterceptor {
    initial: String,
    closing: String,
    tracked: Option<Capability>,
    state: RwLock<TrackingState>,
}

impl PairedPhaseInterceptor {
    /// Pair two phases. Objects are tracked if they have the capability named
    /// like the initial phase, or unconditionally if there is no such
    /// capability.
    pub fn new(initial: impl Into<String>, closing: impl Into<String>) -> Self {
        let initial = initial.into();
        let tracked = initial.parse::<Capability>().ok();
        Self {
            initial,
            closing: closing.into(),
            tracked,
            state: RwLock::new(TrackingState::default()),
        }
    }

    pub fn standard(initial: StandardPhase, closing: StandardPhase) -> Self {
        Self::new(initial.name(), closing.name())
    }

    /// Track only objects with this capability
    pub fn tracking(mut self, capability: Capability) -> Self {
        self.tracked = Some(capability);
        self
    }

    pub fn initial_phase(&self) -> &str {
        &self.initial
    }

    pub fn final_phase(&self) -> &str {
        &self.closing
    }

    /// Objects currently recorded as having failed the initial phase
    pub async fn failed_objects(&self) -> Vec<ObjectHandle> {
        let mut failed: Vec<_> = self.state.read().await.failed.iter().copied().collect();
        failed.sort();
        failed
    }

    /// Whether no tracking state is held
    pub async fn is_idle(&self) -> bool {
        let state = self.state.read().await;
        state.failed.is_empty() && state.processed.is_empty() && !state.cycle_open
    }

    fn is_tracked(&self, object: &TargetEntry) -> bool {
        self.tracked
            .is_none_or(|capability| object.capabilities().contains(capability))
    }
}

#[async_trait]
impl LifecycleInterceptor for PairedPhaseInterceptor {
    async fn before_phase_execution(&self, phase: &str, object: &TargetEntry) -> bool {
        if !self.is_tracked(object) {
            return true;
        }

        if phase == self.initial {
            let mut state = self.state.write().await;
            state.cycle_open = true;
            state.processed.insert(object.handle());
            return true;
        }

        if phase == self.closing {
            let state = self.state.read().await;
            if state.failed.contains(&object.handle()) {
                tracing::warn!(
                    "Skipping {} for {}: {} previously failed",
                    phase,
                    object.name(),
                    self.initial
                );
                return false;
            }
            if state.cycle_open && !state.processed.contains(&object.handle()) {
                tracing::warn!(
                    "Skipping {} for {}: {} never reached it",
                    phase,
                    object.name(),
                    self.initial
                );
                return false;
            }
        }

        true
    }

    async fn after_phase_execution(
        &self,
        phase: &str,
        object: &TargetEntry,
        error: Option<&anyhow::Error>,
    ) {
        if error.is_some() && phase == self.initial && self.is_tracked(object) {
            self.state.write().await.failed.insert(object.handle());
        }
    }

    async fn on_phase_completed(&self, phase: &str) {
        if phase == self.initial {
            *self.state.write().await = TrackingState::default();
        }
    }

    async fn on_reset(&self) {
        *self.state.write().await = TrackingState::default();
    }
}
