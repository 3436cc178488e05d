//! Lifecycle Coordinator
//!
//! Drives the targets supplied by a [`TargetSource`] through registered
//! phases, enforcing the transition table and consulting a
//! [`LifecycleInterceptor`] for every object.

use super::state::{LifecycleSnapshot, PhaseRecord};
use super::{
    ApplicationOrder, ErrorPolicy, LifecycleError, Phase, PhaseFailure, PhaseRegistry, Result,
    StandardPhase, TransitionTable,
};
use crate::config::LifecycleConfig;
use crate::container::{TargetEntry, TargetSource};
use crate::interceptor::{CompositeInterceptor, LifecycleInterceptor};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use strum::IntoEnumIterator;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Completed-phase records kept when no limit is configured
pub const DEFAULT_HISTORY_LIMIT: usize = 64;

#[derive(Debug, Clone)]
struct CoordinatorOptions {
    strict_teardown: bool,
    slow_phase_threshold: Option<Duration>,
    history_limit: usize,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            strict_teardown: false,
            slow_phase_threshold: None,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

#[derive(Debug)]
struct CoordinatorState {
    current: String,
    executing: Option<String>,
    completed: Vec<String>,
    last_failed: bool,
    history: VecDeque<PhaseRecord>,
    /// Bumped whenever the executing slot changes hands
    generation: u64,
}

impl CoordinatorState {
    fn new() -> Self {
        let initial = StandardPhase::NotInLifecycle.name().to_string();
        Self {
            completed: vec![initial.clone()],
            current: initial,
            executing: None,
            last_failed: false,
            history: VecDeque::new(),
            generation: 0,
        }
    }

    /// The phase objects are at, or being brought to
    fn position(&self) -> String {
        self.executing
            .clone()
            .unwrap_or_else(|| self.current.clone())
    }

    fn set_executing(&mut self, phase: Option<&str>) {
        self.executing = phase.map(str::to_string);
        self.generation += 1;
    }

    fn complete(&mut self, phase: &Phase, record: PhaseRecord, history_limit: usize) {
        self.current = phase.name().to_string();
        if !self.completed.iter().any(|p| p == phase.name()) {
            self.completed.push(phase.name().to_string());
        }
        for superseded in phase.superseded_phases() {
            self.completed.retain(|p| p != superseded);
        }
        self.last_failed = false;
        self.history.push_back(record);
        while self.history.len() > history_limit {
            self.history.pop_front();
        }
    }
}

/// Coordinates lifecycle phases for one managed subsystem
///
/// The coordinator is not internally concurrent: one transition completes
/// or fails before the next may begin, and a transition requested while a
/// phase is executing (including from inside a target's own behavior) is
/// rejected with [`LifecycleError::IllegalPhase`]. Callers that share a
/// coordinator between tasks serialize access themselves, as
/// [`Application`](super::Application) does.
///
/// # Example
///
/// ```rust,ignore
/// use phaseflow::prelude::*;
///
/// let container = Arc::new(Container::new());
/// container.register(database);
/// container.register(http_listener);
///
/// let coordinator = LifecycleCoordinator::builder(container).standard_phases().build()?;
///
/// // Walks initialise, then start
/// coordinator.fire_lifecycle("start").await?;
/// // ... application runs ...
/// // Walks stop, then dispose
/// coordinator.fire_lifecycle("dispose").await?;
/// ```
pub struct LifecycleCoordinator {
    id: String,
    phases: PhaseRegistry,
    transitions: TransitionTable,
    interceptor: Arc<dyn LifecycleInterceptor>,
    source: Arc<dyn TargetSource>,
    options: CoordinatorOptions,
    state: RwLock<CoordinatorState>,
}

impl LifecycleCoordinator {
    pub fn builder(source: Arc<dyn TargetSource>) -> CoordinatorBuilder {
        CoordinatorBuilder::new(source)
    }

    /// Standard phases, standard transitions, standard interceptor pairs
    pub fn standard(source: Arc<dyn TargetSource>) -> Result<Self> {
        Self::builder(source).standard_phases().build()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn phases(&self) -> &PhaseRegistry {
        &self.phases
    }

    pub fn transitions(&self) -> &TransitionTable {
        &self.transitions
    }

    /// Last phase fully completed
    pub async fn current_phase(&self) -> String {
        self.state.read().await.current.clone()
    }

    /// Phase being applied right now, if any
    pub async fn executing_phase(&self) -> Option<String> {
        self.state.read().await.executing.clone()
    }

    pub async fn completed_phases(&self) -> Vec<String> {
        self.state.read().await.completed.clone()
    }

    pub async fn is_phase_complete(&self, phase: &str) -> bool {
        self.state.read().await.completed.iter().any(|p| p == phase)
    }

    pub async fn is_last_phase_execution_failed(&self) -> bool {
        self.state.read().await.last_failed
    }

    /// Most recent completed phases, oldest first, bounded by the
    /// configured history limit
    pub async fn history(&self) -> Vec<PhaseRecord> {
        self.state.read().await.history.iter().cloned().collect()
    }

    /// Whether `destination` is directly reachable from the current phase
    pub async fn is_direct_transition(&self, destination: &str) -> bool {
        let state = self.state.read().await;
        self.transitions
            .is_direct_transition(&state.current, destination)
    }

    pub async fn snapshot(&self) -> LifecycleSnapshot {
        let state = self.state.read().await;
        LifecycleSnapshot {
            id: self.id.clone(),
            current_phase: state.current.clone(),
            executing_phase: state.executing.clone(),
            completed_phases: state.completed.clone(),
            last_phase_failed: state.last_failed,
            history: state.history.iter().cloned().collect(),
        }
    }

    /// Validate that `phase` may be fired from the current state
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::IllegalPhase`] if a phase is executing, `phase` is
    ///   already current, or `phase` is not registered
    /// - [`LifecycleError::IllegalTransition`] if `phase` is neither directly
    ///   reachable nor ahead of the current phase
    pub async fn check_phase(&self, phase: &str) -> Result<()> {
        let state = self.state.read().await;
        self.check_phase_in(&state, phase)
    }

    fn check_phase_in(&self, state: &CoordinatorState, phase: &str) -> Result<()> {
        if let Some(executing) = &state.executing {
            let reason = if executing == phase {
                "phase is already being executed".to_string()
            } else {
                format!("currently executing lifecycle phase '{executing}'")
            };
            return Err(LifecycleError::illegal_phase(phase, reason));
        }
        if !self.phases.contains(phase) {
            return Err(LifecycleError::illegal_phase(phase, "phase does not exist"));
        }
        if state.current == phase {
            return Err(LifecycleError::illegal_phase(
                phase,
                "already in this phase, cannot fire the same phase twice",
            ));
        }
        if self.transitions.is_direct_transition(&state.current, phase) {
            return Ok(());
        }

        let current = self.phases.position(&state.current);
        let destination = self.phases.position(phase);
        match (current, destination) {
            (Some(current), Some(destination)) if destination > current => Ok(()),
            _ => Err(LifecycleError::illegal_transition(&state.current, phase)),
        }
    }

    /// Transition to `destination`
    ///
    /// A direct transition, or any transition after a failed phase
    /// execution, applies only `destination`. Otherwise every phase after
    /// the current one, up to and including `destination`, is applied in
    /// registration order.
    ///
    /// # Errors
    ///
    /// Validation errors from [`check_phase`](Self::check_phase); the first
    /// [`LifecycleError::PhaseApplication`] of a fail-fast phase; in strict
    /// mode, [`LifecycleError::TeardownFailed`] for a best-effort phase that
    /// completed with failures.
    pub async fn fire_lifecycle(&self, destination: &str) -> Result<()> {
        let (plan, mut targets) = {
            let mut state = self.state.write().await;
            self.check_phase_in(&state, destination)?;

            let direct = self
                .transitions
                .is_direct_transition(&state.current, destination);
            let plan = if direct || state.last_failed {
                vec![self.phases.get(destination)?]
            } else {
                self.phases.between(&state.current, destination)?
            };
            let Some(first) = plan.first() else {
                return Ok(());
            };

            // Claim the executing slot and take the target snapshot before
            // releasing the lock
            state.set_executing(Some(first.name()));
            let targets = self.source.targets_for(first.name());
            (plan, targets)
        };

        tracing::info!(
            "[{}] Firing lifecycle '{}' ({})",
            self.id,
            destination,
            plan.iter()
                .map(|p| p.name())
                .collect::<Vec<_>>()
                .join(" → ")
        );

        for (index, phase) in plan.iter().enumerate() {
            let next = plan.get(index + 1).map(|p| p.name());
            targets = self.invoke_phase(phase, targets, next).await?;
        }
        Ok(())
    }

    /// Run one phase over `targets`; on success the executing slot passes
    /// to `next` and the targets for `next` are returned
    async fn invoke_phase(
        &self,
        phase: &Phase,
        targets: Vec<TargetEntry>,
        next: Option<&str>,
    ) -> Result<Vec<TargetEntry>> {
        let outcome = self.run_phase(phase, targets).await;

        let mut state = self.state.write().await;
        match outcome {
            Ok(record) => {
                let failures = record.failed.clone();
                let strict_failure = self.options.strict_teardown && !failures.is_empty();
                // A strict failure ends the walk here
                let next = next.filter(|_| !strict_failure);
                state.set_executing(next);
                let next_targets = next
                    .map(|name| self.source.targets_for(name))
                    .unwrap_or_default();
                state.complete(phase, record.clone(), self.options.history_limit);
                drop(state);

                phase.callback().on_phase_completed(&record).await;
                tracing::info!(
                    "[{}] Phase '{}' complete ({} applied, {} skipped, {} failed)",
                    self.id,
                    phase.name(),
                    record.applied.len(),
                    record.skipped.len(),
                    failures.len()
                );

                if strict_failure {
                    return Err(LifecycleError::TeardownFailed {
                        phase: phase.name().to_string(),
                        failures,
                    });
                }
                Ok(next_targets)
            }
            Err(e) => {
                state.set_executing(None);
                state.last_failed = true;
                tracing::error!("[{}] Phase '{}' failed: {}", self.id, phase.name(), e);
                Err(e)
            }
        }
    }

    async fn run_phase(
        &self,
        phase: &Phase,
        mut targets: Vec<TargetEntry>,
    ) -> Result<PhaseRecord> {
        if phase.order() == ApplicationOrder::Reverse {
            targets.reverse();
        }

        tracing::debug!(
            "[{}] Applying '{}' to {} candidate object(s)",
            self.id,
            phase.name(),
            targets.len()
        );

        let mut record = PhaseRecord::new(phase.name());
        let mut seen = HashSet::new();

        for object in targets {
            if !seen.insert(object.handle()) {
                continue;
            }
            if !phase.is_in_scope(object.kind(), object.capabilities()) {
                continue;
            }
            if !self
                .interceptor
                .before_phase_execution(phase.name(), &object)
                .await
            {
                record.skipped.push(object.handle());
                continue;
            }

            match self.apply_to(phase, &object).await {
                Ok(()) => {
                    self.interceptor
                        .after_phase_execution(phase.name(), &object, None)
                        .await;
                    record.applied.push(object.handle());
                }
                Err(e) => {
                    self.interceptor
                        .after_phase_execution(phase.name(), &object, Some(&e))
                        .await;
                    match phase.policy() {
                        ErrorPolicy::FailFast => {
                            tracing::error!(
                                "Phase '{}' failed for {}: {:#}",
                                phase.name(),
                                object.name(),
                                e
                            );
                            return Err(LifecycleError::phase_application(
                                phase.name(),
                                object.name(),
                                e,
                            ));
                        }
                        ErrorPolicy::BestEffort => {
                            // Log error but continue with other objects
                            tracing::error!(
                                "Phase '{}' failed for {} (continuing): {:#}",
                                phase.name(),
                                object.name(),
                                e
                            );
                            record.failed.push(PhaseFailure {
                                handle: object.handle(),
                                object: object.name().to_string(),
                                message: format!("{e:#}"),
                            });
                        }
                    }
                }
            }
        }

        self.interceptor.on_phase_completed(phase.name()).await;
        Ok(record.complete())
    }

    async fn apply_to(&self, phase: &Phase, object: &TargetEntry) -> anyhow::Result<()> {
        tracing::debug!("Applying '{}' to {}", phase.name(), object.name());
        let started = Instant::now();

        let result = phase.behavior().apply(object.target().as_ref()).await;

        if let Some(threshold) = self.options.slow_phase_threshold {
            let elapsed = started.elapsed();
            if elapsed > threshold {
                tracing::warn!(
                    "Phase '{}' took {:?} for {} (threshold {:?})",
                    phase.name(),
                    elapsed,
                    object.name(),
                    threshold
                );
            }
        }
        result
    }

    /// Apply every phase strictly after `from`, up to and including `to`,
    /// to a single object
    ///
    /// Coordinator state and the interceptor are left untouched. When `to`
    /// precedes `from` but is a direct transition (e.g. `stop` → `start`),
    /// only `to` is applied.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::UnknownPhase`] for unregistered names,
    /// [`LifecycleError::IllegalTransition`] when `to` precedes `from`
    /// without a direct transition, and [`LifecycleError::PhaseApplication`]
    /// if the object fails.
    pub async fn apply_phase(&self, object: &TargetEntry, from: &str, to: &str) -> Result<()> {
        let phases = self.phases.between(from, to)?;
        let phases = if !phases.is_empty() {
            phases
        } else if from == to {
            Vec::new()
        } else if self.transitions.is_direct_transition(from, to) {
            vec![self.phases.get(to)?]
        } else {
            return Err(LifecycleError::illegal_transition(from, to));
        };

        for phase in phases {
            self.apply_single(&phase, object).await?;
        }
        Ok(())
    }

    /// Bring a late-registered object up to the coordinator's state by
    /// replaying completed phases along direct transitions
    ///
    /// # Errors
    ///
    /// [`LifecycleError::PhaseApplication`] if the object fails.
    pub async fn apply_completed_phases(&self, object: &TargetEntry) -> Result<()> {
        let completed = self.completed_phases().await;
        self.replay_completed(object, &completed).await
    }

    async fn replay_completed(&self, object: &TargetEntry, completed: &[String]) -> Result<()> {
        let mut last = StandardPhase::NotInLifecycle.name();
        for phase in completed {
            if self.transitions.is_direct_transition(last, phase) {
                let definition = self.phases.get(phase)?;
                self.apply_single(&definition, object).await?;
                last = phase.as_str();
            }
        }
        Ok(())
    }

    /// Catch a new object up with the coordinator, then hand it to
    /// `publish` so the target source can supply it to later phases
    ///
    /// The object first replays the completed phases and, if a phase is
    /// executing, is walked up to it. If the coordinator moved on in the
    /// meantime the object follows, and this repeats until no phase has
    /// started since the last check. `publish` then runs under the state
    /// lock, so no phase can snapshot its targets between the final check
    /// and the object becoming visible: every phase is applied to the
    /// object exactly once, either here or by the coordinator.
    ///
    /// Nothing is published if the object fails.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::PhaseApplication`] if the object fails.
    pub async fn admit<F>(&self, object: &TargetEntry, publish: F) -> Result<()>
    where
        F: FnOnce(),
    {
        let (mut generation, completed, current, executing) = {
            let state = self.state.read().await;
            (
                state.generation,
                state.completed.clone(),
                state.current.clone(),
                state.executing.clone(),
            )
        };

        self.replay_completed(object, &completed).await?;
        let mut reached = match executing {
            Some(executing) => {
                self.apply_phase(object, &current, &executing).await?;
                executing
            }
            None => current,
        };

        loop {
            let state = self.state.read().await;
            if state.generation == generation {
                publish();
                tracing::debug!("[{}] Admitted {} at '{}'", self.id, object.name(), reached);
                return Ok(());
            }
            generation = state.generation;
            let position = state.position();
            drop(state);

            self.follow(object, &reached, &position).await?;
            reached = position;
        }
    }

    /// Move an admitted object from `from` to where the coordinator is now
    async fn follow(&self, object: &TargetEntry, from: &str, to: &str) -> Result<()> {
        if from == to {
            return Ok(());
        }
        let ahead = match (self.phases.position(from), self.phases.position(to)) {
            (Some(from), Some(to)) => to > from,
            _ => false,
        };
        if ahead || self.transitions.is_direct_transition(from, to) {
            return self.apply_phase(object, from, to).await;
        }
        // The phase the object was brought to failed, or the coordinator was reset
        tracing::debug!(
            "[{}] {} stays at '{}' while coordinator fell back to '{}'",
            self.id,
            object.name(),
            from,
            to
        );
        Ok(())
    }

    async fn apply_single(&self, phase: &Phase, object: &TargetEntry) -> Result<()> {
        if !phase.is_in_scope(object.kind(), object.capabilities()) {
            return Ok(());
        }
        self.apply_to(phase, object)
            .await
            .map_err(|e| LifecycleError::phase_application(phase.name(), object.name(), e))
    }

    /// Return to not-in-lifecycle with an empty history and clear the
    /// interceptor's tracking
    ///
    /// # Errors
    ///
    /// [`LifecycleError::IllegalPhase`] while a phase is executing.
    pub async fn reset(&self) -> Result<()> {
        {
            let mut state = self.state.write().await;
            if let Some(executing) = &state.executing {
                return Err(LifecycleError::illegal_phase(
                    StandardPhase::NotInLifecycle.name(),
                    format!("cannot reset while executing '{executing}'"),
                ));
            }
            let generation = state.generation + 1;
            *state = CoordinatorState::new();
            state.generation = generation;
        }
        self.interceptor.on_reset().await;
        tracing::info!("[{}] Lifecycle reset", self.id);
        Ok(())
    }
}

/// Builder for [`LifecycleCoordinator`]
///
/// Phases and transitions are fixed once [`build`](CoordinatorBuilder::build)
/// returns.
pub struct CoordinatorBuilder {
    id: Option<String>,
    source: Arc<dyn TargetSource>,
    phases: Vec<Phase>,
    transitions: TransitionTable,
    interceptor: Option<Arc<dyn LifecycleInterceptor>>,
    options: CoordinatorOptions,
    fail_fast_phases: Option<Vec<String>>,
}

impl CoordinatorBuilder {
    pub fn new(source: Arc<dyn TargetSource>) -> Self {
        Self {
            id: None,
            source,
            phases: Vec::new(),
            transitions: TransitionTable::new(),
            interceptor: None,
            options: CoordinatorOptions::default(),
            fail_fast_phases: None,
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Register the standard phases and the standard transition table.
    ///
    /// Not-in-lifecycle is always registered first by
    /// [`build`](Self::build); this adds the other four.
    pub fn standard_phases(mut self) -> Self {
        for phase in StandardPhase::iter().filter(|p| *p != StandardPhase::NotInLifecycle) {
            self.phases.push(Phase::standard(phase));
        }
        for (from, to) in TransitionTable::standard().iter() {
            self.transitions.add_direct_transition(from, to);
        }
        self
    }

    /// Register a phase after the ones registered so far
    pub fn phase(mut self, phase: Phase) -> Self {
        self.phases.push(phase);
        self
    }

    pub fn direct_transition(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.transitions.add_direct_transition(from, to);
        self
    }

    /// Defaults to [`CompositeInterceptor::standard`]
    pub fn interceptor(self, interceptor: impl LifecycleInterceptor) -> Self {
        self.interceptor_arc(Arc::new(interceptor))
    }

    pub fn interceptor_arc(mut self, interceptor: Arc<dyn LifecycleInterceptor>) -> Self {
        self.interceptor = Some(interceptor);
        self
    }

    /// Return [`LifecycleError::TeardownFailed`] from best-effort phases
    /// that completed with failures
    pub fn strict_teardown(mut self, strict: bool) -> Self {
        self.options.strict_teardown = strict;
        self
    }

    /// Warn when a single object takes longer than this in any phase
    pub fn slow_phase_threshold(mut self, threshold: Duration) -> Self {
        self.options.slow_phase_threshold = Some(threshold);
        self
    }

    /// Keep at most this many completed-phase records. Defaults to
    /// [`DEFAULT_HISTORY_LIMIT`]; zero disables history.
    pub fn history_limit(mut self, limit: usize) -> Self {
        self.options.history_limit = limit;
        self
    }

    /// Apply environment-derived settings
    pub fn config(mut self, config: &LifecycleConfig) -> Self {
        if let Some(id) = &config.coordinator_id {
            self.id = Some(id.clone());
        }
        self.options.strict_teardown = config.strict_teardown;
        if let Some(threshold) = config.slow_phase_threshold {
            self.options.slow_phase_threshold = Some(threshold);
        }
        if let Some(limit) = config.history_limit {
            self.options.history_limit = limit;
        }
        if let Some(phases) = &config.fail_fast_phases {
            self.fail_fast_phases = Some(phases.clone());
        }
        self
    }

    /// # Errors
    ///
    /// [`LifecycleError::DuplicatePhase`] if a name is registered twice and
    /// [`LifecycleError::UnknownPhase`] if a transition or fail-fast setting
    /// names an unregistered phase.
    pub fn build(self) -> Result<LifecycleCoordinator> {
        let mut registry = PhaseRegistry::new();
        let not_in_lifecycle = StandardPhase::NotInLifecycle.name();
        if !self.phases.iter().any(|p| p.name() == not_in_lifecycle) {
            registry.register(Phase::standard(StandardPhase::NotInLifecycle))?;
        }
        for phase in self.phases {
            registry.register(phase)?;
        }

        for (from, to) in self.transitions.iter() {
            for name in [from, to] {
                if !registry.contains(name) {
                    return Err(LifecycleError::UnknownPhase(name.to_string()));
                }
            }
        }

        if let Some(fail_fast) = &self.fail_fast_phases {
            for name in fail_fast {
                if !registry.contains(name) {
                    return Err(LifecycleError::UnknownPhase(name.clone()));
                }
            }
            let names: Vec<String> = registry.names().map(str::to_string).collect();
            for name in names {
                let policy = if fail_fast.contains(&name) {
                    ErrorPolicy::FailFast
                } else {
                    ErrorPolicy::BestEffort
                };
                if let Some(phase) = registry.get_mut(&name) {
                    phase.set_policy(policy);
                }
            }
        }

        let id = self
            .id
            .unwrap_or_else(|| format!("lifecycle-{}", uuid::Uuid::new_v4()));
        tracing::debug!(
            "[{}] Coordinator built with {} phase(s) and {} direct transition(s)",
            id,
            registry.len(),
            self.transitions.len()
        );

        Ok(LifecycleCoordinator {
            id,
            phases: registry,
            transitions: self.transitions,
            interceptor: self
                .interceptor
                .unwrap_or_else(|| Arc::new(CompositeInterceptor::standard())),
            source: self.source,
            options: self.options,
            state: RwLock::new(CoordinatorState::new()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{Container, ObjectHandle, StaticSource};
    use crate::lifecycle::{Capabilities, Capability, LifecycleTarget, PhaseCallback};
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    type Log = Arc<Mutex<Vec<String>>>;

    struct TestService {
        name: &'static str,
        fail_on: Option<Capability>,
        log: Log,
    }

    impl TestService {
        fn new(name: &'static str, log: &Log) -> Self {
            Self {
                name,
                fail_on: None,
                log: Arc::clone(log),
            }
        }

        fn failing_on(mut self, capability: Capability) -> Self {
            self.fail_on = Some(capability);
            self
        }

        async fn record(&self, capability: Capability) -> anyhow::Result<()> {
            self.log
                .lock()
                .await
                .push(format!("{}:{}", capability, self.name));
            if self.fail_on == Some(capability) {
                anyhow::bail!("{} refused to {}", self.name, capability);
            }
            Ok(())
        }
    }

    #[async_trait]
    impl LifecycleTarget for TestService {
        fn name(&self) -> &str {
            self.name
        }

        fn capabilities(&self) -> Capabilities {
            Capabilities::ALL
        }

        async fn initialise(&self) -> anyhow::Result<()> {
            self.record(Capability::Initialise).await
        }

        async fn start(&self) -> anyhow::Result<()> {
            self.record(Capability::Start).await
        }

        async fn stop(&self) -> anyhow::Result<()> {
            self.record(Capability::Stop).await
        }

        async fn dispose(&self) -> anyhow::Result<()> {
            self.record(Capability::Dispose).await
        }
    }

    fn setup(services: Vec<TestService>) -> (Arc<Container>, LifecycleCoordinator) {
        let container = Arc::new(Container::new());
        for service in services {
            container.register(service);
        }
        let coordinator = LifecycleCoordinator::builder(container.clone())
            .id("test")
            .standard_phases()
            .build()
            .unwrap();
        (container, coordinator)
    }

    #[tokio::test]
    async fn test_walk_applies_intermediate_phases_in_order() {
        let log = Log::default();
        let (_, coordinator) = setup(vec![TestService::new("a", &log), TestService::new("b", &log)]);

        coordinator.fire_lifecycle("start").await.unwrap();

        assert_eq!(
            *log.lock().await,
            vec!["initialise:a", "initialise:b", "start:a", "start:b"]
        );
        assert_eq!(coordinator.current_phase().await, "start");
        assert!(coordinator.executing_phase().await.is_none());
        assert_eq!(
            coordinator.completed_phases().await,
            vec!["not in lifecycle", "initialise", "start"]
        );
    }

    #[tokio::test]
    async fn test_stop_and_start_supersede_each_other() {
        let log = Log::default();
        let (_, coordinator) = setup(vec![TestService::new("a", &log)]);

        coordinator.fire_lifecycle("start").await.unwrap();
        coordinator.fire_lifecycle("stop").await.unwrap();
        assert!(!coordinator.is_phase_complete("start").await);
        assert!(coordinator.is_phase_complete("stop").await);

        coordinator.fire_lifecycle("start").await.unwrap();
        assert!(!coordinator.is_phase_complete("stop").await);
        assert_eq!(coordinator.history().await.len(), 4);
    }

    #[tokio::test]
    async fn test_dispose_from_started_walks_through_stop() {
        let log = Log::default();
        let (_, coordinator) = setup(vec![TestService::new("a", &log)]);

        coordinator.fire_lifecycle("start").await.unwrap();
        coordinator.fire_lifecycle("dispose").await.unwrap();

        assert_eq!(
            *log.lock().await,
            vec!["initialise:a", "start:a", "stop:a", "dispose:a"]
        );
        assert!(!coordinator.is_phase_complete("initialise").await);
    }

    #[tokio::test]
    async fn test_fail_fast_leaves_phase_unadvanced() {
        let log = Log::default();
        let (_, coordinator) = setup(vec![
            TestService::new("a", &log).failing_on(Capability::Initialise),
            TestService::new("b", &log),
        ]);

        let err = coordinator.fire_lifecycle("initialise").await.unwrap_err();

        assert!(matches!(
            &err,
            LifecycleError::PhaseApplication { phase, object, .. } if phase == "initialise" && object == "a"
        ));
        assert_eq!(*log.lock().await, vec!["initialise:a"]);
        assert_eq!(coordinator.current_phase().await, "not in lifecycle");
        assert!(coordinator.executing_phase().await.is_none());
        assert!(coordinator.is_last_phase_execution_failed().await);
    }

    #[tokio::test]
    async fn test_best_effort_continues_past_failures() {
        let log = Log::default();
        let (_, coordinator) = setup(vec![
            TestService::new("a", &log).failing_on(Capability::Stop),
            TestService::new("b", &log),
        ]);
        coordinator.fire_lifecycle("start").await.unwrap();
        log.lock().await.clear();

        coordinator.fire_lifecycle("stop").await.unwrap();

        assert_eq!(*log.lock().await, vec!["stop:a", "stop:b"]);
        assert_eq!(coordinator.current_phase().await, "stop");
        let history = coordinator.history().await;
        let stop = history.last().unwrap();
        assert_eq!(stop.failed.len(), 1);
        assert_eq!(stop.failed[0].object, "a");
        assert_eq!(stop.applied.len(), 1);
    }

    #[tokio::test]
    async fn test_strict_teardown_reports_failures_after_completing() {
        let log = Log::default();
        let container = Arc::new(Container::new());
        container.register(TestService::new("a", &log).failing_on(Capability::Dispose));
        container.register(TestService::new("b", &log));
        let coordinator = LifecycleCoordinator::builder(container)
            .standard_phases()
            .strict_teardown(true)
            .build()
            .unwrap();

        coordinator.fire_lifecycle("initialise").await.unwrap();
        let err = coordinator.fire_lifecycle("dispose").await.unwrap_err();

        match err {
            LifecycleError::TeardownFailed { phase, failures } => {
                assert_eq!(phase, "dispose");
                assert_eq!(failures.len(), 1);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(log.lock().await.contains(&"dispose:b".to_string()));
        assert_eq!(coordinator.current_phase().await, "dispose");
    }

    #[tokio::test]
    async fn test_check_phase_rules() {
        let log = Log::default();
        let (_, coordinator) = setup(vec![TestService::new("a", &log)]);

        assert!(matches!(
            coordinator.fire_lifecycle("restart").await,
            Err(LifecycleError::IllegalPhase { .. })
        ));
        assert!(matches!(
            coordinator.fire_lifecycle("not in lifecycle").await,
            Err(LifecycleError::IllegalPhase { .. })
        ));

        coordinator.fire_lifecycle("start").await.unwrap();
        assert!(matches!(
            coordinator.fire_lifecycle("start").await,
            Err(LifecycleError::IllegalPhase { .. })
        ));
        assert!(matches!(
            coordinator.fire_lifecycle("initialise").await,
            Err(LifecycleError::IllegalTransition { from, to }) if from == "start" && to == "initialise"
        ));
    }

    #[tokio::test]
    async fn test_last_failure_forces_direct_transition() {
        let log = Log::default();
        let (_, coordinator) = setup(vec![
            TestService::new("a", &log).failing_on(Capability::Initialise),
        ]);

        coordinator.fire_lifecycle("initialise").await.unwrap_err();
        log.lock().await.clear();

        // Not a direct transition from not-in-lifecycle, but the last execution failed
        coordinator.fire_lifecycle("stop").await.unwrap();
        assert_eq!(*log.lock().await, vec!["stop:a"]);
        assert!(!coordinator.is_last_phase_execution_failed().await);
    }

    #[tokio::test]
    async fn test_reverse_order_and_ignored_kinds() {
        let log = Log::default();
        let container = Arc::new(Container::new());
        for name in ["a", "b", "c"] {
            container.register(TestService::new(name, &log));
        }
        let coordinator = LifecycleCoordinator::builder(container)
            .phase(Phase::standard(StandardPhase::Initialise))
            .phase(
                Phase::standard(StandardPhase::Dispose)
                    .with_order(ApplicationOrder::Reverse)
                    .ignore_kind("transient"),
            )
            .direct_transition("not in lifecycle", "initialise")
            .direct_transition("initialise", "dispose")
            .build()
            .unwrap();

        coordinator.fire_lifecycle("dispose").await.unwrap();

        // dispose is not direct from not-in-lifecycle here, so the walk initialises first
        assert_eq!(
            *log.lock().await,
            vec![
                "initialise:a",
                "initialise:b",
                "initialise:c",
                "dispose:c",
                "dispose:b",
                "dispose:a"
            ]
        );
    }

    #[tokio::test]
    async fn test_apply_phase_to_single_object() {
        let log = Log::default();
        let (container, coordinator) = setup(vec![]);
        let handle = container.register(TestService::new("late", &log));
        let entry = container.get(handle).unwrap();

        coordinator
            .apply_phase(&entry, "not in lifecycle", "start")
            .await
            .unwrap();
        coordinator.apply_phase(&entry, "start", "stop").await.unwrap();
        coordinator.apply_phase(&entry, "stop", "start").await.unwrap();

        assert_eq!(
            *log.lock().await,
            vec!["initialise:late", "start:late", "stop:late", "start:late"]
        );
        assert_eq!(coordinator.current_phase().await, "not in lifecycle");
        assert!(matches!(
            coordinator.apply_phase(&entry, "dispose", "initialise").await,
            Err(LifecycleError::IllegalTransition { .. })
        ));
        assert!(matches!(
            coordinator.apply_phase(&entry, "bogus", "start").await,
            Err(LifecycleError::UnknownPhase(_))
        ));
    }

    #[tokio::test]
    async fn test_apply_completed_phases_follows_direct_transitions() {
        let log = Log::default();
        let (container, coordinator) = setup(vec![TestService::new("a", &log)]);
        coordinator.fire_lifecycle("start").await.unwrap();
        coordinator.fire_lifecycle("stop").await.unwrap();
        log.lock().await.clear();

        let handle = container.register(TestService::new("late", &log));
        let entry = container.get(handle).unwrap();
        coordinator.apply_completed_phases(&entry).await.unwrap();

        // completed: not in lifecycle, initialise, stop; initialise → stop is not direct
        assert_eq!(*log.lock().await, vec!["initialise:late"]);
    }

    #[tokio::test]
    async fn test_duplicate_targets_applied_once() {
        let log = Log::default();
        let entry = TargetEntry::new(ObjectHandle::new(0), Arc::new(TestService::new("a", &log)));
        let source = Arc::new(StaticSource::new(vec![entry.clone(), entry]));
        let coordinator = LifecycleCoordinator::standard(source).unwrap();

        coordinator.fire_lifecycle("initialise").await.unwrap();

        assert_eq!(*log.lock().await, vec!["initialise:a"]);
    }

    #[tokio::test]
    async fn test_slow_threshold_only_warns() {
        let log = Log::default();
        let container = Arc::new(Container::new());
        container.register(TestService::new("a", &log));
        let coordinator = LifecycleCoordinator::builder(container)
            .standard_phases()
            .slow_phase_threshold(Duration::ZERO)
            .build()
            .unwrap();

        coordinator.fire_lifecycle("initialise").await.unwrap();
        assert_eq!(coordinator.current_phase().await, "initialise");
    }

    #[tokio::test]
    async fn test_reset() {
        let log = Log::default();
        let (_, coordinator) = setup(vec![TestService::new("a", &log)]);
        coordinator.fire_lifecycle("start").await.unwrap();

        coordinator.reset().await.unwrap();

        assert_eq!(coordinator.current_phase().await, "not in lifecycle");
        assert!(coordinator.history().await.is_empty());
        coordinator.fire_lifecycle("initialise").await.unwrap();
    }

    #[tokio::test]
    async fn test_reset_clears_interceptor_tracking() {
        let log = Log::default();
        let (_, coordinator) = setup(vec![
            TestService::new("a", &log).failing_on(Capability::Initialise),
            TestService::new("b", &log),
        ]);
        coordinator.fire_lifecycle("initialise").await.unwrap_err();

        coordinator.reset().await.unwrap();
        log.lock().await.clear();

        // `a` failed and `b` was never reached, but that was the previous cycle
        coordinator.fire_lifecycle("dispose").await.unwrap();
        assert_eq!(*log.lock().await, vec!["dispose:a", "dispose:b"]);
    }

    #[tokio::test]
    async fn test_history_keeps_most_recent_records() {
        let log = Log::default();
        let container = Arc::new(Container::new());
        container.register(TestService::new("a", &log));
        let coordinator = LifecycleCoordinator::builder(container)
            .standard_phases()
            .history_limit(3)
            .build()
            .unwrap();

        coordinator.fire_lifecycle("start").await.unwrap();
        for phase in ["stop", "start", "stop"] {
            coordinator.fire_lifecycle(phase).await.unwrap();
        }

        let phases: Vec<_> = coordinator
            .history()
            .await
            .into_iter()
            .map(|record| record.phase)
            .collect();
        assert_eq!(phases, vec!["stop", "start", "stop"]);
        assert_eq!(coordinator.snapshot().await.history.len(), 3);
    }

    #[tokio::test]
    async fn test_zero_history_limit_keeps_nothing() {
        let log = Log::default();
        let container = Arc::new(Container::new());
        container.register(TestService::new("a", &log));
        let config = LifecycleConfig {
            history_limit: Some(0),
            ..LifecycleConfig::default()
        };
        let coordinator = LifecycleCoordinator::builder(container)
            .standard_phases()
            .config(&config)
            .build()
            .unwrap();

        coordinator.fire_lifecycle("start").await.unwrap();

        assert!(coordinator.history().await.is_empty());
        assert_eq!(coordinator.current_phase().await, "start");
    }

    #[tokio::test]
    async fn test_admit_publishes_only_after_catching_up() {
        let log = Log::default();
        let (container, coordinator) = setup(vec![TestService::new("a", &log)]);
        coordinator.fire_lifecycle("start").await.unwrap();
        log.lock().await.clear();

        let entry = container.prepare(Arc::new(TestService::new("late", &log)));
        coordinator
            .admit(&entry, || {
                container.insert(entry.clone());
            })
            .await
            .unwrap();
        assert_eq!(*log.lock().await, vec!["initialise:late", "start:late"]);
        assert!(container.contains(entry.handle()));

        let failing = container.prepare(Arc::new(
            TestService::new("broken", &log).failing_on(Capability::Start),
        ));
        let result = coordinator
            .admit(&failing, || {
                container.insert(failing.clone());
            })
            .await;
        assert!(matches!(result, Err(LifecycleError::PhaseApplication { .. })));
        assert!(!container.contains(failing.handle()));
    }

    #[tokio::test]
    async fn test_callback_receives_record() {
        struct Capture(Arc<Mutex<Vec<String>>>);

        #[async_trait]
        impl PhaseCallback for Capture {
            async fn on_phase_completed(&self, record: &PhaseRecord) {
                self.0
                    .lock()
                    .await
                    .push(format!("{}:{}", record.phase, record.applied.len()));
            }
        }

        let log = Log::default();
        let captured = Arc::new(Mutex::new(Vec::new()));
        let container = Arc::new(Container::new());
        container.register(TestService::new("a", &log));
        let coordinator = LifecycleCoordinator::builder(container)
            .phase(
                Phase::standard(StandardPhase::Initialise)
                    .with_callback(Capture(Arc::clone(&captured))),
            )
            .direct_transition("not in lifecycle", "initialise")
            .build()
            .unwrap();

        coordinator.fire_lifecycle("initialise").await.unwrap();
        assert_eq!(*captured.lock().await, vec!["initialise:1"]);
    }

    #[tokio::test]
    async fn test_builder_rejects_unknown_transition_phase() {
        let container = Arc::new(Container::new());
        let result = LifecycleCoordinator::builder(container)
            .standard_phases()
            .direct_transition("start", "restart")
            .build();
        assert!(matches!(result, Err(LifecycleError::UnknownPhase(name)) if name == "restart"));
    }

    #[tokio::test]
    async fn test_config_overrides_policies() {
        let log = Log::default();
        let container = Arc::new(Container::new());
        container.register(TestService::new("a", &log).failing_on(Capability::Initialise));
        container.register(TestService::new("b", &log));
        let config = LifecycleConfig {
            coordinator_id: Some("configured".to_string()),
            fail_fast_phases: Some(vec!["start".to_string()]),
            ..LifecycleConfig::default()
        };
        let coordinator = LifecycleCoordinator::builder(container)
            .standard_phases()
            .config(&config)
            .build()
            .unwrap();

        // initialise is now best-effort
        coordinator.fire_lifecycle("initialise").await.unwrap();
        assert_eq!(coordinator.id(), "configured");
        assert_eq!(*log.lock().await, vec!["initialise:a", "initialise:b"]);
    }

    #[tokio::test]
    async fn test_snapshot_serializes() {
        let log = Log::default();
        let (_, coordinator) = setup(vec![TestService::new("a", &log)]);
        coordinator.fire_lifecycle("initialise").await.unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&coordinator.snapshot().await.to_json().unwrap()).unwrap();
        assert_eq!(json["id"], "test");
        assert_eq!(json["current_phase"], "initialise");
        assert_eq!(json["history"][0]["applied"][0], 0);
    }
}
