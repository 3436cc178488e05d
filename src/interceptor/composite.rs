use super::{LifecycleInterceptor, PairedPhaseInterceptor};
use crate::container::TargetEntry;
use crate::lifecycle::StandardPhase;
use async_trait::async_trait;
use std::sync::Arc;

/// Runs a chain of interceptors
///
/// `before_phase_execution` short-circuits on the first veto, so later
/// delegates never see an object an earlier one rejected. The other calls
/// reach every delegate.
#[derive(Clone, Default)]
pub struct CompositeInterceptor {
    delegates: Vec<Arc<dyn LifecycleInterceptor>>,
}

impl CompositeInterceptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initialise gates dispose, start gates stop
    pub fn standard() -> Self {
        Self::new()
            .with(PairedPhaseInterceptor::standard(
                StandardPhase::Initialise,
                StandardPhase::Dispose,
            ))
            .with(PairedPhaseInterceptor::standard(
                StandardPhase::Start,
                StandardPhase::Stop,
            ))
    }

    pub fn with(self, interceptor: impl LifecycleInterceptor) -> Self {
        self.with_arc(Arc::new(interceptor))
    }

    pub fn with_arc(mut self, interceptor: Arc<dyn LifecycleInterceptor>) -> Self {
        self.delegates.push(interceptor);
        self
    }

    pub fn len(&self) -> usize {
        self.delegates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.delegates.is_empty()
    }
}

#[async_trait]
impl LifecycleInterceptor for CompositeInterceptor {
    async fn before_phase_execution(&self, phase: &str, object: &TargetEntry) -> bool {
        for delegate in &self.delegates {
            if !delegate.before_phase_execution(phase, object).await {
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
        for delegate in &self.delegates {
            delegate.after_phase_execution(phase, object, error).await;
        }
    }

    async fn on_phase_completed(&self, phase: &str) {
        for delegate in &self.delegates {
            delegate.on_phase_completed(phase).await;
        }
    }

    async fn on_reset(&self) {
        for delegate in &self.delegates {
            delegate.on_reset().await;
        }
    }
}
