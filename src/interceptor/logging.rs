use crate::container::{ObjectHandle, TargetEntry};
use crate::interceptor::LifecycleInterceptor;
use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;

/// An interceptor that logs per-object phase timing and outcome. Never vetoes.
#[derive(Debug, Default)]
pub struct LoggingInterceptor {
    started: DashMap<(String, ObjectHandle), Instant>,
}

impl LoggingInterceptor {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LifecycleInterceptor for LoggingInterceptor {
    async fn before_phase_execution(&self, phase: &str, object: &TargetEntry) -> bool {
        tracing::debug!("--> {} {} {}", phase, object.name(), object.handle());
        self.started
            .insert((phase.to_string(), object.handle()), Instant::now());
        true
    }

    async fn after_phase_execution(
        &self,
        phase: &str,
        object: &TargetEntry,
        error: Option<&anyhow::Error>,
    ) {
        let elapsed = self
            .started
            .remove(&(phase.to_string(), object.handle()))
            .map(|(_, started)| started.elapsed());

        match error {
            None => tracing::debug!(
                "<-- {} {} {} {:?}",
                phase,
                object.name(),
                object.handle(),
                elapsed
            ),
            Some(e) => tracing::debug!(
                "<-- {} {} {} ERROR: {:#} {:?}",
                phase,
                object.name(),
                object.handle(),
                e,
                elapsed
            ),
        }
    }

    async fn on_phase_completed(&self, phase: &str) {
        // Entries left behind belong to objects vetoed further down the chain
        self.started.retain(|(p, _), _| p != phase);
        tracing::debug!("<== {} complete", phase);
    }

    async fn on_reset(&self) {
        self.started.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::{Capabilities, LifecycleTarget};
    use std::sync::Arc;

    struct Stub;

    #[async_trait]
    impl LifecycleTarget for Stub {
        fn name(&self) -> &str {
            "stub"
        }

        fn capabilities(&self) -> Capabilities {
            Capabilities::ALL
        }
    }

    #[tokio::test]
    async fn test_never_vetoes_and_forgets_timings() {
        let interceptor = LoggingInterceptor::new();
        let object = TargetEntry::new(ObjectHandle::new(7), Arc::new(Stub));

        assert!(interceptor.before_phase_execution("start", &object).await);
        assert_eq!(interceptor.started.len(), 1);

        interceptor.after_phase_execution("start", &object, None).await;
        assert!(interceptor.started.is_empty());

        interceptor.before_phase_execution("stop", &object).await;
        interceptor.on_phase_completed("stop").await;
        assert!(interceptor.started.is_empty());

        interceptor.before_phase_execution("dispose", &object).await;
        interceptor.on_reset().await;
        assert!(interceptor.started.is_empty());
    }
}
