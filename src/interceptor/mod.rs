//! Lifecycle interceptors
//!
//! An interceptor observes every per-object phase application and may veto
//! it. The coordinator calls, for each target in scope:
//!
//! ```text
//! before_phase_execution ─ false ─→ skipped
//!        │ true
//!        ▼
//! behavior.apply(target)
//!        │
//!        ▼
//! after_phase_execution(error?)
//! ```
//!
//! and, once every target has been processed, `on_phase_completed`.
//! `on_reset` follows a coordinator reset.

mod composite;
mod logging;
mod paired;

pub use composite::CompositeInterceptor;
pub use logging::LoggingInterceptor;
pub use paired::PairedPhaseInterceptor;

use crate::container::TargetEntry;
use async_trait::async_trait;

/// The LifecycleInterceptor trait
///
/// # Example
/// ```rust,ignore
/// struct DenyTransformers;
///
/// #[async_trait]
/// impl LifecycleInterceptor for DenyTransformers {
///     async fn before_phase_execution(&self, _phase: &str, object: &TargetEntry) -> bool {
///         object.kind() != "transformer"
///     }
///
///     async fn after_phase_execution(&self, _: &str, _: &TargetEntry, _: Option<&anyhow::Error>) {}
///
///     async fn on_phase_completed(&self, _phase: &str) {}
/// }
/// ```
#[async_trait]
pub trait LifecycleInterceptor: Send + Sync + 'static {
    /// Return `false` to skip applying `phase` to `object`
    async fn before_phase_execution(&self, phase: &str, object: &TargetEntry) -> bool;

    /// Called after the behavior ran, with the error it returned, if any
    async fn after_phase_execution(
        &self,
        phase: &str,
        object: &TargetEntry,
        error: Option<&anyhow::Error>,
    );

    /// Called once `phase` has been processed for every object in scope.
    /// Not called when a fail-fast phase aborts.
    async fn on_phase_completed(&self, phase: &str);

    /// Called when the coordinator is reset. Interceptors holding tracking
    /// state clear it here.
    async fn on_reset(&self) {}
}

/// Never vetoes, records nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopInterceptor;

#[async_trait]
impl LifecycleInterceptor for NoopInterceptor {
    async fn before_phase_execution(&self, _phase: &str, _object: &TargetEntry) -> bool {
        true
    }

    async fn after_phase_execution(
        &self,
        _phase: &str,
        _object: &TargetEntry,
        _error: Option<&anyhow::Error>,
    ) {
    }

    async fn on_phase_completed(&self, _phase: &str) {}
}
