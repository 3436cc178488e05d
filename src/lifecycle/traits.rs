//! Lifecycle target trait
//!
//! Defines the contract for objects that are driven through lifecycle phases
//! by a [`LifecycleCoordinator`](super::LifecycleCoordinator).

use super::Capabilities;
use async_trait::async_trait;

/// An object under lifecycle management
///
/// Every method has a no-op default so a target only implements the
/// behaviors it declares in [`capabilities`](LifecycleTarget::capabilities).
/// Phases never call a behavior that is missing from the descriptor.
///
/// Methods take `&self`; targets that need to mutate state keep it behind
/// their own lock, because the same target is shared between the container
/// and any in-flight phase.
///
/// # Example
///
/// ```rust,ignore
/// use phaseflow::lifecycle::{Capabilities, Capability, LifecycleTarget};
/// use async_trait::async_trait;
///
/// struct JmsConnector { /* ... */ }
///
/// #[async_trait]
/// impl LifecycleTarget for JmsConnector {
///     fn name(&self) -> &str {
///         "jms-connector"
///     }
///
///     fn capabilities(&self) -> Capabilities {
///         Capabilities::ALL
///     }
///
///     async fn start(&self) -> anyhow::Result<()> {
///         self.connection.connect().await?;
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait LifecycleTarget: Send + Sync {
    /// Name used in logs and error messages
    fn name(&self) -> &str;

    /// Category of the object, used by phases that ignore some kinds
    fn kind(&self) -> &str {
        "component"
    }

    /// Behaviors this object supports. Read once when the object is registered.
    fn capabilities(&self) -> Capabilities;

    /// Acquire resources and validate configuration
    async fn initialise(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Begin processing
    async fn start(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Stop processing; the object may be started again
    async fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Release resources. Terminal.
    async fn dispose(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
