//! # Phaseflow
//!
//! Lifecycle phase coordination for graphs of managed objects.
//!
//! Objects live in a [`Container`] and declare which of the standard
//! behaviors (initialise, start, stop, dispose) they support. A
//! [`LifecycleCoordinator`] moves them through named phases, enforcing a
//! transition table, walking intermediate phases when a request skips
//! ahead, and consulting an interceptor that can veto individual objects.
//!
//! ## Features
//!
//! - **Ordered phases**: a request for a later phase applies every phase in between
//! - **Transition rules**: direct transitions such as `stop → start` skip the walk
//! - **Paired phases**: an object that failed `initialise` is never disposed
//! - **Error policies**: startup phases fail fast, teardown phases are best-effort
//! - **Late registration**: objects added after startup catch up automatically
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use phaseflow::prelude::*;
//!
//! #[derive(Capable)]
//! #[lifecycle(start, stop)]
//! struct HttpListener;
//!
//! #[async_trait]
//! impl LifecycleTarget for HttpListener {
//!     fn name(&self) -> &str {
//!         "http-listener"
//!     }
//!
//!     fn capabilities(&self) -> Capabilities {
//!         Self::CAPABILITIES
//!     }
//!
//!     async fn start(&self) -> anyhow::Result<()> {
//!         tracing::info!("listening");
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> phaseflow::Result<()> {
//!     let app = Application::builder()
//!         .register(HttpListener)
//!         .build()
//!         .await?;
//!
//!     app.shutdown().await?;
//!     Ok(())
//! }
//! ```

extern crate self as phaseflow;

pub mod config;
pub mod container;
pub mod error;
pub mod interceptor;
pub mod lifecycle;

// Re-export core types
pub use container::{Container, ObjectHandle, TargetEntry, TargetSource};
pub use error::{PhaseflowError, Result};
pub use lifecycle::{Application, LifecycleCoordinator, LifecycleError, LifecycleTarget};

// Re-export macros
pub use phaseflow_macro::Capable as DeriveCapable;

// Re-export commonly used types from dependencies
pub use async_trait::async_trait;

/// Prelude module for convenient imports
///
/// ```
/// use phaseflow::prelude::*;
/// ```
pub mod prelude {
    pub use crate::DeriveCapable as Capable;
    pub use crate::config::{ConfigService, LifecycleConfig};
    pub use crate::container::{Container, ObjectHandle, StaticSource, TargetEntry, TargetSource};
    pub use crate::error::{PhaseflowError, Result};
    pub use crate::interceptor::{
        CompositeInterceptor, LifecycleInterceptor, LoggingInterceptor, NoopInterceptor,
        PairedPhaseInterceptor,
    };
    pub use crate::lifecycle::{
        Application, ApplicationBuilder, ApplicationOrder, Capabilities, Capability, Capable,
        ErrorPolicy, LifecycleCoordinator, LifecycleError, LifecycleTarget, Phase, PhaseBehavior,
        PhaseCallback, PhaseRecord, ShutdownHandler, StandardPhase, shutdown_signal,
    };
    pub use async_trait::async_trait;
    pub use std::sync::Arc;
}
