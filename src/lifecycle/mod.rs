//! Lifecycle Module
//!
//! Coordinates the phases a set of managed objects moves through, from
//! creation to disposal.
//!
//! # Lifecycle Phases
//!
//! ```text
//! not in lifecycle
//!    ↓
//! initialise          ← fail-fast
//!    ↓
//! start  ⇄  stop      ← start fail-fast, stop best-effort
//!             ↓
//!          dispose    ← best-effort
//! ```
//!
//! A request for a phase that is not a direct transition from the current
//! one walks every registered phase in between, in registration order.
//! Phases are applied to each object only if its [`Capabilities`] include
//! the phase's behavior, and only if the interceptor allows it. By default
//! an object that failed `initialise` is never disposed, and one that
//! failed `start` is never stopped.
//!
//! # Example
//!
//! ```rust,ignore
//! use phaseflow::lifecycle::{Capabilities, LifecycleCoordinator, LifecycleTarget};
//! use phaseflow::container::Container;
//!
//! let container = Arc::new(Container::new());
//! container.register(DatabaseService::new(config));
//!
//! let coordinator = LifecycleCoordinator::standard(container)?;
//! coordinator.fire_lifecycle("start").await?;
//! ```

mod application;
mod capability;
mod coordinator;
mod error;
mod phase;
mod registry;
mod shutdown;
mod state;
mod traits;
mod transition;

pub use application::{Application, ApplicationBuilder};
pub use capability::{Capabilities, Capability, Capable};
pub use coordinator::{CoordinatorBuilder, DEFAULT_HISTORY_LIMIT, LifecycleCoordinator};
pub use error::{LifecycleError, PhaseFailure, Result};
pub use phase::{
    ApplicationOrder, CapabilityBehavior, ErrorPolicy, NoopBehavior, NoopCallback, Phase,
    PhaseBehavior, PhaseCallback, StandardPhase,
};
pub use registry::PhaseRegistry;
pub use shutdown::{ShutdownHandler, shutdown_signal};
pub use state::{LifecycleSnapshot, PhaseRecord};
pub use traits::LifecycleTarget;
pub use transition::TransitionTable;
