//! Lifecycle-specific error types

use crate::container::ObjectHandle;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Errors that can occur during lifecycle operations
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The phase is unknown, already current, or another phase is executing
    #[error("Illegal lifecycle phase '{phase}': {reason}")]
    IllegalPhase {
        /// The requested phase
        phase: String,
        /// Why it cannot be fired now
        reason: String,
    },

    /// No direct transition and the destination is behind the current phase
    #[error("Illegal lifecycle transition from '{from}' to '{to}'")]
    IllegalTransition {
        /// The current phase
        from: String,
        /// The requested phase
        to: String,
    },

    /// A target failed while a fail-fast phase was applied to it
    #[error("Failed to apply phase '{phase}' to {object}: {source}")]
    PhaseApplication {
        /// Phase being applied
        phase: String,
        /// Name of the target that failed
        object: String,
        /// Error returned by the target
        #[source]
        source: anyhow::Error,
    },

    /// Lookup of a phase that was never registered
    #[error("Unknown lifecycle phase: {0}")]
    UnknownPhase(String),

    /// A phase name was registered twice
    #[error("Lifecycle phase registered twice: {0}")]
    DuplicatePhase(String),

    /// A handle that is not (or no longer) in the container
    #[error("Unknown lifecycle object: {0}")]
    UnknownObject(ObjectHandle),

    /// Strict mode only: a best-effort phase completed with failures
    #[error("Phase '{phase}' completed with {} failure(s)", .failures.len())]
    TeardownFailed {
        /// The phase that completed
        phase: String,
        /// Every object that failed
        failures: Vec<PhaseFailure>,
    },
}

impl LifecycleError {
    /// Create an illegal phase error
    pub fn illegal_phase(phase: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::IllegalPhase {
            phase: phase.into(),
            reason: reason.into(),
        }
    }

    /// Create an illegal transition error
    pub fn illegal_transition(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::IllegalTransition {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Wrap an error returned by a target
    pub fn phase_application(
        phase: impl Into<String>,
        object: impl Into<String>,
        source: anyhow::Error,
    ) -> Self {
        Self::PhaseApplication {
            phase: phase.into(),
            object: object.into(),
            source,
        }
    }
}

/// A per-object failure swallowed by a best-effort phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseFailure {
    pub handle: ObjectHandle,
    pub object: String,
    pub message: String,
}

impl fmt::Display for PhaseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.object, self.handle, self.message)
    }
}

/// A specialized Result type for lifecycle operations
pub type Result<T> = std::result::Result<T, LifecycleError>;
