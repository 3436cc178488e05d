//! Completed-phase history and serializable snapshots

use super::PhaseFailure;
use crate::container::ObjectHandle;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Outcome of one completed phase
#[derive(Debug, Clone, Serialize)]
pub struct PhaseRecord {
    pub phase: String,
    pub completed_at: DateTime<Utc>,
    /// Objects the behavior ran on successfully
    pub applied: Vec<ObjectHandle>,
    /// Objects vetoed by the interceptor
    pub skipped: Vec<ObjectHandle>,
    /// Objects that failed under a best-effort policy
    pub failed: Vec<PhaseFailure>,
}

impl PhaseRecord {
    pub(crate) fn new(phase: impl Into<String>) -> Self {
        Self {
            phase: phase.into(),
            completed_at: Utc::now(),
            applied: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub(crate) fn complete(mut self) -> Self {
        self.completed_at = Utc::now();
        self
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Point-in-time view of a coordinator, for diagnostics and management
/// endpoints
#[derive(Debug, Clone, Serialize)]
pub struct LifecycleSnapshot {
    pub id: String,
    pub current_phase: String,
    pub executing_phase: Option<String>,
    pub completed_phases: Vec<String>,
    pub last_phase_failed: bool,
    pub history: Vec<PhaseRecord>,
}

impl LifecycleSnapshot {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
