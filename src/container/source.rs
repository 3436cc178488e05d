use super::{ObjectHandle, TargetEntry};
use crate::lifecycle::LifecycleTarget;
use std::sync::Arc;

/// Supplies the objects in scope for a phase
///
/// Called once per phase application, while the coordinator holds its state
/// lock, so implementations must not block or call back into the
/// coordinator. The returned order is the order the phase visits objects
/// in, and each handle must belong to exactly one object.
pub trait TargetSource: Send + Sync {
    fn targets_for(&self, phase: &str) -> Vec<TargetEntry>;
}

/// A fixed list of targets, handed out for every phase
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    targets: Vec<TargetEntry>,
}

impl StaticSource {
    pub fn new(targets: Vec<TargetEntry>) -> Self {
        Self { targets }
    }

    /// Number the targets by position
    pub fn from_targets(targets: impl IntoIterator<Item = Arc<dyn LifecycleTarget>>) -> Self {
        let targets = targets
            .into_iter()
            .enumerate()
            .map(|(index, target)| TargetEntry::new(ObjectHandle::new(index), target))
            .collect();
        Self { targets }
    }

    pub fn targets(&self) -> &[TargetEntry] {
        &self.targets
    }
}

impl TargetSource for StaticSource {
    fn targets_for(&self, _phase: &str) -> Vec<TargetEntry> {
        self.targets.clone()
    }
}
