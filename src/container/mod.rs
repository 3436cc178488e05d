//! Target container
//!
//! Arena of lifecycle targets addressed by opaque [`ObjectHandle`]s. Handles
//! are never reused, so they double as object identity for interceptor
//! tracking.

mod source;

pub use source::{StaticSource, TargetSource};

use crate::lifecycle::{Capabilities, LifecycleTarget};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Opaque identity of a registered target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectHandle(usize);

impl ObjectHandle {
    /// Handle for the object at `index`
    ///
    /// Handles identify objects to interceptors, so a [`TargetSource`] must
    /// never hand out two different objects under the same handle.
    /// [`Container`] allocates them for you; build them by hand only for
    /// a source of your own, such as a [`StaticSource`].
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A registered target together with the metadata resolved at registration
#[derive(Clone)]
pub struct TargetEntry {
    handle: ObjectHandle,
    name: String,
    kind: String,
    capabilities: Capabilities,
    target: Arc<dyn LifecycleTarget>,
}

impl TargetEntry {
    /// Resolve name, kind and capabilities from the target
    pub fn new(handle: ObjectHandle, target: Arc<dyn LifecycleTarget>) -> Self {
        Self {
            handle,
            name: target.name().to_string(),
            kind: target.kind().to_string(),
            capabilities: target.capabilities(),
            target,
        }
    }

    pub fn handle(&self) -> ObjectHandle {
        self.handle
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn target(&self) -> &Arc<dyn LifecycleTarget> {
        &self.target
    }
}

impl fmt::Debug for TargetEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetEntry")
            .field("handle", &self.handle)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

/// Thread-safe container of lifecycle targets.
///
/// Iteration order is registration order.
pub struct Container {
    entries: DashMap<ObjectHandle, TargetEntry>,
    names: DashMap<String, ObjectHandle>,
    next_handle: AtomicUsize,
}

impl Container {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            names: DashMap::new(),
            next_handle: AtomicUsize::new(0),
        }
    }

    /// Register a target and return its handle.
    ///
    /// A later registration under the same name shadows the earlier one for
    /// [`lookup`](Container::lookup); both stay under lifecycle management.
    pub fn register<T: LifecycleTarget + 'static>(&self, target: T) -> ObjectHandle {
        self.register_arc(Arc::new(target))
    }

    pub fn register_arc(&self, target: Arc<dyn LifecycleTarget>) -> ObjectHandle {
        self.insert(self.prepare(target))
    }

    /// Allocate a handle for `target` without making it visible yet
    pub fn prepare(&self, target: Arc<dyn LifecycleTarget>) -> TargetEntry {
        let handle = ObjectHandle::new(self.next_handle.fetch_add(1, Ordering::SeqCst));
        TargetEntry::new(handle, target)
    }

    /// Make a [`prepare`](Container::prepare)d entry visible to phases
    pub fn insert(&self, entry: TargetEntry) -> ObjectHandle {
        let handle = entry.handle();
        tracing::debug!(
            "Registered {} as {} with capabilities {:?}",
            entry.name(),
            handle,
            entry.capabilities()
        );
        self.names.insert(entry.name().to_string(), handle);
        self.entries.insert(handle, entry);
        handle
    }

    pub fn get(&self, handle: ObjectHandle) -> Option<TargetEntry> {
        self.entries.get(&handle).map(|entry| entry.value().clone())
    }

    pub fn lookup(&self, name: &str) -> Option<TargetEntry> {
        let handle = *self.names.get(name)?.value();
        self.get(handle)
    }

    /// Remove a target. Its handle is never handed out again.
    pub fn remove(&self, handle: ObjectHandle) -> Option<TargetEntry> {
        let (_, entry) = self.entries.remove(&handle)?;
        self.names
            .remove_if(entry.name(), |_, registered| *registered == handle);
        Some(entry)
    }

    /// All targets in registration order
    pub fn targets(&self) -> Vec<TargetEntry> {
        let mut entries: Vec<TargetEntry> = self
            .entries
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        entries.sort_by_key(TargetEntry::handle);
        entries
    }

    pub fn contains(&self, handle: ObjectHandle) -> bool {
        self.entries.contains_key(&handle)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl TargetSource for Container {
    fn targets_for(&self, _phase: &str) -> Vec<TargetEntry> {
        self.targets()
    }
}
