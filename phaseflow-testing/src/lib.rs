//! Test doubles for phaseflow
//!
//! [`RecordingTarget`] writes every behavior call to a shared [`Journal`],
//! so tests can assert the exact order in which phases reached objects.

use async_trait::async_trait;
use phaseflow::lifecycle::{Capabilities, Capability, LifecycleTarget};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Ordered log of `"<capability>:<object>"` entries shared between targets
#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record(&self, entry: impl Into<String>) {
        self.entries.lock().await.push(entry.into());
    }

    pub async fn entries(&self) -> Vec<String> {
        self.entries.lock().await.clone()
    }

    /// Entries recorded for one object, without the object name
    pub async fn calls_for(&self, object: &str) -> Vec<String> {
        let suffix = format!(":{object}");
        self.entries
            .lock()
            .await
            .iter()
            .filter_map(|entry| entry.strip_suffix(&suffix).map(str::to_string))
            .collect()
    }

    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }
}

/// A target that journals each behavior call and fails on request
///
/// Every call is journaled, including the ones configured to fail.
#[derive(Debug, Clone)]
pub struct RecordingTarget {
    name: String,
    kind: String,
    capabilities: Capabilities,
    failing_on: HashSet<Capability>,
    journal: Journal,
}

impl RecordingTarget {
    /// A target with every capability
    pub fn new(name: impl Into<String>, journal: &Journal) -> Self {
        Self {
            name: name.into(),
            kind: "component".to_string(),
            capabilities: Capabilities::ALL,
            failing_on: HashSet::new(),
            journal: journal.clone(),
        }
    }

    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    pub fn capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn failing_on(mut self, capability: Capability) -> Self {
        self.failing_on.insert(capability);
        self
    }

    async fn call(&self, capability: Capability) -> anyhow::Result<()> {
        self.journal
            .record(format!("{}:{}", capability, self.name))
            .await;
        if self.failing_on.contains(&capability) {
            anyhow::bail!("{} failed to {}", self.name, capability);
        }
        Ok(())
    }
}

#[async_trait]
impl LifecycleTarget for RecordingTarget {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &str {
        &self.kind
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    async fn initialise(&self) -> anyhow::Result<()> {
        self.call(Capability::Initialise).await
    }

    async fn start(&self) -> anyhow::Result<()> {
        self.call(Capability::Start).await
    }

    async fn stop(&self) -> anyhow::Result<()> {
        self.call(Capability::Stop).await
    }

    async fn dispose(&self) -> anyhow::Result<()> {
        self.call(Capability::Dispose).await
    }
}

/// Install a test subscriber honoring `RUST_LOG`. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
