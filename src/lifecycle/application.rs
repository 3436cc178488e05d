//! Application Bootstrap
//!
//! Ties a [`Container`] to a [`LifecycleCoordinator`] driving the standard
//! phases, and serializes lifecycle requests coming from different tasks.

use super::{LifecycleCoordinator, LifecycleTarget, Result, ShutdownHandler, StandardPhase};
use crate::config::LifecycleConfig;
use crate::container::{Container, ObjectHandle};
use crate::interceptor::LifecycleInterceptor;
use std::sync::Arc;
use tokio::sync::Mutex;

/// A container of lifecycle targets and the coordinator that drives them
///
/// Cloning is cheap; clones share the container, the coordinator and the
/// lock that serializes phase transitions.
///
/// # Example
///
/// ```rust,ignore
/// use phaseflow::lifecycle::Application;
///
/// #[tokio::main]
/// async fn main() -> phaseflow::Result<()> {
///     let app = Application::builder()
///         .register(database)
///         .register(http_listener)
///         .config_from_env()
///         .build()
///         .await?;
///
///     // Serve until Ctrl+C, then stop and dispose everything
///     app.shutdown_handler().wait_for_shutdown().await;
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Application {
    container: Arc<Container>,
    coordinator: Arc<LifecycleCoordinator>,
    lock: Arc<Mutex<()>>,
}

impl Application {
    /// Create a new application builder
    pub fn builder() -> ApplicationBuilder {
        ApplicationBuilder::new()
    }

    pub fn container(&self) -> &Arc<Container> {
        &self.container
    }

    pub fn coordinator(&self) -> &Arc<LifecycleCoordinator> {
        &self.coordinator
    }

    /// Fire any registered phase, waiting for transitions requested by
    /// other tasks to finish first
    pub async fn fire(&self, phase: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.coordinator.fire_lifecycle(phase).await
    }

    pub async fn initialise(&self) -> Result<()> {
        self.fire(StandardPhase::Initialise.name()).await
    }

    pub async fn start(&self) -> Result<()> {
        self.fire(StandardPhase::Start.name()).await
    }

    pub async fn stop(&self) -> Result<()> {
        self.fire(StandardPhase::Stop.name()).await
    }

    pub async fn dispose(&self) -> Result<()> {
        self.fire(StandardPhase::Dispose.name()).await
    }

    /// Register a target and bring it up to the application's current
    /// state
    ///
    /// Does not wait for the transition lock, so targets may register
    /// collaborators from inside their own phase behavior. The target only
    /// becomes visible to phases once it has caught up, including with any
    /// phase that ran or started while it was catching up; see
    /// [`LifecycleCoordinator::admit`].
    ///
    /// # Errors
    ///
    /// [`LifecycleError::PhaseApplication`](super::LifecycleError::PhaseApplication)
    /// if the target fails while catching up. It is never added to the
    /// container.
    pub async fn register<T: LifecycleTarget + 'static>(&self, target: T) -> Result<ObjectHandle> {
        self.register_arc(Arc::new(target)).await
    }

    pub async fn register_arc(&self, target: Arc<dyn LifecycleTarget>) -> Result<ObjectHandle> {
        let entry = self.container.prepare(target);

        let admitted = self
            .coordinator
            .admit(&entry, || {
                self.container.insert(entry.clone());
            })
            .await;

        if let Err(e) = admitted {
            tracing::error!("Failed to bring {} up to date: {}", entry.name(), e);
            return Err(e);
        }

        tracing::debug!("Registered {} as {}", entry.name(), entry.handle());
        Ok(entry.handle())
    }

    /// Create a shutdown handler for graceful shutdown
    pub fn shutdown_handler(&self) -> ShutdownHandler {
        ShutdownHandler::new(self.clone())
    }

    /// Perform graceful shutdown
    ///
    /// Stops the application if it is started, then disposes it. Dispose
    /// runs even if stop reported an error; the first error is returned.
    pub async fn shutdown(&self) -> Result<()> {
        let _guard = self.lock.lock().await;
        tracing::info!("Shutting down application...");

        let mut first_error = None;

        if self.coordinator.current_phase().await == StandardPhase::Start.name() {
            if let Err(e) = self
                .coordinator
                .fire_lifecycle(StandardPhase::Stop.name())
                .await
            {
                tracing::error!("Error during stop: {}", e);
                first_error = Some(e);
            }
        }

        if self.coordinator.current_phase().await != StandardPhase::Dispose.name() {
            if let Err(e) = self
                .coordinator
                .fire_lifecycle(StandardPhase::Dispose.name())
                .await
            {
                tracing::error!("Error during dispose: {}", e);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                tracing::info!("Application shutdown complete");
                Ok(())
            }
        }
    }

    /// Spawn a background task that waits for shutdown signals
    /// and performs graceful shutdown automatically.
    ///
    /// Returns a handle that can be used to wait for the shutdown to complete.
    pub fn spawn_shutdown_handler(&self) -> tokio::task::JoinHandle<()> {
        let shutdown_handler = self.shutdown_handler();
        tokio::spawn(async move {
            shutdown_handler.wait_for_shutdown().await;
        })
    }
}

/// Builder for Application
pub struct ApplicationBuilder {
    container: Option<Arc<Container>>,
    targets: Vec<Arc<dyn LifecycleTarget>>,
    coordinator_id: Option<String>,
    interceptor: Option<Arc<dyn LifecycleInterceptor>>,
    config: Option<LifecycleConfig>,
    config_from_env: bool,
    auto_start: bool,
}

impl Default for ApplicationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ApplicationBuilder {
    pub fn new() -> Self {
        Self {
            container: None,
            targets: Vec::new(),
            coordinator_id: None,
            interceptor: None,
            config: None,
            config_from_env: false,
            auto_start: true,
        }
    }

    /// Use an existing container instead of an empty one
    pub fn container(mut self, container: Arc<Container>) -> Self {
        self.container = Some(container);
        self
    }

    pub fn register<T: LifecycleTarget + 'static>(mut self, target: T) -> Self {
        self.targets.push(Arc::new(target));
        self
    }

    pub fn register_arc(mut self, target: Arc<dyn LifecycleTarget>) -> Self {
        self.targets.push(target);
        self
    }

    /// Takes precedence over a configured id
    pub fn coordinator_id(mut self, id: impl Into<String>) -> Self {
        self.coordinator_id = Some(id.into());
        self
    }

    pub fn interceptor(mut self, interceptor: impl LifecycleInterceptor) -> Self {
        self.interceptor = Some(Arc::new(interceptor));
        self
    }

    pub fn config(mut self, config: LifecycleConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Read [`LifecycleConfig`] from the environment when building
    pub fn config_from_env(mut self) -> Self {
        self.config_from_env = true;
        self
    }

    /// Whether [`build`](Self::build) also fires start. Defaults to true.
    pub fn auto_start(mut self, auto_start: bool) -> Self {
        self.auto_start = auto_start;
        self
    }

    /// Build and initialise the application
    ///
    /// This will:
    /// 1. Fire initialise
    /// 2. Fire start, unless auto-start is off
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or a startup phase
    /// fails.
    pub async fn build(self) -> crate::Result<Application> {
        let container = self.container.unwrap_or_default();
        for target in self.targets {
            container.register_arc(target);
        }

        let config = match (self.config, self.config_from_env) {
            (_, true) => LifecycleConfig::from_env()?,
            (Some(config), false) => config,
            (None, false) => LifecycleConfig::default(),
        };

        let mut builder = LifecycleCoordinator::builder(container.clone())
            .standard_phases()
            .config(&config);
        if let Some(id) = self.coordinator_id {
            builder = builder.id(id);
        }
        if let Some(interceptor) = self.interceptor {
            builder = builder.interceptor_arc(interceptor);
        }

        let application = Application {
            container,
            coordinator: Arc::new(builder.build()?),
            lock: Arc::new(Mutex::new(())),
        };

        tracing::info!(
            "Starting application '{}' with {} object(s)...",
            application.coordinator.id(),
            application.container.len()
        );

        application.initialise().await?;
        if self.auto_start {
            application.start().await?;
        }

        tracing::info!("Application initialization complete");
        Ok(application)
    }
}
