use crate::config::ConfigError;
use crate::lifecycle::LifecycleError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PhaseflowError>;

#[derive(Debug, Error)]
pub enum PhaseflowError {
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
