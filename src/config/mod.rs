use dashmap::DashMap;
use std::env;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub const STRICT_TEARDOWN: &str = "PHASEFLOW_STRICT_TEARDOWN";
pub const SLOW_PHASE_THRESHOLD_MS: &str = "PHASEFLOW_SLOW_PHASE_THRESHOLD_MS";
pub const FAIL_FAST_PHASES: &str = "PHASEFLOW_FAIL_FAST_PHASES";
pub const COORDINATOR_ID: &str = "PHASEFLOW_COORDINATOR_ID";
pub const HISTORY_LIMIT: &str = "PHASEFLOW_HISTORY_LIMIT";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: '{value}'")]
    Invalid { key: String, value: String },
}

/// Configuration service
#[derive(Debug, Clone, Default)]
pub struct ConfigService {
    config: Arc<DashMap<String, String>>,
}

impl ConfigService {
    /// Seeded from the process environment
    pub fn new() -> Self {
        let service = Self::empty();
        for (key, value) in env::vars() {
            service.set(&key, &value);
        }
        service
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.config.get(key).map(|v| v.clone())
    }

    pub fn set(&self, key: &str, value: &str) {
        self.config.insert(key.to_string(), value.to_string());
    }
}

/// Coordinator settings read from a [`ConfigService`]
///
/// | Key | Meaning |
/// |-----|---------|
/// | `PHASEFLOW_COORDINATOR_ID` | coordinator id used in logs and snapshots |
/// | `PHASEFLOW_STRICT_TEARDOWN` | `true`/`false`; report best-effort failures as errors |
/// | `PHASEFLOW_SLOW_PHASE_THRESHOLD_MS` | warn when one object takes longer than this |
/// | `PHASEFLOW_FAIL_FAST_PHASES` | comma-separated phases that fail fast; every other phase becomes best-effort |
/// | `PHASEFLOW_HISTORY_LIMIT` | completed-phase records to keep; `0` disables history |
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LifecycleConfig {
    pub coordinator_id: Option<String>,
    pub strict_teardown: bool,
    pub slow_phase_threshold: Option<Duration>,
    pub fail_fast_phases: Option<Vec<String>>,
    pub history_limit: Option<usize>,
}

impl LifecycleConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_service(&ConfigService::new())
    }

    pub fn from_service(config: &ConfigService) -> Result<Self, ConfigError> {
        let coordinator_id = config
            .get(COORDINATOR_ID)
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());

        let strict_teardown = match config.get(STRICT_TEARDOWN) {
            None => false,
            Some(value) => parse_bool(&value).ok_or_else(|| invalid(STRICT_TEARDOWN, &value))?,
        };

        let slow_phase_threshold = config
            .get(SLOW_PHASE_THRESHOLD_MS)
            .map(|value| {
                value
                    .trim()
                    .parse::<u64>()
                    .map(Duration::from_millis)
                    .map_err(|_| invalid(SLOW_PHASE_THRESHOLD_MS, &value))
            })
            .transpose()?;

        let history_limit = config
            .get(HISTORY_LIMIT)
            .map(|value| {
                value
                    .trim()
                    .parse::<usize>()
                    .map_err(|_| invalid(HISTORY_LIMIT, &value))
            })
            .transpose()?;

        let fail_fast_phases = config.get(FAIL_FAST_PHASES).map(|value| {
            value
                .split(',')
                .map(str::trim)
                .filter(|phase| !phase.is_empty())
                .map(str::to_string)
                .collect()
        });

        Ok(Self {
            coordinator_id,
            strict_teardown,
            slow_phase_threshold,
            fail_fast_phases,
            history_limit,
        })
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::Invalid {
        key: key.to_string(),
        value: value.to_string(),
    }
}
