//! Service configuration.

use serde::{Deserialize, Serialize};

use crate::error::{BatteryResult, ConfigError};

/// Default loader thread name.
pub const DEFAULT_WORKER_THREAD_NAME: &str = "BatteryUsage Icon Loader";

/// Entry service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntryServiceConfig {
    /// Name given to the loader thread.
    pub worker_thread_name: String,
    /// Run the loader at the lowest scheduling priority.
    pub lower_worker_priority: bool,
    /// Buffer capacity of streams created by `subscribe`.
    pub event_capacity: usize,
}

impl Default for EntryServiceConfig {
    fn default() -> Self {
        Self {
            worker_thread_name: DEFAULT_WORKER_THREAD_NAME.to_string(),
            lower_worker_priority: true,
            event_capacity: 1024,
        }
    }
}

impl EntryServiceConfig {
    /// Parses a JSON configuration; missing fields take their defaults.
    ///
    /// # Errors
    /// - `Parse`: the input is not valid JSON for this shape
    /// - `InvalidField`: a field failed validation
    pub fn from_json_str(json: &str) -> BatteryResult<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks field constraints.
    ///
    /// # Errors
    /// - `InvalidField`: the thread name is empty or contains a NUL byte
    pub fn validate(&self) -> BatteryResult<()> {
        if self.worker_thread_name.trim().is_empty() {
            return Err(ConfigError::InvalidField {
                field: "worker_thread_name".to_string(),
                reason: "must not be empty".to_string(),
            }
            .into());
        }
        if self.worker_thread_name.contains('\0') {
            return Err(ConfigError::InvalidField {
                field: "worker_thread_name".to_string(),
                reason: "must not contain NUL bytes".to_string(),
            }
            .into());
        }
        Ok(())
    }
}
