//! Error types for battery entry resolution.
//!
//! All errors are strongly typed using thiserror. Lookup errors are produced
//! by the platform collaborators and are always recovered inside the resolver;
//! only queue lifecycle, event streams and configuration surface errors to
//! callers.

use thiserror::Error;

/// Missing-record errors reported by the platform collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("Package not found: {package}")]
    PackageNotFound {
        package: String,
    },
}

/// Errors from the request queue and its event streams.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Failed to spawn worker thread '{name}': {message}")]
    SpawnFailed {
        name: String,
        message: String,
    },

    #[error("Event stream disconnected: {path}")]
    Disconnected {
        path: String,
    },

    #[error("Timed out after {duration_ms}ms")]
    Timeout {
        duration_ms: u64,
    },
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {message}")]
    Parse {
        message: String,
    },

    #[error("Invalid configuration field '{field}': {reason}")]
    InvalidField {
        field: String,
        reason: String,
    },
}

/// Top-level error type.
#[derive(Debug, Error)]
pub enum BatteryError {
    #[error("Lookup error: {0}")]
    Lookup(#[from] LookupError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl BatteryError {
    /// Returns true if this is a lookup error.
    #[must_use]
    pub const fn is_lookup(&self) -> bool {
        matches!(self, Self::Lookup(_))
    }

    /// Returns true if this is a queue error.
    #[must_use]
    pub const fn is_queue(&self) -> bool {
        matches!(self, Self::Queue(_))
    }

    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

/// Result type alias for battery entry operations.
pub type BatteryResult<T> = Result<T, BatteryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_error_package() {
        let err = LookupError::PackageNotFound {
            package: "com.example.gone".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("com.example.gone"));
    }

    #[test]
    fn test_queue_error_timeout() {
        let err = QueueError::Timeout { duration_ms: 250 };
        assert!(format!("{err}").contains("250ms"));
    }

    #[test]
    fn test_battery_error_from_lookup() {
        let err: BatteryError = LookupError::PackageNotFound {
            package: "p".to_string(),
        }
        .into();
        assert!(err.is_lookup());
        assert!(!err.is_queue());
    }

    #[test]
    fn test_battery_error_from_queue() {
        let err: BatteryError = QueueError::Timeout { duration_ms: 1 }.into();
        assert!(err.is_queue());
        assert!(format!("{err}").contains("1ms"));
    }

    #[test]
    fn test_battery_error_from_config() {
        let err: BatteryError = ConfigError::InvalidField {
            field: "worker_thread_name".to_string(),
            reason: "must not be empty".to_string(),
        }
        .into();
        assert!(err.is_config());
        assert!(format!("{err}").contains("worker_thread_name"));
    }
}
