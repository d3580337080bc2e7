//! Runtime Error Types
//!
//! Check failures are not errors here: a probe that fails, times out or
//! panics is recorded as a failed check and the loops keep running. What
//! does surface as [`RuntimeError`] is wiring (bad configuration, a provider
//! registered twice) and the few operations that cross a task boundary.

use sourcefusion_core::ConfigError;
use thiserror::Error;

/// Result type for runtime operations
pub type Result<T> = std::result::Result<T, RuntimeError>;

/// Errors from the runtime layer
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Invalid configuration passed to a constructor
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A provider with this name already has a health check
    #[error("provider {0} is already registered")]
    DuplicateProvider(String),

    /// No provider with this name is monitored
    #[error("provider {0} is not registered")]
    UnknownProvider(String),

    /// Provider names must be non-empty after trimming
    #[error("provider name must not be empty")]
    EmptyProviderName,

    /// A worker task panicked or was cancelled
    #[error("worker task failed: {0}")]
    Worker(String),

    /// The worker pool was shut down while work was queued
    #[error("worker pool is closed")]
    PoolClosed,

    /// Serializing an export failed
    #[error("export serialization failed: {0}")]
    Export(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_convert() {
        let err: RuntimeError = ConfigError::AllWeightsZero.into();
        assert!(matches!(err, RuntimeError::Config(ConfigError::AllWeightsZero)));
        assert!(err.to_string().starts_with("configuration error"));
    }
}
