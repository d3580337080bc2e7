//! Error Types for Setup and Configuration Failures
//!
//! ## Design Philosophy
//!
//! Almost nothing in SourceFusion fails with an error. Bad input degrades a
//! score, an empty batch yields an explicit empty fusion result, a broken
//! provider becomes a failed health check. Those are all *values*, returned
//! through the normal result types, so downstream consumers can make informed
//! decisions about low-confidence output instead of the system failing.
//!
//! What remains for `Result` are programmer errors made while wiring the
//! system together: a weight table that cannot be normalized, bounds that
//! contradict each other, a zero-length window. These surface from the setup
//! APIs (`WeightManager::new`, `WeightTable::normalized`, `reset_weights`,
//! config validation) and should be fixed at the call site, not retried.
//!
//! ## Error Categories
//!
//! ### Weight Table
//! - `EmptyWeights`: no providers at all
//! - `AllWeightsZero`: nothing to normalize against
//! - `InvalidWeight`: negative, NaN or infinite entry
//! - `InvalidBounds`: `min > max`, or a bound outside `[0, 1]`
//!
//! ### General Configuration
//! - `NonPositive`: a duration or capacity that must be > 0
//! - `OutOfUnitRange`: a probability-like setting outside `[0, 1]`
//!
//! ```rust
//! use std::collections::BTreeMap;
//! use sourcefusion_core::{ConfigError, WeightBounds, WeightTable};
//!
//! let raw: BTreeMap<String, f64> = [("a".to_string(), 0.0)].into_iter().collect();
//! match WeightTable::normalized(&raw, &Default::default(), WeightBounds::default(), 0) {
//!     Err(ConfigError::AllWeightsZero) => {} // refuse to start
//!     other => panic!("unexpected: {other:?}"),
//! }
//! ```

use thiserror::Error;

/// Result type for setup and configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors raised by the setup APIs
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Weight table has no entries
    #[error("weight table is empty")]
    EmptyWeights,

    /// Every weight is zero, so no proportions can be derived
    #[error("all weights are zero, table cannot be normalized")]
    AllWeightsZero,

    /// A single weight entry is unusable
    #[error("weight for {provider} must be finite and non-negative, got {weight}")]
    InvalidWeight {
        /// Provider the bad entry belongs to
        provider: String,
        /// The rejected value
        weight: f64,
    },

    /// Weight bounds contradict each other
    #[error("invalid weight bounds: min {min}, max {max}, critical min {critical_min}")]
    InvalidBounds {
        /// Regular floor
        min: f64,
        /// Ceiling
        max: f64,
        /// Floor for business-critical providers
        critical_min: f64,
    },

    /// A duration, capacity or count that must be greater than zero
    #[error("{field} must be greater than zero")]
    NonPositive {
        /// Name of the offending setting
        field: &'static str,
    },

    /// A setting that must lie in `[0, 1]`
    #[error("{field} must lie in [0, 1], got {value}")]
    OutOfUnitRange {
        /// Name of the offending setting
        field: &'static str,
        /// The rejected value
        value: f64,
    },
}

/// Check that `value` lies in `[0, 1]`
pub(crate) fn ensure_unit(field: &'static str, value: f64) -> ConfigResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfUnitRange { field, value })
    }
}

/// Check that a count or duration is non-zero
pub(crate) fn ensure_positive(field: &'static str, value: u64) -> ConfigResult<()> {
    if value > 0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { field })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_range_check() {
        assert!(ensure_unit("x", 0.0).is_ok());
        assert!(ensure_unit("x", 1.0).is_ok());
        assert_eq!(
            ensure_unit("x", 1.5),
            Err(ConfigError::OutOfUnitRange { field: "x", value: 1.5 })
        );
        assert!(ensure_unit("x", f64::NAN).is_err());
    }

    #[test]
    fn messages_name_the_field() {
        let err = ConfigError::NonPositive { field: "check_interval" };
        assert_eq!(err.to_string(), "check_interval must be greater than zero");
    }
}
