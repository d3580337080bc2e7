//! Constants for SourceFusion Core
//!
//! This module provides centralized, documented constants used throughout
//! SourceFusion. Numeric thresholds that were tuned empirically are named
//! here so they can be found, reviewed and (through the config structs)
//! overridden, instead of hiding as magic numbers in the algorithms.
//!
//! ## Organization
//!
//! Constants are grouped by domain:
//! - **Time**: Unit conversions and scheduling intervals
//! - **Quality**: Dimension weights, grades and sub-check bands
//! - **Fusion**: Validation, effective weights and adaptive selection
//! - **Monitor**: Health thresholds, windows and alert limits
//! - **Weights**: Bounds, performance scoring and adjustment gates
//!
//! ## Usage Guidelines
//!
//! 1. Always use these constants instead of magic numbers
//! 2. When adding new constants, document purpose and origin
//! 3. Use descriptive names that include units

/// Time unit conversions and scheduling intervals.
pub mod time;

/// Quality dimension weights, grades and scoring bands.
pub mod quality;

/// Fusion algorithm parameters and thresholds.
pub mod fusion;

/// Reliability monitoring thresholds and limits.
pub mod monitor;

/// Dynamic weighting parameters.
pub mod weights;

// Re-export commonly used constants for convenience
pub use time::{
    MS_PER_SECOND, MS_PER_MINUTE, MS_PER_HOUR, MS_PER_DAY,
    DEFAULT_CHECK_INTERVAL_MS, DEFAULT_WEIGHT_INTERVAL_MS,
};

pub use quality::{NEUTRAL_SCORE, GRADE_EXCELLENT, GRADE_GOOD, GRADE_FAIR};

pub use fusion::{
    DEFAULT_STALENESS_MS, DEFAULT_BASE_WEIGHT,
    ADAPTIVE_AGREE_CV, ADAPTIVE_DISAGREE_CV,
};

pub use monitor::{HEALTH_WINDOW, ALERT_CAPACITY, ALERT_DEDUP_MS};

pub use weights::{MIN_WEIGHT, MAX_WEIGHT, CRITICAL_MIN_WEIGHT, SUM_TOLERANCE};
