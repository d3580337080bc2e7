//! Fusion Algorithm Constants
//!
//! This module defines constants for reading validation, effective weight
//! computation, adaptive method selection and result quality bonuses.

use super::time::{MS_PER_HOUR, MS_PER_SECOND};

// ===== VALIDATION =====

/// Default staleness window (milliseconds).
///
/// Readings older than this are excluded from fusion. Intraday prices lose
/// most of their value within an hour.
///
/// Source: Intraday market-data freshness expectations
pub const DEFAULT_STALENESS_MS: u64 = MS_PER_HOUR;

/// Tolerated clock skew for readings stamped in the future (milliseconds).
///
/// Providers stamp readings with their own clocks; a few seconds of drift is
/// normal, anything more means a broken timestamp.
pub const DEFAULT_FUTURE_SKEW_MS: u64 = 5 * MS_PER_SECOND;

/// Value substituted for quality or confidence outside `[0, 1]`.
pub const DEFAULT_SIGNAL: f64 = 0.5;

// ===== EFFECTIVE WEIGHTS =====

/// Base weight for a provider missing from the weight table.
pub const DEFAULT_BASE_WEIGHT: f64 = 0.1;

/// Smoothing factor for provider performance statistics.
///
/// α = 0.1 gives an effective memory of roughly ten fusion cycles.
///
/// Source: Exponential moving average, 10-sample horizon
pub const PERFORMANCE_EMA_ALPHA: f64 = 0.1;

/// Initial accuracy and reliability for a provider's performance statistics.
pub const PERFORMANCE_PRIOR: f64 = 0.5;

/// Lower clamp of the performance factor.
pub const PERFORMANCE_FACTOR_MIN: f64 = 0.5;

/// Upper clamp of the performance factor.
pub const PERFORMANCE_FACTOR_MAX: f64 = 1.5;

/// Freshness horizon for the reliability statistic (minutes).
///
/// A reading this old contributes the floor freshness.
pub const FRESHNESS_HORIZON_MIN: f64 = 60.0;

/// Minimum freshness credited to a reading.
pub const FRESHNESS_FLOOR: f64 = 0.1;

// ===== ADAPTIVE SELECTION =====

/// Coefficient of variation below which providers are considered in
/// agreement and blended with a weighted average.
///
/// Empirically chosen; kept exactly for behavioral parity.
///
/// Source: Production tuning
pub const ADAPTIVE_AGREE_CV: f64 = 0.05;

/// Coefficient of variation above which providers are considered in
/// disagreement and the median is used.
///
/// Empirically chosen; kept exactly for behavioral parity.
///
/// Source: Production tuning
pub const ADAPTIVE_DISAGREE_CV: f64 = 0.20;

/// Floor for the mean magnitude in the adaptive CV denominator.
///
/// Keeps the ratio finite for values near zero.
pub const ADAPTIVE_MEAN_FLOOR: f64 = 1.0;

// ===== RESULT QUALITY =====

/// Quality bonus per contributing provider.
pub const DIVERSITY_BONUS_PER_SOURCE: f64 = 0.02;

/// Cap on the provider diversity bonus.
pub const DIVERSITY_BONUS_CAP: f64 = 0.1;

/// Consistency bonus bands as `(CV upper bound, bonus)`, checked in order.
///
/// ```text
/// CV      <1%   <5%   <10%  else
/// bonus   0.10  0.05  0.02  0.00
/// ```
pub const CONSISTENCY_BONUS_BANDS: [(f64, f64); 3] = [(0.01, 0.1), (0.05, 0.05), (0.10, 0.02)];

/// Consistency bonus when the mean is too close to zero for a CV.
pub const NEAR_ZERO_MEAN_BONUS: f64 = 0.05;

/// Magnitude below which a mean counts as zero.
pub const NEAR_ZERO_MEAN: f64 = 1e-6;

// ===== SUGGESTIONS =====

/// Overall performance above which a higher weight is suggested.
pub const SUGGEST_BOOST_ABOVE: f64 = 0.8;

/// Overall performance below which a lower weight is suggested.
pub const SUGGEST_CUT_BELOW: f64 = 0.3;

/// Multiplier applied to boosted weights.
pub const SUGGEST_BOOST_FACTOR: f64 = 1.2;

/// Multiplier applied to cut weights.
pub const SUGGEST_CUT_FACTOR: f64 = 0.8;

/// Ceiling for boosted suggestions.
pub const SUGGEST_BOOST_CEILING: f64 = 0.4;

/// Floor for cut suggestions.
pub const SUGGEST_CUT_FLOOR: f64 = 0.05;

/// Number of providers listed as top and under performers.
pub const PERFORMER_LIST_LEN: usize = 3;
