//! Dynamic Weighting Parameters
//!
//! This module defines weight bounds, performance scoring weights, and the
//! damping, confidence and risk constants of the weight manager.

// ===== BOUNDS =====

/// Minimum weight of any provider.
///
/// Keeps every provider in play so it can earn trust back.
pub const MIN_WEIGHT: f64 = 0.01;

/// Maximum weight of any provider.
///
/// No single provider may dominate fusion.
///
/// Source: Concentration limit, 60%
pub const MAX_WEIGHT: f64 = 0.6;

/// Minimum weight of a business-critical provider.
pub const CRITICAL_MIN_WEIGHT: f64 = 0.05;

/// Starting weight for a provider registered at runtime.
pub const NEW_PROVIDER_WEIGHT: f64 = 0.1;

/// Tolerance on the sum of a normalized table.
pub const SUM_TOLERANCE: f64 = 1e-6;

/// Bisection iterations for water-filling normalization.
///
/// Enough to pin the scale factor to machine precision across the full
/// `[0, hi / min_weight]` bracket.
pub const NORMALIZE_ITERATIONS: usize = 200;

/// Default starting table as `(provider, weight)` before normalization.
///
/// Source: Production provider mix
pub const DEFAULT_TABLE: [(&str, f64); 6] = [
    ("eastmoney", 0.35),
    ("tencent", 0.30),
    ("sina", 0.25),
    ("xueqiu", 0.15),
    ("tushare", 0.20),
    ("akshare", 0.10),
];

// ===== PERFORMANCE SCORE =====

/// Weight of the monitor's reliability score.
pub const PERF_WEIGHT_RELIABILITY: f64 = 0.25;
/// Weight of the success rate.
pub const PERF_WEIGHT_SUCCESS: f64 = 0.20;
/// Weight of the uptime ratio.
pub const PERF_WEIGHT_UPTIME: f64 = 0.20;
/// Weight of the data quality.
pub const PERF_WEIGHT_QUALITY: f64 = 0.15;
/// Weight of the health status score.
pub const PERF_WEIGHT_STATUS: f64 = 0.15;
/// Weight of the response time score.
pub const PERF_WEIGHT_RESPONSE: f64 = 0.05;

/// Latency (ms) that maps to the response score floor.
pub const RESPONSE_SCALE_MS: f64 = 10_000.0;

/// Floor of the response time score.
pub const RESPONSE_SCORE_FLOOR: f64 = 0.1;

// ===== SIGNAL DEFAULTS =====

/// Reliability assumed for a provider without monitor data.
pub const DEFAULT_RELIABILITY: f64 = 0.5;
/// Response time (ms) assumed for a provider without monitor data.
pub const DEFAULT_RESPONSE_MS: f64 = 1_000.0;
/// Success rate assumed for a provider without monitor data.
pub const DEFAULT_SUCCESS_RATE: f64 = 0.8;
/// Uptime assumed for a provider without monitor data.
pub const DEFAULT_UPTIME: f64 = 0.8;
/// Data quality assumed for a provider without quality history.
pub const DEFAULT_DATA_QUALITY: f64 = 0.7;
/// Request count assumed for a provider without monitor data.
pub const DEFAULT_REQUESTS: u64 = 1;
/// Status score assumed for a provider without monitor data.
pub const DEFAULT_STATUS_SCORE: f64 = 0.7;

// ===== TARGET AND STABILITY =====

/// Scale from performance score to target weight.
///
/// A perfect provider targets 40% of the table before normalization.
pub const TARGET_SCALE: f64 = 0.4;

/// Weight samples used for the stability factor.
pub const STABILITY_WINDOW: usize = 20;

/// Minimum weight samples before stability is measured.
pub const STABILITY_MIN_SAMPLES: usize = 3;

/// Stability assumed with too little history.
pub const STABILITY_DEFAULT: f64 = 0.8;

/// Sensitivity of the stability factor to weight standard deviation.
pub const STABILITY_SENSITIVITY: f64 = 5.0;

/// Floor of the stability factor.
pub const STABILITY_FLOOR: f64 = 0.3;

// ===== ADAPTIVE LEARNING RATE =====

/// Base learning rate of the Adaptive strategy.
pub const ADAPTIVE_BASE_RATE: f64 = 0.1;
/// Performance above which the adaptive rate is boosted.
pub const ADAPTIVE_HIGH_PERF: f64 = 0.8;
/// Performance below which the adaptive rate is damped.
pub const ADAPTIVE_LOW_PERF: f64 = 0.4;
/// Boost multiplier for high performers.
pub const ADAPTIVE_BOOST: f64 = 1.2;
/// Damping multiplier for low performers.
pub const ADAPTIVE_DAMP: f64 = 0.8;
/// Stability above which the adaptive rate is boosted further.
pub const ADAPTIVE_STABLE: f64 = 0.8;
/// Stability below which the adaptive rate is damped further.
pub const ADAPTIVE_UNSTABLE: f64 = 0.5;
/// Multiplier for stable providers.
pub const ADAPTIVE_STABLE_BOOST: f64 = 1.1;
/// Multiplier for unstable providers.
pub const ADAPTIVE_UNSTABLE_DAMP: f64 = 0.8;

// ===== CONFIDENCE AND RISK GATES =====

/// Request count at which request confidence saturates.
///
/// Source: log(n+1)/log(100), 100 requests for full confidence
pub const CONFIDENCE_FULL_REQUESTS: f64 = 100.0;

/// Confidence above which a risk one level over the strategy limit is
/// still accepted.
pub const RISK_OVERRIDE_CONFIDENCE: f64 = 0.8;

/// Change ratio above which an adjustment is High risk (for large weights).
pub const RISK_HIGH_RATIO: f64 = 0.5;
/// Change ratio above which an adjustment is Medium risk.
pub const RISK_MEDIUM_RATIO: f64 = 0.3;
/// Change ratio above which an adjustment is Low risk.
pub const RISK_LOW_RATIO: f64 = 0.1;
/// Old weight above which a provider counts as load-bearing for risk.
pub const RISK_LARGE_WEIGHT: f64 = 0.2;

/// Relative change (percent) below which a reason says "stable".
pub const REASON_STABLE_PCT: f64 = 2.0;

/// Minimum |Δweight| logged as a change.
pub const LOG_CHANGE_MIN: f64 = 0.005;

/// Minimum |Δweight| recorded as an applied adjustment.
pub const RECORD_CHANGE_MIN: f64 = 0.001;

// ===== HISTORY =====

/// Weight snapshots retained per provider.
pub const WEIGHT_HISTORY_CAPACITY: usize = 200;

/// Weight adjustments retained for audit.
pub const ADJUSTMENT_HISTORY_CAPACITY: usize = 1000;

/// Adjustments listed in an adjustment summary.
pub const SUMMARY_RECENT_COUNT: usize = 10;
