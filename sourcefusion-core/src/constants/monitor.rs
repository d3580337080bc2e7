//! Reliability Monitoring Thresholds and Limits
//!
//! This module defines health classification thresholds, rolling window
//! sizes, and alerting limits for the reliability monitor.

use super::time::MS_PER_MINUTE;

// ===== CLASSIFICATION THRESHOLDS =====

/// Success rate below which a provider is in Warning.
///
/// Source: Provider SLA targets (90% successful checks)
pub const SUCCESS_RATE_WARNING: f64 = 0.9;

/// Success rate below which a provider is Critical.
pub const SUCCESS_RATE_CRITICAL: f64 = 0.8;

/// Mean latency (ms) above which a provider is in Warning.
///
/// Source: Quote endpoint p99 latency budget
pub const LATENCY_WARNING_MS: f64 = 5_000.0;

/// Mean latency (ms) above which a provider is Critical.
pub const LATENCY_CRITICAL_MS: f64 = 10_000.0;

/// Quality score below which a provider is in Warning.
pub const QUALITY_WARNING: f64 = 0.7;

/// Quality score below which a provider is Critical.
pub const QUALITY_CRITICAL: f64 = 0.5;

/// Uptime ratio below which a provider is in Warning.
pub const UPTIME_WARNING: f64 = 0.95;

/// Uptime ratio below which a provider is Critical.
pub const UPTIME_CRITICAL: f64 = 0.9;

/// Missed check intervals without a success before a provider is Offline.
///
/// Source: Three consecutive misses rule out a single transient failure
pub const OFFLINE_AFTER_INTERVALS: u64 = 3;

// ===== WINDOWS =====

/// Health samples retained per provider.
///
/// 288 samples at the default 5-minute interval covers 24 hours.
pub const HEALTH_WINDOW: usize = 288;

/// Alerts retained in the alert ring.
pub const ALERT_CAPACITY: usize = 1000;

/// Window in which a repeated (source, level, category) alert is suppressed.
pub const ALERT_DEDUP_MS: u64 = 10 * MS_PER_MINUTE;

/// Alerts included in a health report.
pub const REPORT_ALERT_COUNT: usize = 50;

/// Alerts included in a metrics export.
pub const EXPORT_ALERT_COUNT: usize = 100;

// ===== SCORING =====

/// Latency (ms) that maps to a zero response score.
pub const RESPONSE_SCORE_SCALE_MS: f64 = 10_000.0;

/// Response score used before any latency has been observed.
pub const RESPONSE_SCORE_UNKNOWN: f64 = 0.5;

/// Composite weights for best/worst provider ranking: success, uptime, response.
pub const RANKING_WEIGHTS: (f64, f64, f64) = (0.4, 0.4, 0.2);

/// Weights for the reliability score: success, uptime, response, quality.
pub const RELIABILITY_WEIGHTS: (f64, f64, f64, f64) = (0.3, 0.3, 0.2, 0.2);

/// Quality assumed for the reliability score when no signal exists.
pub const RELIABILITY_QUALITY_DEFAULT: f64 = 0.5;

/// Reliability score of a provider the monitor has never seen.
pub const RELIABILITY_UNKNOWN: f64 = 0.5;
