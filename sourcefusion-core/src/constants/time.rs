//! Time-Related Constants
//!
//! This module defines time intervals, durations, and conversion factors
//! used throughout SourceFusion for staleness, scheduling and dedup windows.

// ===== TIME UNIT CONVERSIONS =====

/// Milliseconds per second.
pub const MS_PER_SECOND: u64 = 1000;

/// Seconds per minute.
pub const SECONDS_PER_MINUTE: u64 = 60;

/// Minutes per hour.
pub const MINUTES_PER_HOUR: u64 = 60;

/// Hours per day.
pub const HOURS_PER_DAY: u64 = 24;

/// Milliseconds per minute.
pub const MS_PER_MINUTE: u64 = MS_PER_SECOND * SECONDS_PER_MINUTE;

/// Milliseconds per hour.
pub const MS_PER_HOUR: u64 = MS_PER_MINUTE * MINUTES_PER_HOUR;

/// Milliseconds per day.
pub const MS_PER_DAY: u64 = MS_PER_HOUR * HOURS_PER_DAY;

// ===== SCHEDULING INTERVALS =====

/// Default health-check interval (milliseconds).
///
/// Five minutes keeps probe traffic to public market-data endpoints well
/// under typical rate limits while still detecting an outage within one
/// trading quarter-hour.
///
/// Source: Provider rate-limit budgets
pub const DEFAULT_CHECK_INTERVAL_MS: u64 = 5 * MS_PER_MINUTE;

/// Default weight recomputation interval (milliseconds).
///
/// Matches the health-check interval so each weight cycle sees at most one
/// new sample per provider.
pub const DEFAULT_WEIGHT_INTERVAL_MS: u64 = DEFAULT_CHECK_INTERVAL_MS;
