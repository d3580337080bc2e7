//! Time management for scoring and monitoring
//!
//! Provides clock abstraction so every time-dependent rule (staleness,
//! timeliness, offline detection, dedup windows) can be driven by:
//! - System clock (production)
//! - Fixed clock (deterministic tests, replay)

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::constants::{MS_PER_MINUTE, MS_PER_SECOND};

/// Timestamp in milliseconds since the UNIX epoch
pub type Timestamp = u64;

/// Source of time for the system
///
/// Shared between the analyzer, the fusion engine and the background loops,
/// so implementations must be thread-safe.
pub trait TimeSource: Send + Sync {
    /// Get current timestamp in milliseconds
    fn now(&self) -> Timestamp;

    /// Check if this source provides wall clock time (vs a scripted clock)
    fn is_wall_clock(&self) -> bool;
}

/// Shared handle to a clock
pub type SharedClock = Arc<dyn TimeSource>;

/// System time source
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTime;

impl TimeSource for SystemTime {
    fn now(&self) -> Timestamp {
        use std::time::{SystemTime as StdSystemTime, UNIX_EPOCH};

        StdSystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as Timestamp
    }

    fn is_wall_clock(&self) -> bool {
        true
    }
}

/// Fixed time source for testing
///
/// Uses an atomic so a test can hold one handle and move time forward while
/// the monitor holds another.
#[derive(Debug, Default)]
pub struct FixedTime {
    timestamp: AtomicU64,
}

impl FixedTime {
    /// Create a clock frozen at `timestamp`
    pub fn new(timestamp: Timestamp) -> Self {
        Self {
            timestamp: AtomicU64::new(timestamp),
        }
    }

    /// Jump to an absolute time
    pub fn set(&self, timestamp: Timestamp) {
        self.timestamp.store(timestamp, Ordering::SeqCst);
    }

    /// Move forward by `ms` milliseconds
    pub fn advance(&self, ms: u64) {
        self.timestamp.fetch_add(ms, Ordering::SeqCst);
    }
}

impl TimeSource for FixedTime {
    fn now(&self) -> Timestamp {
        self.timestamp.load(Ordering::SeqCst)
    }

    fn is_wall_clock(&self) -> bool {
        false
    }
}

/// Default shared system clock
pub fn system_clock() -> SharedClock {
    Arc::new(SystemTime)
}

/// Age of `then` relative to `now`; a timestamp in the future has age 0
pub fn age_ms(now: Timestamp, then: Timestamp) -> u64 {
    now.saturating_sub(then)
}

/// Convert milliseconds to fractional seconds
pub fn ms_to_secs(ms: f64) -> f64 {
    ms / MS_PER_SECOND as f64
}

/// Convert milliseconds to fractional minutes
pub fn ms_to_minutes(ms: u64) -> f64 {
    ms as f64 / MS_PER_MINUTE as f64
}
