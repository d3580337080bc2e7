//! Clock driven by tokio's timer
//!
//! Wall time anchored at construction, advanced by `tokio::time::Instant`.
//! Under a paused test runtime the clock moves exactly as far as the
//! runtime's virtual time, so staleness, offline detection and alert dedup
//! line up with the timer loops.

use sourcefusion_core::{TimeSource, Timestamp};
use tokio::time::Instant;

/// Millisecond clock that follows tokio time
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    epoch_ms: Timestamp,
    started: Instant,
}

impl TokioClock {
    /// Clock reading `epoch_ms` now; must be called inside a runtime
    pub fn new(epoch_ms: Timestamp) -> Self {
        Self {
            epoch_ms,
            started: Instant::now(),
        }
    }
}

impl TimeSource for TokioClock {
    fn now(&self) -> Timestamp {
        self.epoch_ms + self.started.elapsed().as_millis() as Timestamp
    }

    fn is_wall_clock(&self) -> bool {
        false
    }
}
