//! Monitor settings

use std::time::Duration;

use serde::{Deserialize, Serialize};
use sourcefusion_core::constants::monitor::{ALERT_CAPACITY, ALERT_DEDUP_MS, HEALTH_WINDOW};
use sourcefusion_core::constants::DEFAULT_CHECK_INTERVAL_MS;
use sourcefusion_core::{ConfigError, ConfigResult, Thresholds};

/// Reliability monitor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Time between check cycles
    pub check_interval_ms: u64,
    /// Per-check timeout; `None` uses the interval
    pub check_timeout_ms: Option<u64>,
    /// Checks kept in each provider's rolling window
    pub window: usize,
    /// Alerts kept in the log
    pub alert_capacity: usize,
    /// Window in which a repeated alert is suppressed
    pub alert_dedup_ms: u64,
    /// Classification thresholds
    pub thresholds: Thresholds,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            check_interval_ms: DEFAULT_CHECK_INTERVAL_MS,
            check_timeout_ms: None,
            window: HEALTH_WINDOW,
            alert_capacity: ALERT_CAPACITY,
            alert_dedup_ms: ALERT_DEDUP_MS,
            thresholds: Thresholds::default(),
        }
    }
}

impl MonitorConfig {
    /// Set the check interval
    pub fn interval_ms(mut self, ms: u64) -> Self {
        self.check_interval_ms = ms;
        self
    }

    /// Set the per-check timeout
    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.check_timeout_ms = Some(ms);
        self
    }

    /// Set the rolling window length
    pub fn window(mut self, checks: usize) -> Self {
        self.window = checks;
        self
    }

    /// Replace the thresholds
    pub fn thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Interval between cycles
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms)
    }

    /// Effective per-check timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.check_timeout_ms.unwrap_or(self.check_interval_ms))
    }

    /// Reject zero durations and capacities, and bad thresholds
    pub fn validate(&self) -> ConfigResult<()> {
        let zero = |field: &'static str| Err(ConfigError::NonPositive { field });
        if self.check_interval_ms == 0 {
            return zero("check_interval_ms");
        }
        if self.check_timeout_ms == Some(0) {
            return zero("check_timeout_ms");
        }
        if self.window == 0 {
            return zero("window");
        }
        if self.alert_capacity == 0 {
            return zero("alert_capacity");
        }
        self.thresholds.validate()
    }
}
