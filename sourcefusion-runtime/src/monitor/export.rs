//! Serializable metrics snapshot
//!
//! Where the snapshot ends up (a file, a log line, an HTTP response) is the
//! caller's concern; this module only assembles it.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sourcefusion_core::health::Alert;
use sourcefusion_core::{HealthStatus, ProviderMetrics, Thresholds, Timestamp};

use crate::errors::Result;

/// Point-in-time export of everything the monitor knows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsExport {
    /// RFC 3339 rendering of `generated_at_ms`
    pub generated_at: String,
    /// Export time in milliseconds since the epoch
    pub generated_at_ms: Timestamp,
    /// Aggregate status
    pub overall_status: HealthStatus,
    /// Check interval in force
    pub check_interval_ms: u64,
    /// Thresholds in force
    pub thresholds: Thresholds,
    /// Metrics per provider
    pub providers: BTreeMap<String, ProviderMetrics>,
    /// Most recent alerts, oldest first
    pub alerts: Vec<Alert>,
}

impl MetricsExport {
    /// Pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// RFC 3339 rendering of a millisecond timestamp
pub(crate) fn rfc3339(ms: Timestamp) -> String {
    i64::try_from(ms)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_default()
}
