//! Alerts
//!
//! Alerts are drafted from status transitions and performance readings,
//! then admitted into a bounded log. A draft with the same source, level
//! and category as an alert admitted within the dedup window is suppressed.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{HealthStatus, ProviderMetrics, Thresholds, Transition};
use crate::buffer::RingBuffer;
use crate::constants::monitor::{ALERT_CAPACITY, ALERT_DEDUP_MS};
use crate::time::Timestamp;

/// Severity of an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    /// Informational, e.g. a recovery
    Info,
    /// Degraded but usable
    Warning,
    /// Unusable or close to it
    Critical,
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Critical => "critical",
        })
    }
}

/// What an alert is about; part of the dedup key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertCategory {
    /// Status transition
    Status,
    /// Mean latency over a threshold
    Latency,
    /// Success rate under a threshold
    SuccessRate,
    /// A check errored, timed out or panicked
    ProbeError,
}

/// An alert before admission to the log
#[derive(Debug, Clone, PartialEq)]
pub struct AlertDraft {
    /// Severity
    pub level: AlertLevel,
    /// Provider the alert is about
    pub source: String,
    /// Dedup category
    pub category: AlertCategory,
    /// Human-readable description
    pub message: String,
}

impl AlertDraft {
    /// New draft
    pub fn new(
        level: AlertLevel,
        source: impl Into<String>,
        category: AlertCategory,
        message: impl Into<String>,
    ) -> Self {
        Self {
            level,
            source: source.into(),
            category,
            message: message.into(),
        }
    }
}

/// An admitted alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Unique, increasing id
    pub id: u64,
    /// Severity
    pub level: AlertLevel,
    /// Provider the alert is about
    pub source: String,
    /// Dedup category
    pub category: AlertCategory,
    /// Human-readable description
    pub message: String,
    /// When the alert was admitted
    pub timestamp: Timestamp,
    /// Whether an operator acknowledged it
    pub acknowledged: bool,
}

/// Bounded alert history with dedup
#[derive(Debug)]
pub struct AlertLog {
    alerts: RingBuffer<Alert>,
    dedup_ms: u64,
    next_id: u64,
}

impl Default for AlertLog {
    fn default() -> Self {
        Self::new(ALERT_CAPACITY, ALERT_DEDUP_MS)
    }
}

impl AlertLog {
    /// Log keeping `capacity` alerts and suppressing repeats within `dedup_ms`
    pub fn new(capacity: usize, dedup_ms: u64) -> Self {
        Self {
            alerts: RingBuffer::new(capacity),
            dedup_ms,
            next_id: 1,
        }
    }

    /// Admit a draft unless a matching alert is within the dedup window
    pub fn admit(&mut self, draft: AlertDraft, now: Timestamp) -> Option<Alert> {
        let duplicate = self.alerts.iter().rev().any(|a| {
            a.source == draft.source
                && a.level == draft.level
                && a.category == draft.category
                && now.saturating_sub(a.timestamp) < self.dedup_ms
        });
        if duplicate {
            return None;
        }

        let alert = Alert {
            id: self.next_id,
            level: draft.level,
            source: draft.source,
            category: draft.category,
            message: draft.message,
            timestamp: now,
            acknowledged: false,
        };
        self.next_id += 1;
        self.alerts.push(alert.clone());
        Some(alert)
    }

    /// Mark an alert as acknowledged; `false` if it is not in the log
    pub fn acknowledge(&mut self, id: u64) -> bool {
        match self.alerts.find_mut(|a| a.id == id) {
            Some(alert) => {
                alert.acknowledged = true;
                true
            }
            None => false,
        }
    }

    /// Newest `n` alerts, oldest of them first
    pub fn recent(&self, n: usize) -> Vec<Alert> {
        self.alerts.recent(n).cloned().collect()
    }

    /// Unacknowledged alerts, oldest first
    pub fn unacknowledged(&self) -> Vec<Alert> {
        self.alerts.iter().filter(|a| !a.acknowledged).cloned().collect()
    }

    /// Alerts retained
    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    /// Whether the log is empty
    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }
}

/// Alerts implied by a status transition
pub fn status_alert(source: &str, transition: Transition) -> Option<AlertDraft> {
    let Transition { previous, current } = transition;
    if previous == current {
        return None;
    }
    let (level, message) = match current {
        HealthStatus::Critical => (AlertLevel::Critical, format!("{source} is critical")),
        HealthStatus::Offline => (AlertLevel::Critical, format!("{source} is offline")),
        HealthStatus::Warning => (AlertLevel::Warning, format!("{source} is degraded")),
        HealthStatus::Healthy if previous.is_degraded() => {
            (AlertLevel::Info, format!("{source} recovered from {previous}"))
        }
        _ => return None,
    };
    Some(AlertDraft::new(level, source, AlertCategory::Status, message))
}

/// Alerts implied by a provider's latency and success rate
pub fn performance_alerts(metrics: &ProviderMetrics, thresholds: &Thresholds) -> Vec<AlertDraft> {
    let mut drafts = Vec::new();
    let source = metrics.provider.as_str();
    let latency = metrics.avg_response_time_ms;

    if latency > thresholds.latency_critical_ms {
        drafts.push(AlertDraft::new(
            AlertLevel::Critical,
            source,
            AlertCategory::Latency,
            format!("{source} latency {latency:.0} ms"),
        ));
    } else if latency > thresholds.latency_warning_ms {
        drafts.push(AlertDraft::new(
            AlertLevel::Warning,
            source,
            AlertCategory::Latency,
            format!("{source} latency {latency:.0} ms"),
        ));
    }

    if metrics.total_requests > 0 {
        let rate = metrics.success_rate * 100.0;
        if metrics.success_rate < thresholds.success_rate_critical {
            drafts.push(AlertDraft::new(
                AlertLevel::Critical,
                source,
                AlertCategory::SuccessRate,
                format!("{source} success rate {rate:.1}%"),
            ));
        } else if metrics.success_rate < thresholds.success_rate_warning {
            drafts.push(AlertDraft::new(
                AlertLevel::Warning,
                source,
                AlertCategory::SuccessRate,
                format!("{source} success rate {rate:.1}%"),
            ));
        }
    }

    drafts
}
