//! Provider Health Model
//!
//! ## Overview
//!
//! The reliability monitor (in the runtime crate) probes providers on a
//! schedule. Everything it decides is modelled here, synchronously, so the
//! rules can be tested without a runtime:
//!
//! - [`ProviderHealth`]: rolling window of checks and the derived metrics
//! - [`Thresholds`] and [`classify`]: the status rules
//! - [`AlertLog`]: bounded, deduplicated alert history
//! - [`HealthReport`]: the owned snapshot handed to readers
//!
//! ## Status machine
//!
//! ```text
//!            first check
//! Unknown ───────────────→ Healthy ⇄ Warning ⇄ Critical
//!                              ↘        ↓        ↙
//!                        no success in 3 × interval
//!                                       ↓
//!                                    Offline
//! ```
//!
//! Rules are evaluated after every check and the worst match wins:
//! Offline, then Critical, then Warning, else Healthy.

pub mod alerts;
pub mod window;

pub use alerts::{Alert, AlertCategory, AlertDraft, AlertLevel, AlertLog};
pub use window::{CheckRecord, HealthSample, ProviderHealth, Transition};

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::monitor::*;
use crate::errors::{ensure_unit, ConfigError, ConfigResult};
use crate::time::{age_ms, Timestamp};

/// Health of one provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// All criteria met
    Healthy,
    /// At least one warning criterion tripped
    Warning,
    /// At least one critical criterion tripped
    Critical,
    /// No success for three check intervals
    Offline,
    /// Not checked yet
    Unknown,
}

impl HealthStatus {
    /// Score used by the weight manager
    pub fn score(&self) -> f64 {
        match self {
            Self::Healthy => 1.0,
            Self::Warning => 0.7,
            Self::Critical => 0.3,
            Self::Offline => 0.1,
            Self::Unknown => 0.5,
        }
    }

    /// Whether the provider is degraded in any way
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Warning | Self::Critical | Self::Offline)
    }

    /// Stable lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Warning => "warning",
            Self::Critical => "critical",
            Self::Offline => "offline",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Success rate below which a provider is in Warning
    pub success_rate_warning: f64,
    /// Success rate below which a provider is Critical
    pub success_rate_critical: f64,
    /// Mean latency (ms) above which a provider is in Warning
    pub latency_warning_ms: f64,
    /// Mean latency (ms) above which a provider is Critical
    pub latency_critical_ms: f64,
    /// Quality below which a provider is in Warning
    pub quality_warning: f64,
    /// Quality below which a provider is Critical
    pub quality_critical: f64,
    /// Uptime below which a provider is in Warning
    pub uptime_warning: f64,
    /// Uptime below which a provider is Critical
    pub uptime_critical: f64,
    /// Check intervals without success before Offline
    pub offline_after_intervals: u64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            success_rate_warning: SUCCESS_RATE_WARNING,
            success_rate_critical: SUCCESS_RATE_CRITICAL,
            latency_warning_ms: LATENCY_WARNING_MS,
            latency_critical_ms: LATENCY_CRITICAL_MS,
            quality_warning: QUALITY_WARNING,
            quality_critical: QUALITY_CRITICAL,
            uptime_warning: UPTIME_WARNING,
            uptime_critical: UPTIME_CRITICAL,
            offline_after_intervals: OFFLINE_AFTER_INTERVALS,
        }
    }
}

impl Thresholds {
    /// Ratios in `[0, 1]`, critical no laxer than warning
    pub fn validate(&self) -> ConfigResult<()> {
        ensure_unit("success rate warning", self.success_rate_warning)?;
        ensure_unit("success rate critical", self.success_rate_critical)?;
        ensure_unit("quality warning", self.quality_warning)?;
        ensure_unit("quality critical", self.quality_critical)?;
        ensure_unit("uptime warning", self.uptime_warning)?;
        ensure_unit("uptime critical", self.uptime_critical)?;
        if !(self.latency_warning_ms > 0.0 && self.latency_critical_ms >= self.latency_warning_ms) {
            return Err(ConfigError::NonPositive {
                field: "latency thresholds",
            });
        }
        if self.offline_after_intervals == 0 {
            return Err(ConfigError::NonPositive {
                field: "offline after intervals",
            });
        }
        Ok(())
    }
}

/// Rolling and lifetime metrics of one provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderMetrics {
    /// Provider id
    pub provider: String,
    /// Current status
    pub status: HealthStatus,
    /// Successful checks in the window / checks in the window
    pub success_rate: f64,
    /// Mean latency over the window (ms)
    pub avg_response_time_ms: f64,
    /// Latency of the last check (ms)
    pub last_response_time_ms: f64,
    /// Time-weighted share of the window the provider was up
    pub uptime_ratio: f64,
    /// Latest quality signal, if any
    pub quality_score: Option<f64>,
    /// Failed checks since registration
    pub error_count: u64,
    /// Checks since registration
    pub total_requests: u64,
    /// Last check time
    pub last_checked_at: Option<Timestamp>,
    /// Last successful check time
    pub last_success_at: Option<Timestamp>,
    /// Message of the last failure
    pub last_error: Option<String>,
    /// Business-critical provider
    pub critical: bool,
    /// Registration time
    pub registered_at: Timestamp,
}

impl ProviderMetrics {
    /// Metrics of a provider that has not been checked yet
    pub fn new(provider: impl Into<String>, critical: bool, registered_at: Timestamp) -> Self {
        Self {
            provider: provider.into(),
            status: HealthStatus::Unknown,
            success_rate: 0.0,
            avg_response_time_ms: 0.0,
            last_response_time_ms: 0.0,
            uptime_ratio: 0.0,
            quality_score: None,
            error_count: 0,
            total_requests: 0,
            last_checked_at: None,
            last_success_at: None,
            last_error: None,
            critical,
            registered_at,
        }
    }

    /// Response score: `max(0, 1 − latency/10 s)`, or 0.5 before any latency
    pub fn response_score(&self) -> f64 {
        if self.avg_response_time_ms > 0.0 {
            (1.0 - self.avg_response_time_ms / RESPONSE_SCORE_SCALE_MS).max(0.0)
        } else {
            RESPONSE_SCORE_UNKNOWN
        }
    }

    /// Composite used to pick the best and worst provider
    pub fn ranking_score(&self) -> f64 {
        let (ws, wu, wr) = RANKING_WEIGHTS;
        self.success_rate * ws + self.uptime_ratio * wu + self.response_score() * wr
    }

    /// `success·.3 + uptime·.3 + response·.2 + quality·.2`
    pub fn reliability_score(&self) -> f64 {
        let (ws, wu, wr, wq) = RELIABILITY_WEIGHTS;
        let quality = self.quality_score.unwrap_or(RELIABILITY_QUALITY_DEFAULT);
        (self.success_rate * ws + self.uptime_ratio * wu + self.response_score() * wr + quality * wq)
            .clamp(0.0, 1.0)
    }
}

/// Classify a provider; the worst matching rule wins
pub fn classify(
    metrics: &ProviderMetrics,
    now: Timestamp,
    interval_ms: u64,
    thresholds: &Thresholds,
) -> HealthStatus {
    let last_alive = metrics.last_success_at.unwrap_or(metrics.registered_at);
    let offline_after = interval_ms.saturating_mul(thresholds.offline_after_intervals);
    if age_ms(now, last_alive) > offline_after {
        return HealthStatus::Offline;
    }

    let quality_below = |limit: f64| metrics.quality_score.map_or(false, |q| q < limit);

    let critical = metrics.success_rate < thresholds.success_rate_critical
        || metrics.avg_response_time_ms > thresholds.latency_critical_ms
        || quality_below(thresholds.quality_critical)
        || metrics.uptime_ratio < thresholds.uptime_critical;
    if critical {
        return HealthStatus::Critical;
    }

    let warning = metrics.success_rate < thresholds.success_rate_warning
        || metrics.avg_response_time_ms > thresholds.latency_warning_ms
        || quality_below(thresholds.quality_warning)
        || metrics.uptime_ratio < thresholds.uptime_warning;
    if warning {
        HealthStatus::Warning
    } else {
        HealthStatus::Healthy
    }
}

/// Averages across providers plus the best and worst of them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    /// Mean latency over providers that reported one (ms)
    pub avg_response_time_ms: f64,
    /// Mean success rate
    pub avg_success_rate: f64,
    /// Mean uptime
    pub avg_uptime: f64,
    /// Highest ranking score
    pub best_provider: Option<String>,
    /// Lowest ranking score
    pub worst_provider: Option<String>,
}

impl PerformanceSummary {
    /// Summarize a set of provider metrics
    pub fn from_metrics<'a>(metrics: impl IntoIterator<Item = &'a ProviderMetrics>) -> Self {
        let metrics: Vec<&ProviderMetrics> = metrics.into_iter().collect();
        if metrics.is_empty() {
            return Self::default();
        }
        let n = metrics.len() as f64;

        let latencies: Vec<f64> = metrics
            .iter()
            .map(|m| m.avg_response_time_ms)
            .filter(|l| *l > 0.0)
            .collect();
        let avg_response_time_ms = if latencies.is_empty() {
            0.0
        } else {
            latencies.iter().sum::<f64>() / latencies.len() as f64
        };

        let mut ranked: Vec<(&str, f64)> = metrics
            .iter()
            .map(|m| (m.provider.as_str(), m.ranking_score()))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

        Self {
            avg_response_time_ms,
            avg_success_rate: metrics.iter().map(|m| m.success_rate).sum::<f64>() / n,
            avg_uptime: metrics.iter().map(|m| m.uptime_ratio).sum::<f64>() / n,
            best_provider: ranked.first().map(|(p, _)| p.to_string()),
            worst_provider: ranked.last().map(|(p, _)| p.to_string()),
        }
    }
}

/// Snapshot of every monitored provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    /// Aggregate status
    pub overall_status: HealthStatus,
    /// Providers per status
    pub status_counts: BTreeMap<HealthStatus, usize>,
    /// Per-provider metrics
    pub providers: BTreeMap<String, ProviderMetrics>,
    /// Cross-provider averages
    pub summary: PerformanceSummary,
    /// Most recent alerts, oldest first
    pub recent_alerts: Vec<Alert>,
    /// When the report was generated
    pub generated_at: Timestamp,
}

impl HealthReport {
    /// Assemble a report from provider metrics and recent alerts
    pub fn new(
        providers: BTreeMap<String, ProviderMetrics>,
        recent_alerts: Vec<Alert>,
        generated_at: Timestamp,
    ) -> Self {
        let mut status_counts = BTreeMap::new();
        for m in providers.values() {
            *status_counts.entry(m.status).or_insert(0) += 1;
        }
        let overall_status = overall_status(&status_counts, providers.len());
        let summary = PerformanceSummary::from_metrics(providers.values());

        Self {
            overall_status,
            status_counts,
            providers,
            summary,
            recent_alerts,
            generated_at,
        }
    }

    /// Providers in a status
    pub fn count(&self, status: HealthStatus) -> usize {
        self.status_counts.get(&status).copied().unwrap_or(0)
    }

    /// Metrics of one provider
    pub fn provider(&self, provider: &str) -> Option<&ProviderMetrics> {
        self.providers.get(provider)
    }
}

/// Any Critical → Critical; any Warning or Offline → Warning; else Healthy
fn overall_status(counts: &BTreeMap<HealthStatus, usize>, total: usize) -> HealthStatus {
    let has = |s: HealthStatus| counts.get(&s).copied().unwrap_or(0) > 0;
    if total == 0 || counts.get(&HealthStatus::Unknown).copied() == Some(total) {
        HealthStatus::Unknown
    } else if has(HealthStatus::Critical) {
        HealthStatus::Critical
    } else if has(HealthStatus::Warning) || has(HealthStatus::Offline) {
        HealthStatus::Warning
    } else {
        HealthStatus::Healthy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::MS_PER_MINUTE;

    const INTERVAL: u64 = 5 * MS_PER_MINUTE;

    fn healthy(now: Timestamp) -> ProviderMetrics {
        ProviderMetrics {
            status: HealthStatus::Healthy,
            success_rate: 1.0,
            avg_response_time_ms: 200.0,
            uptime_ratio: 1.0,
            quality_score: Some(0.9),
            total_requests: 10,
            last_checked_at: Some(now),
            last_success_at: Some(now),
            ..ProviderMetrics::new("sina", false, 0)
        }
    }

    #[test]
    fn classification_rules() {
        let th = Thresholds::default();
        let now = 100 * INTERVAL;
        assert_eq!(classify(&healthy(now), now, INTERVAL, &th), HealthStatus::Healthy);

        let slow = ProviderMetrics {
            avg_response_time_ms: 6_000.0,
            ..healthy(now)
        };
        assert_eq!(classify(&slow, now, INTERVAL, &th), HealthStatus::Warning);

        let very_slow = ProviderMetrics {
            avg_response_time_ms: 12_000.0,
            ..healthy(now)
        };
        assert_eq!(classify(&very_slow, now, INTERVAL, &th), HealthStatus::Critical);

        let flaky = ProviderMetrics {
            success_rate: 0.85,
            ..healthy(now)
        };
        assert_eq!(classify(&flaky, now, INTERVAL, &th), HealthStatus::Warning);

        let poor = ProviderMetrics {
            quality_score: Some(0.4),
            ..healthy(now)
        };
        assert_eq!(classify(&poor, now, INTERVAL, &th), HealthStatus::Critical);

        let down = ProviderMetrics {
            uptime_ratio: 0.92,
            ..healthy(now)
        };
        assert_eq!(classify(&down, now, INTERVAL, &th), HealthStatus::Warning);
    }

    #[test]
    fn missing_quality_is_skipped() {
        let now = 10 * INTERVAL;
        let m = ProviderMetrics {
            quality_score: None,
            ..healthy(now)
        };
        assert_eq!(classify(&m, now, INTERVAL, &Thresholds::default()), HealthStatus::Healthy);
    }

    #[test]
    fn offline_after_three_silent_intervals() {
        let th = Thresholds::default();
        let m = healthy(0);
        assert_eq!(classify(&m, 3 * INTERVAL, INTERVAL, &th), HealthStatus::Healthy);
        assert_eq!(classify(&m, 3 * INTERVAL + 1, INTERVAL, &th), HealthStatus::Offline);

        // never succeeded: counted from registration
        let fresh = ProviderMetrics::new("tushare", false, 1_000);
        assert_eq!(classify(&fresh, 1_000 + 4 * INTERVAL, INTERVAL, &th), HealthStatus::Offline);
    }

    #[test]
    fn reliability_score_weights() {
        let m = healthy(0);
        let expected = 0.3 + 0.3 + 0.2 * (1.0 - 200.0 / 10_000.0) + 0.2 * 0.9;
        assert!((m.reliability_score() - expected).abs() < 1e-12);

        let unseen = ProviderMetrics::new("x", false, 0);
        assert_eq!(unseen.response_score(), RESPONSE_SCORE_UNKNOWN);
    }

    #[test]
    fn report_aggregates() {
        let mut providers = BTreeMap::new();
        providers.insert("sina".to_string(), healthy(0));
        providers.insert(
            "tencent".to_string(),
            ProviderMetrics {
                provider: "tencent".into(),
                status: HealthStatus::Offline,
                success_rate: 0.5,
                uptime_ratio: 0.5,
                ..healthy(0)
            },
        );
        let report = HealthReport::new(providers, Vec::new(), 9);

        assert_eq!(report.overall_status, HealthStatus::Warning);
        assert_eq!(report.count(HealthStatus::Healthy), 1);
        assert_eq!(report.count(HealthStatus::Offline), 1);
        assert_eq!(report.count(HealthStatus::Critical), 0);
        assert_eq!(report.summary.best_provider.as_deref(), Some("sina"));
        assert_eq!(report.summary.worst_provider.as_deref(), Some("tencent"));
        assert!((report.summary.avg_success_rate - 0.75).abs() < 1e-12);
    }

    #[test]
    fn overall_status_precedence() {
        let counts = |pairs: &[(HealthStatus, usize)]| pairs.iter().copied().collect::<BTreeMap<_, _>>();
        assert_eq!(overall_status(&counts(&[]), 0), HealthStatus::Unknown);
        assert_eq!(
            overall_status(&counts(&[(HealthStatus::Critical, 1), (HealthStatus::Offline, 1)]), 2),
            HealthStatus::Critical
        );
        assert_eq!(
            overall_status(&counts(&[(HealthStatus::Healthy, 2), (HealthStatus::Unknown, 1)]), 3),
            HealthStatus::Healthy
        );
    }

    #[test]
    fn threshold_validation() {
        assert!(Thresholds::default().validate().is_ok());
        let bad = Thresholds {
            uptime_warning: 1.5,
            ..Thresholds::default()
        };
        assert!(bad.validate().is_err());
    }
}
