//! Performance signals feeding the weight manager
//!
//! ```text
//! HealthReport ──┐
//! QualityTracker ┼─→ collect_signals ─→ PerformanceInput per provider
//! overrides ─────┘                            │
//!                                   resolve (defaults) ─→ score, confidence
//! ```
//!
//! Every field is optional. Missing fields take the neutral defaults in
//! [`crate::constants::weights`] when the input is resolved.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::weights::*;
use crate::health::HealthReport;
use crate::quality::QualityTracker;

/// Raw signals for one provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceInput {
    /// Monitor reliability score
    pub reliability_score: Option<f64>,
    /// Mean response time (ms)
    pub response_time_ms: Option<f64>,
    /// Success rate
    pub success_rate: Option<f64>,
    /// Uptime ratio
    pub uptime: Option<f64>,
    /// Data quality
    pub data_quality: Option<f64>,
    /// Failed checks
    pub error_count: Option<u64>,
    /// Checks performed
    pub total_requests: Option<u64>,
    /// Health status score
    pub status_score: Option<f64>,
}

impl PerformanceInput {
    /// Fields set in `other` replace ours
    pub fn merge(&mut self, other: &PerformanceInput) {
        fn take<T: Copy>(slot: &mut Option<T>, value: Option<T>) {
            if value.is_some() {
                *slot = value;
            }
        }
        take(&mut self.reliability_score, other.reliability_score);
        take(&mut self.response_time_ms, other.response_time_ms);
        take(&mut self.success_rate, other.success_rate);
        take(&mut self.uptime, other.uptime);
        take(&mut self.data_quality, other.data_quality);
        take(&mut self.error_count, other.error_count);
        take(&mut self.total_requests, other.total_requests);
        take(&mut self.status_score, other.status_score);
    }

    /// Fill missing fields with defaults
    pub fn resolve(&self) -> ResolvedInput {
        let unit = |v: Option<f64>, default: f64| v.filter(|x| x.is_finite()).map_or(default, |x| x.clamp(0.0, 1.0));
        ResolvedInput {
            reliability_score: unit(self.reliability_score, DEFAULT_RELIABILITY),
            response_time_ms: self
                .response_time_ms
                .filter(|x| x.is_finite() && *x >= 0.0)
                .unwrap_or(DEFAULT_RESPONSE_MS),
            success_rate: unit(self.success_rate, DEFAULT_SUCCESS_RATE),
            uptime: unit(self.uptime, DEFAULT_UPTIME),
            data_quality: unit(self.data_quality, DEFAULT_DATA_QUALITY),
            error_count: self.error_count.unwrap_or(0),
            total_requests: self.total_requests.unwrap_or(DEFAULT_REQUESTS),
            status_score: unit(self.status_score, DEFAULT_STATUS_SCORE),
        }
    }
}

/// Signals with every field filled
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolvedInput {
    /// Monitor reliability score
    pub reliability_score: f64,
    /// Mean response time (ms)
    pub response_time_ms: f64,
    /// Success rate
    pub success_rate: f64,
    /// Uptime ratio
    pub uptime: f64,
    /// Data quality
    pub data_quality: f64,
    /// Failed checks
    pub error_count: u64,
    /// Checks performed
    pub total_requests: u64,
    /// Health status score
    pub status_score: f64,
}

impl Default for ResolvedInput {
    fn default() -> Self {
        PerformanceInput::default().resolve()
    }
}

impl ResolvedInput {
    /// `max(0.1, 1 − latency / 10 s)`
    pub fn response_score(&self) -> f64 {
        (1.0 - self.response_time_ms / RESPONSE_SCALE_MS).max(RESPONSE_SCORE_FLOOR)
    }

    /// Weighted performance in `[0, 1]`
    pub fn performance_score(&self) -> f64 {
        let score = self.reliability_score * PERF_WEIGHT_RELIABILITY
            + self.success_rate * PERF_WEIGHT_SUCCESS
            + self.uptime * PERF_WEIGHT_UPTIME
            + self.data_quality * PERF_WEIGHT_QUALITY
            + self.status_score * PERF_WEIGHT_STATUS
            + self.response_score() * PERF_WEIGHT_RESPONSE;
        score.clamp(0.0, 1.0)
    }

    /// Confidence that an adjustment based on these signals is sound
    ///
    /// Mean of data completeness, request volume and a reliability band.
    pub fn confidence(&self) -> f64 {
        let present = [
            self.reliability_score,
            self.success_rate,
            self.uptime,
            self.data_quality,
        ]
        .iter()
        .filter(|v| **v > 0.0)
        .count();
        let completeness = present as f64 / 4.0;

        let volume = ((self.total_requests as f64 + 1.0).ln() / CONFIDENCE_FULL_REQUESTS.ln()).min(1.0);

        let reliability = if self.reliability_score > 0.8 {
            0.9
        } else if self.reliability_score > 0.6 {
            0.7
        } else {
            0.5
        };

        (completeness + volume + reliability) / 3.0
    }
}

/// Build one input per provider from the monitor, the quality history and
/// caller overrides
///
/// Data quality prefers the tracker's recent average over the monitor's
/// quality signal. Override fields win over both.
pub fn collect_signals(
    report: Option<&HealthReport>,
    tracker: Option<&QualityTracker>,
    overrides: &BTreeMap<String, PerformanceInput>,
) -> BTreeMap<String, PerformanceInput> {
    let mut signals: BTreeMap<String, PerformanceInput> = BTreeMap::new();

    if let Some(report) = report {
        for (provider, m) in &report.providers {
            let input = PerformanceInput {
                reliability_score: Some(m.reliability_score()),
                response_time_ms: Some(m.avg_response_time_ms),
                success_rate: Some(m.success_rate),
                uptime: Some(m.uptime_ratio),
                data_quality: m.quality_score,
                error_count: Some(m.error_count),
                total_requests: Some(m.total_requests),
                status_score: Some(m.status.score()),
            };
            signals.insert(provider.clone(), input);
        }
    }

    if let Some(tracker) = tracker {
        for provider in tracker.providers() {
            if let Some(avg) = tracker.recent_average(&provider) {
                signals.entry(provider).or_default().data_quality = Some(avg);
            }
        }
    }

    for (provider, extra) in overrides {
        signals.entry(provider.clone()).or_default().merge(extra);
    }

    signals
}
