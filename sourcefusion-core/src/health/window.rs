//! Rolling check window of one provider
//!
//! ```text
//! success_rate = ok checks / checks                       (count based)
//! avg latency  = Σ latency / checks
//! uptime       = Σ spanᵢ·okᵢ / Σ spanᵢ                    (time weighted)
//!
//!   spanᵢ = tᵢ₊₁ − tᵢ, and one nominal interval for the newest sample
//! ```
//!
//! Error and request counters and the last error are lifetime values; the
//! rest only look at the window.

use serde::{Deserialize, Serialize};

use super::{classify, HealthStatus, ProviderMetrics, Thresholds};
use crate::buffer::RingBuffer;
use crate::time::Timestamp;

/// One completed health check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckRecord {
    /// When the check completed
    pub at: Timestamp,
    /// Whether the provider answered correctly
    pub ok: bool,
    /// Check latency (ms)
    pub latency_ms: f64,
    /// Quality reported by the check, if any
    pub quality: Option<f64>,
    /// Failure description
    pub error: Option<String>,
}

impl CheckRecord {
    /// Successful check
    pub fn success(at: Timestamp, latency_ms: f64) -> Self {
        Self {
            at,
            ok: true,
            latency_ms,
            quality: None,
            error: None,
        }
    }

    /// Failed check
    pub fn failure(at: Timestamp, latency_ms: f64, error: impl Into<String>) -> Self {
        Self {
            at,
            ok: false,
            latency_ms,
            quality: None,
            error: Some(error.into()),
        }
    }

    /// Attach a quality signal
    pub fn with_quality(mut self, quality: f64) -> Self {
        self.quality = Some(quality);
        self
    }
}

/// Windowed sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HealthSample {
    /// Check time
    pub at: Timestamp,
    /// Check succeeded
    pub ok: bool,
    /// Check latency (ms)
    pub latency_ms: f64,
}

/// Status before and after an evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    /// Status before
    pub previous: HealthStatus,
    /// Status after
    pub current: HealthStatus,
}

impl Transition {
    /// Whether the status changed
    pub fn changed(&self) -> bool {
        self.previous != self.current
    }
}

/// Window, metrics and status of one provider
#[derive(Debug, Clone)]
pub struct ProviderHealth {
    metrics: ProviderMetrics,
    samples: RingBuffer<HealthSample>,
}

impl ProviderHealth {
    /// Unchecked provider with a window of `window` samples
    pub fn new(provider: impl Into<String>, critical: bool, registered_at: Timestamp, window: usize) -> Self {
        Self {
            metrics: ProviderMetrics::new(provider, critical, registered_at),
            samples: RingBuffer::new(window),
        }
    }

    /// Current metrics
    pub fn metrics(&self) -> &ProviderMetrics {
        &self.metrics
    }

    /// Current status
    pub fn status(&self) -> HealthStatus {
        self.metrics.status
    }

    /// Samples in the window
    pub fn samples(&self) -> usize {
        self.samples.len()
    }

    /// Mark or unmark as business-critical
    pub fn set_critical(&mut self, critical: bool) {
        self.metrics.critical = critical;
    }

    /// Fold a check into the window and re-classify
    pub fn record_check(&mut self, check: CheckRecord, interval_ms: u64, thresholds: &Thresholds) -> Transition {
        let latency_ms = if check.latency_ms.is_finite() {
            check.latency_ms.max(0.0)
        } else {
            0.0
        };
        self.samples.push(HealthSample {
            at: check.at,
            ok: check.ok,
            latency_ms,
        });

        let m = &mut self.metrics;
        m.total_requests += 1;
        m.last_checked_at = Some(check.at);
        m.last_response_time_ms = latency_ms;
        if check.ok {
            m.last_success_at = Some(check.at);
        } else {
            m.error_count += 1;
            m.last_error = Some(check.error.unwrap_or_else(|| "check failed".to_string()));
        }
        if let Some(q) = check.quality.filter(|q| q.is_finite()) {
            m.quality_score = Some(q.clamp(0.0, 1.0));
        }

        self.recompute(interval_ms);
        self.evaluate(check.at, interval_ms, thresholds)
    }

    /// Update the quality signal without a check
    pub fn record_quality(&mut self, quality: f64) {
        if quality.is_finite() {
            self.metrics.quality_score = Some(quality.clamp(0.0, 1.0));
        }
    }

    /// Re-classify at `now` without new data
    ///
    /// Catches providers that went silent. A provider that was never
    /// checked stays Unknown until it is checked or goes Offline.
    pub fn evaluate(&mut self, now: Timestamp, interval_ms: u64, thresholds: &Thresholds) -> Transition {
        let previous = self.metrics.status;
        let mut current = classify(&self.metrics, now, interval_ms, thresholds);
        if self.metrics.total_requests == 0 && current != HealthStatus::Offline {
            current = HealthStatus::Unknown;
        }
        self.metrics.status = current;
        Transition { previous, current }
    }

    fn recompute(&mut self, interval_ms: u64) {
        let n = self.samples.len();
        if n == 0 {
            return;
        }
        let samples: Vec<HealthSample> = self.samples.iter().copied().collect();

        let ok = samples.iter().filter(|s| s.ok).count();
        self.metrics.success_rate = ok as f64 / n as f64;
        self.metrics.avg_response_time_ms = samples.iter().map(|s| s.latency_ms).sum::<f64>() / n as f64;

        let mut up = 0u64;
        let mut total = 0u64;
        for (i, s) in samples.iter().enumerate() {
            let span = samples
                .get(i + 1)
                .map_or(interval_ms, |next| next.at.saturating_sub(s.at));
            total += span;
            if s.ok {
                up += span;
            }
        }
        self.metrics.uptime_ratio = if total > 0 {
            up as f64 / total as f64
        } else {
            self.metrics.success_rate
        };
    }
}
