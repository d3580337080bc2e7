//! Quality history per provider and metric
//!
//! The analyzer is pure; this tracker is where scores accumulate. It is
//! shared between the fusion path (which records) and the weight manager
//! (which reads recent averages), so it locks internally and every method
//! takes `&self`.

use std::collections::BTreeMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::QualityScore;
use crate::buffer::RingBuffer;
use crate::constants::quality::{QUALITY_HISTORY_CAPACITY, TREND_THRESHOLD, TREND_WINDOW};
use crate::reading::MetricType;
use crate::time::Timestamp;

/// Direction of a provider's quality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityTrend {
    /// Recent mean more than 0.05 above the previous window
    Rising,
    /// Within ±0.05 of the previous window
    Stable,
    /// Recent mean more than 0.05 below the previous window
    Falling,
}

/// Aggregate quality for one provider and metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualitySummary {
    /// Provider id
    pub provider: String,
    /// Metric
    pub metric: MetricType,
    /// Mean overall score over the retained history
    pub average: f64,
    /// Most recent overall score
    pub latest: f64,
    /// Retained samples
    pub samples: usize,
}

#[derive(Debug, Clone, Copy)]
struct Sample {
    at: Timestamp,
    overall: f64,
}

type HistoryKey = (String, MetricType);

/// Bounded quality history
#[derive(Debug)]
pub struct QualityTracker {
    capacity: usize,
    history: RwLock<BTreeMap<HistoryKey, RingBuffer<Sample>>>,
}

impl Default for QualityTracker {
    fn default() -> Self {
        Self::new(QUALITY_HISTORY_CAPACITY)
    }
}

impl QualityTracker {
    /// Tracker keeping `capacity` scores per provider and metric
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            history: RwLock::new(BTreeMap::new()),
        }
    }

    /// Append a score, evicting the oldest one past capacity
    pub fn record(&self, score: &QualityScore) {
        let sample = Sample {
            at: score.analyzed_at,
            overall: score.overall,
        };
        let mut history = self.history.write();
        history
            .entry((score.provider.clone(), score.metric))
            .or_insert_with(|| RingBuffer::new(self.capacity))
            .push(sample);
    }

    /// Provider's samples across all metrics, oldest first
    fn provider_samples(&self, provider: &str) -> Vec<Sample> {
        let history = self.history.read();
        let mut samples: Vec<Sample> = history
            .iter()
            .filter(|((p, _), _)| p == provider)
            .flat_map(|(_, buf)| buf.iter().copied())
            .collect();
        samples.sort_by_key(|s| s.at);
        samples
    }

    /// Mean of the provider's last ten scores across its metrics
    pub fn recent_average(&self, provider: &str) -> Option<f64> {
        let samples = self.provider_samples(provider);
        let start = samples.len().saturating_sub(TREND_WINDOW);
        mean(&samples[start..])
    }

    /// Compare the last ten scores with the ten before them
    ///
    /// With fewer than twenty samples the previous window is taken to equal
    /// the recent one, so short histories read as stable.
    pub fn trend(&self, provider: &str) -> QualityTrend {
        let samples = self.provider_samples(provider);
        let split = samples.len().saturating_sub(TREND_WINDOW);
        let Some(recent) = mean(&samples[split..]) else {
            return QualityTrend::Stable;
        };
        let previous = if samples.len() >= 2 * TREND_WINDOW {
            mean(&samples[split - TREND_WINDOW..split]).unwrap_or(recent)
        } else {
            recent
        };

        let delta = recent - previous;
        if delta > TREND_THRESHOLD {
            QualityTrend::Rising
        } else if delta < -TREND_THRESHOLD {
            QualityTrend::Falling
        } else {
            QualityTrend::Stable
        }
    }

    /// Per provider and metric averages, optionally for one provider only
    pub fn summary(&self, provider: Option<&str>) -> Vec<QualitySummary> {
        let history = self.history.read();
        history
            .iter()
            .filter(|((p, _), _)| provider.map_or(true, |wanted| p == wanted))
            .filter_map(|((p, metric), buf)| {
                let samples: Vec<Sample> = buf.iter().copied().collect();
                Some(QualitySummary {
                    provider: p.clone(),
                    metric: *metric,
                    average: mean(&samples)?,
                    latest: buf.last()?.overall,
                    samples: samples.len(),
                })
            })
            .collect()
    }

    /// Providers with any history
    pub fn providers(&self) -> Vec<String> {
        let mut providers: Vec<String> = self.history.read().keys().map(|(p, _)| p.clone()).collect();
        providers.dedup();
        providers
    }

    /// Retained samples for one provider and metric
    pub fn len(&self, provider: &str, metric: MetricType) -> usize {
        self.history
            .read()
            .get(&(provider.to_string(), metric))
            .map_or(0, RingBuffer::len)
    }
}

fn mean(samples: &[Sample]) -> Option<f64> {
    if samples.is_empty() {
        None
    } else {
        Some(samples.iter().map(|s| s.overall).sum::<f64>() / samples.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quality::QualityGrade;

    fn score(provider: &str, metric: MetricType, overall: f64, at: Timestamp) -> QualityScore {
        QualityScore {
            provider: provider.into(),
            metric,
            completeness: overall,
            accuracy: overall,
            timeliness: overall,
            consistency: overall,
            validity: overall,
            reliability: overall,
            overall,
            grade: QualityGrade::from_score(overall),
            analyzed_at: at,
        }
    }

    #[test]
    fn history_is_bounded() {
        let tracker = QualityTracker::new(5);
        for i in 0..12 {
            tracker.record(&score("sina", MetricType::Price, 0.8, i));
        }
        assert_eq!(tracker.len("sina", MetricType::Price), 5);
    }

    #[test]
    fn recent_average_spans_metrics() {
        let tracker = QualityTracker::default();
        tracker.record(&score("sina", MetricType::Price, 0.9, 1));
        tracker.record(&score("sina", MetricType::News, 0.5, 2));
        tracker.record(&score("tencent", MetricType::Price, 0.1, 3));

        let avg = tracker.recent_average("sina").unwrap();
        assert!((avg - 0.7).abs() < 1e-12);
        assert_eq!(tracker.recent_average("nobody"), None);
    }

    #[test]
    fn recent_average_uses_last_ten() {
        let tracker = QualityTracker::default();
        for i in 0..10 {
            tracker.record(&score("sina", MetricType::Price, 0.2, i));
        }
        for i in 10..20 {
            tracker.record(&score("sina", MetricType::Price, 0.9, i));
        }
        let avg = tracker.recent_average("sina").unwrap();
        assert!((avg - 0.9).abs() < 1e-12);
    }

    #[test]
    fn trend_detection() {
        let tracker = QualityTracker::default();
        for i in 0..10 {
            tracker.record(&score("up", MetricType::Price, 0.5, i));
            tracker.record(&score("down", MetricType::Price, 0.9, i));
        }
        // short history reads as stable
        assert_eq!(tracker.trend("up"), QualityTrend::Stable);

        for i in 10..20 {
            tracker.record(&score("up", MetricType::Price, 0.8, i));
            tracker.record(&score("down", MetricType::Price, 0.6, i));
        }
        assert_eq!(tracker.trend("up"), QualityTrend::Rising);
        assert_eq!(tracker.trend("down"), QualityTrend::Falling);
        assert_eq!(tracker.trend("nobody"), QualityTrend::Stable);
    }

    #[test]
    fn summary_filters_by_provider() {
        let tracker = QualityTracker::default();
        tracker.record(&score("sina", MetricType::Price, 0.6, 1));
        tracker.record(&score("sina", MetricType::Price, 0.8, 2));
        tracker.record(&score("tencent", MetricType::News, 0.4, 3));

        assert_eq!(tracker.summary(None).len(), 2);
        let sina = tracker.summary(Some("sina"));
        assert_eq!(sina.len(), 1);
        assert_eq!(sina[0].samples, 2);
        assert_eq!(sina[0].latest, 0.8);
        assert!((sina[0].average - 0.7).abs() < 1e-12);
    }
}
