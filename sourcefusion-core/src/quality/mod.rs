//! Data Quality Analysis
//!
//! ## Overview
//!
//! Every reading is scored on six dimensions before it is fused. The scores
//! feed the fusion weights (as `quality²`), the reliability monitor and the
//! dynamic weight manager.
//!
//! ```text
//! Reading ──→ completeness ─┐
//!         ──→ accuracy     ─┤
//!         ──→ timeliness   ─┼─→ Σ wᵢ·scoreᵢ ─→ overall ─→ grade
//!         ──→ consistency  ─┤
//!         ──→ validity     ─┤
//!         ──→ reliability  ─┘
//! ```
//!
//! ## Metric families
//!
//! - **Price**: quotes (or bare scalar prices) are checked for range,
//!   internal consistency, precision and plausibility
//! - **News**: articles are checked for field coverage, headline shape and
//!   URL/relevance validity
//! - **Other**: sentiment, technical and fundamental readings only get
//!   coverage and benchmark-based scoring
//!
//! ## Failure policy
//!
//! Analysis never fails. A sub-check that cannot be evaluated (missing
//! field, wrong payload shape, NaN) scores [`NEUTRAL_SCORE`] and every
//! sub-score is clamped to `[0, 1]`.
//!
//! ## Usage Example
//!
//! ```rust
//! use sourcefusion_core::quality::{QualityAnalyzer, QualityGrade};
//! use sourcefusion_core::{MetricType, Reading};
//!
//! let analyzer = QualityAnalyzer::default();
//! let reading = Reading::price("eastmoney", 1688.5, 1_000);
//!
//! let score = analyzer.analyze(&reading, MetricType::Price, 61_000);
//! assert!(score.overall > 0.5);
//! assert_ne!(score.grade, QualityGrade::Poor);
//! ```

pub mod benchmarks;
mod generic;
mod news;
mod price;
pub mod tracker;

pub use benchmarks::{BenchmarkTable, ProviderBenchmark};
pub use tracker::{QualitySummary, QualityTracker, QualityTrend};

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::quality::*;
use crate::errors::{ensure_unit, ConfigError, ConfigResult};
use crate::reading::{MetricType, Payload, Quote, Reading};
use crate::time::{age_ms, Timestamp};

/// Letter-style grade derived from the overall score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityGrade {
    /// overall ≥ 0.90
    Excellent,
    /// overall ≥ 0.70
    Good,
    /// overall ≥ 0.50
    Fair,
    /// Below 0.50
    Poor,
}

impl QualityGrade {
    /// Grade for an overall score
    pub fn from_score(score: f64) -> Self {
        if score >= GRADE_EXCELLENT {
            Self::Excellent
        } else if score >= GRADE_GOOD {
            Self::Good
        } else if score >= GRADE_FAIR {
            Self::Fair
        } else {
            Self::Poor
        }
    }
}

impl fmt::Display for QualityGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Fair => "fair",
            Self::Poor => "poor",
        };
        f.write_str(name)
    }
}

/// Quality assessment of one reading
///
/// Immutable once produced; all sub-scores lie in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityScore {
    /// Provider of the analyzed reading
    pub provider: String,
    /// Metric the reading was analyzed as
    pub metric: MetricType,
    /// Field coverage
    pub completeness: f64,
    /// Plausibility of the values
    pub accuracy: f64,
    /// Freshness
    pub timeliness: f64,
    /// Internal agreement between related fields
    pub consistency: f64,
    /// Format and range validity
    pub validity: f64,
    /// Provider track record blended with this reading's coverage and age
    pub reliability: f64,
    /// Weighted sum of the six dimensions
    pub overall: f64,
    /// Grade of `overall`
    pub grade: QualityGrade,
    /// When the analysis ran
    pub analyzed_at: Timestamp,
}

/// Weights of the six quality dimensions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DimensionWeights {
    /// Completeness weight
    pub completeness: f64,
    /// Accuracy weight
    pub accuracy: f64,
    /// Timeliness weight
    pub timeliness: f64,
    /// Consistency weight
    pub consistency: f64,
    /// Validity weight
    pub validity: f64,
    /// Reliability weight
    pub reliability: f64,
}

impl Default for DimensionWeights {
    fn default() -> Self {
        Self {
            completeness: WEIGHT_COMPLETENESS,
            accuracy: WEIGHT_ACCURACY,
            timeliness: WEIGHT_TIMELINESS,
            consistency: WEIGHT_CONSISTENCY,
            validity: WEIGHT_VALIDITY,
            reliability: WEIGHT_RELIABILITY,
        }
    }
}

impl DimensionWeights {
    fn as_array(&self) -> [(&'static str, f64); 6] {
        [
            ("completeness", self.completeness),
            ("accuracy", self.accuracy),
            ("timeliness", self.timeliness),
            ("consistency", self.consistency),
            ("validity", self.validity),
            ("reliability", self.reliability),
        ]
    }

    /// Check every weight is in `[0, 1]` and at least one is positive
    pub fn validate(&self) -> ConfigResult<()> {
        let weights = self.as_array();
        for (field, value) in weights {
            ensure_unit(field, value)?;
        }
        if weights.iter().all(|(_, w)| *w == 0.0) {
            return Err(ConfigError::NonPositive {
                field: "dimension weights",
            });
        }
        Ok(())
    }
}

/// Quality analysis settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Dimension weights
    pub weights: DimensionWeights,
    /// Per-provider benchmarks
    pub benchmarks: BenchmarkTable,
    /// Scores kept per provider and metric
    pub history_capacity: usize,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            weights: DimensionWeights::default(),
            benchmarks: BenchmarkTable::default(),
            history_capacity: QUALITY_HISTORY_CAPACITY,
        }
    }
}

impl QualityConfig {
    /// Reject weights, benchmarks or capacity that cannot work
    pub fn validate(&self) -> ConfigResult<()> {
        self.weights.validate()?;
        self.benchmarks.validate()?;
        if self.history_capacity == 0 {
            return Err(ConfigError::NonPositive {
                field: "quality history capacity",
            });
        }
        Ok(())
    }

    /// Analyzer and tracker built from these settings
    pub fn build(&self) -> ConfigResult<(QualityAnalyzer, QualityTracker)> {
        self.validate()?;
        let analyzer = QualityAnalyzer::new(self.benchmarks.clone(), self.weights)?;
        Ok((analyzer, QualityTracker::new(self.history_capacity)))
    }
}

/// Per-dimension sub-scores before weighting
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Dimensions {
    pub completeness: f64,
    pub accuracy: f64,
    pub consistency: f64,
    pub validity: f64,
}

impl Dimensions {
    /// Every dimension at the neutral score
    pub(crate) const NEUTRAL: Self = Self {
        completeness: NEUTRAL_SCORE,
        accuracy: NEUTRAL_SCORE,
        consistency: NEUTRAL_SCORE,
        validity: NEUTRAL_SCORE,
    };
}

/// Six-dimension quality scorer
///
/// Pure: the same reading, metric and `now` always produce the same score.
/// History is kept separately by [`QualityTracker`].
#[derive(Debug, Clone, Default)]
pub struct QualityAnalyzer {
    benchmarks: BenchmarkTable,
    weights: DimensionWeights,
}

impl QualityAnalyzer {
    /// Create an analyzer
    pub fn new(benchmarks: BenchmarkTable, weights: DimensionWeights) -> ConfigResult<Self> {
        weights.validate()?;
        benchmarks.validate()?;
        Ok(Self {
            benchmarks,
            weights,
        })
    }

    /// Benchmark table in use
    pub fn benchmarks(&self) -> &BenchmarkTable {
        &self.benchmarks
    }

    /// Dimension weights in use
    pub fn weights(&self) -> &DimensionWeights {
        &self.weights
    }

    /// Score a reading as the given metric at time `now`
    pub fn analyze(&self, reading: &Reading, metric: MetricType, now: Timestamp) -> QualityScore {
        let dims = self.dimensions(reading, metric);
        let timeliness = timeliness_score(effective_time(reading, metric), now);

        let benchmark = self.benchmarks.reliability_base(&reading.provider);
        let reliability = benchmark
            + RELIABILITY_COMPLETENESS_BONUS * dims.completeness
            + RELIABILITY_TIMELINESS_BONUS * timeliness;

        let completeness = clamp_unit(dims.completeness);
        let accuracy = clamp_unit(dims.accuracy);
        let consistency = clamp_unit(dims.consistency);
        let validity = clamp_unit(dims.validity);
        let reliability = clamp_unit(reliability);

        let w = &self.weights;
        let overall = clamp_unit(
            w.completeness * completeness
                + w.accuracy * accuracy
                + w.timeliness * timeliness
                + w.consistency * consistency
                + w.validity * validity
                + w.reliability * reliability,
        );

        QualityScore {
            provider: reading.provider.clone(),
            metric,
            completeness,
            accuracy,
            timeliness,
            consistency,
            validity,
            reliability,
            overall,
            grade: QualityGrade::from_score(overall),
            analyzed_at: now,
        }
    }

    fn dimensions(&self, reading: &Reading, metric: MetricType) -> Dimensions {
        let provider = reading.provider.as_str();
        match (metric, &reading.value) {
            (MetricType::Price, Payload::Quote(quote)) => {
                price::score(quote, self.benchmarks.price_accuracy(provider))
            }
            (MetricType::Price, Payload::Scalar(value)) => {
                let quote = Quote::with_price(*value);
                price::score(&quote, self.benchmarks.price_accuracy(provider))
            }
            (MetricType::News, Payload::Article(article)) => {
                news::score(article, self.benchmarks.news_accuracy(provider))
            }
            (MetricType::Price | MetricType::News, _) => Dimensions::NEUTRAL,
            (_, payload) => generic::score(payload, self.benchmarks.generic_accuracy(provider)),
        }
    }
}

/// Time the reading's content refers to
///
/// Articles are as fresh as their publication, not their fetch.
fn effective_time(reading: &Reading, metric: MetricType) -> Timestamp {
    match (metric, &reading.value) {
        (MetricType::News, Payload::Article(article)) => {
            article.published_at.unwrap_or(reading.observed_at)
        }
        _ => reading.observed_at,
    }
}

/// Banded freshness score; future timestamps count as age zero
pub fn timeliness_score(observed_at: Timestamp, now: Timestamp) -> f64 {
    let age_min = age_ms(now, observed_at) as f64 / crate::constants::MS_PER_MINUTE as f64;
    TIMELINESS_BANDS
        .iter()
        .find(|(max_min, _)| age_min <= *max_min as f64)
        .map_or(TIMELINESS_FLOOR, |(_, score)| *score)
}

/// Mean of the checks that could run, or neutral when none could
pub(crate) fn mean_or_neutral(checks: &[f64]) -> f64 {
    if checks.is_empty() {
        NEUTRAL_SCORE
    } else {
        checks.iter().sum::<f64>() / checks.len() as f64
    }
}

/// Clamp to `[0, 1]`, mapping NaN to neutral
pub(crate) fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        NEUTRAL_SCORE
    } else {
        value.clamp(0.0, 1.0)
    }
}
