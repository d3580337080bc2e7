//! Provider performance tracking
//!
//! Each provider keeps two exponential moving averages fed by the readings
//! it contributes to fusion:
//!
//! ```text
//! accuracy    ← α·(quality + confidence)/2      + (1 − α)·accuracy
//! reliability ← α·max(0.1, 1 − age_min/60)      + (1 − α)·reliability
//! ```
//!
//! A reading is ingested only when it is strictly newer than the last one
//! seen from that provider, so fusing the same batch twice leaves the
//! statistics untouched.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::fusion::{
    FRESHNESS_FLOOR, FRESHNESS_HORIZON_MIN, PERFORMANCE_FACTOR_MAX, PERFORMANCE_FACTOR_MIN,
    PERFORMANCE_PRIOR, PERFORMER_LIST_LEN, SUGGEST_BOOST_ABOVE, SUGGEST_BOOST_CEILING,
    SUGGEST_BOOST_FACTOR, SUGGEST_CUT_BELOW, SUGGEST_CUT_FACTOR, SUGGEST_CUT_FLOOR,
};
use crate::time::{age_ms, ms_to_minutes, Timestamp};
use crate::weights::WeightTable;

/// Running statistics of one provider
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProviderStats {
    /// EMA of (quality + confidence) / 2
    pub accuracy: f64,
    /// EMA of reading freshness
    pub reliability: f64,
    /// Readings ingested
    pub calls: u64,
    /// When the statistics last changed
    pub last_update: Timestamp,
    /// Observation time of the newest ingested reading
    pub last_observed_at: Timestamp,
}

impl Default for ProviderStats {
    fn default() -> Self {
        Self {
            accuracy: PERFORMANCE_PRIOR,
            reliability: PERFORMANCE_PRIOR,
            calls: 0,
            last_update: 0,
            last_observed_at: 0,
        }
    }
}

impl ProviderStats {
    /// Fold in one reading; returns `false` if it was not newer
    pub fn ingest(
        &mut self,
        quality: f64,
        confidence: f64,
        observed_at: Timestamp,
        now: Timestamp,
        alpha: f64,
    ) -> bool {
        if self.calls > 0 && observed_at <= self.last_observed_at {
            return false;
        }

        let freshness =
            (1.0 - ms_to_minutes(age_ms(now, observed_at)) / FRESHNESS_HORIZON_MIN).max(FRESHNESS_FLOOR);
        self.accuracy = alpha * (quality + confidence) / 2.0 + (1.0 - alpha) * self.accuracy;
        self.reliability = alpha * freshness + (1.0 - alpha) * self.reliability;
        self.calls += 1;
        self.last_update = now;
        self.last_observed_at = observed_at;
        true
    }

    /// Mean of accuracy and reliability
    pub fn overall(&self) -> f64 {
        (self.accuracy + self.reliability) / 2.0
    }

    /// Multiplier applied to the provider's effective weight
    pub fn factor(&self) -> f64 {
        (PERFORMANCE_FACTOR_MIN + self.accuracy + self.reliability)
            .clamp(PERFORMANCE_FACTOR_MIN, PERFORMANCE_FACTOR_MAX)
    }
}

/// One provider's line in a performance report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderPerformance {
    /// Provider id
    pub provider: String,
    /// Accuracy EMA
    pub accuracy: f64,
    /// Reliability EMA
    pub reliability: f64,
    /// Mean of the two
    pub overall: f64,
    /// Readings ingested
    pub calls: u64,
    /// Last statistics update
    pub last_update: Timestamp,
}

/// Snapshot of all provider statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    /// Per-provider figures, in provider order
    pub providers: Vec<ProviderPerformance>,
    /// Best providers by overall score, best first
    pub top_performers: Vec<String>,
    /// Worst providers by overall score, worst first
    pub under_performers: Vec<String>,
    /// When the report was generated
    pub generated_at: Timestamp,
}

impl PerformanceReport {
    pub(crate) fn build(stats: &BTreeMap<String, ProviderStats>, now: Timestamp) -> Self {
        let providers: Vec<ProviderPerformance> = stats
            .iter()
            .map(|(provider, s)| ProviderPerformance {
                provider: provider.clone(),
                accuracy: s.accuracy,
                reliability: s.reliability,
                overall: s.overall(),
                calls: s.calls,
                last_update: s.last_update,
            })
            .collect();

        let mut ranked: Vec<&ProviderPerformance> = providers.iter().collect();
        ranked.sort_by(|a, b| b.overall.total_cmp(&a.overall));
        let top_performers = ranked
            .iter()
            .take(PERFORMER_LIST_LEN)
            .map(|p| p.provider.clone())
            .collect();
        let under_performers = ranked
            .iter()
            .rev()
            .take(PERFORMER_LIST_LEN)
            .map(|p| p.provider.clone())
            .collect();

        Self {
            providers,
            top_performers,
            under_performers,
            generated_at: now,
        }
    }
}

/// Suggested weights from performance alone
///
/// Strong providers get a boost, weak ones a cut, the rest keep their
/// weight. Suggestions are not normalized.
pub(crate) fn suggest(
    stats: &BTreeMap<String, ProviderStats>,
    table: &WeightTable,
) -> BTreeMap<String, f64> {
    table
        .iter()
        .map(|(provider, current)| {
            let suggested = match stats.get(provider).map(ProviderStats::overall) {
                Some(overall) if overall > SUGGEST_BOOST_ABOVE => {
                    (current * SUGGEST_BOOST_FACTOR).min(SUGGEST_BOOST_CEILING)
                }
                Some(overall) if overall < SUGGEST_CUT_BELOW => {
                    (current * SUGGEST_CUT_FACTOR).max(SUGGEST_CUT_FLOOR)
                }
                _ => current,
            };
            (provider.to_string(), suggested)
        })
        .collect()
}
