//! Fusion engine

use std::collections::BTreeMap;

use log::debug;
use parking_lot::Mutex;

use super::methods::{combine, FusionMethod};
use super::performance::{suggest, PerformanceReport, ProviderStats};
use super::stats::{mean, normalize_or_equal, sample_stdev};
use super::{Candidate, FusedValue, FusionConfig, FusionResult};
use crate::constants::fusion::{
    CONSISTENCY_BONUS_BANDS, DEFAULT_SIGNAL, DIVERSITY_BONUS_CAP, DIVERSITY_BONUS_PER_SOURCE,
    NEAR_ZERO_MEAN, NEAR_ZERO_MEAN_BONUS,
};
use crate::errors::ConfigResult;
use crate::reading::Reading;
use crate::time::{age_ms, ms_to_secs, SharedClock, Timestamp};
use crate::weights::WeightTable;

/// Reason reported when no reading survives validation
pub const NO_VALID_READINGS: &str = "no valid readings";

/// Combines readings from several providers into one value
///
/// `fuse` is synchronous and safe to call from many threads; the only
/// shared state is the per-provider statistics, locked briefly.
pub struct FusionEngine {
    config: FusionConfig,
    clock: SharedClock,
    stats: Mutex<BTreeMap<String, ProviderStats>>,
}

impl std::fmt::Debug for FusionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FusionEngine")
            .field("config", &self.config)
            .field("providers", &self.stats.lock().len())
            .finish()
    }
}

impl FusionEngine {
    /// Create an engine with default-validated config
    ///
    /// Invalid settings are replaced by defaults; use [`FusionEngine::try_new`]
    /// to surface them instead.
    pub fn new(config: FusionConfig, clock: SharedClock) -> Self {
        let config = match config.validate() {
            Ok(()) => config,
            Err(err) => {
                log::warn!("invalid fusion config ({err}), using defaults");
                FusionConfig::default()
            }
        };
        Self {
            config,
            clock,
            stats: Mutex::new(BTreeMap::new()),
        }
    }

    /// Create an engine, rejecting invalid settings
    pub fn try_new(config: FusionConfig, clock: SharedClock) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self::new(config, clock))
    }

    /// Settings in use
    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    /// Fuse readings of one metric
    pub fn fuse(&self, readings: &[Reading], weights: &WeightTable, method: FusionMethod) -> FusionResult {
        let now = self.clock.now();
        let candidates = self.validate(readings, now);

        if candidates.is_empty() {
            return FusionResult::Empty {
                reason: NO_VALID_READINGS.to_string(),
                timestamp: now,
                input_count: readings.len(),
            };
        }

        let factors = self.update_stats(&candidates, now);
        let effective = self.effective_weights(&candidates, &factors, weights);
        let combined = combine(method, &candidates, &effective);

        let confidence: f64 = candidates
            .iter()
            .zip(&combined.weights)
            .map(|(c, w)| c.confidence * w)
            .sum();
        let blended_quality: f64 = candidates
            .iter()
            .zip(&combined.weights)
            .map(|(c, w)| c.quality * w)
            .sum();
        let values: Vec<f64> = candidates.iter().map(|c| c.value).collect();
        let quality = blended_quality + diversity_bonus(candidates.len()) + consistency_bonus(&values);

        FusionResult::Fused(FusedValue {
            value: combined.value,
            confidence: confidence.clamp(0.0, 1.0),
            quality: quality.clamp(0.0, 1.0),
            contributing_providers: candidates.iter().map(|c| c.provider.clone()).collect(),
            source_weights: candidates
                .iter()
                .map(|c| c.provider.clone())
                .zip(combined.weights.iter().copied())
                .collect(),
            method: combined.method,
            requested_method: method,
            timestamp: now,
            input_count: readings.len(),
            valid_count: candidates.len(),
        })
    }

    /// Drop unusable readings and keep the newest one per provider
    fn validate(&self, readings: &[Reading], now: Timestamp) -> Vec<Candidate> {
        let mut newest: BTreeMap<&str, Candidate> = BTreeMap::new();

        for reading in readings {
            let provider = reading.provider.trim();
            if provider.is_empty() {
                debug!("dropping reading without provider");
                continue;
            }
            let Some(value) = reading.numeric() else {
                debug!("dropping {provider}: no numeric value");
                continue;
            };
            if reading.observed_at > now.saturating_add(self.config.future_skew_ms) {
                debug!("dropping {provider}: observed {} ms in the future", reading.observed_at - now);
                continue;
            }
            if age_ms(now, reading.observed_at) > self.config.staleness_ms {
                debug!("dropping {provider}: stale by {} ms", age_ms(now, reading.observed_at));
                continue;
            }

            let candidate = Candidate {
                provider: provider.to_string(),
                value,
                quality: unit_or_default(reading.quality_score),
                confidence: unit_or_default(reading.confidence),
                latency_ms: if reading.latency_ms.is_finite() {
                    reading.latency_ms.max(0.0)
                } else {
                    0.0
                },
                observed_at: reading.observed_at,
            };

            match newest.get(provider) {
                Some(kept) if kept.observed_at > candidate.observed_at => {
                    debug!("dropping older duplicate from {provider}");
                }
                _ => {
                    newest.insert(provider, candidate);
                }
            }
        }

        newest.into_values().collect()
    }

    /// Ingest candidates into the statistics; returns each one's factor
    fn update_stats(&self, candidates: &[Candidate], now: Timestamp) -> Vec<f64> {
        let mut stats = self.stats.lock();
        candidates
            .iter()
            .map(|c| {
                let entry = stats.entry(c.provider.clone()).or_default();
                entry.ingest(c.quality, c.confidence, c.observed_at, now, self.config.ema_alpha);
                entry.factor()
            })
            .collect()
    }

    fn effective_weights(&self, candidates: &[Candidate], factors: &[f64], table: &WeightTable) -> Vec<f64> {
        let raw: Vec<f64> = candidates
            .iter()
            .zip(factors)
            .map(|(c, factor)| {
                let base = table.get(&c.provider).unwrap_or(self.config.default_base_weight);
                base * c.quality * c.quality * c.confidence / (1.0 + ms_to_secs(c.latency_ms)) * factor
            })
            .collect();
        normalize_or_equal(&raw)
    }

    /// Statistics of one provider
    pub fn provider_stats(&self, provider: &str) -> Option<ProviderStats> {
        self.stats.lock().get(provider).copied()
    }

    /// Per-provider performance with top and bottom performers
    pub fn performance_report(&self) -> PerformanceReport {
        let stats = self.stats.lock().clone();
        PerformanceReport::build(&stats, self.clock.now())
    }

    /// Weight suggestions derived from performance alone
    pub fn suggest_weights(&self, table: &WeightTable) -> BTreeMap<String, f64> {
        let stats = self.stats.lock();
        suggest(&stats, table)
    }
}

fn unit_or_default(value: f64) -> f64 {
    if (0.0..=1.0).contains(&value) {
        value
    } else {
        DEFAULT_SIGNAL
    }
}

fn diversity_bonus(providers: usize) -> f64 {
    (DIVERSITY_BONUS_PER_SOURCE * providers as f64).min(DIVERSITY_BONUS_CAP)
}

/// Bonus for providers that agree closely
fn consistency_bonus(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let Some(mu) = mean(values) else {
        return 0.0;
    };
    if mu.abs() < NEAR_ZERO_MEAN {
        return NEAR_ZERO_MEAN_BONUS;
    }
    let cv = sample_stdev(values) / mu.abs();
    CONSISTENCY_BONUS_BANDS
        .iter()
        .find(|(below, _)| cv < *below)
        .map_or(0.0, |(_, bonus)| *bonus)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{MS_PER_HOUR, MS_PER_SECOND};
    use crate::reading::{Article, MetricType, Payload};
    use crate::time::FixedTime;
    use std::sync::Arc;

    const NOW: Timestamp = 1_700_000_000_000;

    fn engine() -> FusionEngine {
        FusionEngine::new(FusionConfig::default(), Arc::new(FixedTime::new(NOW)))
    }

    fn reading(provider: &str, value: f64) -> Reading {
        Reading::price(provider, value, NOW - MS_PER_SECOND)
            .with_quality(0.9)
            .with_confidence(0.9)
    }

    fn sum(weights: &BTreeMap<String, f64>) -> f64 {
        weights.values().sum()
    }

    #[test]
    fn empty_input_gives_sentinel() {
        let result = engine().fuse(&[], &WeightTable::default(), FusionMethod::Adaptive);
        match result {
            FusionResult::Empty { reason, input_count, timestamp } => {
                assert_eq!(reason, NO_VALID_READINGS);
                assert_eq!(input_count, 0);
                assert_eq!(timestamp, NOW);
            }
            other => panic!("expected empty, got {other:?}"),
        }
    }

    #[test]
    fn invalid_readings_are_dropped() {
        let readings = vec![
            reading("", 10.0),
            Reading::new("sina", MetricType::News, Payload::Article(Article::default()), NOW),
            reading("stale", 10.0).tap_time(NOW - 2 * MS_PER_HOUR),
            reading("future", 10.0).tap_time(NOW + 60 * MS_PER_SECOND),
            reading("eastmoney", 10.0),
        ];
        let result = engine().fuse(&readings, &WeightTable::default(), FusionMethod::Adaptive);
        let fused = result.fused().cloned().expect("expected a value");
        assert_eq!(fused.valid_count, 1);
        assert_eq!(fused.input_count, 5);
        assert_eq!(fused.contributing_providers, vec!["eastmoney"]);
        assert_eq!(fused.value, 10.0);
        assert_eq!(fused.method, FusionMethod::WeightedAverage);
    }

    #[test]
    fn small_future_skew_is_tolerated() {
        let readings = vec![reading("sina", 10.0).tap_time(NOW + 2 * MS_PER_SECOND)];
        assert!(engine().fuse(&readings, &WeightTable::default(), FusionMethod::Median).is_fused());
    }

    #[test]
    fn all_dropped_is_empty() {
        let readings = vec![reading("stale", 10.0).tap_time(0)];
        let result = engine().fuse(&readings, &WeightTable::default(), FusionMethod::Adaptive);
        assert!(matches!(result, FusionResult::Empty { input_count: 1, .. }));
    }

    #[test]
    fn duplicate_provider_keeps_newest() {
        let readings = vec![
            reading("sina", 10.0).tap_time(NOW - 5 * MS_PER_SECOND),
            reading("sina", 12.0).tap_time(NOW - MS_PER_SECOND),
        ];
        let fused = engine()
            .fuse(&readings, &WeightTable::default(), FusionMethod::WeightedAverage)
            .value();
        assert_eq!(fused, Some(12.0));
    }

    #[test]
    fn out_of_range_signals_reset() {
        let readings = vec![reading("sina", 10.0).with_quality(3.0).with_confidence(f64::NAN)];
        let fused = engine().fuse(&readings, &WeightTable::default(), FusionMethod::WeightedAverage);
        let fused = fused.fused().cloned().expect("expected a value");
        // 0.5 blended plus the single-source diversity bonus
        assert!((fused.quality - (0.5 + DIVERSITY_BONUS_PER_SOURCE)).abs() < 1e-12);
        assert!((fused.confidence - 0.5).abs() < 1e-12);
    }

    #[test]
    fn source_weights_sum_to_one_for_every_method() {
        let readings = vec![
            reading("eastmoney", 10.0),
            reading("tencent", 10.5).with_quality(0.6),
            reading("newcomer", 11.0).with_confidence(0.3),
        ];
        for method in [
            FusionMethod::WeightedAverage,
            FusionMethod::Median,
            FusionMethod::ConfidenceWeighted,
            FusionMethod::QualityWeighted,
            FusionMethod::Adaptive,
        ] {
            let result = engine().fuse(&readings, &WeightTable::default(), method);
            let fused = result.fused().cloned().expect("expected a value");
            assert!((sum(&fused.source_weights) - 1.0).abs() < 1e-6, "{method}");
            assert!(fused.value >= 10.0 && fused.value <= 11.0, "{method}");
            assert_eq!(fused.requested_method, method);
        }
    }

    #[test]
    fn fusing_twice_is_idempotent() {
        let engine = engine();
        let readings = vec![reading("eastmoney", 10.0), reading("sina", 10.2)];
        let first = engine.fuse(&readings, &WeightTable::default(), FusionMethod::Adaptive);
        let second = engine.fuse(&readings, &WeightTable::default(), FusionMethod::Adaptive);
        assert_eq!(first, second);
        assert_eq!(engine.provider_stats("sina").map(|s| s.calls), Some(1));
    }

    #[test]
    fn latency_lowers_effective_weight() {
        let readings = vec![
            reading("eastmoney", 10.0).with_latency(0.0),
            reading("tencent", 10.0).with_latency(9_000.0),
        ];
        let equal = WeightTable::normalized(
            &[("eastmoney".to_string(), 1.0), ("tencent".to_string(), 1.0)]
                .into_iter()
                .collect(),
            &Default::default(),
            Default::default(),
            0,
        )
        .unwrap();
        let fused = engine().fuse(&readings, &equal, FusionMethod::WeightedAverage);
        let weights = fused.fused().map(|f| f.source_weights.clone()).unwrap();
        assert!((weights["eastmoney"] / weights["tencent"] - 10.0).abs() < 1e-9);
    }

    #[test]
    fn consistency_bonus_bands() {
        assert_eq!(consistency_bonus(&[10.0]), 0.0);
        assert_eq!(consistency_bonus(&[10.0, 10.01]), 0.1);
        assert_eq!(consistency_bonus(&[10.0, 10.5]), 0.05);
        assert_eq!(consistency_bonus(&[10.0, 11.2]), 0.02);
        assert_eq!(consistency_bonus(&[10.0, 20.0]), 0.0);
        assert_eq!(consistency_bonus(&[-1e-8, 1e-8]), NEAR_ZERO_MEAN_BONUS);
    }

    #[test]
    fn report_covers_fused_providers() {
        let engine = engine();
        engine.fuse(
            &[reading("eastmoney", 10.0), reading("sina", 10.1)],
            &WeightTable::default(),
            FusionMethod::Adaptive,
        );
        let report = engine.performance_report();
        assert_eq!(report.providers.len(), 2);
        assert_eq!(report.generated_at, NOW);
        assert!(engine.provider_stats("sina").is_some());
        assert!(engine.provider_stats("tencent").is_none());
    }

    trait TapTime {
        fn tap_time(self, at: Timestamp) -> Self;
    }

    impl TapTime for Reading {
        fn tap_time(mut self, at: Timestamp) -> Self {
            self.observed_at = at;
            self
        }
    }
}
