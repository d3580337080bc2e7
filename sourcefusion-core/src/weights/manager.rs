//! Weight manager
//!
//! Single writer, many readers. Updates are serialized by the state mutex;
//! the table itself sits behind an `RwLock<Arc<_>>` so a reader only holds
//! the lock long enough to clone the `Arc`.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::{debug, info};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use super::signals::{PerformanceInput, ResolvedInput};
use super::strategy::{RiskLevel, WeightStrategy};
use super::table::WeightTable;
use super::WeightConfig;
use crate::buffer::RingBuffer;
use crate::constants::weights::*;
use crate::errors::ConfigResult;
use crate::fusion::stats::sample_stdev;
use crate::time::{SharedClock, Timestamp};

/// One provider weight at one point in time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightSample {
    /// When the table was published
    pub timestamp: Timestamp,
    /// Normalized weight
    pub weight: f64,
    /// Strategy in force
    pub strategy: WeightStrategy,
}

/// An applied adjustment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightAdjustment {
    /// When the adjustment was applied
    pub timestamp: Timestamp,
    /// Provider adjusted
    pub provider: String,
    /// Weight before the cycle
    pub old_weight: f64,
    /// Accepted weight, before renormalization
    pub new_weight: f64,
    /// Why the weight moved
    pub reason: String,
    /// Strategy in force
    pub strategy: WeightStrategy,
    /// Confidence of the adjustment
    pub confidence: f64,
    /// Assessed risk
    pub risk: RiskLevel,
}

/// An adjustment the gate turned down
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedAdjustment {
    /// Provider concerned
    pub provider: String,
    /// Weight kept
    pub old_weight: f64,
    /// Weight proposed
    pub proposed_weight: f64,
    /// Confidence of the proposal
    pub confidence: f64,
    /// Assessed risk
    pub risk: RiskLevel,
}

/// Outcome of one update cycle
#[derive(Debug, Clone)]
pub struct WeightUpdate {
    /// Published table
    pub table: Arc<WeightTable>,
    /// Adjustments applied (changes above the recording threshold)
    pub applied: Vec<WeightAdjustment>,
    /// Adjustments the gate rejected
    pub rejected: Vec<RejectedAdjustment>,
}

/// Adjustment totals for one provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderAdjustments {
    /// Adjustments applied
    pub count: usize,
    /// Σ |Δweight|
    pub total_change: f64,
    /// Mean confidence
    pub avg_confidence: f64,
}

/// Adjustments since a point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentSummary {
    /// Start of the period
    pub since: Timestamp,
    /// Adjustments in the period
    pub total_adjustments: usize,
    /// Distinct providers adjusted
    pub providers_adjusted: usize,
    /// Strategy in force now
    pub strategy: WeightStrategy,
    /// Totals per provider
    pub by_provider: BTreeMap<String, ProviderAdjustments>,
    /// Most recent adjustments, newest first
    pub recent: Vec<WeightAdjustment>,
}

#[derive(Debug)]
struct State {
    strategy: WeightStrategy,
    history: BTreeMap<String, RingBuffer<WeightSample>>,
    adjustments: RingBuffer<WeightAdjustment>,
}

impl State {
    /// `max(0.3, 1 − 5·stdev)` over the last 20 weights; 0.8 with < 3 samples
    fn stability(&self, provider: &str) -> f64 {
        let Some(history) = self.history.get(provider) else {
            return STABILITY_DEFAULT;
        };
        let recent: Vec<f64> = history.recent(STABILITY_WINDOW).map(|s| s.weight).collect();
        if recent.len() < STABILITY_MIN_SAMPLES {
            return STABILITY_DEFAULT;
        }
        (1.0 - STABILITY_SENSITIVITY * sample_stdev(&recent)).max(STABILITY_FLOOR)
    }
}

/// Adapts provider weights to their observed performance
pub struct WeightManager {
    config: WeightConfig,
    clock: SharedClock,
    table: RwLock<Arc<WeightTable>>,
    state: Mutex<State>,
}

impl std::fmt::Debug for WeightManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeightManager")
            .field("config", &self.config)
            .field("version", &self.table.read().version())
            .finish()
    }
}

impl WeightManager {
    /// Manager starting from the configured default weights
    pub fn new(config: WeightConfig, clock: SharedClock) -> ConfigResult<Self> {
        config.validate()?;
        let table = WeightTable::normalized(&config.default_weights, &config.critical, config.bounds, clock.now())?;
        info!(
            "weight manager ready: {} providers, {} strategy",
            table.len(),
            config.strategy
        );
        Ok(Self {
            state: Mutex::new(State {
                strategy: config.strategy,
                history: BTreeMap::new(),
                adjustments: RingBuffer::new(config.adjustment_capacity),
            }),
            table: RwLock::new(Arc::new(table)),
            config,
            clock,
        })
    }

    /// Settings in force
    pub fn config(&self) -> &WeightConfig {
        &self.config
    }

    /// Current table
    pub fn weights(&self) -> Arc<WeightTable> {
        self.table.read().clone()
    }

    /// Current strategy
    pub fn strategy(&self) -> WeightStrategy {
        self.state.lock().strategy
    }

    /// Switch strategy for future cycles
    pub fn set_strategy(&self, strategy: WeightStrategy) {
        let mut state = self.state.lock();
        if state.strategy != strategy {
            info!("weight strategy {} -> {}", state.strategy, strategy);
            state.strategy = strategy;
        }
    }

    /// Run one adjustment cycle and publish the result
    ///
    /// Providers in the table without signals are scored from defaults.
    /// Signals for providers not in the table are ignored; register them
    /// first.
    pub fn update(&self, signals: &BTreeMap<String, PerformanceInput>) -> ConfigResult<WeightUpdate> {
        let mut state = self.state.lock();
        let current = self.weights();
        let now = self.clock.now();
        let strategy = state.strategy;
        let params = strategy.params();
        let bounds = current.bounds();

        for provider in signals.keys().filter(|p| !current.contains(p)) {
            debug!("ignoring signals for unregistered provider {provider}");
        }

        let mut raw = BTreeMap::new();
        let mut applied = Vec::new();
        let mut rejected = Vec::new();

        for (provider, old) in current.iter() {
            let input = signals.get(provider).map(PerformanceInput::resolve).unwrap_or_default();
            let performance = input.performance_score();
            let stability = state.stability(provider);
            let target = performance * TARGET_SCALE * stability;
            let rate = strategy.learning_rate(performance, stability);
            let step = ((target - old) * rate).clamp(-params.max_adjustment, params.max_adjustment);
            let proposed = (old + step).clamp(bounds.min, bounds.max);

            let confidence = input.confidence();
            let risk = RiskLevel::assess(old, proposed);

            let weight = if strategy.accepts(confidence, risk) {
                if (proposed - old).abs() > RECORD_CHANGE_MIN {
                    applied.push(WeightAdjustment {
                        timestamp: now,
                        provider: provider.to_string(),
                        old_weight: old,
                        new_weight: proposed,
                        reason: reason(old, proposed, &input),
                        strategy,
                        confidence,
                        risk,
                    });
                }
                proposed
            } else {
                info!(
                    "skipping {provider} adjustment {old:.3} -> {proposed:.3}: {risk} risk, confidence {confidence:.2}"
                );
                rejected.push(RejectedAdjustment {
                    provider: provider.to_string(),
                    old_weight: old,
                    proposed_weight: proposed,
                    confidence,
                    risk,
                });
                old
            };
            raw.insert(provider.to_string(), bounds.clamp(weight, current.is_critical(provider)));
        }

        let next = Arc::new(current.successor(&raw, now)?);
        log_changes(&current, &next);

        for (provider, weight) in next.iter() {
            state
                .history
                .entry(provider.to_string())
                .or_insert_with(|| RingBuffer::new(self.config.history_capacity))
                .push(WeightSample {
                    timestamp: now,
                    weight,
                    strategy,
                });
        }
        for adjustment in &applied {
            state.adjustments.push(adjustment.clone());
        }

        *self.table.write() = next.clone();
        Ok(WeightUpdate {
            table: next,
            applied,
            rejected,
        })
    }

    /// Add a provider at the new-provider weight, or change its critical flag
    pub fn register_provider(&self, provider: &str, critical: bool) -> ConfigResult<Arc<WeightTable>> {
        let _state = self.state.lock();
        let current = self.weights();
        let now = self.clock.now();
        let next = if current.contains(provider) {
            if current.is_critical(provider) == critical {
                return Ok(current);
            }
            current.with_critical(provider, critical, now)?
        } else {
            info!("registering provider {provider} (critical: {critical})");
            current.with_entry(provider, NEW_PROVIDER_WEIGHT, critical, now)?
        };
        let next = Arc::new(next);
        *self.table.write() = next.clone();
        Ok(next)
    }

    /// Replace the table and clear all history
    ///
    /// `None` restores the configured defaults. Providers in `keep` (name to
    /// critical flag) stay in the table; other critical flags carry over for
    /// providers still present.
    pub fn reset_weights(
        &self,
        weights: Option<&BTreeMap<String, f64>>,
        keep: &BTreeMap<String, bool>,
    ) -> ConfigResult<Arc<WeightTable>> {
        let mut state = self.state.lock();
        let current = self.weights();
        let raw = weights.unwrap_or(&self.config.default_weights);
        let next = Arc::new(current.rebased(raw, keep, self.clock.now())?);

        state.history.clear();
        state.adjustments.clear();
        *self.table.write() = next.clone();
        match weights {
            Some(_) => info!("weights reset to {} given values", next.len()),
            None => info!("weights reset to defaults"),
        }
        Ok(next)
    }

    /// Weight samples since `since`, for one provider or all of them
    pub fn weight_history(&self, provider: Option<&str>, since: Timestamp) -> BTreeMap<String, Vec<WeightSample>> {
        let state = self.state.lock();
        state
            .history
            .iter()
            .filter(|(p, _)| provider.map_or(true, |wanted| p.as_str() == wanted))
            .map(|(p, samples)| {
                let recent: Vec<WeightSample> = samples.iter().filter(|s| s.timestamp >= since).copied().collect();
                (p.clone(), recent)
            })
            .filter(|(_, samples)| !samples.is_empty())
            .collect()
    }

    /// Stability factor the next cycle would use for a provider
    pub fn stability(&self, provider: &str) -> f64 {
        self.state.lock().stability(provider)
    }

    /// Totals and the latest adjustments since `since`
    pub fn adjustment_summary(&self, since: Timestamp) -> AdjustmentSummary {
        let state = self.state.lock();
        let adjustments: Vec<&WeightAdjustment> = state.adjustments.iter().filter(|a| a.timestamp >= since).collect();

        let mut by_provider: BTreeMap<String, ProviderAdjustments> = BTreeMap::new();
        for a in &adjustments {
            let entry = by_provider.entry(a.provider.clone()).or_default();
            entry.count += 1;
            entry.total_change += (a.new_weight - a.old_weight).abs();
            entry.avg_confidence += a.confidence;
        }
        for entry in by_provider.values_mut() {
            entry.avg_confidence /= entry.count as f64;
        }

        AdjustmentSummary {
            since,
            total_adjustments: adjustments.len(),
            providers_adjusted: by_provider.len(),
            strategy: state.strategy,
            by_provider,
            recent: adjustments.iter().rev().take(SUMMARY_RECENT_COUNT).map(|a| (*a).clone()).collect(),
        }
    }
}

/// Human-readable reason for a change
fn reason(old: f64, new: f64, input: &ResolvedInput) -> String {
    let change_pct = if old > 0.0 { (new - old) / old * 100.0 } else { 0.0 };
    if change_pct.abs() < REASON_STABLE_PCT {
        return "weight stable, performance steady".to_string();
    }

    let mut reasons = Vec::new();
    if new > old {
        if input.reliability_score > 0.8 {
            reasons.push("excellent reliability");
        }
        if input.success_rate > 0.9 {
            reasons.push("high success rate");
        }
        if input.response_time_ms < 1_000.0 {
            reasons.push("fast responses");
        }
        if input.data_quality > 0.8 {
            reasons.push("high data quality");
        }
    } else {
        if input.reliability_score < 0.5 {
            reasons.push("low reliability");
        }
        if input.success_rate < 0.8 {
            reasons.push("success rate needs improvement");
        }
        if input.response_time_ms > 5_000.0 {
            reasons.push("slow responses");
        }
        if input.error_count > 10 {
            reasons.push("frequent errors");
        }
    }

    if reasons.is_empty() {
        format!("performance-based adjustment ({change_pct:+.1}%)")
    } else {
        reasons.join("; ")
    }
}

fn log_changes(old: &WeightTable, new: &WeightTable) {
    let changes: Vec<String> = new
        .iter()
        .filter_map(|(provider, w)| {
            let before = old.get(provider)?;
            if (w - before).abs() <= LOG_CHANGE_MIN {
                return None;
            }
            let pct = if before > 0.0 { (w - before) / before * 100.0 } else { 0.0 };
            Some(format!("{provider}: {pct:+.1}%"))
        })
        .collect();
    if changes.is_empty() {
        info!("weights v{} unchanged", new.version());
    } else {
        info!("weights v{}: {}", new.version(), changes.join(", "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::FixedTime;
    use crate::weights::is_normalized;

    fn manager(strategy: WeightStrategy) -> (WeightManager, Arc<FixedTime>) {
        let clock = Arc::new(FixedTime::new(1_000));
        let config = WeightConfig {
            strategy,
            ..WeightConfig::default()
        };
        let manager = WeightManager::new(config, clock.clone()).unwrap();
        (manager, clock)
    }

    fn strong() -> PerformanceInput {
        PerformanceInput {
            reliability_score: Some(0.95),
            response_time_ms: Some(200.0),
            success_rate: Some(1.0),
            uptime: Some(1.0),
            data_quality: Some(0.9),
            error_count: Some(0),
            total_requests: Some(500),
            status_score: Some(1.0),
        }
    }

    fn weak() -> PerformanceInput {
        PerformanceInput {
            reliability_score: Some(0.2),
            response_time_ms: Some(9_000.0),
            success_rate: Some(0.3),
            uptime: Some(0.4),
            data_quality: Some(0.3),
            error_count: Some(40),
            total_requests: Some(500),
            status_score: Some(0.3),
        }
    }

    #[test]
    fn update_bumps_version_and_stays_normalized() {
        let (m, _) = manager(WeightStrategy::Balanced);
        let before = m.weights();
        let update = m.update(&BTreeMap::new()).unwrap();
        assert_eq!(update.table.version(), before.version() + 1);
        assert!(is_normalized(&update.table));
        assert!(Arc::ptr_eq(&update.table, &m.weights()));
    }

    #[test]
    fn degraded_provider_loses_weight() {
        let (m, clock) = manager(WeightStrategy::Aggressive);
        let mut signals = BTreeMap::new();
        for p in ["eastmoney", "tencent", "sina", "xueqiu", "tushare", "akshare"] {
            signals.insert(p.to_string(), strong());
        }
        signals.insert("eastmoney".to_string(), weak());

        let before = m.weights().get("eastmoney").unwrap();
        for _ in 0..5 {
            clock.advance(60_000);
            let _ = m.update(&signals);
        }
        let after = m.weights().get("eastmoney").unwrap();
        assert!(after < before, "{after} >= {before}");
        assert!(m.weights().get("eastmoney") < m.weights().get("tencent"));
    }

    #[test]
    fn low_confidence_is_rejected() {
        let (m, _) = manager(WeightStrategy::Conservative);
        let thin = PerformanceInput {
            total_requests: Some(0),
            ..strong()
        };
        let mut signals = BTreeMap::new();
        signals.insert("sina".to_string(), thin);
        let update = m.update(&signals).unwrap();
        assert!(update.rejected.iter().any(|r| r.provider == "sina"));
        assert!(update.applied.iter().all(|a| a.provider != "sina"));
    }

    #[test]
    fn history_feeds_stability_and_summary() {
        let (m, clock) = manager(WeightStrategy::Aggressive);
        assert_eq!(m.stability("sina"), STABILITY_DEFAULT);
        let mut signals = BTreeMap::new();
        signals.insert("sina".to_string(), strong());
        for _ in 0..4 {
            clock.advance(1_000);
            let _ = m.update(&signals);
        }
        let history = m.weight_history(Some("sina"), 0);
        assert_eq!(history.get("sina").map(Vec::len), Some(4));
        assert!(m.stability("sina") <= 1.0 && m.stability("sina") >= STABILITY_FLOOR);
        assert!(m.weight_history(None, u64::MAX).is_empty());

        let summary = m.adjustment_summary(0);
        assert_eq!(summary.strategy, WeightStrategy::Aggressive);
        assert!(summary.recent.len() <= SUMMARY_RECENT_COUNT);
        assert_eq!(summary.total_adjustments, summary.by_provider.values().map(|p| p.count).sum::<usize>());
    }

    #[test]
    fn register_and_reset() {
        let (m, _) = manager(WeightStrategy::Balanced);
        let table = m.register_provider("baostock", true).unwrap();
        assert_eq!(table.len(), 7);
        assert!(table.is_critical("baostock"));
        assert!(is_normalized(&table));

        // registering again with the same flag is a no-op
        let again = m.register_provider("baostock", true).unwrap();
        assert_eq!(again.version(), table.version());

        let _ = m.update(&BTreeMap::new());
        let reset = m.reset_weights(None, &BTreeMap::new()).unwrap();
        assert_eq!(reset.len(), 6);
        assert!(reset.version() > table.version());
        assert!(m.weight_history(None, 0).is_empty());
        assert_eq!(m.adjustment_summary(0).total_adjustments, 0);

        let zeros: BTreeMap<String, f64> = [("a".to_string(), 0.0)].into_iter().collect();
        assert!(m.reset_weights(Some(&zeros), &BTreeMap::new()).is_err());
        assert_eq!(m.weights().version(), reset.version());
    }

    #[test]
    fn reset_keeps_listed_providers() {
        let (m, _) = manager(WeightStrategy::Balanced);
        m.register_provider("baostock", true).unwrap();
        let keep: BTreeMap<String, bool> = [("baostock".to_string(), true), ("sina".to_string(), true)]
            .into_iter()
            .collect();

        let reset = m.reset_weights(None, &keep).unwrap();
        assert_eq!(reset.len(), 7);
        assert!(reset.is_critical("baostock"));
        assert!(reset.is_critical("sina"));
        assert!(reset.get("baostock").unwrap() >= CRITICAL_MIN_WEIGHT - 1e-12);
        assert!(is_normalized(&reset));

        // kept providers do not rescue an all-zero map
        let zeros: BTreeMap<String, f64> = [("a".to_string(), 0.0)].into_iter().collect();
        assert!(m.reset_weights(Some(&zeros), &keep).is_err());
    }

    #[test]
    fn strategy_switch() {
        let (m, _) = manager(WeightStrategy::Balanced);
        m.set_strategy(WeightStrategy::Adaptive);
        assert_eq!(m.strategy(), WeightStrategy::Adaptive);
    }

    #[test]
    fn reasons_describe_direction() {
        let good = strong().resolve();
        assert!(reason(0.1, 0.2, &good).contains("high success rate"));
        let bad = weak().resolve();
        assert!(reason(0.2, 0.1, &bad).contains("frequent errors"));
        assert_eq!(reason(0.2, 0.201, &good), "weight stable, performance steady");
    }
}
