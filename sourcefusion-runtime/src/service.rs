//! Fusion Service
//!
//! ## Overview
//!
//! [`FusionService`] wires the components together and is the one type most
//! callers need. Every component is built from [`ServiceConfig`] and shares
//! a single clock:
//!
//! ```text
//!             ┌──────────────┐    quality    ┌──────────────┐
//! readings ──→│   Analyzer   │──────────────→│   Tracker    │──┐
//!             └──────┬───────┘               └──────────────┘  │
//!                    │ scored readings                         │
//!                    ▼                                         ▼
//!             ┌──────────────┐  Arc<WeightTable>  ┌────────────────────┐
//!             │ FusionEngine │←───────────────────│   WeightManager    │
//!             └──────────────┘                    └────────────────────┘
//!                                                          ▲ signals
//!             ┌──────────────┐       HealthReport          │
//!   probes ──→│   Monitor    │─────────────────────────────┘
//!             └──────────────┘
//! ```
//!
//! ## Background Work
//!
//! [`FusionService::start`] spawns two loops: the monitor's check loop and a
//! weight loop that turns the latest health report and quality history into
//! a weight update each weight interval. Both stop when the token passed to
//! `start` is cancelled or [`ServiceHandle::shutdown`] is called.
//!
//! Fusion itself never waits on the loops: `fuse` reads whatever weight
//! table was last published.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use sourcefusion_core::constants::DEFAULT_WEIGHT_INTERVAL_MS;
use sourcefusion_core::fusion::PerformanceReport;
use sourcefusion_core::health::Alert;
use sourcefusion_core::quality::QualitySummary;
use sourcefusion_core::time::system_clock;
use sourcefusion_core::weights::{collect_signals, AdjustmentSummary, PerformanceInput, WeightUpdate};
use sourcefusion_core::{
    ConfigError, FusionConfig, FusionEngine, FusionMethod, FusionResult, HealthReport, MetricType,
    QualityAnalyzer, QualityConfig, QualityScore, QualityTracker, Reading, SharedClock,
    WeightConfig, WeightManager, WeightStrategy, WeightTable,
};

use crate::errors::Result;
use crate::monitor::{MetricsExport, MonitorConfig, ReliabilityMonitor};
use crate::pool::WorkerPool;
use crate::probe::HealthCheck;

/// Settings for every component of the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Quality analyzer and tracker
    pub quality: QualityConfig,
    /// Fusion engine
    pub fusion: FusionConfig,
    /// Reliability monitor
    pub monitor: MonitorConfig,
    /// Weight manager
    pub weights: WeightConfig,
    /// Time between weight updates
    pub weight_interval_ms: u64,
    /// Worker pool size; `None` picks one from the host's parallelism
    pub workers: Option<usize>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            quality: QualityConfig::default(),
            fusion: FusionConfig::default(),
            monitor: MonitorConfig::default(),
            weights: WeightConfig::default(),
            weight_interval_ms: DEFAULT_WEIGHT_INTERVAL_MS,
            workers: None,
        }
    }
}

impl ServiceConfig {
    /// Validate every section
    pub fn validate(&self) -> Result<()> {
        self.quality.validate()?;
        self.fusion.validate()?;
        self.monitor.validate()?;
        self.weights.validate()?;
        if self.weight_interval_ms == 0 {
            return Err(ConfigError::NonPositive {
                field: "weight_interval_ms",
            }
            .into());
        }
        if self.workers == Some(0) {
            return Err(ConfigError::NonPositive { field: "workers" }.into());
        }
        Ok(())
    }
}

struct Inner {
    clock: SharedClock,
    analyzer: QualityAnalyzer,
    tracker: QualityTracker,
    engine: FusionEngine,
    monitor: ReliabilityMonitor,
    weights: WeightManager,
    pool: WorkerPool,
    weight_interval: Duration,
}

impl Inner {
    fn refresh_weights(&self, overrides: &BTreeMap<String, PerformanceInput>) -> Result<WeightUpdate> {
        let report = self.monitor.health_report();
        let signals = collect_signals(Some(&report), Some(&self.tracker), overrides);
        Ok(self.weights.update(&signals)?)
    }
}

/// Quality scoring, fusion, monitoring and weighting behind one handle
///
/// Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct FusionService {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for FusionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FusionService")
            .field("monitor", &self.inner.monitor)
            .field("weights", &self.inner.weights)
            .field("workers", &self.inner.pool.size())
            .finish()
    }
}

impl FusionService {
    /// Build every component from `config` on the given clock
    pub fn new(config: ServiceConfig, clock: SharedClock) -> Result<Self> {
        config.validate()?;
        let (analyzer, tracker) = config.quality.build()?;
        let engine = FusionEngine::try_new(config.fusion, clock.clone())?;
        let monitor = ReliabilityMonitor::new(config.monitor, clock.clone())?;
        let weights = WeightManager::new(config.weights, clock.clone())?;
        let pool = config.workers.map_or_else(WorkerPool::default, WorkerPool::new);

        Ok(Self {
            inner: Arc::new(Inner {
                clock,
                analyzer,
                tracker,
                engine,
                monitor,
                weights,
                pool,
                weight_interval: Duration::from_millis(config.weight_interval_ms),
            }),
        })
    }

    /// Build on the system clock
    pub fn with_system_clock(config: ServiceConfig) -> Result<Self> {
        Self::new(config, system_clock())
    }

    /// Fuse with the current weight table
    pub fn fuse(&self, readings: &[Reading], method: FusionMethod) -> FusionResult {
        let table = self.inner.weights.weights();
        self.inner.engine.fuse(readings, &table, method)
    }

    /// Fuse with an explicit weight table
    pub fn fuse_with(&self, readings: &[Reading], weights: &WeightTable, method: FusionMethod) -> FusionResult {
        self.inner.engine.fuse(readings, weights, method)
    }

    /// Fuse many independent batches on the worker pool, in input order
    ///
    /// Every batch sees the same weight table snapshot.
    pub async fn fuse_many(&self, batches: Vec<Vec<Reading>>, method: FusionMethod) -> Result<Vec<FusionResult>> {
        let table = self.inner.weights.weights();
        let inner = Arc::clone(&self.inner);
        self.inner
            .pool
            .map(batches, move |batch| inner.engine.fuse(&batch, &table, method))
            .await
    }

    /// Score one reading; records nothing
    pub fn analyze_quality(&self, reading: &Reading, metric: MetricType) -> QualityScore {
        self.inner.analyzer.analyze(reading, metric, self.inner.clock.now())
    }

    /// Score, record, then fuse
    ///
    /// Each reading's `quality_score` is replaced by its analyzed overall
    /// score before fusion. Scores go to the quality history and, for
    /// monitored providers, to the monitor's quality signal.
    pub fn ingest(&self, readings: Vec<Reading>, method: FusionMethod) -> FusionResult {
        let now = self.inner.clock.now();
        let scored: Vec<Reading> = readings
            .into_iter()
            .map(|mut reading| {
                let score = self.inner.analyzer.analyze(&reading, reading.metric, now);
                self.inner.tracker.record(&score);
                self.inner.monitor.record_quality(&reading.provider, score.overall);
                reading.quality_score = score.overall;
                reading
            })
            .collect();
        self.fuse(&scored, method)
    }

    /// Monitor a provider and give it a weight
    pub fn register_provider(&self, provider: &str, check: Arc<dyn HealthCheck>, critical: bool) -> Result<()> {
        self.inner.monitor.register(provider, check, critical)?;
        let name = provider.trim();
        if let Err(err) = self.inner.weights.register_provider(name, critical) {
            self.inner.monitor.unregister(name);
            return Err(err.into());
        }
        Ok(())
    }

    /// Current health of every monitored provider
    pub fn health_report(&self) -> HealthReport {
        self.inner.monitor.health_report()
    }

    /// Current weight table
    pub fn weights(&self) -> Arc<WeightTable> {
        self.inner.weights.weights()
    }

    /// Run one weight update now; `overrides` take precedence per field
    pub fn update_weights(&self, overrides: &BTreeMap<String, PerformanceInput>) -> Result<WeightUpdate> {
        self.inner.refresh_weights(overrides)
    }

    /// Replace the weight table; `None` restores the defaults
    ///
    /// Monitored providers stay in the table with their critical flags, so
    /// their health keeps reaching their weight.
    pub fn reset_weights(&self, weights: Option<&BTreeMap<String, f64>>) -> Result<Arc<WeightTable>> {
        let monitor = &self.inner.monitor;
        let monitored: BTreeMap<String, bool> = monitor
            .providers()
            .into_iter()
            .filter_map(|p| monitor.metrics(&p).map(|m| (p, m.critical)))
            .collect();
        Ok(self.inner.weights.reset_weights(weights, &monitored)?)
    }

    /// Switch weighting strategy
    pub fn set_strategy(&self, strategy: WeightStrategy) {
        self.inner.weights.set_strategy(strategy);
    }

    /// Weighting strategy in force
    pub fn strategy(&self) -> WeightStrategy {
        self.inner.weights.strategy()
    }

    /// Subscribe to monitor alerts
    pub fn on_alert<F>(&self, handler: F)
    where
        F: Fn(&Alert) + Send + Sync + 'static,
    {
        self.inner.monitor.on_alert(handler);
    }

    /// Per-provider fusion statistics
    pub fn performance_report(&self) -> PerformanceReport {
        self.inner.engine.performance_report()
    }

    /// Weights the fusion statistics alone would suggest
    pub fn suggested_weights(&self) -> BTreeMap<String, f64> {
        self.inner.engine.suggest_weights(&self.inner.weights.weights())
    }

    /// Quality history aggregates, for one provider or all
    pub fn quality_summary(&self, provider: Option<&str>) -> Vec<QualitySummary> {
        self.inner.tracker.summary(provider)
    }

    /// Weight adjustments since `since`
    pub fn adjustment_summary(&self, since: sourcefusion_core::Timestamp) -> AdjustmentSummary {
        self.inner.weights.adjustment_summary(since)
    }

    /// Serializable monitor snapshot
    pub fn export_metrics(&self) -> MetricsExport {
        self.inner.monitor.export_metrics()
    }

    /// The reliability monitor
    pub fn monitor(&self) -> &ReliabilityMonitor {
        &self.inner.monitor
    }

    /// The weight manager
    pub fn weight_manager(&self) -> &WeightManager {
        &self.inner.weights
    }

    /// Spawn the monitor and weight loops
    ///
    /// The loops stop when `token` (or the handle) is cancelled.
    pub fn start(&self, token: CancellationToken) -> ServiceHandle {
        let token = token.child_token();
        let monitor = self.inner.monitor.spawn(token.clone());

        let inner = Arc::clone(&self.inner);
        let weight_token = token.clone();
        let weights = tokio::spawn(async move { run_weight_loop(inner, weight_token).await });

        info!("fusion service started");
        ServiceHandle {
            token,
            tasks: vec![monitor, weights],
        }
    }
}

/// Weight updates every interval, first one after a full interval so the
/// monitor has a cycle of data
async fn run_weight_loop(inner: Arc<Inner>, token: CancellationToken) {
    let period = inner.weight_interval;
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = ticker.tick() => {
                if let Err(err) = inner.refresh_weights(&BTreeMap::new()) {
                    warn!("weight update failed: {err}");
                }
            }
        }
    }
    info!("weight loop stopped");
}

/// Running background loops of a [`FusionService`]
#[derive(Debug)]
pub struct ServiceHandle {
    token: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl ServiceHandle {
    /// Token that stops the loops
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Whether every loop has exited
    pub fn is_finished(&self) -> bool {
        self.tasks.iter().all(JoinHandle::is_finished)
    }

    /// Stop the loops and wait for in-flight cycles to finish
    pub async fn shutdown(self) {
        self.token.cancel();
        for task in self.tasks {
            if let Err(err) = task.await {
                warn!("background loop ended abnormally: {err}");
            }
        }
        info!("fusion service stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_weight_interval_is_rejected() {
        let config = ServiceConfig {
            weight_interval_ms: 0,
            ..ServiceConfig::default()
        };
        assert!(config.validate().is_err());
        assert!(ServiceConfig::default().validate().is_ok());
    }

    #[test]
    fn config_reads_partial_json() {
        let config: ServiceConfig = serde_json::from_str(
            r#"{"weights": {"strategy": "conservative"}, "monitor": {"check_interval_ms": 60000}}"#,
        )
        .unwrap();
        assert_eq!(config.weights.strategy, WeightStrategy::Conservative);
        assert_eq!(config.monitor.check_interval_ms, 60_000);
        assert_eq!(config.weight_interval_ms, DEFAULT_WEIGHT_INTERVAL_MS);
    }
}
