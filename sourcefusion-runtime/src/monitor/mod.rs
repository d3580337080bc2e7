//! Reliability Monitor
//!
//! ## Overview
//!
//! The monitor owns one [`ProviderHealth`] per registered provider and a
//! timer loop that probes every provider each interval. Results are folded
//! into the provider's rolling window, re-classified, and turned into
//! alerts for whoever subscribed with [`ReliabilityMonitor::on_alert`].
//!
//! ```text
//!   interval tick
//!        │
//!        ▼
//!   JoinSet ── provider A ── timeout(check) ──┐
//!          ├── provider B ── timeout(check) ──┼─→ record_check ─→ classify
//!          └── provider C ── timeout(check) ──┘         │
//!                                                       ▼
//!                                        AlertLog (dedup) ─→ handlers
//! ```
//!
//! ## Concurrency
//!
//! - Every check runs as its own task, so one slow provider never delays
//!   the others beyond the per-check timeout.
//! - Each provider has an async gate held from probe start until its result
//!   is applied; two checks of the same provider never interleave.
//! - Window state sits behind a short-lived `parking_lot` lock, so reports
//!   and quality updates are synchronous.
//!
//! ## Failure Semantics
//!
//! A probe that reports `ok: false`, returns an error, panics or runs past
//! the timeout is a failed check. Errors, panics and timeouts also raise a
//! probe-error alert. Nothing a probe or an alert handler does can stop
//! the loop.

pub mod config;
pub mod export;

pub use config::MonitorConfig;
pub use export::MetricsExport;

use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use log::{debug, error, info, warn};
use parking_lot::{Mutex, RwLock};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use sourcefusion_core::constants::monitor::{EXPORT_ALERT_COUNT, RELIABILITY_UNKNOWN, REPORT_ALERT_COUNT};
use sourcefusion_core::health::{
    alerts::{performance_alerts, status_alert},
    Alert, AlertCategory, AlertDraft, AlertLevel, AlertLog, CheckRecord, ProviderHealth, Transition,
};
use sourcefusion_core::{HealthReport, ProviderMetrics, SharedClock, Thresholds};

use crate::errors::{Result, RuntimeError};
use crate::probe::{panic_message, HealthCheck, ProbeError, ProbeOutcome};

/// Callback invoked for every admitted alert
pub type AlertHandler = Arc<dyn Fn(&Alert) + Send + Sync>;

struct Entry {
    check: Arc<dyn HealthCheck>,
    gate: tokio::sync::Mutex<()>,
    health: Mutex<ProviderHealth>,
}

struct Inner {
    config: MonitorConfig,
    clock: SharedClock,
    thresholds: RwLock<Thresholds>,
    providers: RwLock<BTreeMap<String, Arc<Entry>>>,
    alerts: Mutex<AlertLog>,
    handlers: RwLock<Vec<AlertHandler>>,
}

/// Periodic health checking with alerting
///
/// Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct ReliabilityMonitor {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for ReliabilityMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReliabilityMonitor")
            .field("config", &self.inner.config)
            .field("providers", &self.inner.providers.read().len())
            .field("alerts", &self.inner.alerts.lock().len())
            .finish()
    }
}

impl ReliabilityMonitor {
    /// Create a monitor with no providers
    pub fn new(config: MonitorConfig, clock: SharedClock) -> Result<Self> {
        config.validate()?;
        let alerts = AlertLog::new(config.alert_capacity, config.alert_dedup_ms);
        Ok(Self {
            inner: Arc::new(Inner {
                thresholds: RwLock::new(config.thresholds),
                config,
                clock,
                providers: RwLock::new(BTreeMap::new()),
                alerts: Mutex::new(alerts),
                handlers: RwLock::new(Vec::new()),
            }),
        })
    }

    /// Settings the monitor was built with
    pub fn config(&self) -> &MonitorConfig {
        &self.inner.config
    }

    /// Thresholds currently in force
    pub fn thresholds(&self) -> Thresholds {
        *self.inner.thresholds.read()
    }

    /// Start monitoring a provider
    pub fn register(&self, provider: &str, check: Arc<dyn HealthCheck>, critical: bool) -> Result<()> {
        let name = provider.trim();
        if name.is_empty() {
            return Err(RuntimeError::EmptyProviderName);
        }
        let mut providers = self.inner.providers.write();
        if providers.contains_key(name) {
            return Err(RuntimeError::DuplicateProvider(name.to_string()));
        }
        let health = ProviderHealth::new(name, critical, self.inner.clock.now(), self.inner.config.window);
        providers.insert(
            name.to_string(),
            Arc::new(Entry {
                check,
                gate: tokio::sync::Mutex::new(()),
                health: Mutex::new(health),
            }),
        );
        info!("monitoring provider {name} (critical: {critical})");
        Ok(())
    }

    /// Stop monitoring a provider; `false` if it was not registered
    pub fn unregister(&self, provider: &str) -> bool {
        let removed = self.inner.providers.write().remove(provider).is_some();
        if removed {
            info!("stopped monitoring provider {provider}");
        }
        removed
    }

    /// Change whether a provider is business-critical
    pub fn set_critical(&self, provider: &str, critical: bool) -> Result<()> {
        let entry = self.inner.entry(provider)?;
        entry.health.lock().set_critical(critical);
        Ok(())
    }

    /// Registered provider names
    pub fn providers(&self) -> Vec<String> {
        self.inner.providers.read().keys().cloned().collect()
    }

    /// Probe every provider concurrently and apply the results
    pub async fn check_all(&self) -> BTreeMap<String, Transition> {
        let entries: Vec<(String, Arc<Entry>)> = self
            .inner
            .providers
            .read()
            .iter()
            .map(|(name, entry)| (name.clone(), Arc::clone(entry)))
            .collect();

        let mut tasks = JoinSet::new();
        for (name, entry) in entries {
            let inner = Arc::clone(&self.inner);
            tasks.spawn(async move {
                let transition = inner.probe(&name, &entry).await;
                (name, transition)
            });
        }

        let mut transitions = BTreeMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, transition)) => {
                    transitions.insert(name, transition);
                }
                Err(err) => error!("check task failed: {err}"),
            }
        }
        debug!("check cycle finished for {} providers", transitions.len());
        transitions
    }

    /// Update a provider's quality signal; applies from the next check on
    pub fn record_quality(&self, provider: &str, quality: f64) -> bool {
        match self.inner.entry(provider) {
            Ok(entry) => {
                entry.health.lock().record_quality(quality);
                true
            }
            Err(_) => false,
        }
    }

    /// Replace the thresholds and re-classify every provider
    pub fn update_thresholds(&self, thresholds: Thresholds) -> Result<()> {
        thresholds.validate()?;
        *self.inner.thresholds.write() = thresholds;
        info!("health thresholds updated");

        let now = self.inner.clock.now();
        let interval = self.inner.config.check_interval_ms;
        let mut drafts = Vec::new();
        for (name, entry) in self.inner.providers.read().iter() {
            let transition = entry.health.lock().evaluate(now, interval, &thresholds);
            drafts.extend(status_alert(name, transition));
        }
        self.inner.emit(drafts, now);
        Ok(())
    }

    /// Subscribe to admitted alerts; handlers run in registration order
    pub fn on_alert<F>(&self, handler: F)
    where
        F: Fn(&Alert) + Send + Sync + 'static,
    {
        self.inner.handlers.write().push(Arc::new(handler));
    }

    /// Mark an alert as acknowledged; `false` if it is no longer retained
    pub fn acknowledge(&self, alert_id: u64) -> bool {
        self.inner.alerts.lock().acknowledge(alert_id)
    }

    /// Newest `n` alerts, oldest first
    pub fn alerts(&self, n: usize) -> Vec<Alert> {
        self.inner.alerts.lock().recent(n)
    }

    /// Alerts nobody acknowledged yet
    pub fn unacknowledged_alerts(&self) -> Vec<Alert> {
        self.inner.alerts.lock().unacknowledged()
    }

    /// Current metrics of one provider
    pub fn metrics(&self, provider: &str) -> Option<ProviderMetrics> {
        self.inner
            .entry(provider)
            .ok()
            .map(|entry| entry.health.lock().metrics().clone())
    }

    /// Snapshot of every provider plus recent alerts
    pub fn health_report(&self) -> HealthReport {
        HealthReport::new(
            self.inner.snapshot(),
            self.alerts(REPORT_ALERT_COUNT),
            self.inner.clock.now(),
        )
    }

    /// Composite reliability in `[0, 1]`; 0.5 for unknown or unchecked providers
    pub fn reliability_score(&self, provider: &str) -> f64 {
        match self.metrics(provider) {
            Some(m) if m.total_requests > 0 => m.reliability_score(),
            _ => RELIABILITY_UNKNOWN,
        }
    }

    /// Serializable snapshot for external sinks
    pub fn export_metrics(&self) -> MetricsExport {
        let now = self.inner.clock.now();
        let report = HealthReport::new(self.inner.snapshot(), Vec::new(), now);
        MetricsExport {
            generated_at: export::rfc3339(now),
            generated_at_ms: now,
            overall_status: report.overall_status,
            check_interval_ms: self.inner.config.check_interval_ms,
            thresholds: self.thresholds(),
            providers: report.providers,
            alerts: self.alerts(EXPORT_ALERT_COUNT),
        }
    }

    /// Run the check loop until `token` is cancelled
    ///
    /// The first cycle starts immediately. A cycle in flight when the token
    /// fires runs to completion.
    pub async fn run(&self, token: CancellationToken) {
        let mut ticker = tokio::time::interval(self.inner.config.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            "reliability monitor started: {} providers every {:?}",
            self.inner.providers.read().len(),
            self.inner.config.interval()
        );

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    self.check_all().await;
                }
            }
        }
        info!("reliability monitor stopped");
    }

    /// Spawn [`ReliabilityMonitor::run`] on the current runtime
    pub fn spawn(&self, token: CancellationToken) -> JoinHandle<()> {
        let monitor = self.clone();
        tokio::spawn(async move { monitor.run(token).await })
    }
}

impl Inner {
    fn entry(&self, provider: &str) -> Result<Arc<Entry>> {
        self.providers
            .read()
            .get(provider)
            .cloned()
            .ok_or_else(|| RuntimeError::UnknownProvider(provider.to_string()))
    }

    fn snapshot(&self) -> BTreeMap<String, ProviderMetrics> {
        self.providers
            .read()
            .iter()
            .map(|(name, entry)| (name.clone(), entry.health.lock().metrics().clone()))
            .collect()
    }

    async fn probe(&self, name: &str, entry: &Entry) -> Transition {
        let _turn = entry.gate.lock().await;
        let timeout = self.config.timeout();
        let started = Instant::now();

        let check = Arc::clone(&entry.check);
        let mut task = tokio::spawn(async move { check.check().await });
        let result = match tokio::time::timeout(timeout, &mut task).await {
            Ok(Ok(result)) => result,
            Ok(Err(err)) if err.is_panic() => Err(ProbeError::Panicked(panic_message(err.into_panic().as_ref()))),
            Ok(Err(err)) => Err(ProbeError::Failed(err.to_string())),
            Err(_) => {
                task.abort();
                Err(ProbeError::Timeout(timeout))
            }
        };

        let elapsed_ms = started.elapsed().as_secs_f64() * 1_000.0;
        self.apply(name, entry, result, elapsed_ms)
    }

    fn apply(
        &self,
        name: &str,
        entry: &Entry,
        result: std::result::Result<ProbeOutcome, ProbeError>,
        elapsed_ms: f64,
    ) -> Transition {
        let at = self.clock.now();
        let thresholds = *self.thresholds.read();
        let mut probe_alert = None;

        let record = match result {
            Ok(outcome) => {
                let latency = if outcome.latency_ms > 0.0 && outcome.latency_ms.is_finite() {
                    outcome.latency_ms
                } else {
                    elapsed_ms
                };
                let quality = outcome.quality();
                let record = if outcome.ok {
                    CheckRecord::success(at, latency)
                } else {
                    let reason = outcome.error.unwrap_or_else(|| "check reported failure".to_string());
                    warn!("health check for {name} failed: {reason}");
                    CheckRecord::failure(at, latency, reason)
                };
                match quality {
                    Some(q) => record.with_quality(q),
                    None => record,
                }
            }
            Err(err) => {
                let level = match err {
                    ProbeError::Panicked(_) => {
                        error!("health check for {name} panicked: {err}");
                        AlertLevel::Critical
                    }
                    _ => {
                        warn!("health check for {name} failed: {err}");
                        AlertLevel::Warning
                    }
                };
                probe_alert = Some(AlertDraft::new(
                    level,
                    name,
                    AlertCategory::ProbeError,
                    format!("{name}: {err}"),
                ));
                CheckRecord::failure(at, elapsed_ms, err.to_string())
            }
        };

        let (transition, metrics) = {
            let mut health = entry.health.lock();
            let transition = health.record_check(record, self.config.check_interval_ms, &thresholds);
            (transition, health.metrics().clone())
        };
        if transition.changed() {
            info!("{name}: {} -> {}", transition.previous, transition.current);
        }

        let mut drafts: Vec<AlertDraft> = status_alert(name, transition).into_iter().collect();
        drafts.extend(performance_alerts(&metrics, &thresholds));
        drafts.extend(probe_alert);
        self.emit(drafts, at);
        transition
    }

    fn emit(&self, drafts: Vec<AlertDraft>, at: sourcefusion_core::Timestamp) {
        if drafts.is_empty() {
            return;
        }
        let admitted: Vec<Alert> = {
            let mut log = self.alerts.lock();
            drafts.into_iter().filter_map(|d| log.admit(d, at)).collect()
        };
        if admitted.is_empty() {
            return;
        }

        let handlers = self.handlers.read().clone();
        for alert in &admitted {
            debug!("alert #{} [{}] {}", alert.id, alert.level, alert.message);
            for handler in &handlers {
                if let Err(payload) = catch_unwind(AssertUnwindSafe(|| handler(alert))) {
                    warn!(
                        "alert handler panicked on alert #{}: {}",
                        alert.id,
                        panic_message(payload.as_ref())
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{BlockingCheck, FnCheck};
    use sourcefusion_core::time::FixedTime;
    use sourcefusion_core::HealthStatus;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const NOW: u64 = 1_700_000_000_000;

    fn monitor() -> (ReliabilityMonitor, Arc<FixedTime>) {
        let clock = Arc::new(FixedTime::new(NOW));
        let config = MonitorConfig::default().interval_ms(60_000).timeout_ms(1_000);
        let monitor = ReliabilityMonitor::new(config, clock.clone()).unwrap();
        (monitor, clock)
    }

    fn ok_check(latency: f64) -> Arc<dyn HealthCheck> {
        Arc::new(BlockingCheck::new(move || ProbeOutcome::success(latency)))
    }

    #[test]
    fn duplicate_and_blank_names_are_rejected() {
        let (monitor, _) = monitor();
        assert!(monitor.register("sina", ok_check(100.0), false).is_ok());
        assert!(matches!(
            monitor.register("sina", ok_check(100.0), false),
            Err(RuntimeError::DuplicateProvider(_))
        ));
        assert!(matches!(
            monitor.register("  ", ok_check(100.0), false),
            Err(RuntimeError::EmptyProviderName)
        ));
        assert_eq!(monitor.providers(), vec!["sina".to_string()]);
    }

    #[tokio::test]
    async fn successful_check_is_healthy() {
        let (monitor, _) = monitor();
        monitor.register("sina", ok_check(120.0), false).unwrap();
        let transitions = monitor.check_all().await;
        assert_eq!(transitions["sina"].current, HealthStatus::Healthy);

        let metrics = monitor.metrics("sina").expect("no metrics");
        assert_eq!(metrics.total_requests, 1);
        assert!((metrics.avg_response_time_ms - 120.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn errors_and_panics_count_as_failures() {
        let (monitor, _) = monitor();
        let refusing: Arc<dyn HealthCheck> =
            Arc::new(FnCheck::new(|| async { Err(ProbeError::Failed("connection refused".into())) }));
        let panicking: Arc<dyn HealthCheck> =
            Arc::new(BlockingCheck::new(|| -> ProbeOutcome { panic!("boom") }));
        monitor.register("tencent", refusing, false).unwrap();
        monitor.register("xueqiu", panicking, false).unwrap();

        monitor.check_all().await;
        for provider in ["tencent", "xueqiu"] {
            let m = monitor.metrics(provider).expect("no metrics");
            assert_eq!(m.error_count, 1, "{provider}");
            assert!(m.last_error.is_some());
        }
        let categories: Vec<AlertCategory> = monitor.alerts(10).iter().map(|a| a.category).collect();
        assert!(categories.contains(&AlertCategory::ProbeError));
    }

    #[tokio::test]
    async fn quality_extra_updates_signal() {
        let (monitor, _) = monitor();
        let check: Arc<dyn HealthCheck> =
            Arc::new(BlockingCheck::new(|| ProbeOutcome::success(90.0).with_quality(0.6)));
        monitor.register("akshare", check, false).unwrap();
        monitor.check_all().await;
        assert_eq!(monitor.metrics("akshare").and_then(|m| m.quality_score), Some(0.6));

        assert!(monitor.record_quality("akshare", 0.95));
        assert!(!monitor.record_quality("nobody", 0.95));
        assert_eq!(monitor.metrics("akshare").and_then(|m| m.quality_score), Some(0.95));
    }

    #[tokio::test]
    async fn panicking_handler_does_not_stop_delivery() {
        let (monitor, _) = monitor();
        let delivered = Arc::new(AtomicUsize::new(0));
        monitor.on_alert(|_| panic!("handler bug"));
        let counter = delivered.clone();
        monitor.on_alert(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let failing: Arc<dyn HealthCheck> =
            Arc::new(BlockingCheck::new(|| ProbeOutcome::failure(12_000.0, "HTTP 500")));
        monitor.register("sina", failing, false).unwrap();
        monitor.check_all().await;

        assert!(delivered.load(Ordering::SeqCst) > 0);
        let id = monitor.alerts(1).first().map(|a| a.id).unwrap();
        assert!(monitor.acknowledge(id));
        assert!(monitor.unacknowledged_alerts().iter().all(|a| a.id != id));
    }

    #[tokio::test]
    async fn stricter_thresholds_reclassify() {
        let (monitor, _) = monitor();
        monitor.register("sina", ok_check(3_000.0), false).unwrap();
        monitor.check_all().await;
        assert_eq!(monitor.metrics("sina").map(|m| m.status), Some(HealthStatus::Healthy));

        let strict = Thresholds {
            latency_warning_ms: 1_000.0,
            ..Thresholds::default()
        };
        assert!(monitor.update_thresholds(strict).is_ok());
        assert_eq!(monitor.metrics("sina").map(|m| m.status), Some(HealthStatus::Warning));
        assert_eq!(monitor.thresholds().latency_warning_ms, 1_000.0);
    }

    #[test]
    fn unknown_providers_score_neutral() {
        let (monitor, _) = monitor();
        monitor.register("sina", ok_check(100.0), false).unwrap();
        assert_eq!(monitor.reliability_score("sina"), RELIABILITY_UNKNOWN);
        assert_eq!(monitor.reliability_score("nobody"), RELIABILITY_UNKNOWN);
    }

    #[tokio::test]
    async fn export_carries_thresholds_and_alerts() {
        let (monitor, _) = monitor();
        let failing: Arc<dyn HealthCheck> =
            Arc::new(BlockingCheck::new(|| ProbeOutcome::failure(100.0, "HTTP 502")));
        monitor.register("tushare", failing, true).unwrap();
        monitor.check_all().await;

        let export = monitor.export_metrics();
        assert_eq!(export.generated_at_ms, NOW);
        assert!(export.providers.contains_key("tushare"));
        assert!(!export.alerts.is_empty());
        let json = export.to_json().unwrap();
        assert!(json.contains("\"thresholds\""));
    }
}
