//! Shared fixtures for runtime integration tests
//!
//! - Scripted health checks whose outcome depends on the call number
//! - Service and monitor constructors on a [`TokioClock`], so paused
//!   runtime time drives every time-dependent rule

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sourcefusion_core::{Reading, Timestamp};
use sourcefusion_runtime::{
    FnCheck, FusionService, HealthCheck, MonitorConfig, ProbeError, ProbeOutcome, ReliabilityMonitor,
    ServiceConfig, TokioClock,
};

pub const NOW: Timestamp = 1_700_000_000_000;

/// One check cycle
pub const INTERVAL: Duration = Duration::from_secs(60);

/// Check counting its calls; `script(n)` decides the outcome of call `n`
pub struct ScriptedCheck {
    pub calls: Arc<AtomicUsize>,
    pub check: Arc<dyn HealthCheck>,
}

impl ScriptedCheck {
    pub fn new<F>(script: F) -> Self
    where
        F: Fn(usize) -> Result<ProbeOutcome, ProbeError> + Send + Sync + 'static,
    {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let script = Arc::new(script);
        let check: Arc<dyn HealthCheck> = Arc::new(FnCheck::new(move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            let script = script.clone();
            async move { script(n) }
        }));
        Self { calls, check }
    }

    pub fn healthy(latency_ms: f64) -> Self {
        Self::new(move |_| Ok(ProbeOutcome::success(latency_ms)))
    }

    pub fn failing(reason: &'static str) -> Self {
        Self::new(move |_| Ok(ProbeOutcome::failure(250.0, reason)))
    }

    /// Succeeds for the first `n` calls, then fails
    pub fn degrading(n: usize) -> Self {
        Self::new(move |i| {
            if i < n {
                Ok(ProbeOutcome::success(120.0))
            } else {
                Err(ProbeError::Failed("connection reset".into()))
            }
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub fn monitor_config() -> MonitorConfig {
    MonitorConfig::default()
        .interval_ms(INTERVAL.as_millis() as u64)
        .timeout_ms(5_000)
}

/// Monitor on a tokio-driven clock; call inside a runtime
pub fn monitor() -> ReliabilityMonitor {
    ReliabilityMonitor::new(monitor_config(), Arc::new(TokioClock::new(NOW)))
        .expect("monitor")
}

/// Service checking and re-weighting every minute; call inside a runtime
pub fn service(config: ServiceConfig) -> FusionService {
    FusionService::new(config, Arc::new(TokioClock::new(NOW))).expect("service")
}

pub fn fast_config() -> ServiceConfig {
    ServiceConfig {
        monitor: monitor_config(),
        weight_interval_ms: INTERVAL.as_millis() as u64,
        workers: Some(4),
        ..ServiceConfig::default()
    }
}

/// Price reading observed `age_ms` before [`NOW`]
pub fn price(provider: &str, value: f64, age_ms: u64) -> Reading {
    Reading::price(provider, value, NOW - age_ms)
        .with_confidence(0.85)
        .with_latency(150.0)
}
