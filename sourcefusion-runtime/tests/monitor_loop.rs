//! Monitor loop timing under a paused runtime
//!
//! Covers:
//! - One cycle per interval, starting immediately
//! - Cancellation stops scheduling
//! - Hanging checks time out as failures
//! - Degradation walks the status machine to Offline

mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sourcefusion_core::health::{AlertCategory, AlertLevel};
use sourcefusion_core::HealthStatus;
use sourcefusion_runtime::{FnCheck, HealthCheck, ProbeOutcome};
use tokio_util::sync::CancellationToken;

use common::{monitor, ScriptedCheck, INTERVAL};

#[tokio::test(start_paused = true)]
async fn checks_once_per_interval_until_cancelled() {
    let monitor = monitor();
    let sina = ScriptedCheck::healthy(100.0);
    monitor.register("sina", sina.check.clone(), false).unwrap();

    let token = CancellationToken::new();
    let task = monitor.spawn(token.clone());

    // ticks at 0, 1, 2 and 3 intervals
    tokio::time::sleep(INTERVAL * 3 + Duration::from_secs(1)).await;
    assert_eq!(sina.calls(), 4);

    token.cancel();
    task.await.unwrap();
    tokio::time::sleep(INTERVAL * 5).await;
    assert_eq!(sina.calls(), 4);

    let metrics = monitor.metrics("sina").expect("no metrics");
    assert_eq!(metrics.total_requests, 4);
    assert_eq!(metrics.status, HealthStatus::Healthy);
    assert!((metrics.uptime_ratio - 1.0).abs() < 1e-9);
}

#[tokio::test(start_paused = true)]
async fn hanging_check_times_out() {
    let monitor = monitor();
    let finished = Arc::new(AtomicBool::new(false));
    let flag = finished.clone();
    let hanging: Arc<dyn HealthCheck> = Arc::new(FnCheck::new(move || {
        let flag = flag.clone();
        async move {
            tokio::time::sleep(Duration::from_secs(30)).await;
            flag.store(true, Ordering::SeqCst);
            Ok(ProbeOutcome::success(1.0))
        }
    }));
    monitor.register("xueqiu", hanging, false).unwrap();

    monitor.check_all().await;
    let metrics = monitor.metrics("xueqiu").expect("no metrics");
    assert_eq!(metrics.error_count, 1);
    assert!(metrics.last_error.as_deref().unwrap().contains("timed out"));
    // the measured elapsed time stands in for latency
    assert!((metrics.last_response_time_ms - 5_000.0).abs() < 50.0);

    let probe_alerts = monitor
        .alerts(10)
        .into_iter()
        .filter(|a| a.category == AlertCategory::ProbeError)
        .count();
    assert_eq!(probe_alerts, 1);

    // the abandoned probe was aborted
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert!(!finished.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn degrading_provider_goes_offline() {
    let monitor = monitor();
    let tencent = ScriptedCheck::degrading(1);
    monitor.register("tencent", tencent.check.clone(), true).unwrap();

    let mut statuses = Vec::new();
    for _ in 0..5 {
        let transitions = monitor.check_all().await;
        statuses.push(transitions["tencent"].current);
        tokio::time::sleep(INTERVAL).await;
    }

    assert_eq!(statuses[0], HealthStatus::Healthy);
    assert_eq!(statuses[1], HealthStatus::Critical);
    assert_eq!(statuses.last().copied(), Some(HealthStatus::Offline));

    let report = monitor.health_report();
    assert_eq!(report.count(HealthStatus::Offline), 1);
    assert!(report.recent_alerts.iter().any(|a| a.level == AlertLevel::Critical));
    assert!(monitor.reliability_score("tencent") < 0.5);
}

#[tokio::test(start_paused = true)]
async fn repeated_alerts_are_suppressed() {
    let monitor = monitor();
    let akshare = ScriptedCheck::failing("HTTP 503");
    monitor.register("akshare", akshare.check.clone(), false).unwrap();

    // five failing cycles inside one ten-minute dedup window
    for _ in 0..5 {
        monitor.check_all().await;
        tokio::time::sleep(INTERVAL).await;
    }
    let success_rate_alerts = monitor
        .alerts(100)
        .into_iter()
        .filter(|a| a.category == AlertCategory::SuccessRate)
        .count();
    assert_eq!(success_rate_alerts, 1);
}
