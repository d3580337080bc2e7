//! Live Price Fusion Example
//!
//! This example runs the full service against simulated quote providers:
//! health checks on a timer, quality scoring on every ingest, and weights
//! that drift away from a provider once it starts failing.
//!
//! ## What You'll Learn
//!
//! - Registering providers with blocking health checks
//! - Subscribing to alerts
//! - Ingesting readings and reading back the fused price
//! - Watching the weight table react to a degrading provider
//!
//! ## Running the Example
//!
//! ```bash
//! RUST_LOG=info cargo run --example price_fusion
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sourcefusion_core::time::{system_clock, SystemTime};
use sourcefusion_core::{FusionMethod, FusionResult, MetricType, Payload, Quote, Reading, TimeSource};
use sourcefusion_runtime::{BlockingCheck, FusionService, MonitorConfig, ProbeOutcome, ServiceConfig};
use tokio_util::sync::CancellationToken;

const TRUE_PRICE: f64 = 25.30;
const ROUNDS: u64 = 6;
const CYCLE: Duration = Duration::from_secs(2);

/// Tiny deterministic noise source so runs are reproducible
fn noise(seed: u64) -> f64 {
    let mut x = seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1;
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    (x >> 11) as f64 / (1u64 << 53) as f64 - 0.5
}

fn quote(provider: &str, price: f64, now: u64) -> Reading {
    let q = Quote {
        price: Some(price),
        volume: Some(1_250_000.0),
        change_pct: Some((price / 25.0 - 1.0) * 100.0),
        open: Some(25.05),
        high: Some(price.max(25.40)),
        low: Some(price.min(24.95)),
        prev_close: Some(25.00),
        turnover: Some(price * 1_250_000.0),
        symbol: Some("600519".into()),
        name: None,
    };
    Reading::new(provider, MetricType::Price, Payload::Quote(q), now.saturating_sub(800))
        .with_confidence(0.85)
        .with_latency(120.0)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("SourceFusion Live Price Fusion Example");
    println!("======================================\n");

    let cycle_ms = CYCLE.as_millis() as u64;
    let config = ServiceConfig {
        monitor: MonitorConfig::default().interval_ms(cycle_ms).timeout_ms(1_000),
        weight_interval_ms: cycle_ms,
        ..ServiceConfig::default()
    };
    let service = FusionService::new(config, system_clock())?;

    // tencent answers for two cycles, then every check fails
    let tencent_checks = Arc::new(AtomicU64::new(0));
    let counter = tencent_checks.clone();
    service.register_provider(
        "tencent",
        Arc::new(BlockingCheck::new(move || {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                ProbeOutcome::success(180.0)
            } else {
                ProbeOutcome::failure(950.0, "HTTP 502 Bad Gateway")
            }
        })),
        false,
    )?;
    for (provider, latency) in [("eastmoney", 90.0), ("sina", 140.0), ("xueqiu", 260.0)] {
        service.register_provider(
            provider,
            Arc::new(BlockingCheck::new(move || ProbeOutcome::success(latency).with_quality(0.9))),
            provider == "eastmoney",
        )?;
    }

    service.on_alert(|alert| {
        println!("  ALERT #{} [{}] {}", alert.id, alert.level, alert.message);
    });

    let handle = service.start(CancellationToken::new());

    for round in 0..ROUNDS {
        tokio::time::sleep(CYCLE).await;
        let now = SystemTime.now();
        let readings: Vec<Reading> = ["eastmoney", "tencent", "sina", "xueqiu"]
            .iter()
            .enumerate()
            .map(|(i, p)| quote(p, TRUE_PRICE + noise(round * 10 + i as u64) * 0.04, now))
            .collect();

        match service.ingest(readings, FusionMethod::Adaptive) {
            FusionResult::Fused(fused) => println!(
                "Round {round}: {:.4} via {} (confidence {:.2}, quality {:.2})",
                fused.value, fused.method, fused.confidence, fused.quality
            ),
            FusionResult::Empty { reason, .. } => println!("Round {round}: nothing fused ({reason})"),
        }

        let table = service.weights();
        let weights: Vec<String> = table.iter().map(|(p, w)| format!("{p}={w:.3}")).collect();
        println!("  weights v{}: {}", table.version(), weights.join(" "));
    }

    handle.shutdown().await;

    println!("\nHealth report:");
    let report = service.health_report();
    println!("  overall: {}", report.overall_status);
    for (provider, metrics) in &report.providers {
        println!(
            "  {provider:<10} {:<8} success {:>5.1}%  latency {:>6.1} ms",
            metrics.status,
            metrics.success_rate * 100.0,
            metrics.avg_response_time_ms
        );
    }

    let summary = service.adjustment_summary(0);
    println!(
        "\n{} weight adjustments across {} providers",
        summary.total_adjustments, summary.providers_adjusted
    );
    println!("\nMetrics export:\n{}", service.export_metrics().to_json()?);
    Ok(())
}
