//! # SourceFusion Runtime - Monitoring Loops and Service Wiring
//!
//! The core crate is synchronous and runtime-free. This crate adds what
//! needs a clock that ticks and tasks that run concurrently:
//!
//! - **[`probe`]**: the async [`HealthCheck`] trait and adapters for plain
//!   closures
//! - **[`monitor`]**: the [`ReliabilityMonitor`], which probes providers on
//!   a timer, keeps their rolling health and raises alerts
//! - **[`pool`]**: a semaphore-bounded [`WorkerPool`] for CPU-bound batches
//! - **[`service`]**: the [`FusionService`] facade wiring analyzer, engine,
//!   monitor and weight manager together, plus the weight-update loop
//!
//! ## Design Philosophy
//!
//! ### Loops never die
//!
//! A provider that errors, hangs or panics is a failed health check, not a
//! failed monitor. Alert handlers are isolated the same way. The only way a
//! loop stops is through its cancellation token.
//!
//! ### Readers never wait on writers
//!
//! Fusion reads an `Arc` snapshot of the weight table. Weight updates build
//! a new table and swap it in, so a slow update never stalls `fuse`.
//!
//! ### One clock
//!
//! Every component takes the same [`SharedClock`](sourcefusion_core::SharedClock).
//! Tests use a fixed clock or [`TokioClock`] under a paused runtime, so
//! every time-dependent rule is deterministic.
//!
//! ## Example Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use sourcefusion_core::{FusionMethod, Reading};
//! use sourcefusion_runtime::{BlockingCheck, FusionService, ProbeOutcome, ServiceConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> sourcefusion_runtime::Result<()> {
//! let service = FusionService::with_system_clock(ServiceConfig::default())?;
//! service.register_provider(
//!     "sina",
//!     Arc::new(BlockingCheck::new(|| ProbeOutcome::success(150.0))),
//!     false,
//! )?;
//! service.on_alert(|alert| eprintln!("[{}] {}", alert.level, alert.message));
//!
//! let handle = service.start(CancellationToken::new());
//!
//! let now = 1_700_000_000_000;
//! let result = service.ingest(
//!     vec![Reading::price("sina", 25.31, now), Reading::price("tencent", 25.30, now)],
//!     FusionMethod::Adaptive,
//! );
//! println!("fused: {:?}", result.value());
//!
//! handle.shutdown().await;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod clock;
pub mod errors;
pub mod monitor;
pub mod pool;
pub mod probe;
pub mod service;

pub use clock::TokioClock;
pub use errors::{Result, RuntimeError};
pub use monitor::{AlertHandler, MetricsExport, MonitorConfig, ReliabilityMonitor};
pub use pool::WorkerPool;
pub use probe::{BlockingCheck, FnCheck, HealthCheck, ProbeError, ProbeOutcome};
pub use service::{FusionService, ServiceConfig, ServiceHandle};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
