//! Provider Health Checks
//!
//! ## Overview
//!
//! The monitor does not know how to reach a provider. Each registered
//! provider brings a [`HealthCheck`]: an async probe that reports whether
//! the provider answered, how long it took, and optionally extra signals
//! such as a quality score.
//!
//! ## Design Decisions
//!
//! ### Why an async trait?
//!
//! Most real probes are network calls, so the trait is async and the
//! monitor runs every probe concurrently under a timeout. Implementations
//! only need `Send + Sync`; they are shared as `Arc<dyn HealthCheck>`.
//!
//! ### Blocking probes
//!
//! Plenty of provider SDKs are synchronous. [`BlockingCheck`] wraps a plain
//! closure and runs it on tokio's blocking pool, so a slow SDK call cannot
//! stall the timer loop.
//!
//! ### Failure model
//!
//! A probe may fail in three ways: it returns `ok: false`, it returns a
//! [`ProbeError`], or it panics. The monitor folds all three (and timeouts)
//! into a failed check; none of them stop the loop.
//!
//! ## Example Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use sourcefusion_runtime::probe::{BlockingCheck, HealthCheck, ProbeOutcome};
//!
//! let check: Arc<dyn HealthCheck> = Arc::new(BlockingCheck::new(|| {
//!     ProbeOutcome::success(120.0).with_quality(0.92)
//! }));
//! # let _ = check;
//! ```

use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Key in [`ProbeOutcome::extra`] carrying a quality signal
pub const QUALITY_KEY: &str = "quality_score";

/// What a single probe observed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProbeOutcome {
    /// Whether the provider answered correctly
    pub ok: bool,
    /// Round-trip latency; `<= 0` means "use the measured time"
    pub latency_ms: f64,
    /// Provider-specific signals
    #[serde(default)]
    pub extra: Map<String, Value>,
    /// Why the probe failed, when `ok` is false
    #[serde(default)]
    pub error: Option<String>,
}

impl ProbeOutcome {
    /// Successful probe
    pub fn success(latency_ms: f64) -> Self {
        Self {
            ok: true,
            latency_ms,
            ..Self::default()
        }
    }

    /// Failed probe with a reason
    pub fn failure(latency_ms: f64, error: impl Into<String>) -> Self {
        Self {
            ok: false,
            latency_ms,
            error: Some(error.into()),
            ..Self::default()
        }
    }

    /// Attach an extra signal
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Attach a quality signal
    pub fn with_quality(self, quality: f64) -> Self {
        self.with_extra(QUALITY_KEY, Value::from(quality))
    }

    /// Numeric quality signal, if one was reported
    pub fn quality(&self) -> Option<f64> {
        self.extra
            .get(QUALITY_KEY)
            .and_then(Value::as_f64)
            .filter(|q| q.is_finite())
    }
}

/// Why a probe produced no outcome
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProbeError {
    /// The probe did not finish within the check timeout
    #[error("check timed out after {0:?}")]
    Timeout(Duration),

    /// The probe itself reported an error
    #[error("check failed: {0}")]
    Failed(String),

    /// The probe panicked
    #[error("check panicked: {0}")]
    Panicked(String),
}

/// Async probe of one provider
#[async_trait]
pub trait HealthCheck: Send + Sync {
    /// Probe the provider once
    async fn check(&self) -> Result<ProbeOutcome, ProbeError>;
}

/// Adapts a synchronous closure; runs on the blocking pool
pub struct BlockingCheck<F> {
    probe: Arc<F>,
}

impl<F> BlockingCheck<F>
where
    F: Fn() -> ProbeOutcome + Send + Sync + 'static,
{
    /// Wrap a closure
    pub fn new(probe: F) -> Self {
        Self { probe: Arc::new(probe) }
    }
}

impl<F> std::fmt::Debug for BlockingCheck<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockingCheck").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F> HealthCheck for BlockingCheck<F>
where
    F: Fn() -> ProbeOutcome + Send + Sync + 'static,
{
    async fn check(&self) -> Result<ProbeOutcome, ProbeError> {
        let probe = Arc::clone(&self.probe);
        tokio::task::spawn_blocking(move || probe())
            .await
            .map_err(|err| {
                if err.is_panic() {
                    ProbeError::Panicked(panic_message(err.into_panic().as_ref()))
                } else {
                    ProbeError::Failed(err.to_string())
                }
            })
    }
}

/// Adapts an async closure returning a probe result
pub struct FnCheck<F> {
    probe: F,
}

impl<F, Fut> FnCheck<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<ProbeOutcome, ProbeError>> + Send,
{
    /// Wrap an async closure
    pub fn new(probe: F) -> Self {
        Self { probe }
    }
}

impl<F> std::fmt::Debug for FnCheck<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnCheck").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F, Fut> HealthCheck for FnCheck<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<ProbeOutcome, ProbeError>> + Send,
{
    async fn check(&self) -> Result<ProbeOutcome, ProbeError> {
        (self.probe)().await
    }
}

/// Best-effort text of a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_is_read_from_extra() {
        let outcome = ProbeOutcome::success(80.0).with_quality(0.9);
        assert_eq!(outcome.quality(), Some(0.9));

        let text = ProbeOutcome::success(80.0).with_extra(QUALITY_KEY, Value::from("high"));
        assert_eq!(text.quality(), None);
    }

    #[test]
    fn outcome_deserializes_with_defaults() {
        let outcome: ProbeOutcome =
            serde_json::from_str(r#"{"ok": true, "latency_ms": 42.0}"#).unwrap();
        assert!(outcome.ok);
        assert!(outcome.extra.is_empty());
        assert!(outcome.error.is_none());
    }

    #[tokio::test]
    async fn blocking_check_runs_closure() {
        let check = BlockingCheck::new(|| ProbeOutcome::failure(10.0, "HTTP 503"));
        let outcome = check.check().await;
        assert_eq!(outcome.map(|o| o.error), Ok(Some("HTTP 503".to_string())));
    }

    #[tokio::test]
    async fn blocking_check_reports_panics() {
        let check = BlockingCheck::new(|| -> ProbeOutcome { panic!("sdk exploded") });
        match check.check().await {
            Err(ProbeError::Panicked(msg)) => assert_eq!(msg, "sdk exploded"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn fn_check_propagates_errors() {
        let check = FnCheck::new(|| async { Err(ProbeError::Failed("refused".into())) });
        assert_eq!(check.check().await, Err(ProbeError::Failed("refused".into())));
    }
}
