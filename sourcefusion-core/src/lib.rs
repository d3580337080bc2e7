//! Core scoring and fusion engine for SourceFusion
//!
//! Turns readings of the same metric from several unreliable providers into
//! one trusted value, and keeps track of how much each provider deserves to
//! be trusted.
//!
//! Key properties:
//! - Synchronous and runtime-free; the tokio loops live in
//!   `sourcefusion-runtime`
//! - Bad input degrades a score instead of failing
//! - Every history is bounded
//!
//! ```no_run
//! use std::sync::Arc;
//! use sourcefusion_core::fusion::{FusionConfig, FusionEngine, FusionMethod};
//! use sourcefusion_core::quality::QualityAnalyzer;
//! use sourcefusion_core::time::system_clock;
//! use sourcefusion_core::weights::{WeightConfig, WeightManager};
//! use sourcefusion_core::{MetricType, Reading};
//!
//! let clock = system_clock();
//! let analyzer = QualityAnalyzer::default();
//! let engine = FusionEngine::new(FusionConfig::default(), clock.clone());
//! let weights = WeightManager::new(WeightConfig::default(), clock.clone())?;
//!
//! let now = clock.now();
//! let reading = Reading::price("eastmoney", 25.30, now);
//! let score = analyzer.analyze(&reading, MetricType::Price, now);
//! let reading = reading.with_quality(score.overall);
//!
//! match engine.fuse(&[reading], &weights.weights(), FusionMethod::Adaptive).fused() {
//!     Some(fused) => println!("{} (confidence {:.2})", fused.value, fused.confidence),
//!     None => {} // nothing usable this round
//! }
//! # Ok::<(), sourcefusion_core::ConfigError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod buffer;
pub mod constants;
pub mod errors;
pub mod fusion;
pub mod health;
pub mod quality;
pub mod reading;
pub mod time;
pub mod weights;

// Public API
pub use errors::{ConfigError, ConfigResult};
pub use fusion::{FusedValue, FusionConfig, FusionEngine, FusionMethod, FusionResult};
pub use health::{HealthReport, HealthStatus, ProviderMetrics, Thresholds};
pub use quality::{QualityAnalyzer, QualityConfig, QualityScore, QualityTracker};
pub use reading::{Article, MetricType, Payload, Quote, Reading};
pub use time::{SharedClock, TimeSource, Timestamp};
pub use weights::{WeightBounds, WeightConfig, WeightManager, WeightStrategy, WeightTable};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_exists() {
        assert!(!VERSION.is_empty());
    }
}
