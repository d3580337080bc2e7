//! Multi-Provider Fusion
//!
//! ## Overview
//!
//! Several providers report the same metric with different latency,
//! completeness and trustworthiness. Fusion turns their readings into one
//! value with a confidence and a quality score.
//!
//! ```text
//! Provider 1 ──┐
//! Provider 2 ──┼─→ validate ─→ stats ─→ effective weights ─→ combine ─→ FusionResult
//! Provider N ──┘      ↓                        ↑
//!                  dropped            WeightTable (trust)
//! ```
//!
//! ## Pipeline
//!
//! 1. **Validation**: readings without a provider or numeric value, stale
//!    readings and readings from the future are dropped; out-of-range
//!    quality and confidence reset to 0.5; one reading per provider (the
//!    newest) survives
//! 2. **Performance statistics**: each surviving reading updates its
//!    provider's accuracy and reliability EMAs (once per observation)
//! 3. **Effective weights**:
//!    ```text
//!    wᵢ = baseᵢ × qualityᵢ² × confidenceᵢ × 1/(1 + latencyᵢ[s]) × perfᵢ
//!    ```
//!    renormalized, or equal if all are zero
//! 4. **Combination**: one of the [`FusionMethod`] rules
//! 5. **Result**: weight-blended confidence and quality, plus diversity and
//!    consistency bonuses on quality
//!
//! ## Usage Example
//!
//! ```rust
//! use std::sync::Arc;
//! use sourcefusion_core::fusion::{FusionConfig, FusionEngine, FusionMethod};
//! use sourcefusion_core::time::FixedTime;
//! use sourcefusion_core::{Reading, WeightTable};
//!
//! let engine = FusionEngine::new(FusionConfig::default(), Arc::new(FixedTime::new(10_000)));
//! let readings = vec![
//!     Reading::price("eastmoney", 25.30, 9_000).with_quality(0.9).with_confidence(0.9),
//!     Reading::price("tencent", 25.32, 9_500).with_quality(0.85).with_confidence(0.8),
//!     Reading::price("sina", 25.29, 9_800).with_quality(0.8).with_confidence(0.8),
//! ];
//!
//! let result = engine.fuse(&readings, &WeightTable::default(), FusionMethod::Adaptive);
//! let fused = result.fused().expect("three valid readings");
//! assert!(fused.value >= 25.29 && fused.value <= 25.32);
//! assert_eq!(fused.method, FusionMethod::WeightedAverage);
//! ```

mod engine;
pub mod methods;
pub mod performance;
pub mod stats;

pub use engine::FusionEngine;
pub use methods::FusionMethod;
pub use performance::{PerformanceReport, ProviderPerformance, ProviderStats};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::fusion::{
    DEFAULT_BASE_WEIGHT, DEFAULT_FUTURE_SKEW_MS, DEFAULT_STALENESS_MS, PERFORMANCE_EMA_ALPHA,
};
use crate::errors::{ensure_positive, ConfigError, ConfigResult};
use crate::time::Timestamp;

/// Fusion engine settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// Readings older than this (ms) are dropped
    pub staleness_ms: u64,
    /// Readings stamped further than this (ms) in the future are dropped
    pub future_skew_ms: u64,
    /// Smoothing factor of the performance EMAs, in `(0, 1]`
    pub ema_alpha: f64,
    /// Base weight of providers missing from the weight table
    pub default_base_weight: f64,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            staleness_ms: DEFAULT_STALENESS_MS,
            future_skew_ms: DEFAULT_FUTURE_SKEW_MS,
            ema_alpha: PERFORMANCE_EMA_ALPHA,
            default_base_weight: DEFAULT_BASE_WEIGHT,
        }
    }
}

impl FusionConfig {
    /// Reject settings the engine cannot work with
    pub fn validate(&self) -> ConfigResult<()> {
        ensure_positive("staleness window", self.staleness_ms)?;
        if !(self.ema_alpha > 0.0 && self.ema_alpha <= 1.0) {
            return Err(ConfigError::OutOfUnitRange {
                field: "ema alpha",
                value: self.ema_alpha,
            });
        }
        if !(self.default_base_weight.is_finite() && self.default_base_weight >= 0.0) {
            return Err(ConfigError::InvalidWeight {
                provider: "<default>".into(),
                weight: self.default_base_weight,
            });
        }
        Ok(())
    }
}

/// A successful fusion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedValue {
    /// Fused value
    pub value: f64,
    /// Blended provider confidence in `[0, 1]`
    pub confidence: f64,
    /// Blended quality plus bonuses, in `[0, 1]`
    pub quality: f64,
    /// Providers whose readings were combined
    pub contributing_providers: Vec<String>,
    /// Weight each provider actually had in the combination; sums to 1
    pub source_weights: BTreeMap<String, f64>,
    /// Rule actually applied
    pub method: FusionMethod,
    /// Rule the caller asked for
    pub requested_method: FusionMethod,
    /// When fusion ran
    pub timestamp: Timestamp,
    /// Readings passed in
    pub input_count: usize,
    /// Readings that survived validation
    pub valid_count: usize,
}

/// Outcome of a fusion call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FusionResult {
    /// At least one reading was usable
    Fused(FusedValue),
    /// Nothing could be fused
    Empty {
        /// Why nothing was fused
        reason: String,
        /// When fusion ran
        timestamp: Timestamp,
        /// Readings passed in
        input_count: usize,
    },
}

impl FusionResult {
    /// The fused value, if any
    pub fn fused(&self) -> Option<&FusedValue> {
        match self {
            Self::Fused(v) => Some(v),
            Self::Empty { .. } => None,
        }
    }

    /// Fused number, if any
    pub fn value(&self) -> Option<f64> {
        self.fused().map(|v| v.value)
    }

    /// Whether fusion produced a value
    pub fn is_fused(&self) -> bool {
        matches!(self, Self::Fused(_))
    }

    /// When fusion ran
    pub fn timestamp(&self) -> Timestamp {
        match self {
            Self::Fused(v) => v.timestamp,
            Self::Empty { timestamp, .. } => *timestamp,
        }
    }
}

/// A validated reading reduced to what fusion needs
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Candidate {
    pub provider: String,
    pub value: f64,
    pub quality: f64,
    pub confidence: f64,
    pub latency_ms: f64,
    pub observed_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_validation() {
        assert!(FusionConfig::default().validate().is_ok());
        let zero = FusionConfig {
            staleness_ms: 0,
            ..FusionConfig::default()
        };
        assert_eq!(
            zero.validate(),
            Err(ConfigError::NonPositive {
                field: "staleness window"
            })
        );
        let alpha = FusionConfig {
            ema_alpha: 0.0,
            ..FusionConfig::default()
        };
        assert!(alpha.validate().is_err());
    }

    #[test]
    fn empty_result_accessors() {
        let empty = FusionResult::Empty {
            reason: "no valid readings".into(),
            timestamp: 7,
            input_count: 0,
        };
        assert!(!empty.is_fused());
        assert_eq!(empty.value(), None);
        assert_eq!(empty.timestamp(), 7);
    }
}
