//! Dynamic Provider Weighting
//!
//! ## Overview
//!
//! Fusion trusts providers according to a [`WeightTable`]. The
//! [`WeightManager`] keeps that table current: each cycle it scores every
//! provider from monitor and quality signals, nudges its weight toward a
//! performance target, gates the change on confidence and risk, and
//! publishes a renormalized table.
//!
//! ```text
//! signals ─→ performance ─→ target = perf × 0.4 × stability
//!                                 │
//!          old ──────────────→ proposed = old + (target − old) × rate
//!                                 │            (± max adjustment)
//!                            gate(confidence, risk)
//!                                 │
//!                       clamp + water-fill ─→ WeightTable v+1
//! ```
//!
//! Readers take an `Arc<WeightTable>` snapshot and never see a partially
//! updated table.

pub mod manager;
pub mod signals;
pub mod strategy;
pub mod table;

pub use manager::{
    AdjustmentSummary, ProviderAdjustments, RejectedAdjustment, WeightAdjustment, WeightManager,
    WeightSample, WeightUpdate,
};
pub use signals::{collect_signals, PerformanceInput, ResolvedInput};
pub use strategy::{RiskLevel, StrategyParams, WeightStrategy};
pub use table::{is_normalized, WeightBounds, WeightTable};

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::constants::weights::{ADJUSTMENT_HISTORY_CAPACITY, DEFAULT_TABLE, WEIGHT_HISTORY_CAPACITY};
use crate::errors::{ConfigError, ConfigResult};

/// Weight manager settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightConfig {
    /// Per-entry bounds
    pub bounds: WeightBounds,
    /// Initial adjustment strategy
    pub strategy: WeightStrategy,
    /// Weight samples kept per provider
    pub history_capacity: usize,
    /// Applied adjustments kept for audit
    pub adjustment_capacity: usize,
    /// Raw starting weights, also restored by a reset
    pub default_weights: BTreeMap<String, f64>,
    /// Business-critical providers
    pub critical: BTreeSet<String>,
}

impl Default for WeightConfig {
    fn default() -> Self {
        Self {
            bounds: WeightBounds::default(),
            strategy: WeightStrategy::default(),
            history_capacity: WEIGHT_HISTORY_CAPACITY,
            adjustment_capacity: ADJUSTMENT_HISTORY_CAPACITY,
            default_weights: DEFAULT_TABLE
                .iter()
                .map(|(name, weight)| ((*name).to_string(), *weight))
                .collect(),
            critical: BTreeSet::new(),
        }
    }
}

impl WeightConfig {
    /// Reject bounds, capacities or default weights that cannot work
    pub fn validate(&self) -> ConfigResult<()> {
        if self.history_capacity == 0 {
            return Err(ConfigError::NonPositive {
                field: "weight history capacity",
            });
        }
        if self.adjustment_capacity == 0 {
            return Err(ConfigError::NonPositive {
                field: "adjustment history capacity",
            });
        }
        WeightTable::normalized(&self.default_weights, &self.critical, self.bounds, 0).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(WeightConfig::default().validate().is_ok());
    }

    #[test]
    fn empty_defaults_are_rejected() {
        let config = WeightConfig {
            default_weights: BTreeMap::new(),
            ..WeightConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::EmptyWeights));
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: WeightConfig =
            serde_json::from_str(r#"{"strategy":"aggressive"}"#).unwrap();
        assert_eq!(config.strategy, WeightStrategy::Aggressive);
        assert_eq!(config.history_capacity, WEIGHT_HISTORY_CAPACITY);
    }
}
