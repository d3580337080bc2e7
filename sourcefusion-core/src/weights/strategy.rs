//! Adjustment strategies and the acceptance gate

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::weights::*;

/// How aggressively weights follow performance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightStrategy {
    /// Small, slow, high-confidence changes
    Conservative,
    /// Moderate changes
    #[default]
    Balanced,
    /// Large changes on thin evidence
    Aggressive,
    /// Learning rate scaled by performance and stability
    Adaptive,
}

/// Parameters of a strategy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrategyParams {
    /// Fixed learning rate; `None` when it is computed per provider
    pub learning_rate: Option<f64>,
    /// Largest |Δweight| in one cycle
    pub max_adjustment: f64,
    /// Minimum confidence to apply a change
    pub confidence_threshold: f64,
    /// Highest risk applied without the confidence override
    pub max_risk: RiskLevel,
}

impl WeightStrategy {
    /// Every strategy
    pub const ALL: [WeightStrategy; 4] = [
        Self::Conservative,
        Self::Balanced,
        Self::Aggressive,
        Self::Adaptive,
    ];

    /// Stable lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Conservative => "conservative",
            Self::Balanced => "balanced",
            Self::Aggressive => "aggressive",
            Self::Adaptive => "adaptive",
        }
    }

    /// Rate, clamp, threshold and risk limit of this strategy
    pub fn params(&self) -> StrategyParams {
        match self {
            Self::Conservative => StrategyParams {
                learning_rate: Some(0.05),
                max_adjustment: 0.10,
                confidence_threshold: 0.8,
                max_risk: RiskLevel::Low,
            },
            Self::Balanced => StrategyParams {
                learning_rate: Some(0.10),
                max_adjustment: 0.15,
                confidence_threshold: 0.6,
                max_risk: RiskLevel::Low,
            },
            Self::Aggressive => StrategyParams {
                learning_rate: Some(0.20),
                max_adjustment: 0.25,
                confidence_threshold: 0.4,
                max_risk: RiskLevel::Medium,
            },
            Self::Adaptive => StrategyParams {
                learning_rate: None,
                max_adjustment: 0.20,
                confidence_threshold: 0.5,
                max_risk: RiskLevel::Low,
            },
        }
    }

    /// Learning rate for a provider with the given performance and stability
    pub fn learning_rate(&self, performance: f64, stability: f64) -> f64 {
        match self.params().learning_rate {
            Some(rate) => rate,
            None => adaptive_rate(performance, stability),
        }
    }

    /// Whether an adjustment with this confidence and risk may be applied
    ///
    /// Confidence must reach the threshold. Risk must be within the limit,
    /// or one level above it with confidence over the override level.
    pub fn accepts(&self, confidence: f64, risk: RiskLevel) -> bool {
        let params = self.params();
        if confidence < params.confidence_threshold {
            return false;
        }
        risk <= params.max_risk
            || (params.max_risk.next() == Some(risk) && confidence > RISK_OVERRIDE_CONFIDENCE)
    }
}

impl fmt::Display for WeightStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn adaptive_rate(performance: f64, stability: f64) -> f64 {
    let mut m = if performance > ADAPTIVE_HIGH_PERF {
        ADAPTIVE_BOOST
    } else if performance < ADAPTIVE_LOW_PERF {
        ADAPTIVE_DAMP
    } else {
        1.0
    };
    if stability > ADAPTIVE_STABLE {
        m *= ADAPTIVE_STABLE_BOOST;
    } else if stability < ADAPTIVE_UNSTABLE {
        m *= ADAPTIVE_UNSTABLE_DAMP;
    }
    ADAPTIVE_BASE_RATE * m
}

/// Risk of a single weight adjustment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// Change under 10%
    VeryLow,
    /// Change under 30%
    Low,
    /// Change under 50%, or any size on a small weight
    Medium,
    /// Change over 50% of a load-bearing weight
    High,
}

impl RiskLevel {
    /// Classify a change from `old` to `new`
    pub fn assess(old: f64, new: f64) -> Self {
        let ratio = if old > 0.0 { (new - old).abs() / old } else { 1.0 };
        if ratio > RISK_HIGH_RATIO && old > RISK_LARGE_WEIGHT {
            Self::High
        } else if ratio > RISK_MEDIUM_RATIO {
            Self::Medium
        } else if ratio > RISK_LOW_RATIO {
            Self::Low
        } else {
            Self::VeryLow
        }
    }

    fn next(self) -> Option<Self> {
        match self {
            Self::VeryLow => Some(Self::Low),
            Self::Low => Some(Self::Medium),
            Self::Medium => Some(Self::High),
            Self::High => None,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::VeryLow => "very low",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        })
    }
}
