//! Combination rules
//!
//! Every rule receives the validated candidates and their normalized
//! effective weights and returns the value it computed plus the weights it
//! actually used. Those weights become `source_weights` and blend the
//! result's confidence and quality.

use serde::{Deserialize, Serialize};

use super::stats::{coefficient_of_variation, median, normalize_or_equal, weighted_sum};
use super::Candidate;
use crate::constants::fusion::{ADAPTIVE_AGREE_CV, ADAPTIVE_DISAGREE_CV, ADAPTIVE_MEAN_FLOOR};

/// How readings are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionMethod {
    /// Σ value × effective weight
    WeightedAverage,
    /// Median of the values
    Median,
    /// Weighted by provider confidence
    ConfidenceWeighted,
    /// Weighted by quality²
    QualityWeighted,
    /// Chooses one of the above from provider agreement
    #[default]
    Adaptive,
}

impl FusionMethod {
    /// Stable lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WeightedAverage => "weighted_average",
            Self::Median => "median",
            Self::ConfidenceWeighted => "confidence_weighted",
            Self::QualityWeighted => "quality_weighted",
            Self::Adaptive => "adaptive",
        }
    }
}

impl std::fmt::Display for FusionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of a combination rule
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Combined {
    pub value: f64,
    pub weights: Vec<f64>,
    pub method: FusionMethod,
}

/// Pick the concrete rule for `Adaptive` from the spread of the values
///
/// ```text
/// CV < 0.05          agreement       → WeightedAverage
/// CV > 0.20          disagreement    → Median
/// otherwise                          → QualityWeighted
/// ```
pub(crate) fn select_adaptive(values: &[f64]) -> FusionMethod {
    if values.len() < 2 {
        return FusionMethod::WeightedAverage;
    }
    let cv = coefficient_of_variation(values, ADAPTIVE_MEAN_FLOOR);
    if cv < ADAPTIVE_AGREE_CV {
        FusionMethod::WeightedAverage
    } else if cv > ADAPTIVE_DISAGREE_CV {
        FusionMethod::Median
    } else {
        FusionMethod::QualityWeighted
    }
}

/// Apply `method` to the candidates
///
/// `effective` must be normalized and aligned with `candidates`, which must
/// not be empty.
pub(crate) fn combine(method: FusionMethod, candidates: &[Candidate], effective: &[f64]) -> Combined {
    let values: Vec<f64> = candidates.iter().map(|c| c.value).collect();
    let method = match method {
        FusionMethod::Adaptive => select_adaptive(&values),
        concrete => concrete,
    };

    let weights = match method {
        FusionMethod::ConfidenceWeighted => {
            normalize_or_equal(&candidates.iter().map(|c| c.confidence).collect::<Vec<_>>())
        }
        FusionMethod::QualityWeighted => {
            normalize_or_equal(&candidates.iter().map(|c| c.quality * c.quality).collect::<Vec<_>>())
        }
        _ => effective.to_vec(),
    };

    let value = match method {
        FusionMethod::Median => median(&values).unwrap_or_else(|| weighted_sum(&values, &weights)),
        _ => weighted_sum(&values, &weights),
    };

    Combined {
        value,
        weights,
        method,
    }
}
