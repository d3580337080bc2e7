//! Scoring for sentiment, technical and fundamental readings
//!
//! These metrics have no field-level rules, so they are judged on coverage
//! and the provider's benchmark alone.

use super::Dimensions;
use crate::reading::Payload;

pub(crate) fn score(payload: &Payload, benchmark_accuracy: f64) -> Dimensions {
    let completeness = payload.present_fraction();
    Dimensions {
        completeness,
        accuracy: benchmark_accuracy,
        consistency: if completeness > 0.0 { 0.8 } else { 0.0 },
        validity: completeness,
    }
}
