//! Dispersion statistics for provider agreement
//!
//! ```text
//! mean     μ  = Σxᵢ / n
//! stdev    s  = √( Σ(xᵢ − μ)² / (n − 1) )        sample, n ≥ 2
//! CV          = s / max(|μ|, floor)
//! ```
//!
//! The CV drives adaptive method selection and the consistency bonus. The
//! floor keeps it finite for series centred near zero.

/// Arithmetic mean, `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Sample standard deviation, zero for fewer than two values
pub fn sample_stdev(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let mu = values.iter().sum::<f64>() / n as f64;
    let ss: f64 = values.iter().map(|v| (v - mu) * (v - mu)).sum();
    (ss / (n - 1) as f64).sqrt()
}

/// Coefficient of variation with the mean magnitude floored at `floor`
pub fn coefficient_of_variation(values: &[f64], floor: f64) -> f64 {
    let Some(mu) = mean(values) else {
        return 0.0;
    };
    let denom = mu.abs().max(floor);
    if denom > 0.0 {
        sample_stdev(values) / denom
    } else {
        0.0
    }
}

/// Median; the mean of the middle pair for even counts
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some(0.5 * (sorted[mid - 1] + sorted[mid]))
    } else {
        Some(sorted[mid])
    }
}

/// Scale non-negative weights to sum to 1, or equal weights if all are zero
pub fn normalize_or_equal(weights: &[f64]) -> Vec<f64> {
    let clean: Vec<f64> = weights
        .iter()
        .map(|w| if w.is_finite() && *w > 0.0 { *w } else { 0.0 })
        .collect();
    let sum: f64 = clean.iter().sum();
    if sum > 0.0 {
        clean.iter().map(|w| w / sum).collect()
    } else if clean.is_empty() {
        Vec::new()
    } else {
        vec![1.0 / clean.len() as f64; clean.len()]
    }
}

/// Σ wᵢ·xᵢ
pub fn weighted_sum(values: &[f64], weights: &[f64]) -> f64 {
    values.iter().zip(weights).map(|(v, w)| v * w).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispersion() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(mean(&v), Some(5.0));
        assert!((sample_stdev(&v) - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
        assert_eq!(sample_stdev(&[3.0]), 0.0);
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn cv_floor_applies_near_zero() {
        let v = [-0.1, 0.1];
        let cv = coefficient_of_variation(&v, 1.0);
        assert!((cv - sample_stdev(&v)).abs() < 1e-12);
    }

    #[test]
    fn median_odd_and_even() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn normalization_falls_back_to_equal() {
        assert_eq!(normalize_or_equal(&[0.0, 0.0]), vec![0.5, 0.5]);
        assert_eq!(normalize_or_equal(&[1.0, 3.0]), vec![0.25, 0.75]);
        assert_eq!(normalize_or_equal(&[f64::NAN, 1.0]), vec![0.0, 1.0]);
        assert!(normalize_or_equal(&[]).is_empty());
    }
}
