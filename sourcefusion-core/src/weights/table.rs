//! Normalized provider weight table
//!
//! ## Water-filling
//!
//! A table must sum to 1 while every entry stays inside its bounds. Plain
//! proportional scaling breaks the bounds, and clamp-then-rescale loops can
//! oscillate. Instead the raw weights are scaled by a common factor λ and
//! clamped, and λ is found by bisection:
//!
//! ```text
//! f(λ) = Σ clamp(λ·wᵢ, loᵢ, hi)      f is monotone in λ
//!
//! f(0) = Σ loᵢ ≤ 1 ≤ n·hi = f(∞)     ⇒ some λ* has f(λ*) = 1
//! ```
//!
//! Infeasible bounds are relaxed first: if `n·hi < 1` the ceiling becomes
//! `1/n`, and if `Σ loᵢ > 1` the floors are scaled down proportionally.
//! The last few ULPs of residual after bisection go to entries that still
//! have room, proportionally to that room, so no bound is crossed.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::constants::weights::{
    CRITICAL_MIN_WEIGHT, DEFAULT_TABLE, MAX_WEIGHT, MIN_WEIGHT, NEW_PROVIDER_WEIGHT,
    NORMALIZE_ITERATIONS, SUM_TOLERANCE,
};
use crate::errors::{ConfigError, ConfigResult};
use crate::time::Timestamp;

/// Raw weight substituted for zero entries so they still receive their floor
const ZERO_WEIGHT_EPSILON: f64 = 1e-12;

/// Per-entry bounds of a weight table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightBounds {
    /// Floor of a regular provider
    pub min: f64,
    /// Ceiling of every provider
    pub max: f64,
    /// Floor of a business-critical provider
    pub critical_min: f64,
}

impl Default for WeightBounds {
    fn default() -> Self {
        Self {
            min: MIN_WEIGHT,
            max: MAX_WEIGHT,
            critical_min: CRITICAL_MIN_WEIGHT,
        }
    }
}

impl WeightBounds {
    /// `0 ≤ min ≤ critical_min ≤ max ≤ 1` and `max > 0`
    pub fn validate(&self) -> ConfigResult<()> {
        let ordered = 0.0 <= self.min
            && self.min <= self.critical_min
            && self.critical_min <= self.max
            && self.max <= 1.0
            && self.max > 0.0;
        if ordered {
            Ok(())
        } else {
            Err(ConfigError::InvalidBounds {
                min: self.min,
                max: self.max,
                critical_min: self.critical_min,
            })
        }
    }

    /// Floor for a provider
    pub fn floor(&self, critical: bool) -> f64 {
        if critical {
            self.critical_min
        } else {
            self.min
        }
    }

    /// Clamp a weight into a provider's bounds
    pub fn clamp(&self, weight: f64, critical: bool) -> f64 {
        weight.clamp(self.floor(critical), self.max)
    }
}

/// Normalized provider → weight table
///
/// Always sums to 1 (±1e-6) with every entry inside its bounds. Tables are
/// immutable once built; updates produce a new table with `version + 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightTable {
    weights: BTreeMap<String, f64>,
    critical: BTreeSet<String>,
    bounds: WeightBounds,
    version: u64,
    updated_at: Timestamp,
}

impl Default for WeightTable {
    fn default() -> Self {
        let raw: BTreeMap<String, f64> = DEFAULT_TABLE
            .iter()
            .map(|(name, weight)| ((*name).to_string(), *weight))
            .collect();
        Self::build(&raw, BTreeSet::new(), WeightBounds::default(), 0, 0)
    }
}

impl WeightTable {
    /// Validate and water-fill raw weights into a version 0 table
    pub fn normalized(
        raw: &BTreeMap<String, f64>,
        critical: &BTreeSet<String>,
        bounds: WeightBounds,
        updated_at: Timestamp,
    ) -> ConfigResult<Self> {
        bounds.validate()?;
        validate_raw(raw)?;
        Ok(Self::build(raw, critical.clone(), bounds, 0, updated_at))
    }

    /// Next version of this table from new raw weights
    ///
    /// Keeps the critical set and bounds. Critical providers missing from
    /// `raw` are dropped from the critical set.
    pub fn successor(&self, raw: &BTreeMap<String, f64>, updated_at: Timestamp) -> ConfigResult<Self> {
        validate_raw(raw)?;
        let critical = self
            .critical
            .iter()
            .filter(|p| raw.contains_key(*p))
            .cloned()
            .collect();
        Ok(Self::build(
            raw,
            critical,
            self.bounds,
            self.version + 1,
            updated_at,
        ))
    }

    /// Next version from `raw`, keeping the providers in `keep`
    ///
    /// `keep` maps provider to critical flag. Kept providers missing from
    /// `raw` join at the new-provider weight. `raw` is validated on its own,
    /// so an all-zero map is rejected even when providers are kept.
    pub fn rebased(
        &self,
        raw: &BTreeMap<String, f64>,
        keep: &BTreeMap<String, bool>,
        updated_at: Timestamp,
    ) -> ConfigResult<Self> {
        validate_raw(raw)?;
        let mut merged = raw.clone();
        let mut next = self.clone();
        for (provider, &critical) in keep {
            merged.entry(provider.clone()).or_insert(NEW_PROVIDER_WEIGHT);
            if critical {
                next.critical.insert(provider.clone());
            } else {
                next.critical.remove(provider);
            }
        }
        next.successor(&merged, updated_at)
    }

    /// Next version with a provider marked critical or not
    pub fn with_critical(&self, provider: &str, critical: bool, updated_at: Timestamp) -> ConfigResult<Self> {
        self.mark(provider, critical).successor(&self.weights, updated_at)
    }

    /// Next version with a provider added (or replaced) at raw weight `weight`
    pub fn with_entry(
        &self,
        provider: &str,
        weight: f64,
        critical: bool,
        updated_at: Timestamp,
    ) -> ConfigResult<Self> {
        let mut raw = self.weights.clone();
        raw.insert(provider.to_string(), weight);
        self.mark(provider, critical).successor(&raw, updated_at)
    }

    fn mark(&self, provider: &str, critical: bool) -> Self {
        let mut next = self.clone();
        if critical {
            next.critical.insert(provider.to_string());
        } else {
            next.critical.remove(provider);
        }
        next
    }

    fn build(
        raw: &BTreeMap<String, f64>,
        critical: BTreeSet<String>,
        bounds: WeightBounds,
        version: u64,
        updated_at: Timestamp,
    ) -> Self {
        let entries: Vec<(f64, f64)> = raw
            .iter()
            .map(|(name, w)| {
                let w = if *w > 0.0 { *w } else { ZERO_WEIGHT_EPSILON };
                (w, bounds.floor(critical.contains(name)))
            })
            .collect();
        let filled = water_fill(&entries, bounds.max);
        let weights = raw.keys().cloned().zip(filled).collect();

        Self {
            weights,
            critical,
            bounds,
            version,
            updated_at,
        }
    }

    /// Weight of a provider
    pub fn get(&self, provider: &str) -> Option<f64> {
        self.weights.get(provider).copied()
    }

    /// Whether the provider has an entry
    pub fn contains(&self, provider: &str) -> bool {
        self.weights.contains_key(provider)
    }

    /// Whether the provider is business-critical
    pub fn is_critical(&self, provider: &str) -> bool {
        self.critical.contains(provider)
    }

    /// Business-critical providers
    pub fn critical(&self) -> &BTreeSet<String> {
        &self.critical
    }

    /// Entry bounds
    pub fn bounds(&self) -> WeightBounds {
        self.bounds
    }

    /// Monotonic version, bumped on every update
    pub fn version(&self) -> u64 {
        self.version
    }

    /// When this version was produced
    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    /// Provider ids in order
    pub fn providers(&self) -> impl Iterator<Item = &str> {
        self.weights.keys().map(String::as_str)
    }

    /// `(provider, weight)` pairs in provider order
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.weights.iter().map(|(p, w)| (p.as_str(), *w))
    }

    /// Number of providers
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    /// Whether the table has no providers
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Sum of all weights
    pub fn sum(&self) -> f64 {
        self.weights.values().sum()
    }
}

fn validate_raw(raw: &BTreeMap<String, f64>) -> ConfigResult<()> {
    if raw.is_empty() {
        return Err(ConfigError::EmptyWeights);
    }
    if let Some((provider, weight)) = raw.iter().find(|(_, w)| !w.is_finite() || **w < 0.0) {
        return Err(ConfigError::InvalidWeight {
            provider: provider.clone(),
            weight: *weight,
        });
    }
    if raw.values().all(|w| *w == 0.0) {
        return Err(ConfigError::AllWeightsZero);
    }
    Ok(())
}

/// Water-fill `(raw weight, floor)` pairs to a sum of 1 under ceiling `hi`
///
/// Raw weights must be positive and finite.
pub(crate) fn water_fill(entries: &[(f64, f64)], hi: f64) -> Vec<f64> {
    let n = entries.len();
    if n == 0 {
        return Vec::new();
    }

    let hi = if n as f64 * hi < 1.0 { 1.0 / n as f64 } else { hi };
    let mut lo: Vec<f64> = entries.iter().map(|(_, floor)| floor.min(hi)).collect();
    let floor_sum: f64 = lo.iter().sum();
    if floor_sum > 1.0 {
        lo.iter_mut().for_each(|l| *l /= floor_sum);
    }

    let raw: Vec<f64> = entries.iter().map(|(w, _)| *w).collect();
    let fill = |lambda: f64| -> Vec<f64> {
        raw.iter()
            .zip(&lo)
            .map(|(w, l)| (lambda * w).clamp(*l, hi))
            .collect()
    };

    let smallest = raw.iter().copied().fold(f64::INFINITY, f64::min);
    let mut lambda_lo = 0.0;
    let mut lambda_hi = hi / smallest;
    for _ in 0..NORMALIZE_ITERATIONS {
        let mid = 0.5 * (lambda_lo + lambda_hi);
        if fill(mid).iter().sum::<f64>() < 1.0 {
            lambda_lo = mid;
        } else {
            lambda_hi = mid;
        }
        if lambda_hi - lambda_lo <= f64::EPSILON * lambda_hi {
            break;
        }
    }

    let mut weights = fill(lambda_hi);
    distribute_residual(&mut weights, &lo, hi);
    weights
}

/// Spread `1 − Σw` over entries with room, proportionally to their room
fn distribute_residual(weights: &mut [f64], lo: &[f64], hi: f64) {
    let residual = 1.0 - weights.iter().sum::<f64>();
    if residual.abs() <= f64::EPSILON {
        return;
    }

    let room: Vec<f64> = if residual > 0.0 {
        weights.iter().map(|w| (hi - w).max(0.0)).collect()
    } else {
        weights.iter().zip(lo).map(|(w, l)| (w - l).max(0.0)).collect()
    };
    let total_room: f64 = room.iter().sum();
    if total_room <= 0.0 {
        return;
    }

    for ((w, r), l) in weights.iter_mut().zip(&room).zip(lo) {
        *w = (*w + residual * r / total_room).clamp(*l, hi);
    }
}

/// Whether a table satisfies its invariants
pub fn is_normalized(table: &WeightTable) -> bool {
    let n = table.len() as f64;
    let hi = if n * table.bounds.max < 1.0 { 1.0 / n } else { table.bounds.max };
    (table.sum() - 1.0).abs() <= SUM_TOLERANCE
        && table.iter().all(|(_, w)| w <= hi + SUM_TOLERANCE && w >= -SUM_TOLERANCE)
}
