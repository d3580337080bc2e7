//! Static per-provider benchmarks
//!
//! Long-run accuracy, timeliness and completeness measured for each known
//! provider. They anchor the accuracy and reliability dimensions so a single
//! plausible-looking reading from an unproven provider does not outscore a
//! reading from a provider with a good record.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::quality::{
    DEFAULT_BENCHMARKS, DEFAULT_BENCHMARK_ACCURACY, DEFAULT_NEWS_BENCHMARK_ACCURACY,
    DEFAULT_PRICE_BENCHMARK_ACCURACY,
};
use crate::errors::{ensure_unit, ConfigResult};

/// Benchmark figures for one provider
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProviderBenchmark {
    /// Long-run accuracy
    pub accuracy: f64,
    /// Long-run timeliness
    pub timeliness: f64,
    /// Long-run completeness
    pub completeness: f64,
}

/// Provider id → benchmark
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkTable {
    entries: BTreeMap<String, ProviderBenchmark>,
}

impl Default for BenchmarkTable {
    fn default() -> Self {
        let entries = DEFAULT_BENCHMARKS
            .iter()
            .map(|(name, accuracy, timeliness, completeness)| {
                (
                    (*name).to_string(),
                    ProviderBenchmark {
                        accuracy: *accuracy,
                        timeliness: *timeliness,
                        completeness: *completeness,
                    },
                )
            })
            .collect();
        Self { entries }
    }
}

impl BenchmarkTable {
    /// Table without any known provider
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Add or replace a provider's benchmark
    pub fn with(mut self, provider: impl Into<String>, benchmark: ProviderBenchmark) -> Self {
        self.entries.insert(provider.into(), benchmark);
        self
    }

    /// Benchmark of a provider, if known
    pub fn get(&self, provider: &str) -> Option<&ProviderBenchmark> {
        self.entries.get(provider)
    }

    /// Number of known providers
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no provider is known
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All figures must lie in `[0, 1]`
    pub fn validate(&self) -> ConfigResult<()> {
        for b in self.entries.values() {
            ensure_unit("benchmark accuracy", b.accuracy)?;
            ensure_unit("benchmark timeliness", b.timeliness)?;
            ensure_unit("benchmark completeness", b.completeness)?;
        }
        Ok(())
    }

    fn accuracy_or(&self, provider: &str, default: f64) -> f64 {
        self.get(provider).map_or(default, |b| b.accuracy)
    }

    /// Accuracy prior for price readings
    pub fn price_accuracy(&self, provider: &str) -> f64 {
        self.accuracy_or(provider, DEFAULT_PRICE_BENCHMARK_ACCURACY)
    }

    /// Accuracy prior for news readings
    pub fn news_accuracy(&self, provider: &str) -> f64 {
        self.accuracy_or(provider, DEFAULT_NEWS_BENCHMARK_ACCURACY)
    }

    /// Accuracy prior for every other metric
    pub fn generic_accuracy(&self, provider: &str) -> f64 {
        self.accuracy_or(provider, DEFAULT_BENCHMARK_ACCURACY)
    }

    /// Base of the reliability dimension
    pub fn reliability_base(&self, provider: &str) -> f64 {
        self.accuracy_or(provider, DEFAULT_BENCHMARK_ACCURACY)
    }
}
