//! Common test utilities and reading generators for integration tests
//!
//! This module provides:
//! - A deterministic RNG so scenario data is reproducible
//! - Pre-built provider scenarios with their expected outcomes
//! - Engine and manager constructors on a fixed clock

#![allow(dead_code)]

use std::sync::Arc;

use sourcefusion_core::fusion::{FusionConfig, FusionEngine};
use sourcefusion_core::time::{FixedTime, Timestamp};
use sourcefusion_core::weights::{WeightConfig, WeightManager};
use sourcefusion_core::Reading;

/// Wall-clock-like start time for scenarios
pub const NOW: Timestamp = 1_700_000_000_000;

/// The six providers of the default weight table
pub const PROVIDERS: [&str; 6] = ["eastmoney", "tencent", "sina", "xueqiu", "tushare", "akshare"];

/// Deterministic random number generator for tests
pub struct TestRng {
    state: u64,
}

impl TestRng {
    pub fn new(seed: u64) -> Self {
        Self { state: seed.max(1) }
    }

    pub fn next_u64(&mut self) -> u64 {
        // Xorshift
        self.state ^= self.state << 13;
        self.state ^= self.state >> 7;
        self.state ^= self.state << 17;
        self.state
    }

    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    pub fn gen_range(&mut self, min: f64, max: f64) -> f64 {
        min + self.next_f64() * (max - min)
    }
}

/// Fixed clock shared by everything a test builds
pub fn clock() -> Arc<FixedTime> {
    Arc::new(FixedTime::new(NOW))
}

pub fn engine(clock: &Arc<FixedTime>) -> FusionEngine {
    FusionEngine::new(FusionConfig::default(), clock.clone())
}

pub fn manager(clock: &Arc<FixedTime>, config: WeightConfig) -> WeightManager {
    WeightManager::new(config, clock.clone()).expect("weight manager")
}

/// A price reading one second old with the given signals
pub fn quote(provider: &str, price: f64, quality: f64, confidence: f64) -> Reading {
    Reading::price(provider, price, NOW - 1_000)
        .with_quality(quality)
        .with_confidence(confidence)
        .with_latency(150.0)
}

/// Expected fusion outcome of a scenario
pub struct Expected {
    pub min: f64,
    pub max: f64,
    pub valid: usize,
}

/// Readings plus what fusing them should give
pub struct TestScenario {
    pub name: &'static str,
    pub readings: Vec<Reading>,
    pub expected: Expected,
}

/// Pre-built scenario definitions
pub struct Scenarios;

impl Scenarios {
    /// Three providers quoting within a few cents
    pub fn three_source_agreement() -> TestScenario {
        TestScenario {
            name: "three_source_agreement",
            readings: vec![
                quote("eastmoney", 25.30, 0.9, 0.9),
                quote("tencent", 25.32, 0.85, 0.8),
                quote("sina", 25.29, 0.8, 0.8),
            ],
            expected: Expected {
                min: 25.29,
                max: 25.32,
                valid: 3,
            },
        }
    }

    /// One provider reports a price an order of magnitude off
    pub fn single_outlier() -> TestScenario {
        TestScenario {
            name: "single_outlier",
            readings: vec![
                quote("eastmoney", 10.00, 0.9, 0.9),
                quote("tencent", 10.05, 0.9, 0.9),
                quote("sina", 9.98, 0.9, 0.9),
                quote("xueqiu", 100.0, 0.9, 0.9),
            ],
            expected: Expected {
                min: 9.98,
                max: 10.05,
                valid: 4,
            },
        }
    }

    /// The reference three-source quote: CV well under 5%
    pub fn reference_agreement() -> TestScenario {
        TestScenario {
            name: "reference_agreement",
            readings: vec![
                quote("eastmoney", 25.30, 0.9, 0.85),
                quote("tencent", 25.28, 0.8, 0.80),
                quote("sina", 25.32, 0.75, 0.75),
            ],
            expected: Expected {
                min: 25.28,
                max: 25.32,
                valid: 3,
            },
        }
    }

    /// The reference outlier: one source at 40.00 against two near 25.30
    pub fn reference_outlier() -> TestScenario {
        TestScenario {
            name: "reference_outlier",
            readings: vec![
                quote("eastmoney", 25.30, 0.9, 0.85),
                quote("tencent", 25.28, 0.8, 0.80),
                quote("sina", 40.00, 0.75, 0.75),
            ],
            expected: Expected {
                min: 25.28,
                max: 25.32,
                valid: 3,
            },
        }
    }

    /// Noisy quotes around a true price from every default provider
    pub fn noisy_market(seed: u64) -> TestScenario {
        let mut rng = TestRng::new(seed);
        let readings = PROVIDERS
            .iter()
            .map(|p| {
                quote(
                    p,
                    50.0 + rng.gen_range(-0.5, 0.5),
                    rng.gen_range(0.6, 1.0),
                    rng.gen_range(0.6, 1.0),
                )
            })
            .collect();
        TestScenario {
            name: "noisy_market",
            readings,
            expected: Expected {
                min: 49.5,
                max: 50.5,
                valid: PROVIDERS.len(),
            },
        }
    }

    pub fn all() -> Vec<TestScenario> {
        vec![
            Self::three_source_agreement(),
            Self::single_outlier(),
            Self::reference_agreement(),
            Self::reference_outlier(),
            Self::noisy_market(7),
        ]
    }
}
