//! End-to-end fusion scenarios
//!
//! Covers:
//! - Three-source agreement and adaptive method selection
//! - Outlier rejection through the median
//! - Empty and fully invalid input
//! - Idempotence of repeated fusion
//! - Quality scores feeding fusion weights

mod common;

use std::collections::BTreeMap;

use sourcefusion_core::fusion::{FusionMethod, FusionResult};
use sourcefusion_core::quality::QualityAnalyzer;
use sourcefusion_core::{MetricType, Reading, WeightTable};

use common::{clock, engine, quote, Scenarios, NOW};

#[test]
fn scenarios_stay_in_expected_range() {
    for scenario in Scenarios::all() {
        let clock = clock();
        let result = engine(&clock).fuse(&scenario.readings, &WeightTable::default(), FusionMethod::Adaptive);
        let fused = result.fused().expect(scenario.name);

        assert!(
            fused.value >= scenario.expected.min && fused.value <= scenario.expected.max,
            "{}: {} outside [{}, {}]",
            scenario.name,
            fused.value,
            scenario.expected.min,
            scenario.expected.max
        );
        assert_eq!(fused.valid_count, scenario.expected.valid, "{}", scenario.name);

        let total: f64 = fused.source_weights.values().sum();
        assert!((total - 1.0).abs() < 1e-9, "{}: weights sum {total}", scenario.name);
        assert!((0.0..=1.0).contains(&fused.confidence));
        assert!((0.0..=1.0).contains(&fused.quality));
    }
}

#[test]
fn agreeing_sources_use_weighted_average() {
    let clock = clock();
    let scenario = Scenarios::three_source_agreement();
    let result = engine(&clock).fuse(&scenario.readings, &WeightTable::default(), FusionMethod::Adaptive);
    let fused = result.fused().expect("nothing fused");

    assert_eq!(fused.method, FusionMethod::WeightedAverage);
    assert_eq!(fused.requested_method, FusionMethod::Adaptive);
    assert_eq!(fused.contributing_providers.len(), 3);
    // eastmoney has the highest base weight, quality and confidence
    let top = fused
        .source_weights
        .iter()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(p, _)| p.as_str());
    assert_eq!(top, Some("eastmoney"));
    // agreement earns the diversity and consistency bonuses
    assert!(fused.quality > 0.85);
}

#[test]
fn outlier_is_rejected_by_median() {
    let clock = clock();
    let scenario = Scenarios::single_outlier();
    let result = engine(&clock).fuse(&scenario.readings, &WeightTable::default(), FusionMethod::Adaptive);
    let fused = result.fused().expect("nothing fused");

    assert_eq!(fused.method, FusionMethod::Median);
    assert!((fused.value - 10.025).abs() < 1e-9);

    // the same readings averaged are dragged toward the outlier
    let averaged = engine(&clock)
        .fuse(&scenario.readings, &WeightTable::default(), FusionMethod::WeightedAverage)
        .value()
        .unwrap();
    assert!(averaged > 11.0);
}

#[test]
fn reference_quotes_fuse_by_weighted_average() {
    let clock = clock();
    let scenario = Scenarios::reference_agreement();
    let result = engine(&clock).fuse(&scenario.readings, &WeightTable::default(), FusionMethod::Adaptive);
    let fused = result.fused().expect("nothing fused");

    assert_eq!(fused.method, FusionMethod::WeightedAverage);
    assert!(fused.value >= 25.28 && fused.value <= 25.32, "{}", fused.value);
    assert!(fused.confidence > 0.75, "{}", fused.confidence);
}

#[test]
fn reference_outlier_takes_the_median() {
    let clock = clock();
    let scenario = Scenarios::reference_outlier();
    let result = engine(&clock).fuse(&scenario.readings, &WeightTable::default(), FusionMethod::Adaptive);
    let fused = result.fused().expect("nothing fused");

    assert_eq!(fused.method, FusionMethod::Median);
    assert!((fused.value - 25.30).abs() < 1e-9, "{}", fused.value);
}

#[test]
fn empty_and_invalid_input() {
    let clock = clock();
    let engine = engine(&clock);
    let table = WeightTable::default();

    assert!(matches!(
        engine.fuse(&[], &table, FusionMethod::Adaptive),
        FusionResult::Empty { input_count: 0, .. }
    ));

    let stale = Reading::price("sina", 10.0, NOW - 3 * 60 * 60 * 1_000);
    let anonymous = Reading::price("  ", 10.0, NOW);
    let result = engine.fuse(&[stale, anonymous], &table, FusionMethod::Median);
    assert!(!result.is_fused());
    assert_eq!(result.timestamp(), NOW);
}

#[test]
fn fusing_twice_gives_the_same_result() {
    let clock = clock();
    let engine = engine(&clock);
    let scenario = Scenarios::noisy_market(11);
    let table = WeightTable::default();

    let first = engine.fuse(&scenario.readings, &table, FusionMethod::Adaptive);
    let second = engine.fuse(&scenario.readings, &table, FusionMethod::Adaptive);
    assert_eq!(first, second);

    let stats = engine.provider_stats("eastmoney").unwrap();
    assert_eq!(stats.calls, 1);
}

#[test]
fn analyzed_quality_drives_weights() {
    let clock = clock();
    let engine = engine(&clock);
    let analyzer = QualityAnalyzer::default();

    // same provider weight for both, only payload quality differs
    let mut raw = BTreeMap::new();
    raw.insert("tencent".to_string(), 1.0);
    raw.insert("sina".to_string(), 1.0);
    let table = WeightTable::normalized(&raw, &Default::default(), Default::default(), NOW)
        .unwrap();

    let fresh = Reading::price("tencent", 20.0, NOW - 1_000);
    let old = Reading::price("sina", 20.2, NOW - 50 * 60 * 1_000);
    let readings: Vec<Reading> = [fresh, old]
        .into_iter()
        .map(|r| {
            let score = analyzer.analyze(&r, MetricType::Price, NOW);
            r.with_quality(score.overall).with_confidence(0.8)
        })
        .collect();
    assert!(readings[0].quality_score > readings[1].quality_score);

    let fused = engine
        .fuse(&readings, &table, FusionMethod::WeightedAverage)
        .fused()
        .cloned()
        .expect("nothing fused");
    assert!(fused.source_weights["tencent"] > fused.source_weights["sina"]);
    assert!(fused.value < 20.1);
}

#[test]
fn unknown_provider_uses_default_base_weight() {
    let clock = clock();
    let readings = vec![quote("eastmoney", 10.0, 0.9, 0.9), quote("newcomer", 10.0, 0.9, 0.9)];
    let fused = engine(&clock)
        .fuse(&readings, &WeightTable::default(), FusionMethod::WeightedAverage)
        .fused()
        .cloned()
        .expect("nothing fused");
    assert!(fused.source_weights.contains_key("newcomer"));
    assert!(fused.source_weights["newcomer"] < fused.source_weights["eastmoney"]);
}
