//! Price quote scoring
//!
//! Quotes carry enough redundancy (open/high/low, previous close, change,
//! turnover) to cross-check themselves. Every check that has the fields it
//! needs contributes; the rest are skipped.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{mean_or_neutral, Dimensions};
use crate::constants::quality::*;
use crate::reading::{finite, text, Quote};

/// Mainland A-share code: six digits
static A_SHARE_SYMBOL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{6}$").expect("constant pattern"));

pub(crate) fn score(quote: &Quote, benchmark_accuracy: f64) -> Dimensions {
    Dimensions {
        completeness: completeness(quote),
        accuracy: accuracy(quote, benchmark_accuracy),
        consistency: consistency(quote),
        validity: validity(quote),
    }
}

fn completeness(q: &Quote) -> f64 {
    let has = |v: Option<f64>| finite(v).is_some();
    let required = [
        (has(q.price), IMPORTANCE_PRICE),
        (has(q.volume), IMPORTANCE_VOLUME),
        (has(q.change_pct), IMPORTANCE_CHANGE_PCT),
    ];
    let optional = [
        (has(q.open), IMPORTANCE_OHL),
        (has(q.high), IMPORTANCE_OHL),
        (has(q.low), IMPORTANCE_OHL),
        (has(q.prev_close), IMPORTANCE_PREV_CLOSE),
        (has(q.turnover), IMPORTANCE_TURNOVER),
        (text(&q.name).is_some(), IMPORTANCE_NAME),
    ];

    REQUIRED_FIELDS_SHARE * weighted_presence(&required)
        + OPTIONAL_FIELDS_SHARE * weighted_presence(&optional)
}

/// Importance-weighted fraction of present fields
fn weighted_presence(fields: &[(bool, f64)]) -> f64 {
    let total: f64 = fields.iter().map(|(_, w)| w).sum();
    if total == 0.0 {
        return 0.0;
    }
    let present: f64 = fields.iter().filter(|(p, _)| *p).map(|(_, w)| w).sum();
    present / total
}

fn accuracy(q: &Quote, benchmark: f64) -> f64 {
    let mut factors = Vec::with_capacity(4);

    if let Some(price) = finite(q.price) {
        if price <= 0.0 {
            factors.push(0.1);
        } else if let (Some(high), Some(low)) = (finite(q.high), finite(q.low)) {
            factors.push(if low <= price && price <= high { 0.9 } else { 0.3 });
        }
    }

    if let Some(change) = finite(q.change_pct) {
        let change = change.abs();
        factors.push(if change <= CHANGE_PCT_NORMAL {
            0.8
        } else if change <= CHANGE_PCT_EXTREME {
            0.5
        } else {
            0.2
        });
    }

    let prices: Vec<f64> = [q.price, q.open, q.high, q.low, q.prev_close]
        .into_iter()
        .filter_map(finite)
        .collect();
    if !prices.is_empty() {
        let precise = prices.iter().all(|p| decimal_places(*p) <= MAX_PRICE_DECIMALS);
        factors.push(if precise { 0.8 } else { 0.6 });
    }

    factors.push(benchmark);
    mean_or_neutral(&factors)
}

fn consistency(q: &Quote) -> f64 {
    let mut checks = Vec::with_capacity(4);
    let price = finite(q.price);
    let high = finite(q.high);
    let low = finite(q.low);

    if let (Some(p), Some(h), Some(l)) = (price, high, low) {
        checks.push(if l <= p && p <= h { 1.0 } else { 0.2 });
    }

    if let (Some(o), Some(h), Some(l)) = (finite(q.open), high, low) {
        checks.push(if l <= o && o <= h { 1.0 } else { 0.2 });
    }

    if let (Some(p), Some(prev), Some(reported)) = (price, finite(q.prev_close), finite(q.change_pct)) {
        if prev != 0.0 {
            let computed = 100.0 * (p - prev) / prev;
            let diff = (reported - computed).abs();
            checks.push(if diff <= CHANGE_PCT_TOLERANCE_TIGHT {
                1.0
            } else if diff <= CHANGE_PCT_TOLERANCE_LOOSE {
                0.7
            } else {
                0.3
            });
        }
    }

    if let (Some(p), Some(volume), Some(turnover)) = (price, finite(q.volume), finite(q.turnover)) {
        let expected = volume * p;
        let hi = turnover.max(expected);
        if hi > 0.0 {
            let ratio = turnover.min(expected) / hi;
            checks.push(if ratio >= TURNOVER_RATIO_MIN { 0.8 } else { 0.5 });
        }
    }

    mean_or_neutral(&checks)
}

fn validity(q: &Quote) -> f64 {
    let mut checks = Vec::with_capacity(4);

    if let Some(price) = finite(q.price) {
        checks.push(if price > 0.0 && price < MAX_PLAUSIBLE_PRICE { 1.0 } else { 0.1 });
    }

    if let Some(volume) = finite(q.volume) {
        checks.push(if volume >= 0.0 { 1.0 } else { 0.0 });
    }

    if let Some(change) = finite(q.change_pct) {
        let change = change.abs();
        checks.push(if change <= CHANGE_PCT_NORMAL {
            1.0
        } else if change <= CHANGE_PCT_EXTREME {
            0.7
        } else {
            0.2
        });
    }

    if let Some(symbol) = text(&q.symbol) {
        checks.push(if A_SHARE_SYMBOL.is_match(symbol) { 1.0 } else { 0.7 });
    }

    mean_or_neutral(&checks)
}

/// Decimal places in the shortest round-tripping representation
fn decimal_places(value: f64) -> usize {
    let repr = value.to_string();
    repr.split_once('.').map_or(0, |(_, frac)| frac.len())
}
