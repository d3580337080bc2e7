//! Quality Dimension Weights, Grades and Scoring Bands
//!
//! This module defines the weights of the six quality dimensions, grade
//! cutoffs, and the scoring bands used by the individual sub-checks.

// ===== DIMENSION WEIGHTS =====

/// Weight of the completeness sub-score in the overall score.
///
/// Source: Production scoring profile
pub const WEIGHT_COMPLETENESS: f64 = 0.20;

/// Weight of the accuracy sub-score in the overall score.
///
/// Highest weight: a complete, fresh, but wrong price is worse than a
/// slightly stale correct one.
///
/// Source: Production scoring profile
pub const WEIGHT_ACCURACY: f64 = 0.25;

/// Weight of the timeliness sub-score in the overall score.
pub const WEIGHT_TIMELINESS: f64 = 0.20;

/// Weight of the consistency sub-score in the overall score.
pub const WEIGHT_CONSISTENCY: f64 = 0.15;

/// Weight of the validity sub-score in the overall score.
pub const WEIGHT_VALIDITY: f64 = 0.15;

/// Weight of the reliability sub-score in the overall score.
///
/// Kept small because reliability is partly derived from completeness and
/// timeliness of the same reading.
pub const WEIGHT_RELIABILITY: f64 = 0.05;

// ===== GRADES =====

/// Minimum overall score for the Excellent grade.
pub const GRADE_EXCELLENT: f64 = 0.90;

/// Minimum overall score for the Good grade.
pub const GRADE_GOOD: f64 = 0.70;

/// Minimum overall score for the Fair grade.
///
/// Below this a reading is graded Poor.
pub const GRADE_FAIR: f64 = 0.50;

/// Score assigned when a sub-check cannot be evaluated.
///
/// Missing fields, wrong payload shapes and NaNs degrade the relevant
/// sub-score to neutral instead of aborting the whole analysis.
///
/// Source: Neutral prior (no evidence either way)
pub const NEUTRAL_SCORE: f64 = 0.5;

// ===== TIMELINESS BANDS =====

/// Timeliness bands as `(max age in minutes, score)`, checked in order.
///
/// Anything older than the last band scores [`TIMELINESS_FLOOR`].
///
/// ```text
/// age   ≤30m  ≤2h  ≤6h  ≤24h  ≤72h  older
/// score 1.0   0.9  0.7  0.5   0.3   0.1
/// ```
///
/// Source: Intraday market-data freshness expectations
pub const TIMELINESS_BANDS: [(u64, f64); 5] = [
    (30, 1.0),
    (2 * 60, 0.9),
    (6 * 60, 0.7),
    (24 * 60, 0.5),
    (72 * 60, 0.3),
];

/// Timeliness score for data older than three days.
pub const TIMELINESS_FLOOR: f64 = 0.1;

// ===== COMPLETENESS =====

/// Share of the completeness score carried by required fields.
pub const REQUIRED_FIELDS_SHARE: f64 = 0.7;

/// Share of the completeness score carried by optional fields.
pub const OPTIONAL_FIELDS_SHARE: f64 = 0.3;

/// Importance of the price field.
pub const IMPORTANCE_PRICE: f64 = 1.0;
/// Importance of the volume field.
pub const IMPORTANCE_VOLUME: f64 = 0.8;
/// Importance of the change percentage field.
pub const IMPORTANCE_CHANGE_PCT: f64 = 0.9;
/// Importance of each of the open/high/low fields.
pub const IMPORTANCE_OHL: f64 = 0.7;
/// Importance of the previous close field.
pub const IMPORTANCE_PREV_CLOSE: f64 = 0.6;
/// Importance of the turnover field.
pub const IMPORTANCE_TURNOVER: f64 = 0.5;
/// Importance of the display name field.
pub const IMPORTANCE_NAME: f64 = 0.3;

/// News completeness credit for a present title.
pub const NEWS_TITLE_CREDIT: f64 = 1.0;
/// News completeness credit for summary, publish time and source.
pub const NEWS_IMPORTANT_CREDIT: f64 = 0.8;
/// News completeness credit for url and relevance.
pub const NEWS_OPTIONAL_CREDIT: f64 = 0.5;

// ===== PRICE ACCURACY / VALIDITY =====

/// Daily change (percent) considered normal.
///
/// Mainland A-share daily limit is ±10% (±20% on STAR/ChiNext boards).
///
/// Source: Exchange price-limit rules
pub const CHANGE_PCT_NORMAL: f64 = 20.0;

/// Daily change (percent) considered extreme but possible.
///
/// Covers IPO first days and unrestricted markets.
pub const CHANGE_PCT_EXTREME: f64 = 50.0;

/// Upper bound for a plausible quoted price.
pub const MAX_PLAUSIBLE_PRICE: f64 = 1_000_000.0;

/// Maximum decimal places before a price is flagged as imprecise.
///
/// Quotes are usually 2-3 decimals; more hints at float noise from a
/// derived field.
pub const MAX_PRICE_DECIMALS: usize = 4;

/// Tolerance (percentage points) for reported vs computed change.
pub const CHANGE_PCT_TOLERANCE_TIGHT: f64 = 0.1;

/// Looser tolerance (percentage points) for reported vs computed change.
pub const CHANGE_PCT_TOLERANCE_LOOSE: f64 = 0.5;

/// Minimum turnover / (volume × price) ratio treated as consistent.
///
/// Allows 20% slack for lot-size rounding and VWAP vs last price.
pub const TURNOVER_RATIO_MIN: f64 = 0.8;

/// Static provider benchmarks as `(provider, accuracy, timeliness, completeness)`.
///
/// Source: Historical audit of the production provider mix
pub const DEFAULT_BENCHMARKS: [(&str, f64, f64, f64); 6] = [
    ("eastmoney", 0.85, 0.90, 0.88),
    ("tencent", 0.82, 0.92, 0.85),
    ("sina", 0.78, 0.85, 0.80),
    ("xueqiu", 0.75, 0.80, 0.75),
    ("tushare", 0.90, 0.70, 0.95),
    ("akshare", 0.70, 0.75, 0.85),
];

/// Default benchmark accuracy for price data from an unknown provider.
pub const DEFAULT_PRICE_BENCHMARK_ACCURACY: f64 = 0.7;

/// Default benchmark accuracy for news from an unknown provider.
pub const DEFAULT_NEWS_BENCHMARK_ACCURACY: f64 = 0.6;

/// Default benchmark accuracy for other metrics and reliability.
pub const DEFAULT_BENCHMARK_ACCURACY: f64 = 0.5;

// ===== RELIABILITY =====

/// Completeness contribution to the reliability sub-score.
pub const RELIABILITY_COMPLETENESS_BONUS: f64 = 0.2;

/// Timeliness contribution to the reliability sub-score.
pub const RELIABILITY_TIMELINESS_BONUS: f64 = 0.1;

// ===== HISTORY =====

/// Quality scores retained per provider and metric.
pub const QUALITY_HISTORY_CAPACITY: usize = 100;

/// Number of most recent scores used for averages and trend.
pub const TREND_WINDOW: usize = 10;

/// Change in mean quality needed to call a trend rising or falling.
pub const TREND_THRESHOLD: f64 = 0.05;
