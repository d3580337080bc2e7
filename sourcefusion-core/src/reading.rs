//! Reading types
//!
//! A [`Reading`] is one provider's timestamped observation of one metric. It
//! is produced by an external collector, scored by the quality analyzer,
//! consumed once by the fusion engine and then dropped.
//!
//! Payloads are a closed enum rather than an open map so the invariants the
//! scorers rely on (which fields exist, which are numeric) are enforced by
//! the type system. Provider-specific extras go into `metadata`.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::fusion::DEFAULT_SIGNAL;
use crate::time::Timestamp;

/// Kind of metric a reading reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    /// Real-time traded price (quote)
    Price,
    /// News article
    News,
    /// Sentiment indicator
    Sentiment,
    /// Technical indicator
    Technical,
    /// Fundamental figure
    Fundamental,
}

impl MetricType {
    /// Stable lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Price => "price",
            Self::News => "news",
            Self::Sentiment => "sentiment",
            Self::Technical => "technical",
            Self::Fundamental => "fundamental",
        }
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Market quote as reported by a price provider
///
/// Every field is optional; providers differ in what they report.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Quote {
    /// Last traded price
    pub price: Option<f64>,
    /// Traded volume (shares)
    pub volume: Option<f64>,
    /// Change versus previous close, in percent
    pub change_pct: Option<f64>,
    /// Session open
    pub open: Option<f64>,
    /// Session high
    pub high: Option<f64>,
    /// Session low
    pub low: Option<f64>,
    /// Previous session close
    pub prev_close: Option<f64>,
    /// Traded value (currency)
    pub turnover: Option<f64>,
    /// Exchange symbol, e.g. `600519`
    pub symbol: Option<String>,
    /// Display name
    pub name: Option<String>,
}

impl Quote {
    /// Quote carrying only a price
    pub fn with_price(price: f64) -> Self {
        Self {
            price: Some(price),
            ..Self::default()
        }
    }

    /// Number of fields a quote can carry
    pub const FIELD_COUNT: usize = 10;

    /// Number of fields actually present
    pub fn present_count(&self) -> usize {
        let numbers = [
            self.price,
            self.volume,
            self.change_pct,
            self.open,
            self.high,
            self.low,
            self.prev_close,
            self.turnover,
        ];
        let texts = [&self.symbol, &self.name];

        numbers.iter().filter(|v| finite(**v).is_some()).count()
            + texts.iter().filter(|t| text(t).is_some()).count()
    }
}

/// News article as reported by a news provider
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Article {
    /// Headline
    pub title: Option<String>,
    /// Abstract or lead paragraph
    pub summary: Option<String>,
    /// Publication time
    pub published_at: Option<Timestamp>,
    /// Publishing outlet
    pub source: Option<String>,
    /// Link to the full article
    pub url: Option<String>,
    /// Provider-assigned relevance in `[0, 1]`
    pub relevance_score: Option<f64>,
}

impl Article {
    /// Number of fields an article can carry
    pub const FIELD_COUNT: usize = 6;

    /// Number of fields actually present
    pub fn present_count(&self) -> usize {
        [&self.title, &self.summary, &self.source, &self.url]
            .iter()
            .filter(|t| text(t).is_some())
            .count()
            + usize::from(self.published_at.is_some())
            + usize::from(finite(self.relevance_score).is_some())
    }
}

/// Value carried by a reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Payload {
    /// A single number
    Scalar(f64),
    /// A structured market quote
    Quote(Quote),
    /// A news article
    Article(Article),
}

impl Payload {
    /// Numeric value used for fusion, if any
    ///
    /// Scalars yield themselves and quotes yield their price. Non-finite
    /// numbers count as missing.
    pub fn numeric(&self) -> Option<f64> {
        match self {
            Self::Scalar(v) => finite(Some(*v)),
            Self::Quote(q) => finite(q.price),
            Self::Article(_) => None,
        }
    }

    /// Fraction of the payload's fields that are present
    pub fn present_fraction(&self) -> f64 {
        match self {
            Self::Scalar(v) => {
                if v.is_finite() {
                    1.0
                } else {
                    0.0
                }
            }
            Self::Quote(q) => q.present_count() as f64 / Quote::FIELD_COUNT as f64,
            Self::Article(a) => a.present_count() as f64 / Article::FIELD_COUNT as f64,
        }
    }
}

/// One provider's observation of one metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Provider id
    pub provider: String,
    /// Declared metric type
    pub metric: MetricType,
    /// Observed value
    pub value: Payload,
    /// When the provider observed the value
    pub observed_at: Timestamp,
    /// Fetch latency in milliseconds
    pub latency_ms: f64,
    /// Quality of this reading in `[0, 1]`
    pub quality_score: f64,
    /// Provider confidence in `[0, 1]`
    pub confidence: f64,
    /// Provider-specific extras
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Reading {
    /// Create a reading with neutral quality and confidence
    pub fn new(
        provider: impl Into<String>,
        metric: MetricType,
        value: Payload,
        observed_at: Timestamp,
    ) -> Self {
        Self {
            provider: provider.into(),
            metric,
            value,
            observed_at,
            latency_ms: 0.0,
            quality_score: DEFAULT_SIGNAL,
            confidence: DEFAULT_SIGNAL,
            metadata: BTreeMap::new(),
        }
    }

    /// Scalar price reading
    pub fn price(provider: impl Into<String>, price: f64, observed_at: Timestamp) -> Self {
        Self::new(provider, MetricType::Price, Payload::Scalar(price), observed_at)
    }

    /// Set the quality score
    pub fn with_quality(mut self, quality: f64) -> Self {
        self.quality_score = quality;
        self
    }

    /// Set the confidence
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    /// Set the fetch latency
    pub fn with_latency(mut self, latency_ms: f64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    /// Attach a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Numeric value used for fusion
    pub fn numeric(&self) -> Option<f64> {
        self.value.numeric()
    }
}

/// Finite number or nothing
pub(crate) fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// Non-blank text or nothing
pub(crate) fn text(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_value_of_payloads() {
        assert_eq!(Payload::Scalar(25.3).numeric(), Some(25.3));
        assert_eq!(Payload::Quote(Quote::with_price(10.0)).numeric(), Some(10.0));
        assert_eq!(Payload::Quote(Quote::default()).numeric(), None);
        assert_eq!(Payload::Article(Article::default()).numeric(), None);
        assert_eq!(Payload::Scalar(f64::NAN).numeric(), None);
    }

    #[test]
    fn blank_text_is_absent() {
        let quote = Quote {
            price: Some(1.0),
            symbol: Some("   ".into()),
            name: Some("Moutai".into()),
            volume: Some(f64::INFINITY),
            ..Quote::default()
        };
        assert_eq!(quote.present_count(), 2);
    }

    #[test]
    fn article_fraction() {
        let article = Article {
            title: Some("Earnings beat".into()),
            published_at: Some(1),
            relevance_score: Some(0.4),
            ..Article::default()
        };
        assert!((Payload::Article(article).present_fraction() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn reading_builder_defaults() {
        let reading = Reading::price("sina", 25.3, 1_000)
            .with_quality(0.9)
            .with_latency(120.0)
            .with_metadata("symbol", serde_json::json!("600519"));

        assert_eq!(reading.metric, MetricType::Price);
        assert_eq!(reading.confidence, DEFAULT_SIGNAL);
        assert_eq!(reading.quality_score, 0.9);
        assert_eq!(reading.numeric(), Some(25.3));
        assert_eq!(reading.metadata["symbol"], "600519");
    }

    #[test]
    fn payload_serializes_with_kind_tag() {
        let json = serde_json::to_value(Payload::Scalar(1.5)).unwrap();
        assert_eq!(json["kind"], "scalar");
        assert_eq!(json["data"], 1.5);
    }
}
