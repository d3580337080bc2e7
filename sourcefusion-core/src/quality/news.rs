//! News article scoring

use super::{mean_or_neutral, Dimensions};
use crate::constants::quality::{
    NEUTRAL_SCORE, NEWS_IMPORTANT_CREDIT, NEWS_OPTIONAL_CREDIT, NEWS_TITLE_CREDIT,
};
use crate::reading::{finite, text, Article};

/// Minimum headline length (chars) considered informative
const INFORMATIVE_TITLE_CHARS: usize = 10;

/// Minimum trimmed headline length (chars) considered valid
const VALID_TITLE_CHARS: usize = 5;

pub(crate) fn score(article: &Article, benchmark_accuracy: f64) -> Dimensions {
    let completeness = completeness(article);
    Dimensions {
        completeness,
        accuracy: accuracy(article, benchmark_accuracy),
        consistency: if article.present_count() > 0 { 0.8 } else { 0.0 },
        validity: validity(article),
    }
}

fn completeness(a: &Article) -> f64 {
    let credit = |present: bool, value: f64| if present { value } else { 0.0 };
    let credits = [
        credit(text(&a.title).is_some(), NEWS_TITLE_CREDIT),
        credit(text(&a.summary).is_some(), NEWS_IMPORTANT_CREDIT),
        credit(a.published_at.is_some(), NEWS_IMPORTANT_CREDIT),
        credit(text(&a.source).is_some(), NEWS_IMPORTANT_CREDIT),
        credit(text(&a.url).is_some(), NEWS_OPTIONAL_CREDIT),
        credit(finite(a.relevance_score).is_some(), NEWS_OPTIONAL_CREDIT),
    ];
    credits.iter().sum::<f64>() / credits.len() as f64
}

fn accuracy(a: &Article, benchmark: f64) -> f64 {
    let mut factors = Vec::with_capacity(4);

    if let Some(title) = text(&a.title) {
        let informative = title.chars().count() >= INFORMATIVE_TITLE_CHARS
            && !title.chars().all(|c| c.is_ascii_alphanumeric());
        factors.push(if informative { 0.8 } else { 0.6 });
    }

    let relevance = finite(a.relevance_score).map_or(NEUTRAL_SCORE, |r| r.clamp(0.0, 1.0));
    factors.push(relevance);
    factors.push(if a.published_at.is_some() { 0.7 } else { 0.4 });
    factors.push(benchmark);

    mean_or_neutral(&factors)
}

fn validity(a: &Article) -> f64 {
    let mut checks = Vec::with_capacity(3);

    if let Some(title) = text(&a.title) {
        checks.push(if title.chars().count() >= VALID_TITLE_CHARS { 1.0 } else { 0.3 });
    }

    if let Some(url) = text(&a.url) {
        let web = url.starts_with("http://") || url.starts_with("https://");
        checks.push(if web { 1.0 } else { 0.5 });
    }

    if let Some(relevance) = finite(a.relevance_score) {
        checks.push(if (0.0..=1.0).contains(&relevance) { 1.0 } else { 0.3 });
    }

    mean_or_neutral(&checks)
}
