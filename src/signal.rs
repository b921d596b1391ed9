//! # Signal Types
//!
//! The scored sentiment output (`SentimentVerdict`) and the final unit
//! delivered to callers (`AggregatedSignal`). Wire shapes use camelCase keys
//! so the dashboard front end can consume them unchanged.
//!
//! Invariants:
//! - `AggregatedSignal` is always a value, never an error: total failure is
//!   expressed as `hold` with zero confidence (`AggregatedSignal::fallback`).
//! - Breakdown weights sum to 1.0 across sources that produced content, and
//!   are all zero when none did.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::content::Source;

/// The discrete trading recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalAction {
    Buy,
    Sell,
    Hold,
}

/// Direction of the aggregate sentiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Bullish,
    Bearish,
    Neutral,
}

impl Sentiment {
    /// Classify a continuous score at the +/-0.2 thresholds.
    pub fn classify(score: f64) -> Self {
        if score > 0.2 {
            Sentiment::Bullish
        } else if score < -0.2 {
            Sentiment::Bearish
        } else {
            Sentiment::Neutral
        }
    }

    /// Sign-only classification used for per-source breakdown labels.
    pub fn from_sign(score: f64) -> Self {
        if score > 0.0 {
            Sentiment::Bullish
        } else if score < 0.0 {
            Sentiment::Bearish
        } else {
            Sentiment::Neutral
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FactorKind {
    Positive,
    Negative,
    Neutral,
}

/// One human-readable driver behind a signal, e.g. `{positive, "Social Volume", "+4%"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Factor {
    #[serde(rename = "type")]
    pub kind: FactorKind,
    pub label: String,
    pub value: String,
}

impl Factor {
    pub fn new(kind: FactorKind, label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind,
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Score and (renormalized) weight one source contributed to the verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceScore {
    pub sentiment: Sentiment,
    pub score: f64,
    pub weight: f64,
}

impl SourceScore {
    pub fn neutral() -> Self {
        Self {
            sentiment: Sentiment::Neutral,
            score: 0.0,
            weight: 0.0,
        }
    }
}

/// Per-source breakdown of a verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceBreakdown {
    pub youtube: SourceScore,
    pub twitter: SourceScore,
    pub reddit: SourceScore,
}

impl SourceBreakdown {
    pub fn neutral() -> Self {
        Self {
            youtube: SourceScore::neutral(),
            twitter: SourceScore::neutral(),
            reddit: SourceScore::neutral(),
        }
    }

    pub fn get(&self, source: Source) -> &SourceScore {
        match source {
            Source::Youtube => &self.youtube,
            Source::Twitter => &self.twitter,
            Source::Reddit => &self.reddit,
        }
    }
}

/// Output of a sentiment scoring strategy (LLM or heuristic).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentimentVerdict {
    pub overall_sentiment: Sentiment,
    /// Continuous score in [-1, 1].
    pub overall_score: f64,
    /// Confidence in [0, 1].
    pub overall_confidence: f64,
    pub summary: String,
    #[serde(default)]
    pub factors: Vec<Factor>,
    pub source_breakdown: SourceBreakdown,
}

/// Discrete decision produced by the trading rule (or its LLM counterpart).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalDecision {
    pub signal: SignalAction,
    /// Percentage, 0-100.
    pub confidence: f64,
    pub reasoning: String,
}

/// Counts, scores and weights per source as delivered to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceContribution {
    pub count: usize,
    pub sentiment: f64,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceContributions {
    pub youtube: SourceContribution,
    pub twitter: SourceContribution,
    pub reddit: SourceContribution,
}

/// The final unit delivered to callers. Always present: even total data
/// unavailability yields a hold/zero-confidence value, never an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedSignal {
    pub ticker: String,
    pub signal: SignalAction,
    /// Integer percentage, 0-100.
    pub confidence: u8,
    pub sentiment_score: f64,
    pub summary: String,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub last_updated: DateTime<Utc>,
    pub sources: SourceContributions,
    pub factors: Vec<Factor>,
}

impl AggregatedSignal {
    /// Terminal fallback when no source returned content and the price fetch
    /// failed. Never cached.
    pub fn fallback(ticker: &str, reason: &str) -> Self {
        Self {
            ticker: ticker.to_string(),
            signal: SignalAction::Hold,
            confidence: 0,
            sentiment_score: 0.0,
            summary: format!("Unable to analyze sentiment: {reason}"),
            price: 0.0,
            change: 0.0,
            change_percent: 0.0,
            last_updated: Utc::now(),
            sources: SourceContributions {
                youtube: SourceContribution { count: 0, sentiment: 0.0, weight: 0.0 },
                twitter: SourceContribution { count: 0, sentiment: 0.0, weight: 0.0 },
                reddit: SourceContribution { count: 0, sentiment: 0.0, weight: 0.0 },
            },
            factors: vec![Factor::new(FactorKind::Neutral, "Status", "Data unavailable")],
        }
    }
}

/// Flattened display shape consumed by the dashboard pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockSignal {
    pub id: String,
    pub ticker: String,
    pub name: String,
    pub signal: SignalAction,
    pub confidence: u8,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub summary: String,
    pub last_updated: DateTime<Utc>,
    pub sources: SourceCounts,
    pub factors: Vec<Factor>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCounts {
    pub youtube: usize,
    pub twitter: usize,
    pub reddit: usize,
}

/// Flatten an [`AggregatedSignal`] for display.
pub fn to_stock_signal(aggregated: &AggregatedSignal, name: &str, id: &str) -> StockSignal {
    StockSignal {
        id: id.to_string(),
        ticker: aggregated.ticker.clone(),
        name: name.to_string(),
        signal: aggregated.signal,
        confidence: aggregated.confidence,
        price: aggregated.price,
        change: aggregated.change,
        change_percent: aggregated.change_percent,
        summary: aggregated.summary.clone(),
        last_updated: aggregated.last_updated,
        sources: SourceCounts {
            youtube: aggregated.sources.youtube.count,
            twitter: aggregated.sources.twitter.count,
            reddit: aggregated.sources.reddit.count,
        },
        factors: aggregated.factors.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_uses_strict_thresholds() {
        assert_eq!(Sentiment::classify(0.2), Sentiment::Neutral);
        assert_eq!(Sentiment::classify(0.21), Sentiment::Bullish);
        assert_eq!(Sentiment::classify(-0.2), Sentiment::Neutral);
        assert_eq!(Sentiment::classify(-0.21), Sentiment::Bearish);
    }

    #[test]
    fn fallback_signal_shape_is_exact() {
        let s = AggregatedSignal::fallback("TSLA", "no data available for TSLA");
        assert_eq!(s.signal, SignalAction::Hold);
        assert_eq!(s.confidence, 0);
        assert_eq!(s.price, 0.0);
        assert_eq!(
            s.factors,
            vec![Factor::new(FactorKind::Neutral, "Status", "Data unavailable")]
        );
        assert_eq!(s.sources.youtube.weight, 0.0);
        assert_eq!(s.sources.reddit.count, 0);
    }

    #[test]
    fn serialized_signal_matches_dashboard_shape() {
        let s = AggregatedSignal::fallback("AAPL", "x");
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v["ticker"], serde_json::json!("AAPL"));
        assert_eq!(v["signal"], serde_json::json!("hold"));
        assert!(v.get("sentimentScore").is_some());
        assert!(v.get("changePercent").is_some());
        assert!(v.get("lastUpdated").is_some());
        assert_eq!(v["factors"][0]["type"], serde_json::json!("neutral"));
        assert_eq!(v["factors"][0]["label"], serde_json::json!("Status"));
    }

    #[test]
    fn stock_signal_flattens_counts() {
        let mut agg = AggregatedSignal::fallback("NVDA", "x");
        agg.sources.reddit.count = 3;
        let flat = to_stock_signal(&agg, "NVIDIA Corporation", "signal-NVDA");
        assert_eq!(flat.sources.reddit, 3);
        assert_eq!(flat.name, "NVIDIA Corporation");
        assert_eq!(flat.id, "signal-NVDA");
    }
}
