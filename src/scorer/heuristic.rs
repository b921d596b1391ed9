//! # Heuristic Sentiment Fallback
//!
//! Deterministic keyword scoring, always available. Each bullish keyword
//! present in an item's combined text adds +0.1, each bearish keyword -0.1,
//! clamped to [-1, 1]; items are averaged per source, then sources are
//! blended with weights renormalized over the sources that produced content.
//!
//! The keyword sets and multipliers are fixed for output compatibility with
//! the dashboard; do not tune them without migrating stored snapshots.

use crate::signal::{
    Factor, FactorKind, Sentiment, SentimentVerdict, SourceBreakdown, SourceScore,
};

use super::SentimentInput;

const BULLISH: &[&str] = &[
    "buy", "bullish", "moon", "rocket", "calls", "long", "green", "pump", "breakout",
];
const BEARISH: &[&str] = &[
    "sell", "bearish", "crash", "dump", "puts", "short", "red", "falling",
];

/// Score one text: +0.1 per bullish keyword present, -0.1 per bearish,
/// clamped to [-1, 1]. Presence-based, so a keyword spammed 50 times counts
/// once.
fn score_text(text: &str) -> f64 {
    let lower = text.to_lowercase();
    let mut score: f64 = 0.0;
    for word in BULLISH {
        if lower.contains(word) {
            score += 0.1;
        }
    }
    for word in BEARISH {
        if lower.contains(word) {
            score -= 0.1;
        }
    }
    score.clamp(-1.0, 1.0)
}

fn mean_item_score(items: &[crate::content::ContentItem]) -> f64 {
    if items.is_empty() {
        return 0.0;
    }
    let sum: f64 = items.iter().map(|i| score_text(&i.combined_text())).sum();
    sum / items.len() as f64
}

/// Deterministic verdict from keyword counts; no external dependency.
pub fn calculate_fallback_sentiment(input: &SentimentInput<'_>) -> SentimentVerdict {
    let youtube_score = mean_item_score(input.youtube);
    let twitter_score = mean_item_score(input.twitter);
    let reddit_score = mean_item_score(input.reddit);

    let cfg = input.config;
    let active = [
        (!input.youtube.is_empty(), youtube_score, cfg.youtube_weight),
        (!input.twitter.is_empty(), twitter_score, cfg.twitter_weight),
        (!input.reddit.is_empty(), reddit_score, cfg.reddit_weight),
    ];

    let total_weight: f64 = active.iter().filter(|(on, _, _)| *on).map(|(_, _, w)| w).sum();
    let weighted_score = if total_weight > 0.0 {
        active
            .iter()
            .filter(|(on, _, _)| *on)
            .map(|(_, s, w)| s * w)
            .sum::<f64>()
            / total_weight
    } else {
        0.0
    };

    // Renormalized weight for a source, zero when it produced nothing.
    let weight_of = |on: bool, w: f64| if on && total_weight > 0.0 { w / total_weight } else { 0.0 };

    let total_items = input.total_items();
    // Volume-based confidence: floor 0.3, saturating at 0.9 around 50 items.
    let confidence = (0.3 + (total_items as f64 / 50.0) * 0.6).min(0.9);

    SentimentVerdict {
        overall_sentiment: Sentiment::classify(weighted_score),
        overall_score: weighted_score,
        overall_confidence: confidence,
        summary: format!("Based on {total_items} social media mentions"),
        factors: default_factors(weighted_score, total_items),
        source_breakdown: SourceBreakdown {
            youtube: SourceScore {
                sentiment: Sentiment::from_sign(youtube_score),
                score: youtube_score,
                weight: weight_of(!input.youtube.is_empty(), cfg.youtube_weight),
            },
            twitter: SourceScore {
                sentiment: Sentiment::from_sign(twitter_score),
                score: twitter_score,
                weight: weight_of(!input.twitter.is_empty(), cfg.twitter_weight),
            },
            reddit: SourceScore {
                sentiment: Sentiment::from_sign(reddit_score),
                score: reddit_score,
                weight: weight_of(!input.reddit.is_empty(), cfg.reddit_weight),
            },
        },
    }
}

/// Default factors when the scorer supplied none.
pub fn default_factors(sentiment_score: f64, mention_count: usize) -> Vec<Factor> {
    let mut factors = Vec::new();

    if mention_count > 20 {
        let kind = if sentiment_score > 0.0 {
            FactorKind::Positive
        } else if sentiment_score < 0.0 {
            FactorKind::Negative
        } else {
            FactorKind::Neutral
        };
        let pct = (mention_count as f64 / 10.0).round() as i64;
        let value = if sentiment_score > 0.0 {
            format!("+{pct}%")
        } else {
            format!("{pct}%")
        };
        factors.push(Factor::new(kind, "Social Volume", value));
    }

    if sentiment_score.abs() > 0.3 {
        let (kind, value) = if sentiment_score > 0.0 {
            (FactorKind::Positive, "Bullish")
        } else {
            (FactorKind::Negative, "Bearish")
        };
        factors.push(Factor::new(kind, "Sentiment Direction", value));
    }

    factors.push(Factor::new(
        FactorKind::Neutral,
        "Data Sources",
        format!("{mention_count} mentions"),
    ));

    factors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AggregationConfig;
    use crate::content::{ContentItem, Source};
    use chrono::Utc;

    fn item(source: Source, text: &str) -> ContentItem {
        ContentItem {
            source,
            id: "id".into(),
            title: String::new(),
            text: text.into(),
            comments: Vec::new(),
            engagement: 0.0,
            published_at: Utc::now(),
            author: "a".into(),
            author_followers: None,
            subreddit: None,
            url: String::new(),
        }
    }

    fn input<'a>(
        ticker: &'a str,
        yt: &'a [ContentItem],
        tw: &'a [ContentItem],
        rd: &'a [ContentItem],
        cfg: &'a AggregationConfig,
    ) -> SentimentInput<'a> {
        SentimentInput {
            ticker,
            youtube: yt,
            twitter: tw,
            reddit: rd,
            price: None,
            config: cfg,
        }
    }

    #[test]
    fn score_text_counts_keywords_once_and_clamps() {
        assert!((score_text("buy buy buy") - 0.1).abs() < 1e-9);
        assert!((score_text("moon rocket calls") - 0.3).abs() < 1e-9);
        assert!((score_text("crash dump puts") + 0.3).abs() < 1e-9);
        assert!((score_text("nothing to see")).abs() < 1e-9);
    }

    #[test]
    fn deterministic_for_fixed_input() {
        let cfg = AggregationConfig::default();
        let rd = vec![item(Source::Reddit, "moon rocket"), item(Source::Reddit, "crash")];
        let a = calculate_fallback_sentiment(&input("GME", &[], &[], &rd, &cfg));
        let b = calculate_fallback_sentiment(&input("GME", &[], &[], &rd, &cfg));
        assert_eq!(a, b);
    }

    #[test]
    fn single_active_source_renormalizes_to_its_raw_mean() {
        let cfg = AggregationConfig::default();
        let rd = vec![
            item(Source::Reddit, "moon rocket calls"), // +0.3
            item(Source::Reddit, "dump"),              // -0.1
        ];
        let v = calculate_fallback_sentiment(&input("AMC", &[], &[], &rd, &cfg));
        let expected = (0.3 - 0.1) / 2.0;
        assert!((v.overall_score - expected).abs() < 1e-12);
        assert!((v.source_breakdown.reddit.weight - 1.0).abs() < 1e-12);
        assert_eq!(v.source_breakdown.youtube.weight, 0.0);
        assert_eq!(v.source_breakdown.twitter.weight, 0.0);
    }

    #[test]
    fn two_active_sources_redistribute_missing_weight() {
        let cfg = AggregationConfig::default();
        let yt = vec![item(Source::Youtube, "breakout")];
        let rd = vec![item(Source::Reddit, "short it")];
        let v = calculate_fallback_sentiment(&input("TSLA", &yt, &[], &rd, &cfg));
        let total = cfg.youtube_weight + cfg.reddit_weight;
        let expected = (0.1 * cfg.youtube_weight + (-0.1) * cfg.reddit_weight) / total;
        assert!((v.overall_score - expected).abs() < 1e-12);
        let wsum = v.source_breakdown.youtube.weight + v.source_breakdown.reddit.weight;
        assert!((wsum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn confidence_saturates_by_volume() {
        let cfg = AggregationConfig::default();
        let v = calculate_fallback_sentiment(&input("X", &[], &[], &[], &cfg));
        assert!((v.overall_confidence - 0.3).abs() < 1e-9, "floor at 0.3");

        let many: Vec<ContentItem> = (0..100).map(|_| item(Source::Reddit, "hi")).collect();
        let v = calculate_fallback_sentiment(&input("X", &[], &[], &many, &cfg));
        assert!((v.overall_confidence - 0.9).abs() < 1e-9, "ceiling at 0.9");
    }

    #[test]
    fn empty_input_is_neutral_with_zero_weights() {
        let cfg = AggregationConfig::default();
        let v = calculate_fallback_sentiment(&input("X", &[], &[], &[], &cfg));
        assert_eq!(v.overall_sentiment, Sentiment::Neutral);
        assert_eq!(v.overall_score, 0.0);
        assert_eq!(v.source_breakdown.youtube.weight, 0.0);
        assert_eq!(v.source_breakdown.twitter.weight, 0.0);
        assert_eq!(v.source_breakdown.reddit.weight, 0.0);
    }

    #[test]
    fn default_factors_always_include_mention_count() {
        let f = default_factors(0.0, 3);
        assert_eq!(f.len(), 1);
        assert_eq!(f[0].label, "Data Sources");
        assert_eq!(f[0].value, "3 mentions");

        let f = default_factors(0.5, 30);
        assert_eq!(f.len(), 3);
        assert_eq!(f[0].label, "Social Volume");
        assert_eq!(f[0].value, "+3%");
        assert_eq!(f[1].label, "Sentiment Direction");
        assert_eq!(f[1].value, "Bullish");
    }
}
