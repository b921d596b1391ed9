//! # Configuration
//!
//! Two layers, both env-driven (loaded via `dotenvy` in `main`):
//! - `Credentials`: per-source API keys. Absence of a credential flips the
//!   adapter's `is_configured()` to false; it never crashes the aggregator.
//! - `AggregationConfig`: per-request knobs (source toggles, item limits,
//!   source weights). Deserialized from POST bodies with camelCase keys and
//!   per-field defaults, so callers can override any subset.

use serde::{Deserialize, Serialize};

/// External API credentials resolved from the environment.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub alpha_vantage_key: Option<String>,
    pub youtube_key: Option<String>,
    pub twitter_bearer_token: Option<String>,
    pub reddit_client_id: Option<String>,
    pub reddit_client_secret: Option<String>,
    pub openai_key: Option<String>,
}

fn non_empty(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}

impl Credentials {
    pub fn from_env() -> Self {
        Self {
            alpha_vantage_key: non_empty("ALPHA_VANTAGE_API_KEY"),
            youtube_key: non_empty("YOUTUBE_API_KEY"),
            twitter_bearer_token: non_empty("TWITTER_BEARER_TOKEN"),
            reddit_client_id: non_empty("REDDIT_CLIENT_ID"),
            reddit_client_secret: non_empty("REDDIT_CLIENT_SECRET"),
            openai_key: non_empty("OPENAI_API_KEY"),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_max_youtube() -> usize {
    5
}
fn default_max_tweets() -> usize {
    20
}
fn default_max_reddit() -> usize {
    10
}
fn default_youtube_weight() -> f64 {
    0.35
}
fn default_twitter_weight() -> f64 {
    0.35
}
fn default_reddit_weight() -> f64 {
    0.30
}

/// Per-request aggregation knobs. Weights must sum to 1.0 when all three
/// sources are active; the scorer renormalizes over the active subset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AggregationConfig {
    pub use_youtube: bool,
    pub use_twitter: bool,
    pub use_reddit: bool,
    pub max_youtube_videos: usize,
    pub max_tweets: usize,
    pub max_reddit_posts: usize,
    pub youtube_weight: f64,
    pub twitter_weight: f64,
    pub reddit_weight: f64,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            use_youtube: default_true(),
            use_twitter: default_true(),
            use_reddit: default_true(),
            max_youtube_videos: default_max_youtube(),
            max_tweets: default_max_tweets(),
            max_reddit_posts: default_max_reddit(),
            youtube_weight: default_youtube_weight(),
            twitter_weight: default_twitter_weight(),
            reddit_weight: default_reddit_weight(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = AggregationConfig::default();
        assert!(c.use_youtube && c.use_twitter && c.use_reddit);
        assert_eq!(c.max_youtube_videos, 5);
        assert_eq!(c.max_tweets, 20);
        assert_eq!(c.max_reddit_posts, 10);
        let sum = c.youtube_weight + c.twitter_weight + c.reddit_weight;
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let c: AggregationConfig =
            serde_json::from_str(r#"{"useTwitter": false, "maxRedditPosts": 3}"#).unwrap();
        assert!(!c.use_twitter);
        assert_eq!(c.max_reddit_posts, 3);
        assert!(c.use_youtube);
        assert_eq!(c.max_youtube_videos, 5);
        assert_eq!(c.youtube_weight, 0.35);
    }
}
