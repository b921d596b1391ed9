//! # Content Model
//!
//! Normalized units produced by the source adapters: one `ContentItem` per
//! social post/video/tweet, and one `PriceSnapshot` per quote fetch. Items
//! are created fresh per aggregation call and never persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a piece of social content came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Youtube,
    Twitter,
    Reddit,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Youtube => "youtube",
            Source::Twitter => "twitter",
            Source::Reddit => "reddit",
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One social post/video/tweet, normalized for sentiment scoring.
///
/// `engagement` is a source-specific weighted scalar:
/// - Reddit:  `score + comments*2 + awards*10`
/// - YouTube: `views + likes*10 + comments*20`
/// - Twitter: `likes + retweets*2 + replies + quotes`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub source: Source,
    pub id: String,
    /// Post/video title. Empty for tweets.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    /// Body text: video description, post selftext, or tweet text.
    pub text: String,
    /// Fetched replies/comments, already normalized.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<String>,
    pub engagement: f64,
    pub published_at: DateTime<Utc>,
    pub author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_followers: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subreddit: Option<String>,
    pub url: String,
}

impl ContentItem {
    /// Title, body and comments joined into one scoring string.
    pub fn combined_text(&self) -> String {
        let mut out = String::with_capacity(
            self.title.len() + self.text.len() + self.comments.iter().map(|c| c.len() + 1).sum::<usize>() + 2,
        );
        out.push_str(&self.title);
        out.push(' ');
        out.push_str(&self.text);
        for c in &self.comments {
            out.push(' ');
            out.push_str(c);
        }
        out
    }
}

/// One quote fetch, replaced wholesale on the next successful fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceSnapshot {
    pub ticker: String,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    pub last_updated: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> ContentItem {
        ContentItem {
            source: Source::Reddit,
            id: "abc".into(),
            title: "TSLA earnings".into(),
            text: "thoughts?".into(),
            comments: vec!["calls".into(), "puts".into()],
            engagement: 42.0,
            published_at: Utc::now(),
            author: "u/someone".into(),
            author_followers: None,
            subreddit: Some("stocks".into()),
            url: "https://www.reddit.com/x".into(),
        }
    }

    #[test]
    fn combined_text_joins_title_body_comments() {
        assert_eq!(item().combined_text(), "TSLA earnings thoughts? calls puts");
    }

    #[test]
    fn source_serializes_lowercase() {
        let v = serde_json::to_value(Source::Youtube).unwrap();
        assert_eq!(v, serde_json::json!("youtube"));
    }

    #[test]
    fn content_item_uses_camel_case_keys() {
        let v = serde_json::to_value(item()).unwrap();
        assert!(v.get("publishedAt").is_some());
        assert!(v.get("subreddit").is_some());
        assert!(v.get("authorFollowers").is_none(), "None fields are omitted");
    }
}
