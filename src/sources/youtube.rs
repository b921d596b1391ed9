//! YouTube Data API adapter: video search, statistics, comment threads.
//!
//! Search and statistics are two round-trips (the search endpoint carries no
//! counts). Comments for each hit are fetched in parallel and folded into
//! the item text. Everything fails soft; quota exhaustion for the day just
//! means an empty contribution from this source.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Deserialize;

use crate::cache::TtlCache;
use crate::content::{ContentItem, Source};
use crate::normalize::{normalize_text, normalize_ticker};

use super::{http_client, parse_u64, ContentSource};

const BASE_URL: &str = "https://www.googleapis.com/youtube/v3";
const CACHE_TTL: Duration = Duration::from_secs(600);
const COMMENTS_PER_VIDEO: usize = 10;

pub struct YouTubeAdapter {
    http: reqwest::Client,
    api_key: Option<String>,
    cache: TtlCache<Vec<ContentItem>>,
}

#[derive(Deserialize)]
struct SearchEnvelope {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Deserialize)]
struct SearchItem {
    id: SearchId,
}

#[derive(Deserialize)]
struct SearchId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

#[derive(Deserialize)]
struct VideosEnvelope {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Deserialize)]
struct VideoItem {
    id: String,
    snippet: Snippet,
    #[serde(default)]
    statistics: Statistics,
}

#[derive(Deserialize)]
struct Snippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "channelTitle", default)]
    channel_title: String,
    #[serde(rename = "publishedAt", default)]
    published_at: String,
}

#[derive(Deserialize, Default)]
struct Statistics {
    #[serde(rename = "viewCount", default)]
    view_count: Option<String>,
    #[serde(rename = "likeCount", default)]
    like_count: Option<String>,
    #[serde(rename = "commentCount", default)]
    comment_count: Option<String>,
}

#[derive(Deserialize)]
struct CommentsEnvelope {
    #[serde(default)]
    items: Vec<CommentThread>,
}

#[derive(Deserialize)]
struct CommentThread {
    snippet: CommentThreadSnippet,
}

#[derive(Deserialize)]
struct CommentThreadSnippet {
    #[serde(rename = "topLevelComment")]
    top_level_comment: TopLevelComment,
}

#[derive(Deserialize)]
struct TopLevelComment {
    snippet: CommentSnippet,
}

#[derive(Deserialize)]
struct CommentSnippet {
    #[serde(rename = "textDisplay", default)]
    text_display: String,
}

fn parse_rfc3339(ts: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(ts)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

impl YouTubeAdapter {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            http: http_client(Duration::from_secs(10)),
            api_key,
            cache: TtlCache::new(CACHE_TTL),
        }
    }

    async fn search_and_hydrate(&self, ticker: &str, max_items: usize) -> Result<Vec<ContentItem>> {
        let key = self.api_key.as_deref().context("YOUTUBE_API_KEY not configured")?;

        let query = format!("{ticker} stock OR {ticker} investing OR ${ticker}");
        let published_after = (Utc::now() - chrono::Duration::days(7)).to_rfc3339();
        let max_results = max_items.to_string();

        tracing::info!(%ticker, "searching youtube");
        let search: SearchEnvelope = self
            .http
            .get(format!("{BASE_URL}/search"))
            .query(&[
                ("part", "snippet"),
                ("q", query.as_str()),
                ("type", "video"),
                ("order", "date"),
                ("maxResults", max_results.as_str()),
                ("publishedAfter", published_after.as_str()),
                ("key", key),
            ])
            .send()
            .await
            .context("youtube search request")?
            .error_for_status()
            .context("youtube search status")?
            .json()
            .await
            .context("decoding youtube search")?;

        let video_ids: Vec<String> = search
            .items
            .into_iter()
            .filter_map(|i| i.id.video_id)
            .collect();
        if video_ids.is_empty() {
            return Ok(Vec::new());
        }

        let videos: VideosEnvelope = self
            .http
            .get(format!("{BASE_URL}/videos"))
            .query(&[
                ("part", "statistics,snippet"),
                ("id", video_ids.join(",").as_str()),
                ("key", key),
            ])
            .send()
            .await
            .context("youtube statistics request")?
            .error_for_status()
            .context("youtube statistics status")?
            .json()
            .await
            .context("decoding youtube statistics")?;

        // Comments per video, fetched jointly; each fetch soft-fails alone.
        let comment_futs = videos
            .items
            .iter()
            .map(|v| self.video_comments(v.id.clone(), COMMENTS_PER_VIDEO));
        let comments: Vec<Vec<String>> = join_all(comment_futs).await;

        let items = videos
            .items
            .into_iter()
            .zip(comments)
            .map(|(v, comments)| {
                let views = parse_u64(v.statistics.view_count.as_deref().unwrap_or_default());
                let likes = parse_u64(v.statistics.like_count.as_deref().unwrap_or_default());
                let comment_count =
                    parse_u64(v.statistics.comment_count.as_deref().unwrap_or_default());
                ContentItem {
                    source: Source::Youtube,
                    url: format!("https://www.youtube.com/watch?v={}", v.id),
                    id: v.id,
                    title: v.snippet.title,
                    text: normalize_text(&v.snippet.description),
                    comments,
                    engagement: views as f64 + likes as f64 * 10.0 + comment_count as f64 * 20.0,
                    published_at: parse_rfc3339(&v.snippet.published_at),
                    author: v.snippet.channel_title,
                    author_followers: None,
                    subreddit: None,
                }
            })
            .collect();
        Ok(items)
    }

    async fn video_comments(&self, video_id: String, max: usize) -> Vec<String> {
        let Some(key) = self.api_key.as_deref() else {
            return Vec::new();
        };
        let max_results = max.to_string();
        let resp = self
            .http
            .get(format!("{BASE_URL}/commentThreads"))
            .query(&[
                ("part", "snippet"),
                ("videoId", video_id.as_str()),
                ("maxResults", max_results.as_str()),
                ("order", "relevance"),
                ("key", key),
            ])
            .send()
            .await;

        match resp {
            Ok(r) => match r.json::<CommentsEnvelope>().await {
                Ok(env) => env
                    .items
                    .into_iter()
                    .map(|t| normalize_text(&t.snippet.top_level_comment.snippet.text_display))
                    .filter(|c| !c.is_empty())
                    .collect(),
                Err(e) => {
                    tracing::warn!(error = ?e, %video_id, "youtube comments decode error");
                    Vec::new()
                }
            },
            Err(e) => {
                tracing::warn!(error = ?e, %video_id, "youtube comments error");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl ContentSource for YouTubeAdapter {
    fn kind(&self) -> Source {
        Source::Youtube
    }

    fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    async fn fetch_content(&self, ticker: &str, max_items: usize) -> Result<Vec<ContentItem>> {
        let ticker = normalize_ticker(ticker);
        let cache_key = format!("youtube:{ticker}:{max_items}");
        if let Some(hit) = self.cache.get(&cache_key) {
            tracing::debug!(%ticker, "youtube cache hit");
            return Ok(hit);
        }

        match self.search_and_hydrate(&ticker, max_items).await {
            Ok(items) => {
                self.cache.insert(cache_key, items.clone());
                Ok(items)
            }
            Err(e) => {
                tracing::warn!(error = ?e, %ticker, "youtube fetch failed, returning empty");
                Ok(Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_without_key() {
        assert!(!YouTubeAdapter::new(None).is_configured());
        assert!(YouTubeAdapter::new(Some("k".into())).is_configured());
    }

    #[tokio::test]
    async fn unconfigured_fetch_soft_fails_to_empty() {
        let adapter = YouTubeAdapter::new(None);
        let items = adapter.fetch_content("TSLA", 5).await.unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn statistics_envelope_tolerates_missing_counts() {
        let json = r#"{"items": [{"id": "v1", "snippet": {"title": "T", "description": "d",
            "channelTitle": "c", "publishedAt": "2026-08-01T00:00:00Z"}, "statistics": {"viewCount": "100"}}]}"#;
        let env: VideosEnvelope = serde_json::from_str(json).unwrap();
        let v = &env.items[0];
        assert_eq!(v.statistics.view_count.as_deref(), Some("100"));
        assert!(v.statistics.like_count.is_none());
    }

    #[test]
    fn rfc3339_fallback_is_now_not_panic() {
        let parsed = parse_rfc3339("not a date");
        assert!(parsed <= Utc::now());
    }
}
