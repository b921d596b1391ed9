//! Twitter/X v2 adapter: recent tweet search by cashtag with bearer auth.
//!
//! The search response splits author data into an `includes.users` sidecar;
//! the adapter joins it back so each item carries author name and follower
//! count (the scorer weighs reach).

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::cache::TtlCache;
use crate::content::{ContentItem, Source};
use crate::normalize::normalize_ticker;

use super::{http_client, ContentSource};

const BASE_URL: &str = "https://api.twitter.com/2";
const CACHE_TTL: Duration = Duration::from_secs(300);
const MAX_RESULTS_CAP: usize = 100;

pub struct TwitterAdapter {
    http: reqwest::Client,
    bearer_token: Option<String>,
    cache: TtlCache<Vec<ContentItem>>,
}

#[derive(Deserialize)]
struct SearchEnvelope {
    #[serde(default)]
    data: Vec<Tweet>,
    #[serde(default)]
    includes: Includes,
}

#[derive(Deserialize, Default)]
struct Includes {
    #[serde(default)]
    users: Vec<User>,
}

#[derive(Deserialize)]
struct Tweet {
    id: String,
    text: String,
    #[serde(rename = "author_id", default)]
    author_id: String,
    #[serde(rename = "created_at", default)]
    created_at: String,
    #[serde(rename = "public_metrics", default)]
    public_metrics: TweetMetrics,
}

#[derive(Deserialize, Default)]
struct TweetMetrics {
    #[serde(default)]
    like_count: u64,
    #[serde(default)]
    retweet_count: u64,
    #[serde(default)]
    reply_count: u64,
    #[serde(default)]
    quote_count: u64,
}

#[derive(Deserialize)]
struct User {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    username: String,
    #[serde(rename = "public_metrics", default)]
    public_metrics: UserMetrics,
}

#[derive(Deserialize, Default)]
struct UserMetrics {
    #[serde(default)]
    followers_count: u64,
}

impl TwitterAdapter {
    pub fn new(bearer_token: Option<String>) -> Self {
        Self {
            http: http_client(Duration::from_secs(15)),
            bearer_token,
            cache: TtlCache::new(CACHE_TTL),
        }
    }

    async fn search_cashtag(&self, ticker: &str, max_items: usize) -> Result<Vec<ContentItem>> {
        let token = self
            .bearer_token
            .as_deref()
            .context("TWITTER_BEARER_TOKEN not configured")?;

        let query = format!("${ticker} -is:retweet lang:en");
        let max_results = max_items.min(MAX_RESULTS_CAP).to_string();
        tracing::info!(%ticker, "searching twitter");

        let resp = self
            .http
            .get(format!("{BASE_URL}/tweets/search/recent"))
            .query(&[
                ("query", query.as_str()),
                ("max_results", max_results.as_str()),
                ("tweet.fields", "created_at,public_metrics,author_id"),
                ("user.fields", "public_metrics,verified,username,name"),
                ("expansions", "author_id"),
            ])
            .bearer_auth(token)
            .send()
            .await
            .context("twitter search request")?;

        match resp.status().as_u16() {
            401 => bail!("twitter authentication failed, check bearer token"),
            429 => bail!("twitter rate limit exceeded"),
            s if !(200..300).contains(&s) => bail!("twitter returned status {s}"),
            _ => {}
        }

        let envelope: SearchEnvelope = resp.json().await.context("decoding twitter search")?;
        let users: HashMap<&str, &User> = envelope
            .includes
            .users
            .iter()
            .map(|u| (u.id.as_str(), u))
            .collect();

        let items = envelope
            .data
            .iter()
            .map(|t| {
                let user = users.get(t.author_id.as_str());
                let m = &t.public_metrics;
                ContentItem {
                    source: Source::Twitter,
                    id: t.id.clone(),
                    title: String::new(),
                    text: t.text.clone(),
                    comments: Vec::new(),
                    engagement: (m.like_count
                        + m.retweet_count * 2
                        + m.reply_count
                        + m.quote_count) as f64,
                    published_at: DateTime::parse_from_rfc3339(&t.created_at)
                        .map(|dt| dt.with_timezone(&Utc))
                        .unwrap_or_else(|_| Utc::now()),
                    author: user.map(|u| u.name.clone()).unwrap_or_else(|| "Unknown".into()),
                    author_followers: Some(
                        user.map(|u| u.public_metrics.followers_count).unwrap_or(0),
                    ),
                    subreddit: None,
                    url: format!(
                        "https://twitter.com/{}/status/{}",
                        user.map(|u| u.username.as_str()).unwrap_or("unknown"),
                        t.id
                    ),
                }
            })
            .collect();
        Ok(items)
    }
}

#[async_trait]
impl ContentSource for TwitterAdapter {
    fn kind(&self) -> Source {
        Source::Twitter
    }

    fn is_configured(&self) -> bool {
        self.bearer_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    async fn fetch_content(&self, ticker: &str, max_items: usize) -> Result<Vec<ContentItem>> {
        let ticker = normalize_ticker(ticker);
        if !self.is_configured() {
            tracing::debug!(%ticker, "twitter not configured, skipping");
            return Ok(Vec::new());
        }

        let cache_key = format!("twitter:{ticker}:{max_items}");
        if let Some(hit) = self.cache.get(&cache_key) {
            tracing::debug!(%ticker, "twitter cache hit");
            return Ok(hit);
        }

        match self.search_cashtag(&ticker, max_items).await {
            Ok(items) => {
                self.cache.insert(cache_key, items.clone());
                Ok(items)
            }
            Err(e) => {
                tracing::warn!(error = ?e, %ticker, "twitter fetch failed, returning empty");
                Ok(Vec::new())
            }
        }
    }
}
