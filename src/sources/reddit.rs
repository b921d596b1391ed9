//! Reddit adapter: OAuth client-credentials search with a public fallback.
//!
//! With credentials, searches go through oauth.reddit.com using a cached
//! bearer token (refreshed 60 s before the provider-stated expiry). Without
//! credentials, or when the authenticated path errors, the adapter falls
//! back to the public JSON endpoints: five finance subreddits searched in
//! parallel, deduplicated by post id, sorted by score, truncated to max.
//!
//! Top comments for each hit are folded into the item text before scoring.

use std::collections::HashSet;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::cache::TtlCache;
use crate::content::{ContentItem, Source};
use crate::normalize::{normalize_text, normalize_ticker};

use super::{http_client, ContentSource};

const BASE_URL: &str = "https://www.reddit.com";
const OAUTH_URL: &str = "https://oauth.reddit.com";
const CACHE_TTL: Duration = Duration::from_secs(300);
const TRENDING_CACHE_TTL: Duration = Duration::from_secs(600);
const TOKEN_EXPIRY_SKEW: Duration = Duration::from_secs(60);
const COMMENTS_PER_POST: usize = 5;

pub const DEFAULT_SUBREDDITS: [&str; 5] =
    ["wallstreetbets", "stocks", "investing", "StockMarket", "options"];

/// A post as surfaced by the trending endpoint.
#[derive(Debug, Clone, PartialEq, serde::Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedditPost {
    pub id: String,
    pub title: String,
    pub author: String,
    pub subreddit: String,
    pub score: i64,
    pub num_comments: u64,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

struct BearerToken {
    token: String,
    expires_at: Instant,
}

pub struct RedditAdapter {
    http: reqwest::Client,
    client_id: Option<String>,
    client_secret: Option<String>,
    cache: TtlCache<Vec<ContentItem>>,
    trending_cache: TtlCache<Vec<RedditPost>>,
    token: Mutex<Option<BearerToken>>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Deserialize)]
struct Listing<T> {
    data: ListingData<T>,
}

#[derive(Deserialize)]
struct ListingData<T> {
    #[serde(default = "Vec::new")]
    children: Vec<Child<T>>,
}

#[derive(Deserialize)]
struct Child<T> {
    #[serde(default)]
    kind: String,
    data: T,
}

#[derive(Deserialize, Clone)]
struct PostData {
    #[serde(default)]
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    selftext: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    subreddit: String,
    #[serde(default)]
    permalink: String,
    #[serde(default)]
    created_utc: f64,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    num_comments: u64,
    #[serde(default)]
    total_awards_received: u64,
}

#[derive(Deserialize)]
struct CommentData {
    #[serde(default)]
    body: String,
}

fn epoch_to_datetime(secs: f64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs as i64, 0).unwrap_or_else(Utc::now)
}

impl RedditAdapter {
    pub fn new(client_id: Option<String>, client_secret: Option<String>) -> Self {
        Self {
            http: http_client(Duration::from_secs(15)),
            client_id,
            client_secret,
            cache: TtlCache::new(CACHE_TTL),
            trending_cache: TtlCache::new(TRENDING_CACHE_TTL),
            token: Mutex::new(None),
        }
    }

    /// Cached bearer token; refreshed only when within the skew of expiry.
    async fn access_token(&self) -> Result<String> {
        let mut guard = self.token.lock().await;
        if let Some(t) = guard.as_ref() {
            if Instant::now() < t.expires_at {
                return Ok(t.token.clone());
            }
        }

        let (id, secret) = match (self.client_id.as_deref(), self.client_secret.as_deref()) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => (id, secret),
            _ => bail!("reddit credentials not configured"),
        };

        tracing::info!("refreshing reddit access token");
        let resp: TokenResponse = self
            .http
            .post(format!("{BASE_URL}/api/v1/access_token"))
            .basic_auth(id, Some(secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .context("reddit token request")?
            .error_for_status()
            .context("reddit token status")?
            .json()
            .await
            .context("decoding reddit token")?;

        let ttl = Duration::from_secs(resp.expires_in).saturating_sub(TOKEN_EXPIRY_SKEW);
        *guard = Some(BearerToken {
            token: resp.access_token.clone(),
            expires_at: Instant::now() + ttl,
        });
        Ok(resp.access_token)
    }

    async fn search_posts(&self, ticker: &str, max_items: usize) -> Vec<PostData> {
        if !self.is_configured() {
            return self.search_public(ticker, max_items).await;
        }
        match self.search_oauth(ticker, max_items).await {
            Ok(posts) => posts,
            Err(e) => {
                tracing::warn!(error = ?e, %ticker, "reddit oauth search failed, using public fallback");
                self.search_public(ticker, max_items).await
            }
        }
    }

    async fn search_oauth(&self, ticker: &str, max_items: usize) -> Result<Vec<PostData>> {
        let token = self.access_token().await?;
        let query = format!("{ticker} stock OR ${ticker}");
        let limit = max_items.to_string();

        tracing::info!(%ticker, "searching reddit (oauth)");
        let listing: Listing<PostData> = self
            .http
            .get(format!("{OAUTH_URL}/search"))
            .query(&[
                ("q", query.as_str()),
                ("type", "link"),
                ("sort", "new"),
                ("t", "week"),
                ("limit", limit.as_str()),
            ])
            .bearer_auth(&token)
            .send()
            .await
            .context("reddit search request")?
            .error_for_status()
            .context("reddit search status")?
            .json()
            .await
            .context("decoding reddit search")?;

        Ok(listing.data.children.into_iter().map(|c| c.data).collect())
    }

    /// Unauthenticated multi-subreddit search: fan out, dedupe by id,
    /// sort by score descending, truncate.
    async fn search_public(&self, ticker: &str, max_items: usize) -> Vec<PostData> {
        let per_sub = (max_items / DEFAULT_SUBREDDITS.len()).clamp(1, 10);
        tracing::info!(%ticker, "searching reddit (public fallback)");

        let futs = DEFAULT_SUBREDDITS
            .iter()
            .map(|sub| self.search_one_subreddit(sub, ticker, per_sub));
        let results: Vec<Vec<PostData>> = join_all(futs).await;

        let mut seen: HashSet<String> = HashSet::new();
        let mut posts: Vec<PostData> = Vec::new();
        for post in results.into_iter().flatten() {
            if seen.insert(post.id.clone()) {
                posts.push(post);
            }
        }
        posts.sort_by(|a, b| b.score.cmp(&a.score));
        posts.truncate(max_items);
        posts
    }

    async fn search_one_subreddit(&self, subreddit: &str, ticker: &str, limit: usize) -> Vec<PostData> {
        let limit = limit.to_string();
        let resp = self
            .http
            .get(format!("{BASE_URL}/r/{subreddit}/search.json"))
            .query(&[
                ("q", ticker),
                ("sort", "new"),
                ("t", "week"),
                ("limit", limit.as_str()),
            ])
            .send()
            .await;

        match resp {
            Ok(r) => match r.json::<Listing<PostData>>().await {
                Ok(listing) => listing.data.children.into_iter().map(|c| c.data).collect(),
                Err(e) => {
                    tracing::warn!(error = ?e, %subreddit, "reddit subreddit decode error");
                    Vec::new()
                }
            },
            Err(e) => {
                tracing::warn!(error = ?e, %subreddit, "reddit subreddit search error");
                Vec::new()
            }
        }
    }

    /// Top-level comments for a post, already normalized. Soft-fails.
    async fn post_comments(&self, subreddit: &str, post_id: &str, max: usize) -> Vec<String> {
        // The public endpoint works either way; prefer oauth when configured.
        let url = if self.is_configured() {
            format!("{OAUTH_URL}/r/{subreddit}/comments/{post_id}.json?limit={max}")
        } else {
            format!("{BASE_URL}/r/{subreddit}/comments/{post_id}.json?limit={max}")
        };

        let mut req = self.http.get(&url);
        if self.is_configured() {
            match self.access_token().await {
                Ok(token) => req = req.bearer_auth(token),
                Err(e) => {
                    tracing::warn!(error = ?e, %post_id, "reddit token error for comments");
                    return Vec::new();
                }
            }
        }

        let resp = match req.send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = ?e, %post_id, "reddit comments error");
                return Vec::new();
            }
        };

        // The endpoint returns [post listing, comment listing].
        let listings: Vec<Listing<CommentData>> = match resp.json().await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = ?e, %post_id, "reddit comments decode error");
                return Vec::new();
            }
        };

        listings
            .into_iter()
            .nth(1)
            .map(|l| {
                l.data
                    .children
                    .into_iter()
                    .filter(|c| c.kind == "t1")
                    .map(|c| normalize_text(&c.data.body))
                    .filter(|b| !b.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Hot posts across finance subreddits, for the trending view.
    /// Soft-fails to empty.
    pub async fn trending_posts(&self, subreddits: &[&str], limit: usize) -> Vec<RedditPost> {
        let joined = subreddits.join("+");
        let cache_key = format!("trending:{joined}:{limit}");
        if let Some(hit) = self.trending_cache.get(&cache_key) {
            return hit;
        }

        let url = format!("{BASE_URL}/r/{joined}/hot.json?limit={limit}");
        let resp = match self.http.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = ?e, "reddit trending error");
                return Vec::new();
            }
        };
        let listing: Listing<PostData> = match resp.json().await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = ?e, "reddit trending decode error");
                return Vec::new();
            }
        };

        let posts: Vec<RedditPost> = listing
            .data
            .children
            .into_iter()
            .map(|c| {
                let d = c.data;
                RedditPost {
                    url: format!("{BASE_URL}{}", d.permalink),
                    id: d.id,
                    title: d.title,
                    author: d.author,
                    subreddit: d.subreddit,
                    score: d.score,
                    num_comments: d.num_comments,
                    created_at: epoch_to_datetime(d.created_utc),
                }
            })
            .collect();
        self.trending_cache.insert(cache_key, posts.clone());
        posts
    }
}

#[async_trait]
impl ContentSource for RedditAdapter {
    fn kind(&self) -> Source {
        Source::Reddit
    }

    /// Credentials present. The adapter still works unconfigured through the
    /// public fallback, so callers never skip Reddit outright.
    fn is_configured(&self) -> bool {
        self.client_id.as_deref().is_some_and(|v| !v.is_empty())
            && self.client_secret.as_deref().is_some_and(|v| !v.is_empty())
    }

    async fn fetch_content(&self, ticker: &str, max_items: usize) -> Result<Vec<ContentItem>> {
        let ticker = normalize_ticker(ticker);
        let cache_key = format!("reddit:{ticker}:{max_items}");
        if let Some(hit) = self.cache.get(&cache_key) {
            tracing::debug!(%ticker, "reddit cache hit");
            return Ok(hit);
        }

        let posts = self.search_posts(&ticker, max_items).await;

        let comment_futs = posts
            .iter()
            .map(|p| self.post_comments(&p.subreddit, &p.id, COMMENTS_PER_POST));
        let comments: Vec<Vec<String>> = join_all(comment_futs).await;

        let items: Vec<ContentItem> = posts
            .into_iter()
            .zip(comments)
            .map(|(p, comments)| ContentItem {
                source: Source::Reddit,
                url: format!("{BASE_URL}{}", p.permalink),
                id: p.id,
                title: p.title,
                text: normalize_text(&p.selftext),
                comments,
                engagement: p.score as f64
                    + p.num_comments as f64 * 2.0
                    + p.total_awards_received as f64 * 10.0,
                published_at: epoch_to_datetime(p.created_utc),
                author: p.author,
                author_followers: None,
                subreddit: Some(p.subreddit),
            })
            .collect();

        self.cache.insert(cache_key, items.clone());
        Ok(items)
    }
}
