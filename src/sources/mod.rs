//! # Source Adapters
//!
//! One adapter per external API. Each isolates its API's auth, pagination,
//! rate limits and shape behind a narrow contract:
//!
//! - [`ContentSource`] for the social sources (YouTube, Twitter, Reddit).
//!   These fail soft: any internal error is logged and yields an empty list.
//! - [`PriceSource`] for the quote API. Price errors propagate; price
//!   absence is meaningful and surfaced distinctly by the aggregator.
//!
//! Every adapter keeps its own TTL cache keyed by `source:ticker:params` so
//! repeated dashboard refreshes do not burn external quota.

pub mod price;
pub mod reddit;
pub mod twitter;
pub mod youtube;

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

use crate::content::{ContentItem, PriceSnapshot, Source};

/// A social content source normalized for sentiment scoring.
#[async_trait]
pub trait ContentSource: Send + Sync {
    fn kind(&self) -> Source;

    /// True iff the required credentials are present. Unconfigured sources
    /// are skipped cleanly, never treated as failures.
    fn is_configured(&self) -> bool;

    /// Fetch up to `max_items` normalized items for a ticker. Implementations
    /// recover from their own errors (network, auth, quota) by returning an
    /// empty list; a returned `Err` is still tolerated by the aggregator.
    async fn fetch_content(&self, ticker: &str, max_items: usize) -> Result<Vec<ContentItem>>;
}

/// The quote source. Unlike content sources, errors propagate.
#[async_trait]
pub trait PriceSource: Send + Sync {
    fn is_configured(&self) -> bool;

    async fn fetch_price(&self, ticker: &str) -> Result<PriceSnapshot>;
}

/// Shared reqwest client builder: per-call timeout per source, common UA.
pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent("WhisperTrade/1.0 (Sentiment Analysis Platform)")
        .connect_timeout(Duration::from_secs(4))
        .timeout(timeout)
        .build()
        .expect("reqwest client")
}

/// Lenient numeric field parsing for string-typed upstream JSON.
pub(crate) fn parse_f64(s: &str) -> f64 {
    s.trim().trim_end_matches('%').parse().unwrap_or_default()
}

pub(crate) fn parse_u64(s: &str) -> u64 {
    s.trim().parse().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lenient_parsing_tolerates_garbage() {
        assert_eq!(parse_f64("12.5"), 12.5);
        assert_eq!(parse_f64("-0.43%"), -0.43);
        assert_eq!(parse_f64("n/a"), 0.0);
        assert_eq!(parse_u64("120043"), 120043);
        assert_eq!(parse_u64(""), 0);
    }
}
