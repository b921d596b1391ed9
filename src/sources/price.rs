//! Quote adapter for the Alpha Vantage GLOBAL_QUOTE API.
//!
//! The free tier allows 5 requests per minute, so uncached calls are spaced
//! at least 12 seconds apart. The limiter timestamp lives behind an async
//! mutex held across the forced sleep, which keeps the limit global across
//! concurrent aggregations for different tickers.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::cache::TtlCache;
use crate::content::PriceSnapshot;
use crate::normalize::normalize_ticker;

use super::{http_client, parse_f64, parse_u64, PriceSource};

const BASE_URL: &str = "https://www.alphavantage.co/query";
const RATE_LIMIT_GAP: Duration = Duration::from_secs(12);
const CACHE_TTL: Duration = Duration::from_secs(300);
const SEARCH_CACHE_TTL: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, PartialEq, serde::Serialize, Deserialize)]
pub struct SymbolMatch {
    pub symbol: String,
    pub name: String,
}

pub struct AlphaVantageAdapter {
    http: reqwest::Client,
    api_key: Option<String>,
    quote_cache: TtlCache<PriceSnapshot>,
    search_cache: TtlCache<Vec<SymbolMatch>>,
    last_call: Mutex<Option<Instant>>,
}

#[derive(Deserialize)]
struct QuoteEnvelope {
    #[serde(rename = "Global Quote")]
    quote: Option<GlobalQuote>,
}

// Alpha Vantage numbers arrive as strings under ordinal-prefixed keys.
#[derive(Deserialize)]
struct GlobalQuote {
    #[serde(rename = "01. symbol")]
    symbol: Option<String>,
    #[serde(rename = "02. open")]
    open: Option<String>,
    #[serde(rename = "03. high")]
    high: Option<String>,
    #[serde(rename = "04. low")]
    low: Option<String>,
    #[serde(rename = "05. price")]
    price: Option<String>,
    #[serde(rename = "06. volume")]
    volume: Option<String>,
    #[serde(rename = "09. change")]
    change: Option<String>,
    #[serde(rename = "10. change percent")]
    change_percent: Option<String>,
}

#[derive(Deserialize)]
struct SearchEnvelope {
    #[serde(rename = "bestMatches", default)]
    best_matches: Vec<SearchMatch>,
}

#[derive(Deserialize)]
struct SearchMatch {
    #[serde(rename = "1. symbol")]
    symbol: Option<String>,
    #[serde(rename = "2. name")]
    name: Option<String>,
}

impl AlphaVantageAdapter {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            http: http_client(Duration::from_secs(10)),
            api_key,
            quote_cache: TtlCache::new(CACHE_TTL),
            search_cache: TtlCache::new(SEARCH_CACHE_TTL),
            last_call: Mutex::new(None),
        }
    }

    /// Wait out the inter-call gap and stamp the new call time. The lock is
    /// held across the sleep so concurrent callers queue up behind it.
    async fn check_rate_limit(&self) {
        let mut last = self.last_call.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < RATE_LIMIT_GAP {
                let wait = RATE_LIMIT_GAP - elapsed;
                tracing::info!(wait_ms = wait.as_millis() as u64, "price rate limit: waiting");
                tokio::time::sleep(wait).await;
            }
        }
        *last = Some(Instant::now());
    }

    fn key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .context("ALPHA_VANTAGE_API_KEY not configured")
    }

    /// Symbol search (SYMBOL_SEARCH), used by the dashboard search box.
    /// Soft-fails to an empty list.
    pub async fn search_symbol(&self, keywords: &str) -> Vec<SymbolMatch> {
        let cache_key = format!("search:{keywords}");
        if let Some(hit) = self.search_cache.get(&cache_key) {
            return hit;
        }
        let Ok(key) = self.key() else {
            return Vec::new();
        };

        self.check_rate_limit().await;

        let resp = self
            .http
            .get(BASE_URL)
            .query(&[
                ("function", "SYMBOL_SEARCH"),
                ("keywords", keywords),
                ("apikey", key),
            ])
            .send()
            .await;

        let envelope: SearchEnvelope = match resp {
            Ok(r) => match r.json().await {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(error = ?e, "price symbol search decode error");
                    return Vec::new();
                }
            },
            Err(e) => {
                tracing::warn!(error = ?e, "price symbol search error");
                return Vec::new();
            }
        };

        let results: Vec<SymbolMatch> = envelope
            .best_matches
            .into_iter()
            .filter_map(|m| {
                Some(SymbolMatch {
                    symbol: m.symbol?,
                    name: m.name?,
                })
            })
            .collect();
        self.search_cache.insert(cache_key, results.clone());
        results
    }

    pub fn cache_stats(&self) -> crate::cache::CacheStats {
        self.quote_cache.stats()
    }
}

#[async_trait]
impl PriceSource for AlphaVantageAdapter {
    fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    async fn fetch_price(&self, ticker: &str) -> Result<PriceSnapshot> {
        let ticker = normalize_ticker(ticker);
        let cache_key = format!("price:{ticker}");
        if let Some(hit) = self.quote_cache.get(&cache_key) {
            tracing::debug!(%ticker, "price cache hit");
            return Ok(hit);
        }

        let key = self.key()?;
        self.check_rate_limit().await;
        tracing::info!(%ticker, "fetching price");

        let resp = self
            .http
            .get(BASE_URL)
            .query(&[
                ("function", "GLOBAL_QUOTE"),
                ("symbol", ticker.as_str()),
                ("apikey", key),
            ])
            .send()
            .await
            .context("price request failed")?;

        if resp.status().as_u16() == 429 {
            bail!("price API rate limit exceeded");
        }
        if !resp.status().is_success() {
            bail!("price API returned status {}", resp.status());
        }

        let envelope: QuoteEnvelope = resp.json().await.context("decoding price response")?;
        let quote = match envelope.quote {
            Some(q) if q.symbol.is_some() => q,
            _ => bail!("no data found for ticker: {ticker}"),
        };

        let price = parse_f64(quote.price.as_deref().unwrap_or_default());
        let snapshot = PriceSnapshot {
            ticker: ticker.clone(),
            price,
            change: parse_f64(quote.change.as_deref().unwrap_or_default()),
            change_percent: parse_f64(quote.change_percent.as_deref().unwrap_or_default()),
            open: parse_f64(quote.open.as_deref().unwrap_or_default()),
            high: parse_f64(quote.high.as_deref().unwrap_or_default()),
            low: parse_f64(quote.low.as_deref().unwrap_or_default()),
            close: price,
            volume: parse_u64(quote.volume.as_deref().unwrap_or_default()),
            last_updated: Utc::now(),
        };

        self.quote_cache.insert(cache_key, snapshot.clone());
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_without_key() {
        assert!(!AlphaVantageAdapter::new(None).is_configured());
        assert!(!AlphaVantageAdapter::new(Some(String::new())).is_configured());
        assert!(AlphaVantageAdapter::new(Some("demo".into())).is_configured());
    }

    #[tokio::test]
    async fn fetch_without_key_propagates_error() {
        let adapter = AlphaVantageAdapter::new(None);
        let err = adapter.fetch_price("AAPL").await.unwrap_err();
        assert!(err.to_string().contains("ALPHA_VANTAGE_API_KEY"));
    }

    #[test]
    fn quote_envelope_parses_ordinal_keys() {
        let json = r#"{"Global Quote": {
            "01. symbol": "AAPL",
            "02. open": "230.00",
            "03. high": "233.10",
            "04. low": "229.50",
            "05. price": "232.40",
            "06. volume": "51234567",
            "09. change": "2.40",
            "10. change percent": "1.0435%"
        }}"#;
        let env: QuoteEnvelope = serde_json::from_str(json).unwrap();
        let q = env.quote.unwrap();
        assert_eq!(q.symbol.as_deref(), Some("AAPL"));
        assert_eq!(parse_f64(q.change_percent.as_deref().unwrap()), 1.0435);
        assert_eq!(parse_u64(q.volume.as_deref().unwrap()), 51234567);
    }

    #[test]
    fn empty_quote_is_detected() {
        let env: QuoteEnvelope = serde_json::from_str(r#"{"Global Quote": {}}"#).unwrap();
        assert!(env.quote.unwrap().symbol.is_none());
    }
}
