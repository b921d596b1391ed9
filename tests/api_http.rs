// tests/api_http.rs
//
// HTTP-level tests for the public Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /health
// - GET /signal (missing ticker -> 400, single ticker happy path, batch shape)
// - POST /signal
// - GET /sentiment/youtube (missing ticker -> 400, unconfigured flag)
// - GET /debug/cache

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use tower::ServiceExt as _; // for `oneshot`

use whisper_trade::aggregator::SignalAggregator;
use whisper_trade::api::{self, AppState};
use whisper_trade::config::AggregationConfig;
use whisper_trade::content::{ContentItem, PriceSnapshot, Source};
use whisper_trade::scorer::DisabledScorer;
use whisper_trade::sources::price::AlphaVantageAdapter;
use whisper_trade::sources::reddit::RedditAdapter;
use whisper_trade::sources::twitter::TwitterAdapter;
use whisper_trade::sources::youtube::YouTubeAdapter;
use whisper_trade::sources::{ContentSource, PriceSource};

const BODY_LIMIT: usize = 1024 * 1024;

struct CannedContent(Source, Vec<ContentItem>);

#[async_trait]
impl ContentSource for CannedContent {
    fn kind(&self) -> Source {
        self.0
    }

    fn is_configured(&self) -> bool {
        true
    }

    async fn fetch_content(&self, _ticker: &str, max_items: usize) -> Result<Vec<ContentItem>> {
        Ok(self.1.iter().take(max_items).cloned().collect())
    }
}

struct CannedPrice;

#[async_trait]
impl PriceSource for CannedPrice {
    fn is_configured(&self) -> bool {
        true
    }

    async fn fetch_price(&self, ticker: &str) -> Result<PriceSnapshot> {
        Ok(PriceSnapshot {
            ticker: ticker.to_string(),
            price: 180.5,
            change: -1.5,
            change_percent: -0.82,
            open: 182.0,
            high: 183.0,
            low: 179.0,
            close: 182.0,
            volume: 500_000,
            last_updated: Utc::now(),
        })
    }
}

fn canned_item(source: Source, id: &str, text: &str) -> ContentItem {
    ContentItem {
        source,
        id: id.to_string(),
        title: String::new(),
        text: text.to_string(),
        comments: Vec::new(),
        engagement: 42.0,
        published_at: Utc::now(),
        author: "tester".to_string(),
        author_followers: None,
        subreddit: None,
        url: String::new(),
    }
}

/// Router wired like the binary, but with canned sources behind the
/// aggregator so nothing touches the network.
fn test_router() -> Router {
    let aggregator = Arc::new(SignalAggregator::new(
        Arc::new(CannedPrice),
        Arc::new(CannedContent(
            Source::Youtube,
            vec![canned_item(Source::Youtube, "y1", "bullish breakout ahead")],
        )),
        Arc::new(CannedContent(Source::Twitter, Vec::new())),
        Arc::new(CannedContent(
            Source::Reddit,
            vec![canned_item(Source::Reddit, "r1", "long calls, green week")],
        )),
        Arc::new(DisabledScorer),
        AggregationConfig::default(),
    ));
    let state = AppState::new(
        aggregator,
        Arc::new(AlphaVantageAdapter::new(None)),
        Arc::new(YouTubeAdapter::new(None)),
        Arc::new(TwitterAdapter::new(None)),
        Arc::new(RedditAdapter::new(None, None)),
    );
    api::create_router(state)
}

async fn body_json(resp: axum::response::Response) -> Value {
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn health_returns_200_ok() {
    let app = test_router();

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("oneshot /health");

    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    assert_eq!(String::from_utf8(bytes.to_vec()).unwrap(), "ok");
}

#[tokio::test]
async fn signal_without_ticker_is_400() {
    let app = test_router();

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/signal")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("oneshot /signal");

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn signal_single_ticker_returns_envelope() {
    let app = test_router();

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/signal?ticker=tsla")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("oneshot /signal?ticker");

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["success"], json!(true));

    let data = &body["data"];
    assert_eq!(data["ticker"], "TSLA");
    assert!(["buy", "sell", "hold"].contains(&data["signal"].as_str().unwrap()));
    assert!(data["confidence"].as_u64().unwrap() <= 100);
    assert!(data["sentimentScore"].is_number());
    assert_eq!(data["sources"]["youtube"]["count"], json!(1));
    assert_eq!(data["sources"]["reddit"]["count"], json!(1));
    assert!(data["factors"].is_array());
}

#[tokio::test]
async fn signal_batch_returns_display_rows_in_order() {
    let app = test_router();

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/signal?tickers=TSLA,AAPL")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("oneshot /signal?tickers");

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    let rows = body["data"].as_array().expect("array");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["ticker"], "TSLA");
    assert_eq!(rows[0]["name"], "Tesla Inc.");
    assert_eq!(rows[0]["id"], "signal-TSLA");
    assert_eq!(rows[1]["ticker"], "AAPL");
    assert_eq!(rows[1]["name"], "Apple Inc.");
    // Flattened display shape carries counts, not per-source weights.
    assert_eq!(rows[0]["sources"]["youtube"], json!(1));
}

#[tokio::test]
async fn signal_post_accepts_config_overrides() {
    let app = test_router();

    let payload = json!({
        "ticker": "AAPL",
        "config": { "useYoutube": false }
    });
    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/signal")
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .expect("oneshot POST /signal");

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["data"]["ticker"], "AAPL");
    assert_eq!(body["data"]["sources"]["youtube"]["count"], json!(0));
    assert_eq!(body["data"]["sources"]["reddit"]["count"], json!(1));
}

#[tokio::test]
async fn sentiment_route_without_ticker_is_400() {
    let app = test_router();

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/sentiment/youtube")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("oneshot /sentiment/youtube");

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn sentiment_route_reports_unconfigured_source() {
    let app = test_router();

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/sentiment/youtube?ticker=AAPL")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("oneshot /sentiment/youtube?ticker");

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["configured"], json!(false));
    assert_eq!(body["data"]["totalResults"], json!(0));
    assert_eq!(body["data"]["contentForAnalysis"], json!([]));
}

#[tokio::test]
async fn debug_cache_exposes_stats() {
    let app = test_router();

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/debug/cache")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("oneshot /debug/cache");

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert!(body["data"]["signal"]["keys"].is_number());
    assert!(body["data"]["signal"]["hits"].is_number());
    assert!(body["data"]["signal"]["misses"].is_number());
}
