use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::aggregator::SignalAggregator;
use crate::config::{AggregationConfig, Credentials};
use crate::normalize::normalize_ticker;
use crate::signal::to_stock_signal;
use crate::sources::price::AlphaVantageAdapter;
use crate::sources::reddit::{RedditAdapter, DEFAULT_SUBREDDITS};
use crate::sources::twitter::TwitterAdapter;
use crate::sources::youtube::YouTubeAdapter;
use crate::sources::{ContentSource, PriceSource};

#[derive(Clone)]
pub struct AppState {
    aggregator: Arc<SignalAggregator>,
    price: Arc<AlphaVantageAdapter>,
    youtube: Arc<YouTubeAdapter>,
    twitter: Arc<TwitterAdapter>,
    reddit: Arc<RedditAdapter>,
}

impl AppState {
    pub fn new(
        aggregator: Arc<SignalAggregator>,
        price: Arc<AlphaVantageAdapter>,
        youtube: Arc<YouTubeAdapter>,
        twitter: Arc<TwitterAdapter>,
        reddit: Arc<RedditAdapter>,
    ) -> Self {
        Self {
            aggregator,
            price,
            youtube,
            twitter,
            reddit,
        }
    }

    /// Wire everything from env credentials, sharing one adapter instance
    /// between the aggregator and the per-source routes.
    pub fn from_env() -> Self {
        let creds = Credentials::from_env();
        let price = Arc::new(AlphaVantageAdapter::new(creds.alpha_vantage_key.clone()));
        let youtube = Arc::new(YouTubeAdapter::new(creds.youtube_key.clone()));
        let twitter = Arc::new(TwitterAdapter::new(creds.twitter_bearer_token.clone()));
        let reddit = Arc::new(RedditAdapter::new(
            creds.reddit_client_id.clone(),
            creds.reddit_client_secret.clone(),
        ));
        let scorer = crate::scorer::from_credentials(&creds);
        let aggregator = Arc::new(SignalAggregator::new(
            price.clone(),
            youtube.clone(),
            twitter.clone(),
            reddit.clone(),
            scorer,
            AggregationConfig::default(),
        ));
        Self::new(aggregator, price, youtube, twitter, reddit)
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/signal", get(signal_get).post(signal_post))
        .route("/sentiment/youtube", get(sentiment_youtube))
        .route("/sentiment/twitter", get(sentiment_twitter))
        .route("/sentiment/reddit", get(sentiment_reddit))
        .route("/sentiment/reddit/trending", get(reddit_trending))
        .route("/stock/{ticker}/price", get(stock_price))
        .route("/stock/search", get(stock_search))
        .route("/debug/cache", get(debug_cache))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Display names for the tickers the dashboard ships with; anything else
/// falls back to the raw symbol.
fn company_name(ticker: &str) -> &str {
    match ticker {
        "AAPL" => "Apple Inc.",
        "GOOGL" => "Alphabet Inc.",
        "MSFT" => "Microsoft Corporation",
        "AMZN" => "Amazon.com Inc.",
        "TSLA" => "Tesla Inc.",
        "META" => "Meta Platforms Inc.",
        "NVDA" => "NVIDIA Corporation",
        "NFLX" => "Netflix Inc.",
        "AMD" => "Advanced Micro Devices Inc.",
        "GME" => "GameStop Corp.",
        "AMC" => "AMC Entertainment Holdings",
        "PLTR" => "Palantir Technologies",
        "COIN" => "Coinbase Global Inc.",
        "SPY" => "SPDR S&P 500 ETF",
        "QQQ" => "Invesco QQQ Trust",
        other => other,
    }
}

fn bad_request(message: &str) -> axum::response::Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

#[derive(serde::Deserialize)]
struct SignalQuery {
    ticker: Option<String>,
    tickers: Option<String>,
}

/// `?ticker=` yields one aggregated signal; `?tickers=a,b,c` yields the
/// flattened display list, in request order.
async fn signal_get(
    State(state): State<AppState>,
    Query(q): Query<SignalQuery>,
) -> axum::response::Response {
    if let Some(ticker) = q.ticker.as_deref().filter(|t| !t.trim().is_empty()) {
        let signal = state.aggregator.aggregate_signal(ticker, None).await;
        return Json(json!({ "success": true, "data": signal })).into_response();
    }
    if let Some(raw) = q.tickers.as_deref() {
        let tickers: Vec<String> = raw
            .split(',')
            .map(normalize_ticker)
            .filter(|t| !t.is_empty())
            .collect();
        if tickers.is_empty() {
            return bad_request("tickers query parameter is empty");
        }
        let signals = state.aggregator.get_batch_signals(&tickers, None).await;
        let rows: Vec<_> = signals
            .iter()
            .map(|s| to_stock_signal(s, company_name(&s.ticker), &format!("signal-{}", s.ticker)))
            .collect();
        return Json(json!({ "success": true, "data": rows })).into_response();
    }
    bad_request("ticker query parameter is required")
}

#[derive(serde::Deserialize)]
struct SignalReq {
    ticker: String,
    #[serde(default)]
    config: Option<AggregationConfig>,
}

async fn signal_post(
    State(state): State<AppState>,
    Json(body): Json<SignalReq>,
) -> axum::response::Response {
    if body.ticker.trim().is_empty() {
        return bad_request("ticker is required");
    }
    let signal = state
        .aggregator
        .aggregate_signal(&body.ticker, body.config)
        .await;
    Json(json!({ "success": true, "data": signal })).into_response()
}

#[derive(serde::Deserialize)]
struct SentimentQuery {
    ticker: Option<String>,
    max: Option<usize>,
}

async fn sentiment_youtube(
    State(state): State<AppState>,
    Query(q): Query<SentimentQuery>,
) -> axum::response::Response {
    source_content(state.youtube.as_ref(), q, 5).await
}

async fn sentiment_twitter(
    State(state): State<AppState>,
    Query(q): Query<SentimentQuery>,
) -> axum::response::Response {
    source_content(state.twitter.as_ref(), q, 20).await
}

async fn sentiment_reddit(
    State(state): State<AppState>,
    Query(q): Query<SentimentQuery>,
) -> axum::response::Response {
    source_content(state.reddit.as_ref(), q, 10).await
}

async fn source_content(
    source: &dyn ContentSource,
    q: SentimentQuery,
    default_max: usize,
) -> axum::response::Response {
    let Some(ticker) = q.ticker.as_deref().filter(|t| !t.trim().is_empty()) else {
        return bad_request("ticker query parameter is required");
    };
    let ticker = normalize_ticker(ticker);
    let max = q.max.unwrap_or(default_max);

    let items = match source.fetch_content(&ticker, max).await {
        Ok(items) => items,
        Err(e) => {
            tracing::warn!(error = ?e, source = %source.kind(), %ticker, "content route fetch failed");
            Vec::new()
        }
    };
    let content_for_analysis: Vec<String> = items.iter().map(|i| i.combined_text()).collect();
    let total = items.len();

    Json(json!({
        "success": true,
        "data": {
            "ticker": ticker,
            "items": items,
            "totalResults": total,
            "contentForAnalysis": content_for_analysis,
            "configured": source.is_configured(),
        }
    }))
    .into_response()
}

#[derive(serde::Deserialize)]
struct TrendingQuery {
    limit: Option<usize>,
}

async fn reddit_trending(
    State(state): State<AppState>,
    Query(q): Query<TrendingQuery>,
) -> Json<serde_json::Value> {
    let limit = q.limit.unwrap_or(10).min(50);
    let posts = state
        .reddit
        .trending_posts(&DEFAULT_SUBREDDITS, limit)
        .await;
    let total = posts.len();
    Json(json!({
        "success": true,
        "data": { "posts": posts, "totalResults": total }
    }))
}

async fn stock_price(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> axum::response::Response {
    match state.price.fetch_price(&ticker).await {
        Ok(snapshot) => Json(json!({ "success": true, "data": snapshot })).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}

#[derive(serde::Deserialize)]
struct SearchQuery {
    q: Option<String>,
}

async fn stock_search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> axum::response::Response {
    let Some(keywords) = query.q.as_deref().filter(|s| !s.trim().is_empty()) else {
        return bad_request("q query parameter is required");
    };
    let matches = state.price.search_symbol(keywords.trim()).await;
    Json(json!({ "success": true, "data": { "matches": matches } })).into_response()
}

async fn debug_cache(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "success": true,
        "data": {
            "signal": state.aggregator.cache_stats(),
            "price": state.price.cache_stats(),
        }
    }))
}
