//! # Signal Aggregator
//!
//! The core orchestrator. One call fans out to the price adapter and the
//! three content adapters concurrently (settle-all: each branch records its
//! own success or failure, none aborts a sibling), feeds the surviving
//! content to the sentiment scorer, converts the verdict into a discrete
//! trading signal, and caches the assembled result per ticker.
//!
//! Failure policy, inside-out:
//! - a content adapter error becomes an empty contribution;
//! - a scorer (LLM) error falls back to the deterministic heuristic;
//! - an LLM decision error falls back to the rule in [`crate::engine`];
//! - only "no content from any source AND no price" is terminal, and even
//!   that resolves to a hold/zero-confidence signal (never cached).
//!
//! Overlapping calls for the same ticker are coalesced: a per-ticker gate
//! serializes the compute, and the waiter is served from the fresh cache
//! entry, so concurrent dashboards cannot double-spend external quota.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::Utc;
use futures::future::join_all;
use metrics::{counter, gauge, histogram};
use once_cell::sync::OnceCell;
use tokio::sync::Mutex;

use crate::cache::{CacheStats, TtlCache};
use crate::config::AggregationConfig;
use crate::content::{ContentItem, PriceSnapshot};
use crate::engine;
use crate::normalize::normalize_ticker;
use crate::scorer::{heuristic, SentimentInput, SentimentScorer};
use crate::signal::{
    AggregatedSignal, SentimentVerdict, SignalDecision, SourceContribution, SourceContributions,
};
use crate::sources::{ContentSource, PriceSource};

const SIGNAL_CACHE_TTL: Duration = Duration::from_secs(180);

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        metrics::describe_counter!("signal_cache_hits_total", "Aggregated-signal cache hits.");
        metrics::describe_counter!("signal_cache_misses_total", "Aggregated-signal cache misses.");
        metrics::describe_counter!(
            "source_fetch_errors_total",
            "Source adapter fetch failures, labeled by source."
        );
        metrics::describe_counter!(
            "llm_fallback_total",
            "LLM scorer failures recovered by the heuristic strategy."
        );
        metrics::describe_histogram!("aggregate_duration_ms", "End-to-end aggregation time.");
        metrics::describe_gauge!(
            "signal_last_generated_ts",
            "Unix ts of the last freshly computed signal."
        );
    });
}

pub struct SignalAggregator {
    price: Arc<dyn PriceSource>,
    youtube: Arc<dyn ContentSource>,
    twitter: Arc<dyn ContentSource>,
    reddit: Arc<dyn ContentSource>,
    scorer: Arc<dyn SentimentScorer>,
    defaults: AggregationConfig,
    cache: TtlCache<AggregatedSignal>,
    inflight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SignalAggregator {
    pub fn new(
        price: Arc<dyn PriceSource>,
        youtube: Arc<dyn ContentSource>,
        twitter: Arc<dyn ContentSource>,
        reddit: Arc<dyn ContentSource>,
        scorer: Arc<dyn SentimentScorer>,
        defaults: AggregationConfig,
    ) -> Self {
        ensure_metrics_described();
        Self {
            price,
            youtube,
            twitter,
            reddit,
            scorer,
            defaults,
            cache: TtlCache::new(SIGNAL_CACHE_TTL),
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// The sole entry point: always returns a signal, never an error.
    pub async fn aggregate_signal(
        &self,
        ticker: &str,
        config: Option<AggregationConfig>,
    ) -> AggregatedSignal {
        let ticker = normalize_ticker(ticker);
        let config = config.unwrap_or_else(|| self.defaults.clone());
        let cache_key = format!("signal:{ticker}");

        if let Some(hit) = self.cache.get(&cache_key) {
            tracing::info!(%ticker, "signal cache hit");
            counter!("signal_cache_hits_total").increment(1);
            return hit;
        }
        counter!("signal_cache_misses_total").increment(1);

        // Single-flight: serialize same-ticker computes, recheck the cache
        // once the gate is ours.
        let gate = {
            let mut map = self.inflight.lock().await;
            map.entry(ticker.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        let _guard = gate.lock().await;
        // Peek so a coalesced wait counts as the single miss recorded above,
        // keeping cache stats and the Prometheus counters in step.
        if let Some(hit) = self.cache.peek(&cache_key) {
            tracing::debug!(%ticker, "signal cache hit after coalesced wait");
            return hit;
        }

        let started = std::time::Instant::now();
        let signal = match self.compute_signal(&ticker, &config).await {
            Ok(signal) => {
                self.cache.insert(cache_key, signal.clone());
                gauge!("signal_last_generated_ts").set(Utc::now().timestamp() as f64);
                signal
            }
            Err(e) => {
                // Terminal fallback: a renderable hold. Not cached so the
                // next call retries the sources.
                tracing::warn!(error = ?e, %ticker, "signal generation failed");
                AggregatedSignal::fallback(&ticker, &e.to_string())
            }
        };
        histogram!("aggregate_duration_ms").record(started.elapsed().as_secs_f64() * 1000.0);

        let mut map = self.inflight.lock().await;
        map.remove(&ticker);
        drop(map);

        signal
    }

    /// Fan `aggregate_signal` over all tickers concurrently; output order
    /// matches input order regardless of completion order.
    pub async fn get_batch_signals(
        &self,
        tickers: &[String],
        config: Option<AggregationConfig>,
    ) -> Vec<AggregatedSignal> {
        let futs = tickers
            .iter()
            .map(|t| self.aggregate_signal(t, config.clone()));
        join_all(futs).await
    }

    /// Clear one ticker's cached signal, or flush everything.
    pub fn clear_cache(&self, ticker: Option<&str>) {
        match ticker {
            Some(t) => self.cache.remove(&format!("signal:{}", normalize_ticker(t))),
            None => self.cache.clear(),
        }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    async fn compute_signal(
        &self,
        ticker: &str,
        config: &AggregationConfig,
    ) -> Result<AggregatedSignal> {
        tracing::info!(%ticker, "generating signal");

        // Settle-all fan-out: each branch yields its own Result; no branch
        // can abort a sibling. Twitter is skipped entirely when it has no
        // credentials; Reddit carries its own public fallback.
        let (price_res, youtube_res, twitter_res, reddit_res) = tokio::join!(
            self.price.fetch_price(ticker),
            async {
                if config.use_youtube {
                    self.youtube.fetch_content(ticker, config.max_youtube_videos).await
                } else {
                    Ok(Vec::new())
                }
            },
            async {
                if config.use_twitter && self.twitter.is_configured() {
                    self.twitter.fetch_content(ticker, config.max_tweets).await
                } else {
                    Ok(Vec::new())
                }
            },
            async {
                if config.use_reddit {
                    self.reddit.fetch_content(ticker, config.max_reddit_posts).await
                } else {
                    Ok(Vec::new())
                }
            },
        );

        let price = match price_res {
            Ok(p) => Some(p),
            Err(e) => {
                tracing::warn!(error = ?e, %ticker, "price fetch failed");
                counter!("source_fetch_errors_total", "source" => "price").increment(1);
                None
            }
        };
        let youtube = settle(youtube_res, "youtube");
        let twitter = settle(twitter_res, "twitter");
        let reddit = settle(reddit_res, "reddit");

        tracing::info!(
            %ticker,
            price = price.is_some(),
            youtube = youtube.len(),
            twitter = twitter.len(),
            reddit = reddit.len(),
            "source fetches settled"
        );

        let available_sources = [&youtube, &twitter, &reddit]
            .iter()
            .filter(|items| !items.is_empty())
            .count();
        if available_sources == 0 && price.is_none() {
            return Err(anyhow!("no data available for {ticker}"));
        }

        let input = SentimentInput {
            ticker,
            youtube: &youtube,
            twitter: &twitter,
            reddit: &reddit,
            price: price.as_ref(),
            config,
        };

        let verdict = self.score_sentiment(&input, available_sources).await;
        let decision = self
            .decide_signal(ticker, &verdict, price.as_ref())
            .await;

        Ok(self.assemble(ticker, config, &verdict, &decision, price, youtube, twitter, reddit))
    }

    /// LLM first when configured and there is content; any scorer error is
    /// recovered by the heuristic, never surfaced to the caller.
    async fn score_sentiment(
        &self,
        input: &SentimentInput<'_>,
        available_sources: usize,
    ) -> SentimentVerdict {
        if self.scorer.is_configured() && available_sources > 0 {
            match self.scorer.analyze(input).await {
                Ok(verdict) => return verdict,
                Err(e) => {
                    tracing::warn!(
                        error = ?e,
                        provider = self.scorer.provider_name(),
                        "llm analysis failed, using heuristic fallback"
                    );
                    counter!("llm_fallback_total").increment(1);
                }
            }
        }
        heuristic::calculate_fallback_sentiment(input)
    }

    async fn decide_signal(
        &self,
        ticker: &str,
        verdict: &SentimentVerdict,
        price: Option<&PriceSnapshot>,
    ) -> SignalDecision {
        if self.scorer.is_configured() {
            match self
                .scorer
                .decide(ticker, verdict.overall_score, verdict.overall_confidence, price)
                .await
            {
                Ok(decision) => return decision,
                Err(e) => {
                    tracing::warn!(error = ?e, "llm signal generation failed, using rule");
                    counter!("llm_fallback_total").increment(1);
                }
            }
        }
        engine::decide(verdict.overall_score, verdict.overall_confidence)
    }

    #[allow(clippy::too_many_arguments)]
    fn assemble(
        &self,
        ticker: &str,
        _config: &AggregationConfig,
        verdict: &SentimentVerdict,
        decision: &SignalDecision,
        price: Option<PriceSnapshot>,
        youtube: Vec<ContentItem>,
        twitter: Vec<ContentItem>,
        reddit: Vec<ContentItem>,
    ) -> AggregatedSignal {
        let total_items = youtube.len() + twitter.len() + reddit.len();
        let factors = if verdict.factors.is_empty() {
            heuristic::default_factors(verdict.overall_score, total_items)
        } else {
            verdict.factors.clone()
        };
        let summary = if verdict.summary.is_empty() {
            decision.reasoning.clone()
        } else {
            verdict.summary.clone()
        };

        let contribution = |count: usize, score: &crate::signal::SourceScore| SourceContribution {
            count,
            sentiment: score.score,
            weight: score.weight,
        };

        AggregatedSignal {
            ticker: ticker.to_string(),
            signal: decision.signal,
            confidence: decision.confidence.round().clamp(0.0, 100.0) as u8,
            sentiment_score: verdict.overall_score,
            summary,
            price: price.as_ref().map(|p| p.price).unwrap_or_default(),
            change: price.as_ref().map(|p| p.change).unwrap_or_default(),
            change_percent: price.as_ref().map(|p| p.change_percent).unwrap_or_default(),
            last_updated: Utc::now(),
            sources: SourceContributions {
                youtube: contribution(youtube.len(), &verdict.source_breakdown.youtube),
                twitter: contribution(twitter.len(), &verdict.source_breakdown.twitter),
                reddit: contribution(reddit.len(), &verdict.source_breakdown.reddit),
            },
            factors,
        }
    }
}

fn settle(result: Result<Vec<ContentItem>>, source: &'static str) -> Vec<ContentItem> {
    match result {
        Ok(items) => items,
        Err(e) => {
            tracing::warn!(error = ?e, source, "content fetch failed");
            counter!("source_fetch_errors_total", "source" => source).increment(1);
            Vec::new()
        }
    }
}
