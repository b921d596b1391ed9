//! # Sentiment Scorer
//!
//! Two interchangeable strategies turn a bundle of content items (grouped by
//! source) plus an optional price snapshot into a [`SentimentVerdict`]:
//!
//! - [`llm::OpenAiScorer`] sends the bundle to a chat-completions API in
//!   strict-JSON mode and parses the reply. It fails loudly on malformed or
//!   empty responses so the aggregator can fall back.
//! - [`heuristic`] is the deterministic keyword fallback, always available.
//!
//! Selection is by configuration (`is_configured`), never by content.

pub mod heuristic;
pub mod llm;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::config::AggregationConfig;
use crate::content::{ContentItem, PriceSnapshot};
use crate::signal::{SentimentVerdict, SignalDecision};

/// Content bundle handed to a scoring strategy.
pub struct SentimentInput<'a> {
    pub ticker: &'a str,
    pub youtube: &'a [ContentItem],
    pub twitter: &'a [ContentItem],
    pub reddit: &'a [ContentItem],
    pub price: Option<&'a PriceSnapshot>,
    pub config: &'a AggregationConfig,
}

impl SentimentInput<'_> {
    pub fn total_items(&self) -> usize {
        self.youtube.len() + self.twitter.len() + self.reddit.len()
    }

    /// Number of sources that produced at least one item.
    pub fn active_sources(&self) -> usize {
        [self.youtube, self.twitter, self.reddit]
            .iter()
            .filter(|items| !items.is_empty())
            .count()
    }
}

/// Strategy seam for the LLM-backed scorer; the heuristic stays a plain
/// function since it has no configuration or I/O.
#[async_trait]
pub trait SentimentScorer: Send + Sync {
    /// True iff the backing service has credentials. When false, the
    /// aggregator goes straight to the heuristic.
    fn is_configured(&self) -> bool;

    fn provider_name(&self) -> &'static str;

    /// Score the bundle. Errors (network, malformed JSON, empty reply) must
    /// propagate; the caller owns the fallback policy.
    async fn analyze(&self, input: &SentimentInput<'_>) -> Result<SentimentVerdict>;

    /// Turn a verdict into a discrete trading decision. Same error contract
    /// as `analyze`; the caller falls back to [`crate::engine::decide`].
    async fn decide(
        &self,
        ticker: &str,
        sentiment_score: f64,
        confidence: f64,
        price: Option<&PriceSnapshot>,
    ) -> Result<SignalDecision>;
}

/// Used when no LLM credentials are present.
pub struct DisabledScorer;

#[async_trait]
impl SentimentScorer for DisabledScorer {
    fn is_configured(&self) -> bool {
        false
    }

    fn provider_name(&self) -> &'static str {
        "disabled"
    }

    async fn analyze(&self, _input: &SentimentInput<'_>) -> Result<SentimentVerdict> {
        bail!("sentiment scorer disabled")
    }

    async fn decide(
        &self,
        _ticker: &str,
        _sentiment_score: f64,
        _confidence: f64,
        _price: Option<&PriceSnapshot>,
    ) -> Result<SignalDecision> {
        bail!("sentiment scorer disabled")
    }
}

/// LLM-backed when an OpenAI key is present, otherwise disabled (the
/// aggregator then routes every call to the heuristic).
pub fn from_credentials(creds: &crate::config::Credentials) -> std::sync::Arc<dyn SentimentScorer> {
    match &creds.openai_key {
        Some(key) => std::sync::Arc::new(llm::OpenAiScorer::new(Some(key.clone()), None)),
        None => std::sync::Arc::new(DisabledScorer),
    }
}
