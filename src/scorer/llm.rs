//! LLM-backed scorer: chat-completions JSON mode over reqwest.
//!
//! Requires `OPENAI_API_KEY`. A malformed or empty reply is an error, never
//! a silent zero-confidence verdict; the aggregator retries with the
//! heuristic strategy.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::content::PriceSnapshot;
use crate::signal::{
    Factor, Sentiment, SentimentVerdict, SignalDecision, SourceBreakdown, SourceScore,
};

use super::{SentimentInput, SentimentScorer};

const API_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

pub struct OpenAiScorer {
    http: reqwest::Client,
    api_key: Option<String>,
    model: String,
}

impl OpenAiScorer {
    pub fn new(api_key: Option<String>, model_override: Option<&str>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("whisper-trade/0.1 (+github.com/whispertrade/whisper-trade)")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(15))
            .build()
            .expect("reqwest client");
        Self {
            http,
            api_key,
            model: model_override.unwrap_or(DEFAULT_MODEL).to_string(),
        }
    }

    async fn chat_json(&self, system: &str, user: &str, temperature: f32, max_tokens: u32) -> Result<String> {
        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct ResponseFormat<'a> {
            #[serde(rename = "type")]
            kind: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            max_tokens: u32,
            response_format: ResponseFormat<'a>,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: Option<String>,
        }

        let key = self
            .api_key
            .as_deref()
            .context("OPENAI_API_KEY not configured")?;

        let req = Req {
            model: &self.model,
            messages: vec![
                Msg { role: "system", content: system },
                Msg { role: "user", content: user },
            ],
            temperature,
            max_tokens,
            response_format: ResponseFormat { kind: "json_object" },
        };

        let resp = self
            .http
            .post(API_URL)
            .bearer_auth(key)
            .json(&req)
            .send()
            .await
            .context("openai request failed")?;

        if !resp.status().is_success() {
            bail!("openai returned status {}", resp.status());
        }

        let body: Resp = resp.json().await.context("decoding openai response")?;
        let content = body
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();
        if content.trim().is_empty() {
            bail!("empty response from openai");
        }
        Ok(content)
    }
}

/// Render the content bundle as the analysis prompt.
fn build_analysis_prompt(input: &SentimentInput<'_>) -> String {
    let mut parts: Vec<String> = Vec::new();

    if !input.youtube.is_empty() {
        let lines: Vec<String> = input
            .youtube
            .iter()
            .map(|v| {
                let desc: String = v.text.chars().take(200).collect();
                format!("- {}: {}... [Engagement: {}]", v.title, desc, v.engagement)
            })
            .collect();
        parts.push(format!(
            "YouTube Videos ({}):\n{}",
            input.youtube.len(),
            lines.join("\n")
        ));
    }

    if !input.twitter.is_empty() {
        let lines: Vec<String> = input
            .twitter
            .iter()
            .map(|t| {
                let text: String = t.text.chars().take(200).collect();
                format!(
                    "- {}... [Engagement: {}, Followers: {}]",
                    text,
                    t.engagement,
                    t.author_followers.unwrap_or(0)
                )
            })
            .collect();
        parts.push(format!(
            "Twitter Posts ({}):\n{}",
            input.twitter.len(),
            lines.join("\n")
        ));
    }

    if !input.reddit.is_empty() {
        let lines: Vec<String> = input
            .reddit
            .iter()
            .map(|r| {
                format!(
                    "- r/{}: {} [Engagement: {}]",
                    r.subreddit.as_deref().unwrap_or("unknown"),
                    r.title,
                    r.engagement
                )
            })
            .collect();
        parts.push(format!(
            "Reddit Posts ({}):\n{}",
            input.reddit.len(),
            lines.join("\n")
        ));
    }

    if let Some(p) = input.price {
        let sign = if p.change_percent > 0.0 { "+" } else { "" };
        parts.push(format!("Stock Price: ${} ({sign}{}%)", p.price, p.change_percent));
    }

    format!(
        "Analyze the following social media sentiment data for {} and provide a trading signal recommendation.\n\n{}\n\n\
         Respond in this exact JSON format:\n\
         {{\n\
           \"overallSentiment\": \"bullish\" | \"bearish\" | \"neutral\",\n\
           \"overallScore\": number between -1 and 1,\n\
           \"overallConfidence\": number between 0 and 1,\n\
           \"summary\": \"brief summary\",\n\
           \"factors\": [ {{ \"type\": \"positive\", \"label\": \"Factor Name\", \"value\": \"+12%\" }} ],\n\
           \"sourceBreakdown\": {{\n\
             \"youtube\": {{ \"sentiment\": \"bullish\", \"score\": 0.6, \"weight\": 0.3 }},\n\
             \"twitter\": {{ \"sentiment\": \"neutral\", \"score\": 0.1, \"weight\": 0.4 }},\n\
             \"reddit\": {{ \"sentiment\": \"bullish\", \"score\": 0.7, \"weight\": 0.3 }}\n\
           }}\n\
         }}",
        input.ticker,
        parts.join("\n\n")
    )
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerdictWire {
    overall_sentiment: Sentiment,
    overall_score: f64,
    overall_confidence: f64,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    factors: Vec<Factor>,
    #[serde(default)]
    source_breakdown: Option<SourceBreakdown>,
}

fn default_breakdown() -> SourceBreakdown {
    let third = |w| SourceScore {
        sentiment: Sentiment::Neutral,
        score: 0.0,
        weight: w,
    };
    SourceBreakdown {
        youtube: third(0.33),
        twitter: third(0.33),
        reddit: third(0.34),
    }
}

#[async_trait]
impl SentimentScorer for OpenAiScorer {
    fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }

    async fn analyze(&self, input: &SentimentInput<'_>) -> Result<SentimentVerdict> {
        let system = "You are an expert financial analyst specializing in social sentiment \
                      analysis for stock trading. Provide objective, data-driven sentiment \
                      analysis based on social media content. Consider engagement levels and \
                      source credibility. Output must be valid JSON.";
        let prompt = build_analysis_prompt(input);
        let content = self.chat_json(system, &prompt, 0.3, 1000).await?;

        let wire: VerdictWire =
            serde_json::from_str(&content).context("parsing sentiment verdict JSON")?;

        Ok(SentimentVerdict {
            overall_sentiment: wire.overall_sentiment,
            overall_score: wire.overall_score.clamp(-1.0, 1.0),
            overall_confidence: wire.overall_confidence.clamp(0.0, 1.0),
            summary: wire.summary,
            factors: wire.factors,
            source_breakdown: wire.source_breakdown.unwrap_or_else(default_breakdown),
        })
    }

    async fn decide(
        &self,
        ticker: &str,
        sentiment_score: f64,
        confidence: f64,
        price: Option<&PriceSnapshot>,
    ) -> Result<SignalDecision> {
        let system = "You are a quantitative trading analyst. Generate clear trading signals \
                      based on sentiment data. Be conservative - only recommend buy/sell with \
                      high confidence.";
        let price_info = price
            .map(|p| {
                let sign = if p.change_percent > 0.0 { "+" } else { "" };
                format!("Current Price: ${} ({sign}{}%)", p.price, p.change_percent)
            })
            .unwrap_or_default();
        let prompt = format!(
            "Given the following data for {ticker}, generate a trading signal:\n\n\
             Sentiment Score: {sentiment_score} (-1 bearish to +1 bullish)\n\
             Confidence: {confidence} (0 to 1)\n\
             {price_info}\n\n\
             Respond in JSON format:\n\
             {{ \"signal\": \"buy\" | \"sell\" | \"hold\", \"confidence\": number 0-100, \"reasoning\": \"brief reasoning\" }}"
        );
        let content = self.chat_json(system, &prompt, 0.2, 200).await?;

        let mut decision: SignalDecision =
            serde_json::from_str(&content).context("parsing signal decision JSON")?;
        decision.confidence = decision.confidence.clamp(0.0, 100.0);
        Ok(decision)
    }
}
