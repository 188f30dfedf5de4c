//! Cross-signal insight synthesis
//!
//! Takes the whole enriched batch and asks a reasoning model to surface
//! recurring themes across signals. One request per run; any failure in the
//! call or the parse yields an empty result rather than aborting the run.

use crate::ai::{strip_code_fences, truncate_chars, CompletionClient};
use chrono::Utc;
use common::{Evidence, Insight, RawSignal, Sentiment, Urgency};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

/// Insights below this confidence are dropped even if the model returns them.
const CONFIDENCE_FLOOR: f64 = 0.5;

/// Per-signal body text sent to the synthesizer is capped at this many chars.
const BODY_CAP: usize = 500;

const SYSTEM_PROMPT: &str = "You are an expert market analyst identifying actionable \
supply chain and market signals from social media discussions. Return only valid JSON.";

#[derive(Serialize)]
struct SynthesisEntry<'a> {
    id: &'a str,
    title: &'a str,
    body: &'a str,
    tickers: Vec<String>,
    companies: Vec<String>,
    keywords: Vec<String>,
    sentiment: f64,
    upvotes: i64,
    subreddit: &'a str,
}

/// What the model is asked to return per insight. Everything except the
/// theme and confidence is defaulted so a sloppy response still parses.
#[derive(Deserialize)]
struct RawInsight {
    theme: String,
    confidence_score: f64,
    #[serde(default)]
    related_assets: Vec<String>,
    #[serde(default)]
    sentiment: Sentiment,
    #[serde(default)]
    urgency: Urgency,
    #[serde(default)]
    sources_agreeing: Vec<String>,
    #[serde(default)]
    evidence: Evidence,
}

pub struct InsightSynthesizer {
    client: Arc<dyn CompletionClient>,
}

impl InsightSynthesizer {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self { client }
    }

    /// Synthesize insights from the enriched batch. Returns an empty vec on
    /// any synthesis failure; the caller's enrichment commits are unaffected.
    pub async fn synthesize(&self, signals: &[RawSignal]) -> Vec<Insight> {
        if signals.is_empty() {
            return Vec::new();
        }

        match self.request_insights(signals).await {
            Ok(insights) => {
                info!("✅ Synthesized {} insights", insights.len());
                insights
            }
            Err(e) => {
                error!("Insight synthesis failed, continuing without insights: {:#}", e);
                Vec::new()
            }
        }
    }

    async fn request_insights(&self, signals: &[RawSignal]) -> anyhow::Result<Vec<Insight>> {
        let entries: Vec<SynthesisEntry> = signals
            .iter()
            .map(|signal| {
                let entities = signal.extracted_entities.clone().unwrap_or_default();
                SynthesisEntry {
                    id: &signal.id,
                    title: &signal.title,
                    body: truncate_chars(&signal.body, BODY_CAP),
                    tickers: entities.tickers,
                    companies: entities.companies,
                    keywords: entities.keywords,
                    sentiment: signal.sentiment_score.unwrap_or(0.0),
                    upvotes: signal.engagement.upvotes,
                    subreddit: &signal.subreddit,
                }
            })
            .collect();

        let prompt = build_prompt(&serde_json::to_string_pretty(&entries)?);
        let response = self.client.complete(SYSTEM_PROMPT, &prompt).await?;
        let raw: Vec<RawInsight> = serde_json::from_str(strip_code_fences(&response))?;

        let now = Utc::now();
        let insights = raw
            .into_iter()
            .filter(|r| r.confidence_score > CONFIDENCE_FLOOR)
            .map(|r| {
                let signal_ids = r.evidence.supporting_signal_ids.clone();
                Insight {
                    theme: r.theme,
                    confidence_score: r.confidence_score,
                    related_assets: r.related_assets,
                    sentiment: r.sentiment,
                    urgency: r.urgency,
                    sources_agreeing: r.sources_agreeing,
                    evidence: r.evidence,
                    signal_ids,
                    created_at: now,
                    expires_at: r.urgency.expiry_from(now),
                }
            })
            .collect();

        Ok(insights)
    }
}

fn build_prompt(batch_json: &str) -> String {
    format!(
        r#"Analyze these {count} financial signals and identify 2-5 major market insights.

Signals:
{batch_json}

For each insight, return:
- theme: short description of the pattern (e.g. "GPU supply shortage worsening")
- confidence_score: 0.0-1.0 based on evidence strength and source agreement
- related_assets: ticker symbols affected
- sentiment: "bullish", "bearish", or "neutral"
- urgency: "immediate" (act within 24h), "developing" (this week), or "background"
- sources_agreeing: subreddits where the theme appears
- evidence: {{"key_quotes": [...], "supporting_signal_ids": [...]}}

Only include insights with confidence above 0.5.

Return ONLY a JSON array of insight objects, no other text."#,
        count = batch_json.matches("\"id\"").count(),
    )
}
