//! Batched sentiment scoring against an external classifier
//!
//! Signals are partitioned into consecutive batches; each batch is one
//! classification request. A failed batch falls back to neutral scores for
//! every member, so every input id always comes back with a score and a
//! single malformed response never crashes the run.

use crate::ai::{strip_code_fences, truncate_chars, CompletionClient};
use common::RawSignal;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

pub const DEFAULT_SENTIMENT_BATCH_SIZE: usize = 15;

/// Per-signal content sent to the classifier is capped at this many chars.
const CONTENT_CAP: usize = 1000;

const SYSTEM_PROMPT: &str =
    "You are a financial sentiment analysis expert. Return only valid JSON.";

#[derive(Serialize)]
struct BatchEntry<'a> {
    id: &'a str,
    content: &'a str,
}

pub struct SentimentScorer {
    client: Arc<dyn CompletionClient>,
    batch_size: usize,
}

impl SentimentScorer {
    pub fn new(client: Arc<dyn CompletionClient>, batch_size: usize) -> Self {
        Self {
            client,
            batch_size: batch_size.max(1),
        }
    }

    /// Score every signal. The returned map contains exactly one entry per
    /// input id, each in [-1.0, 1.0]; batches that fail to classify or
    /// parse contribute 0.0 for all of their members.
    pub async fn score(&self, signals: &[RawSignal]) -> HashMap<String, f64> {
        let mut all_scores = HashMap::with_capacity(signals.len());

        for batch in signals.chunks(self.batch_size) {
            all_scores.extend(self.score_batch(batch).await);
        }

        all_scores
    }

    async fn score_batch(&self, batch: &[RawSignal]) -> HashMap<String, f64> {
        match self.request_batch(batch).await {
            Ok(mut scores) => {
                info!("✅ Scored sentiment for {} signals", batch.len());
                batch
                    .iter()
                    .map(|signal| {
                        let score = scores.remove(&signal.id).unwrap_or(0.0);
                        (signal.id.clone(), score.clamp(-1.0, 1.0))
                    })
                    .collect()
            }
            Err(e) => {
                warn!(
                    "Sentiment batch of {} failed, falling back to neutral: {:#}",
                    batch.len(),
                    e
                );
                batch.iter().map(|s| (s.id.clone(), 0.0)).collect()
            }
        }
    }

    async fn request_batch(&self, batch: &[RawSignal]) -> anyhow::Result<HashMap<String, f64>> {
        let contents: Vec<String> = batch.iter().map(|s| s.content()).collect();
        let entries: Vec<BatchEntry> = batch
            .iter()
            .zip(&contents)
            .map(|(signal, content)| BatchEntry {
                id: &signal.id,
                content: truncate_chars(content, CONTENT_CAP),
            })
            .collect();

        let prompt = build_prompt(&serde_json::to_string_pretty(&entries)?);
        let response = self.client.complete(SYSTEM_PROMPT, &prompt).await?;
        let scores: HashMap<String, f64> = serde_json::from_str(strip_code_fences(&response))?;
        Ok(scores)
    }
}

fn build_prompt(batch_json: &str) -> String {
    format!(
        r#"Analyze the sentiment of these financial discussions.
For each signal, return a sentiment score from -1.0 (very bearish) to 1.0 (very bullish).

Signals:
{batch_json}

Return ONLY a JSON object mapping signal IDs to sentiment scores:
{{"signal_id_1": 0.65, "signal_id_2": -0.32, ...}}

Consider:
- Positive: bullish language, excitement, growth mentions
- Negative: bearish language, concern, losses
- Neutral: factual statements, questions

Return ONLY the JSON object, no other text."#
    )
}
