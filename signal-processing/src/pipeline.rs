//! End-to-end processing run
//!
//! One `SignalProcessor::run` does the full pass over a batch of
//! unprocessed signals:
//!
//! 1. Fetch the hottest unprocessed signals from the store
//! 2. Extract tickers and company names from each
//! 3. Score sentiment in batches
//! 4. Synthesize cross-signal insights
//! 5. Commit enrichment and insights back to the store
//!
//! A dry run executes stages 1-4 and reports what stage 5 would have
//! written, without touching the store.

use crate::config::ProcessorConfig;
use crate::extractor::EntityExtractor;
use crate::queue::{CommitReport, SignalQueue};
use crate::sentiment::SentimentScorer;
use crate::synthesizer::InsightSynthesizer;
use anyhow::{Context, Result};
use common::{ExtractedEntities, Insight, SignalStore};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::info;

/// Everything one run produced, for logging and for dry-run inspection.
#[derive(Debug)]
pub struct RunSummary {
    pub processed_count: usize,
    pub insights_count: usize,
    /// Unique tickers seen across the batch.
    pub tickers_count: usize,
    pub dry_run: bool,
    pub extracted_entities: HashMap<String, ExtractedEntities>,
    pub sentiment_scores: HashMap<String, f64>,
    pub insights: Vec<Insight>,
    /// Present only for live runs.
    pub commit: Option<CommitReport>,
}

impl RunSummary {
    fn empty(dry_run: bool) -> Self {
        Self {
            processed_count: 0,
            insights_count: 0,
            tickers_count: 0,
            dry_run,
            extracted_entities: HashMap::new(),
            sentiment_scores: HashMap::new(),
            insights: Vec::new(),
            commit: None,
        }
    }
}

pub struct SignalProcessor {
    store: Arc<dyn SignalStore>,
    queue: SignalQueue,
    extractor: EntityExtractor,
    scorer: SentimentScorer,
    synthesizer: InsightSynthesizer,
    config: ProcessorConfig,
}

impl SignalProcessor {
    pub fn new(
        store: Arc<dyn SignalStore>,
        extractor: EntityExtractor,
        scorer: SentimentScorer,
        synthesizer: InsightSynthesizer,
        config: ProcessorConfig,
    ) -> Self {
        Self {
            queue: SignalQueue::new(store.clone()),
            store,
            extractor,
            scorer,
            synthesizer,
            config,
        }
    }

    /// Run one processing pass. `batch_size` overrides the configured batch
    /// size when given. Enrichment commits are best-effort per record (see
    /// the `CommitReport` in the summary); a failed insight insert aborts.
    pub async fn run(&self, batch_size: Option<usize>, dry_run: bool) -> Result<RunSummary> {
        let limit = batch_size.unwrap_or(self.config.batch_size);

        info!("[1/5] Fetching unprocessed signals (limit {})", limit);
        let mut signals = self.queue.fetch_unprocessed(limit).await;
        if signals.is_empty() {
            info!("No unprocessed signals, nothing to do");
            return Ok(RunSummary::empty(dry_run));
        }
        info!("Processing batch of {} signals", signals.len());

        info!("[2/5] Extracting entities");
        let mut extracted_entities = HashMap::with_capacity(signals.len());
        for signal in &signals {
            let entities = self.extractor.extract(&signal.content());
            extracted_entities.insert(signal.id.clone(), entities);
        }
        let tickers: HashSet<&str> = extracted_entities
            .values()
            .flat_map(|e| e.tickers.iter().map(String::as_str))
            .collect();
        info!(
            "Found {} unique tickers across {} signals",
            tickers.len(),
            signals.len()
        );

        info!("[3/5] Scoring sentiment");
        let sentiment_scores = self.scorer.score(&signals).await;

        // Fold enrichment onto the in-memory batch so the synthesizer sees it.
        for signal in &mut signals {
            signal.extracted_entities = extracted_entities.get(&signal.id).cloned();
            signal.sentiment_score = sentiment_scores.get(&signal.id).copied();
        }

        info!("[4/5] Synthesizing insights");
        let insights = self.synthesizer.synthesize(&signals).await;

        let mut summary = RunSummary {
            processed_count: signals.len(),
            insights_count: insights.len(),
            tickers_count: tickers.len(),
            dry_run,
            extracted_entities,
            sentiment_scores,
            insights,
            commit: None,
        };

        if dry_run {
            info!(
                "[5/5] Dry run: skipping commit of {} enrichments and {} insights",
                summary.processed_count, summary.insights_count
            );
            return Ok(summary);
        }

        info!("[5/5] Committing results");
        let ids: Vec<String> = signals.iter().map(|s| s.id.clone()).collect();
        let report = self
            .queue
            .commit_enrichment(&ids, &summary.extracted_entities, &summary.sentiment_scores)
            .await;
        summary.commit = Some(report);

        if !summary.insights.is_empty() {
            self.store
                .insert_insights(&summary.insights)
                .await
                .context("Failed to store insights")?;
            info!("✅ Stored {} insights", summary.insights.len());
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::CompletionClient;
    use anyhow::anyhow;
    use chrono::Utc;
    use common::{EngagementMetrics, InMemoryStore, RawSignal};

    fn signal(id: &str, title: &str, body: &str) -> RawSignal {
        RawSignal {
            id: id.to_string(),
            source: "reddit".to_string(),
            source_id: format!("src-{}", id),
            subreddit: "stocks".to_string(),
            title: title.to_string(),
            body: body.to_string(),
            author: "tester".to_string(),
            engagement: EngagementMetrics {
                upvotes: 200,
                num_comments: 50,
                upvote_ratio: 0.95,
                velocity: Some(40.0),
            },
            is_quality_signal: true,
            source_created_at: Utc::now(),
            scraped_at: Utc::now(),
            age_hours: 5.0,
            extracted_entities: None,
            sentiment_score: None,
            processed: false,
        }
    }

    struct StaticClient(String);

    #[async_trait::async_trait]
    impl CompletionClient for StaticClient {
        async fn complete(&self, _system: &str, _user: &str) -> anyhow::Result<String> {
            Ok(self.0.clone())
        }
    }

    struct FailingClient;

    #[async_trait::async_trait]
    impl CompletionClient for FailingClient {
        async fn complete(&self, _system: &str, _user: &str) -> anyhow::Result<String> {
            Err(anyhow!("model unavailable"))
        }
    }

    const SENTIMENT_RESPONSE: &str = r#"{"s1": 0.8, "s2": -0.2}"#;
    const SYNTHESIS_RESPONSE: &str = r#"[
  {
    "theme": "Chip demand surging",
    "confidence_score": 0.85,
    "related_assets": ["NVDA", "TSLA"],
    "sentiment": "bullish",
    "urgency": "developing",
    "sources_agreeing": ["stocks"],
    "evidence": {"key_quotes": ["demand is insane"], "supporting_signal_ids": ["s1", "s2"]}
  }
]"#;

    async fn seeded_store() -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        store
            .upsert_signals(&[
                signal("s1", "Loading up on $NVDA", "data center demand"),
                signal("s2", "tesla delivery numbers", "looked weak this quarter"),
            ])
            .await
            .unwrap();
        store
    }

    fn processor(
        store: Arc<InMemoryStore>,
        scorer_client: Arc<dyn CompletionClient>,
        synth_client: Arc<dyn CompletionClient>,
    ) -> SignalProcessor {
        SignalProcessor::new(
            store,
            EntityExtractor::new().unwrap(),
            SentimentScorer::new(scorer_client, 15),
            InsightSynthesizer::new(synth_client),
            ProcessorConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_dry_run_reports_without_mutating_store() {
        let store = seeded_store().await;
        let processor = processor(
            store.clone(),
            Arc::new(StaticClient(SENTIMENT_RESPONSE.to_string())),
            Arc::new(StaticClient(SYNTHESIS_RESPONSE.to_string())),
        );

        let summary = processor.run(None, true).await.unwrap();

        assert!(summary.dry_run);
        assert_eq!(summary.processed_count, 2);
        assert_eq!(summary.insights_count, 1);
        // $NVDA cashtag from s1, tesla dictionary hit from s2.
        assert_eq!(summary.tickers_count, 2);
        assert_eq!(summary.sentiment_scores["s1"], 0.8);
        assert!(summary.commit.is_none());

        // The store must be untouched.
        assert!(!store.get_signal("s1").await.unwrap().processed);
        assert!(!store.get_signal("s2").await.unwrap().processed);
        assert!(store.insights().await.is_empty());
    }

    #[tokio::test]
    async fn test_live_run_commits_enrichment_and_insights() {
        let store = seeded_store().await;
        let processor = processor(
            store.clone(),
            Arc::new(StaticClient(SENTIMENT_RESPONSE.to_string())),
            Arc::new(StaticClient(SYNTHESIS_RESPONSE.to_string())),
        );

        let summary = processor.run(None, false).await.unwrap();

        let report = summary.commit.unwrap();
        assert!(report.is_complete());
        assert_eq!(report.updated, 2);

        let s1 = store.get_signal("s1").await.unwrap();
        assert!(s1.processed);
        assert_eq!(s1.sentiment_score, Some(0.8));
        let entities = s1.extracted_entities.unwrap();
        assert_eq!(entities.tickers, vec!["NVDA".to_string()]);

        let insights = store.insights().await;
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].theme, "Chip demand surging");

        // A second run sees nothing left to process.
        let again = processor.run(None, false).await.unwrap();
        assert_eq!(again.processed_count, 0);
    }

    #[tokio::test]
    async fn test_empty_store_short_circuits() {
        let store = Arc::new(InMemoryStore::new());
        let processor = processor(
            store,
            Arc::new(StaticClient(SENTIMENT_RESPONSE.to_string())),
            Arc::new(StaticClient(SYNTHESIS_RESPONSE.to_string())),
        );

        let summary = processor.run(None, false).await.unwrap();
        assert_eq!(summary.processed_count, 0);
        assert_eq!(summary.insights_count, 0);
        assert!(summary.commit.is_none());
    }

    #[tokio::test]
    async fn test_synthesis_failure_still_commits_enrichment() {
        let store = seeded_store().await;
        let processor = processor(
            store.clone(),
            Arc::new(StaticClient(SENTIMENT_RESPONSE.to_string())),
            Arc::new(FailingClient),
        );

        let summary = processor.run(None, false).await.unwrap();

        assert_eq!(summary.insights_count, 0);
        assert!(summary.commit.unwrap().is_complete());
        assert!(store.get_signal("s1").await.unwrap().processed);
        assert!(store.insights().await.is_empty());
    }

    #[tokio::test]
    async fn test_batch_size_override_limits_fetch() {
        let store = seeded_store().await;
        let processor = processor(
            store,
            Arc::new(StaticClient(SENTIMENT_RESPONSE.to_string())),
            Arc::new(StaticClient("[]".to_string())),
        );

        let summary = processor.run(Some(1), true).await.unwrap();
        assert_eq!(summary.processed_count, 1);
    }
}
