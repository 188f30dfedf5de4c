//! Store adapter for the `raw_signals` and `insights` tables
//!
//! The pipeline consumes the store only through the `SignalStore` trait so
//! tests can substitute the in-memory backend for Postgres.

use crate::types::{ExtractedEntities, Insight, RawSignal};
use anyhow::{anyhow, Result};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Capability interface over the two logical tables.
#[async_trait::async_trait]
pub trait SignalStore: Send + Sync {
    /// Fetch up to `limit` signals with `processed = false`, ordered by
    /// engagement velocity descending; rows without a velocity sort last.
    async fn fetch_unprocessed(&self, limit: usize) -> Result<Vec<RawSignal>>;

    /// Insert-or-skip keyed on `source_id`. Re-submitting the same scrape
    /// batch never creates duplicate rows. Returns the number of new rows.
    async fn upsert_signals(&self, signals: &[RawSignal]) -> Result<usize>;

    /// Set `extracted_entities`, `sentiment_score` and `processed = true`
    /// on one record in a single statement.
    async fn update_enrichment(
        &self,
        id: &str,
        entities: &ExtractedEntities,
        sentiment: f64,
    ) -> Result<()>;

    /// Plain insert; insights are never upserted or deduplicated.
    async fn insert_insights(&self, insights: &[Insight]) -> Result<()>;
}

fn velocity_descending(a: &RawSignal, b: &RawSignal) -> Ordering {
    match (a.engagement.velocity, b.engagement.velocity) {
        (Some(va), Some(vb)) => vb.partial_cmp(&va).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// In-memory store for tests and local development
pub struct InMemoryStore {
    signals: tokio::sync::RwLock<HashMap<String, RawSignal>>,
    insights: tokio::sync::RwLock<Vec<Insight>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            signals: tokio::sync::RwLock::new(HashMap::new()),
            insights: tokio::sync::RwLock::new(Vec::new()),
        }
    }

    pub async fn get_signal(&self, id: &str) -> Option<RawSignal> {
        self.signals.read().await.get(id).cloned()
    }

    pub async fn signal_count(&self) -> usize {
        self.signals.read().await.len()
    }

    pub async fn insights(&self) -> Vec<Insight> {
        self.insights.read().await.clone()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl SignalStore for InMemoryStore {
    async fn fetch_unprocessed(&self, limit: usize) -> Result<Vec<RawSignal>> {
        let signals = self.signals.read().await;
        let mut unprocessed: Vec<RawSignal> = signals
            .values()
            .filter(|s| !s.processed)
            .cloned()
            .collect();
        unprocessed.sort_by(velocity_descending);
        unprocessed.truncate(limit);
        Ok(unprocessed)
    }

    async fn upsert_signals(&self, new_signals: &[RawSignal]) -> Result<usize> {
        let mut signals = self.signals.write().await;
        let existing: Vec<String> = signals
            .values()
            .map(|s| s.source_id.clone())
            .collect();

        let mut inserted = 0;
        for signal in new_signals {
            if existing.contains(&signal.source_id) {
                continue;
            }
            signals.insert(signal.id.clone(), signal.clone());
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn update_enrichment(
        &self,
        id: &str,
        entities: &ExtractedEntities,
        sentiment: f64,
    ) -> Result<()> {
        let mut signals = self.signals.write().await;
        let signal = signals
            .get_mut(id)
            .ok_or_else(|| anyhow!("No signal with id {}", id))?;
        signal.extracted_entities = Some(entities.clone());
        signal.sentiment_score = Some(sentiment);
        signal.processed = true;
        Ok(())
    }

    async fn insert_insights(&self, new_insights: &[Insight]) -> Result<()> {
        let mut insights = self.insights.write().await;
        insights.extend_from_slice(new_insights);
        Ok(())
    }
}
