//! Signal queue over the store
//!
//! Selects the next batch of unprocessed signals (velocity-ordered) and
//! commits enrichment back per record. The `processed` flag filter is the
//! only exclusion mechanism: the scheduler must guarantee runs do not
//! overlap, since two concurrent runs could fetch the same unprocessed set.

use common::{ExtractedEntities, RawSignal, SignalStore};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Outcome of a best-effort enrichment commit. Records are updated
/// independently; failed ids simply stay unprocessed and are picked up by
/// the next run.
#[derive(Debug, Clone, Default)]
pub struct CommitReport {
    pub requested: usize,
    pub updated: usize,
    pub failed: Vec<String>,
}

impl CommitReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct SignalQueue {
    store: Arc<dyn SignalStore>,
}

impl SignalQueue {
    pub fn new(store: Arc<dyn SignalStore>) -> Self {
        Self { store }
    }

    /// Fetch up to `limit` unprocessed signals, velocity descending.
    ///
    /// Store errors degrade to an empty batch: a single bad query must not
    /// abort an otherwise-schedulable run.
    pub async fn fetch_unprocessed(&self, limit: usize) -> Vec<RawSignal> {
        info!("Fetching up to {} unprocessed signals", limit);
        match self.store.fetch_unprocessed(limit).await {
            Ok(signals) => {
                info!("✅ Fetched {} unprocessed signals", signals.len());
                signals
            }
            Err(e) => {
                warn!("Fetch failed, continuing with an empty batch: {:#}", e);
                Vec::new()
            }
        }
    }

    /// Commit enrichment for each id: sets `extracted_entities`,
    /// `sentiment_score` and `processed = true` together. Ids missing from
    /// either map get empty entities / a neutral score.
    pub async fn commit_enrichment(
        &self,
        ids: &[String],
        entities_by_id: &HashMap<String, ExtractedEntities>,
        sentiment_by_id: &HashMap<String, f64>,
    ) -> CommitReport {
        info!("Marking {} signals as processed", ids.len());

        let mut report = CommitReport {
            requested: ids.len(),
            ..CommitReport::default()
        };

        for id in ids {
            let entities = entities_by_id.get(id).cloned().unwrap_or_default();
            let sentiment = sentiment_by_id.get(id).copied().unwrap_or(0.0);

            match self.store.update_enrichment(id, &entities, sentiment).await {
                Ok(()) => report.updated += 1,
                Err(e) => {
                    error!("Failed to commit enrichment for {}: {:#}", id, e);
                    report.failed.push(id.clone());
                }
            }
        }

        if report.is_complete() {
            info!("✅ Committed enrichment for {} signals", report.updated);
        } else {
            warn!(
                "Partial commit: {}/{} updated, {} failed",
                report.updated,
                report.requested,
                report.failed.len()
            );
        }

        report
    }
}
