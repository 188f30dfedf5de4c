//! Postgres-backed `SignalStore` (sqlx)
//!
//! Engagement metrics and extracted entities live in jsonb columns so the
//! schema survives additions to either payload without a migration.

use crate::store::SignalStore;
use crate::types::{ExtractedEntities, Insight, RawSignal};
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::info;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS raw_signals (
    id                 TEXT PRIMARY KEY,
    source             TEXT NOT NULL,
    source_id          TEXT NOT NULL UNIQUE,
    subreddit          TEXT NOT NULL,
    title              TEXT NOT NULL,
    content            TEXT NOT NULL DEFAULT '',
    author_id          TEXT NOT NULL DEFAULT '',
    engagement_metrics JSONB NOT NULL,
    is_quality_signal  BOOLEAN NOT NULL DEFAULT FALSE,
    source_created_at  TIMESTAMPTZ NOT NULL,
    scraped_at         TIMESTAMPTZ NOT NULL,
    age_hours          DOUBLE PRECISION NOT NULL DEFAULT 0,
    extracted_entities JSONB,
    sentiment_score    DOUBLE PRECISION,
    processed          BOOLEAN NOT NULL DEFAULT FALSE
);

CREATE INDEX IF NOT EXISTS idx_raw_signals_unprocessed
    ON raw_signals (processed)
    WHERE processed = FALSE;

CREATE TABLE IF NOT EXISTS insights (
    id               TEXT PRIMARY KEY,
    theme            TEXT NOT NULL,
    confidence_score DOUBLE PRECISION NOT NULL,
    related_assets   JSONB NOT NULL,
    sentiment        TEXT NOT NULL,
    urgency          TEXT NOT NULL,
    sources_agreeing JSONB NOT NULL,
    evidence         JSONB NOT NULL,
    signal_ids       JSONB NOT NULL,
    created_at       TIMESTAMPTZ NOT NULL,
    expires_at       TIMESTAMPTZ
);
"#;

/// Production store over a Postgres connection pool
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect and ensure the schema exists. Idempotent.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .context("Failed to connect to Postgres")?;

        sqlx::raw_sql(SCHEMA)
            .execute(&pool)
            .await
            .context("Failed to apply store schema")?;

        info!("Connected to Postgres store");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn signal_from_row(row: &PgRow) -> Result<RawSignal> {
    let engagement: serde_json::Value = row.try_get("engagement_metrics")?;
    let entities: Option<serde_json::Value> = row.try_get("extracted_entities")?;

    Ok(RawSignal {
        id: row.try_get("id")?,
        source: row.try_get("source")?,
        source_id: row.try_get("source_id")?,
        subreddit: row.try_get("subreddit")?,
        title: row.try_get("title")?,
        body: row.try_get("content")?,
        author: row.try_get("author_id")?,
        engagement: serde_json::from_value(engagement)
            .context("Malformed engagement_metrics column")?,
        is_quality_signal: row.try_get("is_quality_signal")?,
        source_created_at: row.try_get::<DateTime<Utc>, _>("source_created_at")?,
        scraped_at: row.try_get::<DateTime<Utc>, _>("scraped_at")?,
        age_hours: row.try_get("age_hours")?,
        extracted_entities: entities
            .map(serde_json::from_value)
            .transpose()
            .context("Malformed extracted_entities column")?,
        sentiment_score: row.try_get("sentiment_score")?,
        processed: row.try_get("processed")?,
    })
}

#[async_trait::async_trait]
impl SignalStore for PostgresStore {
    async fn fetch_unprocessed(&self, limit: usize) -> Result<Vec<RawSignal>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM raw_signals
            WHERE processed = FALSE
            ORDER BY (engagement_metrics->>'velocity')::double precision DESC NULLS LAST
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .context("Failed to query unprocessed signals")?;

        rows.iter().map(signal_from_row).collect()
    }

    async fn upsert_signals(&self, signals: &[RawSignal]) -> Result<usize> {
        let mut inserted = 0usize;
        for signal in signals {
            let engagement = serde_json::to_value(&signal.engagement)?;
            let result = sqlx::query(
                r#"
                INSERT INTO raw_signals (
                    id, source, source_id, subreddit, title, content, author_id,
                    engagement_metrics, is_quality_signal, source_created_at,
                    scraped_at, age_hours, extracted_entities, sentiment_score, processed
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, NULL, NULL, FALSE)
                ON CONFLICT (source_id) DO NOTHING
                "#,
            )
            .bind(&signal.id)
            .bind(&signal.source)
            .bind(&signal.source_id)
            .bind(&signal.subreddit)
            .bind(&signal.title)
            .bind(&signal.body)
            .bind(&signal.author)
            .bind(&engagement)
            .bind(signal.is_quality_signal)
            .bind(signal.source_created_at)
            .bind(signal.scraped_at)
            .bind(signal.age_hours)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to upsert signal {}", signal.source_id))?;

            inserted += result.rows_affected() as usize;
        }
        Ok(inserted)
    }

    async fn update_enrichment(
        &self,
        id: &str,
        entities: &ExtractedEntities,
        sentiment: f64,
    ) -> Result<()> {
        let entities = serde_json::to_value(entities)?;
        let result = sqlx::query(
            r#"
            UPDATE raw_signals
            SET processed = TRUE, extracted_entities = $2, sentiment_score = $3
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&entities)
        .bind(sentiment)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to update enrichment for {}", id))?;

        if result.rows_affected() == 0 {
            return Err(anyhow!("No signal with id {}", id));
        }
        Ok(())
    }

    async fn insert_insights(&self, insights: &[Insight]) -> Result<()> {
        for insight in insights {
            sqlx::query(
                r#"
                INSERT INTO insights (
                    id, theme, confidence_score, related_assets, sentiment,
                    urgency, sources_agreeing, evidence, signal_ids,
                    created_at, expires_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                "#,
            )
            .bind(RawSignal::new_id())
            .bind(&insight.theme)
            .bind(insight.confidence_score)
            .bind(serde_json::to_value(&insight.related_assets)?)
            .bind(insight.sentiment.as_str())
            .bind(insight.urgency.as_str())
            .bind(serde_json::to_value(&insight.sources_agreeing)?)
            .bind(serde_json::to_value(&insight.evidence)?)
            .bind(serde_json::to_value(&insight.signal_ids)?)
            .bind(insight.created_at)
            .bind(insight.expires_at)
            .execute(&self.pool)
            .await
            .context("Failed to insert insight")?;
        }
        Ok(())
    }
}
