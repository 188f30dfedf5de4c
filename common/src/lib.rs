//! Shared types and store adapter for the PULSE pipeline
//!
//! This crate provides:
//! - Record types for scraped signals and synthesized insights
//! - The `SignalStore` capability trait consumed by the pipeline
//! - An in-memory store for tests and a Postgres store for production

pub mod postgres;
pub mod store;
pub mod types;

pub use postgres::PostgresStore;
pub use store::{InMemoryStore, SignalStore};
pub use types::{
    EngagementMetrics, Evidence, ExtractedEntities, Insight, RawSignal, Sentiment, Urgency,
};
