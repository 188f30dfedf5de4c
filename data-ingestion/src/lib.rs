//! Reddit ingestion for the PULSE pipeline
//!
//! Fetches hot posts, applies quality and relevance filters, and upserts the
//! survivors into the signal store as unprocessed raw signals.

pub mod reddit;
pub mod relevance;

pub use reddit::{RedditConfig, RedditConnector, ScrapedPost};
pub use relevance::{filter_stats, is_relevant, FilterStats, TrackedSubreddit};
