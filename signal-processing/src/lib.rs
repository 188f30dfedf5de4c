//! PULSE signal processing
//!
//! Turns raw scraped signals into enriched records and market insights:
//!
//! - `extractor` finds tickers and tracked companies in post text
//! - `sentiment` scores signals in batches via a classification model
//! - `synthesizer` surfaces cross-signal themes via a reasoning model
//! - `queue` handles fetch and best-effort commit against the store
//! - `pipeline` wires the stages into one idempotent processing run

pub mod ai;
pub mod config;
pub mod extractor;
pub mod pipeline;
pub mod queue;
pub mod sentiment;
pub mod synthesizer;

pub use ai::{AnthropicChat, CompletionClient, OpenAiChat};
pub use config::ProcessorConfig;
pub use extractor::EntityExtractor;
pub use pipeline::{RunSummary, SignalProcessor};
pub use queue::{CommitReport, SignalQueue};
pub use sentiment::SentimentScorer;
pub use synthesizer::InsightSynthesizer;
