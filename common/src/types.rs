//! Shared record types for the PULSE pipeline
//!
//! `RawSignal` is the mutable scraped-post record owned by the store;
//! `Insight` is the immutable synthesized narrative derived from one or
//! more signals.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Engagement counters captured at scrape time, plus the derived velocity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementMetrics {
    pub upvotes: i64,
    pub num_comments: i64,
    pub upvote_ratio: f64,
    /// Upvotes per elapsed hour since creation. Missing for rows ingested
    /// before velocity tracking was added; those sort last in the queue.
    #[serde(default)]
    pub velocity: Option<f64>,
}

/// Entities extracted from a signal's text. All three collections are
/// sorted and deduplicated so extraction output is order-independent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedEntities {
    pub tickers: Vec<String>,
    pub companies: Vec<String>,
    /// Reserved for a retired extraction layer; always empty, kept for
    /// schema compatibility.
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl ExtractedEntities {
    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty() && self.companies.is_empty() && self.keywords.is_empty()
    }
}

/// A single ingested social-media post
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSignal {
    pub id: String,
    pub source: String,
    /// Source-native post id; the upsert conflict key.
    pub source_id: String,
    pub subreddit: String,
    pub title: String,
    pub body: String,
    pub author: String,
    pub engagement: EngagementMetrics,
    pub is_quality_signal: bool,
    pub source_created_at: DateTime<Utc>,
    pub scraped_at: DateTime<Utc>,
    pub age_hours: f64,
    /// Enrichment; null until the pipeline commits, set together with
    /// `processed`.
    pub extracted_entities: Option<ExtractedEntities>,
    pub sentiment_score: Option<f64>,
    pub processed: bool,
}

impl RawSignal {
    /// Title and body concatenated, the text both extraction layers and the
    /// sentiment scorer operate on.
    pub fn content(&self) -> String {
        format!("{} {}", self.title, self.body)
    }

    pub fn new_id() -> String {
        Uuid::new_v4().to_string()
    }
}

/// Directional read of an insight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Bullish,
    Bearish,
    #[serde(other)]
    Neutral,
}

impl Default for Sentiment {
    fn default() -> Self {
        Sentiment::Neutral
    }
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Bullish => "bullish",
            Sentiment::Bearish => "bearish",
            Sentiment::Neutral => "neutral",
        }
    }
}

/// Time-sensitivity of an insight; drives its expiry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Immediate,
    Developing,
    #[serde(other)]
    Background,
}

impl Default for Urgency {
    fn default() -> Self {
        Urgency::Background
    }
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Immediate => "immediate",
            Urgency::Developing => "developing",
            Urgency::Background => "background",
        }
    }

    /// Expiry policy: immediate insights live 24 hours, developing ones a
    /// week, background trends never expire.
    pub fn expiry_from(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Urgency::Immediate => Some(now + Duration::hours(24)),
            Urgency::Developing => Some(now + Duration::days(7)),
            Urgency::Background => None,
        }
    }
}

/// Supporting material attached to an insight
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    #[serde(default)]
    pub key_quotes: Vec<String>,
    #[serde(default)]
    pub supporting_signal_ids: Vec<String>,
}

/// A synthesized market narrative. Created once by the synthesizer, never
/// mutated; `expires_at` is advisory metadata for downstream consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insight {
    pub theme: String,
    pub confidence_score: f64,
    pub related_assets: Vec<String>,
    pub sentiment: Sentiment,
    pub urgency: Urgency,
    pub sources_agreeing: Vec<String>,
    pub evidence: Evidence,
    /// Weak reference to the supporting signals; deleting a RawSignal does
    /// not cascade here.
    pub signal_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urgency_expiry_mapping() {
        let now = Utc::now();

        let immediate = Urgency::Immediate.expiry_from(now).unwrap();
        assert_eq!((immediate - now).num_hours(), 24);

        let developing = Urgency::Developing.expiry_from(now).unwrap();
        assert_eq!((developing - now).num_days(), 7);

        assert!(Urgency::Background.expiry_from(now).is_none());
    }

    #[test]
    fn test_unknown_labels_fall_back() {
        let sentiment: Sentiment = serde_json::from_str("\"mixed\"").unwrap();
        assert_eq!(sentiment, Sentiment::Neutral);

        let urgency: Urgency = serde_json::from_str("\"urgent\"").unwrap();
        assert_eq!(urgency, Urgency::Background);
    }

    #[test]
    fn test_enum_round_trip() {
        assert_eq!(serde_json::to_string(&Sentiment::Bullish).unwrap(), "\"bullish\"");
        assert_eq!(serde_json::to_string(&Urgency::Developing).unwrap(), "\"developing\"");
        let back: Urgency = serde_json::from_str("\"immediate\"").unwrap();
        assert_eq!(back, Urgency::Immediate);
    }
}
