//! Reddit hot-posts connector
//!
//! Pulls a subreddit's hot listing from the public `.json` endpoint (no API
//! key), derives engagement velocity and the quality-keyword flag, and drops
//! posts below the upvote-ratio/upvote floors.

use anyhow::{anyhow, Result};
use chrono::{DateTime, TimeZone, Utc};
use common::{EngagementMetrics, RawSignal};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, warn};

const USER_AGENT: &str = "pulse-rs/0.1 (market research)";

/// Title/body keywords that flag a post as a supply-chain signal
const QUALITY_KEYWORDS: [&str; 4] = ["delay", "inventory", "backorder", "shortage"];

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    children: Vec<ListingChild>,
}

#[derive(Debug, Deserialize)]
struct ListingChild {
    data: PostData,
}

#[derive(Debug, Deserialize)]
struct PostData {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    selftext: String,
    #[serde(default)]
    ups: i64,
    #[serde(default)]
    num_comments: i64,
    #[serde(default)]
    upvote_ratio: f64,
    #[serde(default)]
    created_utc: f64,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    link_flair_text: Option<String>,
}

/// A post that passed the quality filters, with derived fields attached.
/// Carries the flair (not persisted) so the relevance filter can use it.
#[derive(Debug, Clone)]
pub struct ScrapedPost {
    pub source_id: String,
    pub subreddit: String,
    pub title: String,
    pub body: String,
    pub author: String,
    pub flair: Option<String>,
    pub upvotes: i64,
    pub num_comments: i64,
    pub upvote_ratio: f64,
    pub velocity: f64,
    pub age_hours: f64,
    pub is_quality_signal: bool,
    pub created_at: DateTime<Utc>,
}

impl ScrapedPost {
    pub fn into_signal(self, scraped_at: DateTime<Utc>) -> RawSignal {
        RawSignal {
            id: RawSignal::new_id(),
            source: "reddit".to_string(),
            source_id: self.source_id,
            subreddit: self.subreddit,
            title: self.title,
            body: self.body,
            author: self.author,
            engagement: EngagementMetrics {
                upvotes: self.upvotes,
                num_comments: self.num_comments,
                upvote_ratio: self.upvote_ratio,
                velocity: Some(self.velocity),
            },
            is_quality_signal: self.is_quality_signal,
            source_created_at: self.created_at,
            scraped_at,
            age_hours: self.age_hours,
            extracted_entities: None,
            sentiment_score: None,
            processed: false,
        }
    }
}

/// Connector configuration, overridable via environment
#[derive(Debug, Clone)]
pub struct RedditConfig {
    pub subreddit: String,
    pub min_upvote_ratio: f64,
    pub min_upvotes: i64,
    pub fetch_limit: usize,
}

impl Default for RedditConfig {
    fn default() -> Self {
        Self {
            subreddit: "wallstreetbets".to_string(),
            min_upvote_ratio: 0.70,
            min_upvotes: 50,
            fetch_limit: 100,
        }
    }
}

impl RedditConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            subreddit: std::env::var("REDDIT_SUBREDDIT").unwrap_or(defaults.subreddit),
            min_upvote_ratio: env_parse("MIN_UPVOTE_RATIO", defaults.min_upvote_ratio),
            min_upvotes: env_parse("MIN_UPVOTES", defaults.min_upvotes),
            fetch_limit: env_parse("REDDIT_FETCH_LIMIT", defaults.fetch_limit),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Reddit hot-listing connector
pub struct RedditConnector {
    client: Client,
    config: RedditConfig,
}

impl RedditConnector {
    pub fn new(config: RedditConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &RedditConfig {
        &self.config
    }

    /// Fetch the hot listing and return posts that pass the quality filters.
    pub async fn fetch_hot_posts(&self) -> Result<Vec<ScrapedPost>> {
        let url = format!("https://www.reddit.com/r/{}/hot.json", self.config.subreddit);
        info!("Fetching hot posts from r/{}", self.config.subreddit);

        let response = self
            .client
            .get(&url)
            .query(&[("limit", self.config.fetch_limit.to_string())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!("Reddit API error: {}", response.status()));
        }

        let listing: Listing = response.json().await?;
        let total = listing.data.children.len();

        let now = Utc::now();
        let posts: Vec<ScrapedPost> = listing
            .data
            .children
            .into_iter()
            .map(|child| self.process_post(child.data, now))
            .filter(|post| self.passes_filter(post))
            .collect();

        info!(
            "✅ Fetched {} posts, {} passed quality filters",
            total,
            posts.len()
        );
        if posts.is_empty() && total > 0 {
            warn!("All fetched posts fell below the quality thresholds");
        }

        Ok(posts)
    }

    fn process_post(&self, post: PostData, now: DateTime<Utc>) -> ScrapedPost {
        let created_at = Utc
            .timestamp_opt(post.created_utc as i64, 0)
            .single()
            .unwrap_or(now);

        let age_hours = (now - created_at).num_seconds() as f64 / 3600.0;
        // Floor the age so brand-new posts don't blow up the velocity.
        let velocity = post.ups as f64 / age_hours.max(0.1);

        let content = format!("{} {}", post.title, post.selftext).to_lowercase();
        let is_quality_signal = QUALITY_KEYWORDS.iter().any(|kw| content.contains(kw));

        ScrapedPost {
            source_id: post.id,
            subreddit: self.config.subreddit.clone(),
            title: post.title,
            body: post.selftext,
            author: post.author.unwrap_or_else(|| "[deleted]".to_string()),
            flair: post.link_flair_text,
            upvotes: post.ups,
            num_comments: post.num_comments,
            upvote_ratio: post.upvote_ratio,
            velocity: (velocity * 100.0).round() / 100.0,
            age_hours: (age_hours * 100.0).round() / 100.0,
            is_quality_signal,
            created_at,
        }
    }

    fn passes_filter(&self, post: &ScrapedPost) -> bool {
        post.upvote_ratio > self.config.min_upvote_ratio && post.upvotes > self.config.min_upvotes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connector() -> RedditConnector {
        RedditConnector::new(RedditConfig::default()).unwrap()
    }

    fn post(ups: i64, ratio: f64, age_secs: i64, title: &str) -> PostData {
        PostData {
            id: "abc123".to_string(),
            title: title.to_string(),
            selftext: String::new(),
            ups,
            num_comments: 10,
            upvote_ratio: ratio,
            created_utc: (Utc::now().timestamp() - age_secs) as f64,
            author: Some("tester".to_string()),
            link_flair_text: None,
        }
    }

    #[test]
    fn test_parse_listing() {
        let json = r#"{
            "data": {
                "children": [
                    {"data": {
                        "id": "1abc",
                        "title": "NVDA earnings",
                        "selftext": "chip shortage incoming",
                        "ups": 420,
                        "num_comments": 69,
                        "upvote_ratio": 0.93,
                        "created_utc": 1708627200.0,
                        "author": "dd_poster",
                        "link_flair_text": "DD"
                    }}
                ]
            }
        }"#;

        let listing: Listing = serde_json::from_str(json).unwrap();
        assert_eq!(listing.data.children.len(), 1);
        let data = &listing.data.children[0].data;
        assert_eq!(data.id, "1abc");
        assert_eq!(data.ups, 420);
        assert_eq!(data.link_flair_text.as_deref(), Some("DD"));
    }

    #[test]
    fn test_parse_listing_with_missing_fields() {
        // Deleted posts come back with most fields absent.
        let json = r#"{"data": {"children": [{"data": {"id": "gone"}}]}}"#;
        let listing: Listing = serde_json::from_str(json).unwrap();
        let data = &listing.data.children[0].data;
        assert_eq!(data.ups, 0);
        assert!(data.author.is_none());
    }

    #[test]
    fn test_velocity_and_quality_flag() {
        let c = connector();
        // 100 upvotes over ~2 hours => ~50/hr
        let scraped = c.process_post(post(100, 0.9, 7200, "massive backorder reported"), Utc::now());
        assert!((scraped.velocity - 50.0).abs() < 1.0);
        assert!(scraped.is_quality_signal);
        assert_eq!(scraped.author, "tester");
    }

    #[test]
    fn test_velocity_floor_for_new_posts() {
        let c = connector();
        let scraped = c.process_post(post(100, 0.9, 0, "just posted"), Utc::now());
        // Age is floored at 0.1h, so velocity caps at 1000/hr here.
        assert!(scraped.velocity <= 1000.0);
        assert!(!scraped.is_quality_signal);
    }

    #[test]
    fn test_quality_filter_thresholds() {
        let c = connector();
        let now = Utc::now();

        let good = c.process_post(post(51, 0.71, 3600, "ok"), now);
        assert!(c.passes_filter(&good));

        let low_ratio = c.process_post(post(100, 0.70, 3600, "ok"), now);
        assert!(!c.passes_filter(&low_ratio));

        let low_upvotes = c.process_post(post(50, 0.95, 3600, "ok"), now);
        assert!(!c.passes_filter(&low_upvotes));
    }

    #[test]
    fn test_into_signal_carries_engagement() {
        let c = connector();
        let now = Utc::now();
        let signal = c
            .process_post(post(200, 0.88, 7200, "inventory glut"), now)
            .into_signal(now);

        assert_eq!(signal.source, "reddit");
        assert_eq!(signal.engagement.upvotes, 200);
        assert!(signal.engagement.velocity.is_some());
        assert!(!signal.processed);
        assert!(signal.extracted_entities.is_none());
    }
}
