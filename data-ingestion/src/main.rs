use anyhow::{Context, Result};
use chrono::Utc;
use common::{PostgresStore, SignalStore};
use data_ingestion::{filter_stats, is_relevant, RedditConfig, RedditConnector};
use tracing::{info, Level};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    info!("🚀 Starting PULSE Reddit scraper");

    let database_url =
        std::env::var("DATABASE_URL").context("DATABASE_URL environment variable not set")?;
    let store = PostgresStore::connect(&database_url).await?;

    let config = RedditConfig::from_env();
    info!(
        "Config: r/{}, min ratio {}, min upvotes {}, fetch limit {}",
        config.subreddit, config.min_upvote_ratio, config.min_upvotes, config.fetch_limit
    );

    let connector = RedditConnector::new(config)?;
    let posts = connector.fetch_hot_posts().await?;

    let stats = filter_stats(&posts);
    info!(
        "Relevance filter: {}/{} kept ({}% filtered)",
        stats.relevant_posts, stats.total_posts, stats.filter_rate
    );

    let scraped_at = Utc::now();
    let signals: Vec<_> = posts
        .into_iter()
        .filter(|p| is_relevant(p))
        .map(|p| p.into_signal(scraped_at))
        .collect();

    let inserted = store.upsert_signals(&signals).await?;
    info!(
        "✅ Scrape complete: {} signals submitted, {} new rows",
        signals.len(),
        inserted
    );

    Ok(())
}
