use anyhow::{Context, Result};
use common::PostgresStore;
use signal_processing::{
    AnthropicChat, EntityExtractor, InsightSynthesizer, OpenAiChat, ProcessorConfig,
    SentimentScorer, SignalProcessor,
};
use std::sync::Arc;
use tracing::{info, Level};

const SENTIMENT_MODEL: &str = "gpt-4o-mini";
const SENTIMENT_TEMPERATURE: f64 = 0.3;
const SYNTHESIS_MODEL: &str = "claude-sonnet-4-20250514";

struct Args {
    batch_size: Option<usize>,
    dry_run: bool,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        batch_size: None,
        dry_run: false,
    };

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--batch-size" => {
                let value = iter.next().context("--batch-size requires a value")?;
                args.batch_size =
                    Some(value.parse().context("--batch-size must be a positive integer")?);
            }
            "--dry-run" => args.dry_run = true,
            other => anyhow::bail!("Unknown argument: {}", other),
        }
    }

    Ok(args)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    let args = parse_args()?;
    info!("🚀 Starting PULSE signal processor");

    // Credentials are checked before touching the store so a misconfigured
    // run fails without opening a connection.
    let database_url =
        std::env::var("DATABASE_URL").context("DATABASE_URL environment variable not set")?;
    let sentiment_client = OpenAiChat::from_env(SENTIMENT_MODEL, SENTIMENT_TEMPERATURE)?;
    let synthesis_client = AnthropicChat::from_env(SYNTHESIS_MODEL)?;

    let store = Arc::new(PostgresStore::connect(&database_url).await?);

    let config = ProcessorConfig::from_env();
    let extractor = match &config.asset_mapping_path {
        Some(path) => EntityExtractor::from_file(path)?,
        None => EntityExtractor::new()?,
    };

    let processor = SignalProcessor::new(
        store,
        extractor,
        SentimentScorer::new(Arc::new(sentiment_client), config.sentiment_batch_size),
        InsightSynthesizer::new(Arc::new(synthesis_client)),
        config,
    );

    let summary = processor.run(args.batch_size, args.dry_run).await?;

    if summary.dry_run {
        info!(
            "✅ Dry run complete: {} signals analyzed, {} unique tickers, {} insights (nothing committed)",
            summary.processed_count, summary.tickers_count, summary.insights_count
        );
    } else {
        let committed = summary.commit.as_ref().map(|r| r.updated).unwrap_or(0);
        info!(
            "✅ Run complete: {} signals processed ({} committed), {} unique tickers, {} insights stored",
            summary.processed_count, committed, summary.tickers_count, summary.insights_count
        );
    }

    Ok(())
}
