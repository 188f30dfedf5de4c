//! Runtime configuration for the processing pipeline

use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// How many unprocessed signals one run pulls from the store.
    pub batch_size: usize,
    /// How many signals go into one sentiment classification request.
    pub sentiment_batch_size: usize,
    /// Optional override for the embedded company-to-ticker dictionary.
    pub asset_mapping_path: Option<PathBuf>,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            batch_size: 30,
            sentiment_batch_size: crate::sentiment::DEFAULT_SENTIMENT_BATCH_SIZE,
            asset_mapping_path: None,
        }
    }
}

impl ProcessorConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            batch_size: env_parse("SIGNAL_PROCESSOR_BATCH_SIZE", defaults.batch_size),
            sentiment_batch_size: env_parse("SENTIMENT_BATCH_SIZE", defaults.sentiment_batch_size),
            asset_mapping_path: std::env::var("ASSET_MAPPING_PATH").ok().map(PathBuf::from),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ProcessorConfig::default();
        assert_eq!(config.batch_size, 30);
        assert_eq!(config.sentiment_batch_size, 15);
        assert!(config.asset_mapping_path.is_none());
    }
}
