//! Hybrid entity extraction
//!
//! Two deterministic layers, union-merged:
//! - Pattern layer: `$TICKER` cashtags (1-5 uppercase letters, word-bounded)
//! - Dictionary layer: case-insensitive company-name lookup against a fixed
//!   company -> ticker mapping loaded once at startup
//!
//! The retired keyword layer's output slot is kept empty for schema
//! compatibility.

use anyhow::{Context, Result};
use common::ExtractedEntities;
use regex::Regex;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

const TICKER_PATTERN: &str = r"\$([A-Z]{1,5})\b";

/// Default company -> ticker dictionary, embedded at build time.
const DEFAULT_ASSET_MAPPING: &str = include_str!("../assets/asset_mapping.json");

pub struct EntityExtractor {
    ticker_pattern: Regex,
    /// Lowercased company phrase -> canonical ticker.
    asset_mapping: Vec<(String, String)>,
}

impl EntityExtractor {
    /// Extractor over the embedded default dictionary.
    pub fn new() -> Result<Self> {
        let mapping: HashMap<String, String> = serde_json::from_str(DEFAULT_ASSET_MAPPING)
            .context("Embedded asset mapping is malformed")?;
        Ok(Self::with_mapping(mapping))
    }

    /// Extractor over a dictionary loaded from a JSON file
    /// (`{"company name": "TICKER", ...}`).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read asset mapping {}", path.as_ref().display())
        })?;
        let mapping: HashMap<String, String> =
            serde_json::from_str(&raw).context("Asset mapping file is malformed")?;
        Ok(Self::with_mapping(mapping))
    }

    pub fn with_mapping(mapping: HashMap<String, String>) -> Self {
        let mut asset_mapping: Vec<(String, String)> = mapping
            .into_iter()
            .map(|(company, ticker)| (company.to_lowercase(), ticker))
            .collect();
        // Sorted so extraction output never depends on map iteration order.
        asset_mapping.sort();

        Self {
            // The pattern is a compile-time constant; it cannot fail.
            ticker_pattern: Regex::new(TICKER_PATTERN).expect("valid ticker pattern"),
            asset_mapping,
        }
    }

    pub fn mapping_len(&self) -> usize {
        self.asset_mapping.len()
    }

    /// Extract tickers and company names from free text. Pure and
    /// deterministic: identical input always yields identical sets.
    pub fn extract(&self, text: &str) -> ExtractedEntities {
        let mut tickers = BTreeSet::new();
        let mut companies = BTreeSet::new();

        // Layer 1: $TICKER cashtags.
        for capture in self.ticker_pattern.captures_iter(text) {
            if let Some(symbol) = capture.get(1) {
                tickers.insert(symbol.as_str().to_string());
            }
        }

        // Layer 2: dictionary lookup.
        let text_lower = text.to_lowercase();
        for (company, ticker) in &self.asset_mapping {
            if text_lower.contains(company.as_str()) {
                tickers.insert(ticker.clone());
                companies.insert(title_case(company));
            }
        }

        ExtractedEntities {
            tickers: tickers.into_iter().collect(),
            companies: companies.into_iter().collect(),
            keywords: Vec::new(),
        }
    }
}

fn title_case(phrase: &str) -> String {
    phrase
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> EntityExtractor {
        EntityExtractor::new().unwrap()
    }

    #[test]
    fn test_pattern_layer_extracts_cashtags() {
        let entities = extractor().extract("YOLO into $NVDA and $AMD before earnings");
        assert!(entities.tickers.contains(&"NVDA".to_string()));
        assert!(entities.tickers.contains(&"AMD".to_string()));
    }

    #[test]
    fn test_pattern_layer_bounds() {
        let e = extractor();
        // Lowercase and over-length symbols don't match.
        assert!(e.extract("$nvda to the moon").tickers.is_empty());
        assert!(e.extract("$TOOLONG position").tickers.is_empty());
        // Trailing digits break the word boundary.
        assert!(e.extract("$AB12 calls").tickers.is_empty());
        // Punctuation after the symbol is a boundary.
        assert_eq!(e.extract("bought $F.").tickers, vec!["F".to_string()]);
    }

    #[test]
    fn test_dictionary_layer_is_case_insensitive() {
        let entities = extractor().extract("TESLA deliveries are down, Nvidia still strong");
        assert!(entities.tickers.contains(&"TSLA".to_string()));
        assert!(entities.tickers.contains(&"NVDA".to_string()));
        assert!(entities.companies.contains(&"Tesla".to_string()));
        assert!(entities.companies.contains(&"Nvidia".to_string()));
    }

    #[test]
    fn test_layers_merge_and_deduplicate() {
        // $NVDA from the pattern layer and "nvidia" from the dictionary
        // collapse to a single ticker entry.
        let entities = extractor().extract("$NVDA aka nvidia");
        assert_eq!(entities.tickers, vec!["NVDA".to_string()]);
        assert_eq!(entities.companies, vec!["Nvidia".to_string()]);
    }

    #[test]
    fn test_multiword_company_title_case() {
        let entities = extractor().extract("taiwan semiconductor capacity is sold out");
        assert!(entities.tickers.contains(&"TSM".to_string()));
        assert!(entities.companies.contains(&"Taiwan Semiconductor".to_string()));
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let e = extractor();
        let text = "$TSLA vs nvidia vs $AAPL, also microsoft";
        assert_eq!(e.extract(text), e.extract(text));
    }

    #[test]
    fn test_keywords_always_empty() {
        let entities = extractor().extract("$NVDA shortage delay inventory");
        assert!(entities.keywords.is_empty());
    }

    #[test]
    fn test_no_entities_in_plain_text() {
        let entities = extractor().extract("nothing financial here");
        assert!(entities.is_empty());
    }

    #[test]
    fn test_custom_mapping_file_shape() {
        let mut mapping = HashMap::new();
        mapping.insert("Acme Rockets".to_string(), "ACME".to_string());
        let e = EntityExtractor::with_mapping(mapping);
        let entities = e.extract("ACME ROCKETS just won a contract");
        assert_eq!(entities.tickers, vec!["ACME".to_string()]);
        assert_eq!(entities.companies, vec!["Acme Rockets".to_string()]);
    }
}
