//! Ticker configuration — the stock and benchmark lists the pipeline ingests.
//!
//! Stored as a TOML file with two top-level arrays:
//!
//! ```toml
//! stocks = ["AAPL", "MSFT", "GOOGL"]
//! benchmarks = ["SPY", "QQQ"]
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors reading the ticker configuration. Fatal at startup: no run record
/// is created when the config is unusable.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read ticker config {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse ticker config {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },

    #[error("ticker config has an empty '{list}' list")]
    EmptyList { list: &'static str },
}

/// The configured ticker universe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tickers {
    pub stocks: Vec<String>,
    pub benchmarks: Vec<String>,
}

impl Tickers {
    /// Load and validate a ticker config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.display().to_string(),
                source,
            },
            other => other,
        })
    }

    /// Parse and validate a ticker config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let tickers: Tickers = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: String::new(),
            source,
        })?;
        if tickers.stocks.is_empty() {
            return Err(ConfigError::EmptyList { list: "stocks" });
        }
        if tickers.benchmarks.is_empty() {
            return Err(ConfigError::EmptyList { list: "benchmarks" });
        }
        Ok(tickers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_lists() {
        let tickers = Tickers::from_toml(
            r#"
            stocks = ["AAPL", "MSFT"]
            benchmarks = ["SPY"]
            "#,
        )
        .unwrap();
        assert_eq!(tickers.stocks, vec!["AAPL", "MSFT"]);
        assert_eq!(tickers.benchmarks, vec!["SPY"]);
    }

    #[test]
    fn rejects_empty_stock_list() {
        let err = Tickers::from_toml("stocks = []\nbenchmarks = [\"SPY\"]").unwrap_err();
        assert!(matches!(err, ConfigError::EmptyList { list: "stocks" }));
    }

    #[test]
    fn rejects_missing_benchmarks_key() {
        assert!(Tickers::from_toml("stocks = [\"AAPL\"]").is_err());
    }
}
