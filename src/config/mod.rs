//! Configuration loading from environment variables.
//!
//! Every knob has a default that works for local development, so a bare
//! environment boots against a file-backed SQLite store with the stock
//! model hyperparameters.

use anyhow::{Context, Result, bail};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default time-to-live for served predictions.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 900;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    // Storage
    pub database_url: String,
    pub model_dir: PathBuf,

    // Feature extraction
    pub lookback_games: usize,

    // Serving
    pub cache_ttl_secs: u64,

    // Model hyperparameters
    pub forest_trees: usize,
    pub forest_max_depth: u16,
    pub forest_min_split: usize,
    pub ridge_alpha: f64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let config = Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://data/gridcast.db".to_string()),
            model_dir: PathBuf::from(
                env::var("MODEL_DIR").unwrap_or_else(|_| "models".to_string()),
            ),
            lookback_games: parse_usize("LOOKBACK_GAMES", 5)?,
            cache_ttl_secs: parse_u64("PREDICTION_CACHE_TTL_SECS", DEFAULT_CACHE_TTL_SECS)?,
            forest_trees: parse_usize("FOREST_TREES", 100)?,
            forest_max_depth: parse_u16("FOREST_MAX_DEPTH", 10)?,
            forest_min_split: parse_usize("FOREST_MIN_SPLIT", 5)?,
            ridge_alpha: parse_f64("RIDGE_ALPHA", 1.0)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.lookback_games == 0 {
            bail!("LOOKBACK_GAMES must be at least 1");
        }
        if self.forest_trees == 0 {
            bail!("FOREST_TREES must be at least 1");
        }
        if self.ridge_alpha < 0.0 {
            bail!("RIDGE_ALPHA must be non-negative");
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://data/gridcast.db".to_string(),
            model_dir: PathBuf::from("models"),
            lookback_games: 5,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            forest_trees: 100,
            forest_max_depth: 10,
            forest_min_split: 5,
            ridge_alpha: 1.0,
        }
    }
}

fn parse_usize(key: &str, default: usize) -> Result<usize> {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse::<usize>()
        .context(format!("Failed to parse {}", key))
}

fn parse_u64(key: &str, default: u64) -> Result<u64> {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse::<u64>()
        .context(format!("Failed to parse {}", key))
}

fn parse_u16(key: &str, default: u16) -> Result<u16> {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse::<u16>()
        .context(format!("Failed to parse {}", key))
}

fn parse_f64(key: &str, default: f64) -> Result<f64> {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse::<f64>()
        .context(format!("Failed to parse {}", key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_sane() {
        let config = Config::default();
        assert_eq!(config.lookback_games, 5);
        assert_eq!(config.cache_ttl(), Duration::from_secs(900));
        assert_eq!(config.forest_trees, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_lookback() {
        let config = Config {
            lookback_games: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_negative_alpha() {
        let config = Config {
            ridge_alpha: -0.5,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
