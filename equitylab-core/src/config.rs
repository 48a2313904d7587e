//! Pipeline configuration.
//!
//! Sources, lowest precedence first: built-in defaults, an optional TOML
//! file, `.env`, then the process environment (`TICKERS`,
//! `EQUITYLAB_WAREHOUSE`). Command-line flags are applied by the binary on top.

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_TICKERS: &str = "TICKERS";
pub const ENV_WAREHOUSE: &str = "EQUITYLAB_WAREHOUSE";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Root directory of the Parquet warehouse.
    pub warehouse_dir: PathBuf,
    /// Tickers to ingest.
    pub tickers: Vec<String>,
    /// Calendar days of history fetched by a default ingest.
    pub lookback_days: i64,
    /// Freshness check blocks beyond this many business days.
    pub freshness_max_business_days: i64,
    /// Rows shown by the date-gap report.
    pub gap_report_limit: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            warehouse_dir: PathBuf::from("warehouse"),
            tickers: vec!["SPY".into(), "AAPL".into(), "MSFT".into()],
            lookback_days: 120,
            freshness_max_business_days: 3,
            gap_report_limit: 10,
        }
    }
}

impl PipelineConfig {
    pub fn from_file(path: &Path) -> Result<Self, PipelineError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::Config(format!("read {}: {e}", path.display())))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, PipelineError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| PipelineError::Config(format!("parse config TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults or `path`, then `.env`, then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, PipelineError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };

        match dotenvy::dotenv() {
            Ok(p) => log::debug!("loaded environment from {}", p.display()),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(PipelineError::Config(format!(".env: {e}"))),
        }

        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply `TICKERS` (comma separated) and `EQUITYLAB_WAREHOUSE` from `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(raw) = lookup(ENV_TICKERS) {
            let tickers = parse_tickers(&raw);
            if !tickers.is_empty() {
                self.tickers = tickers;
            }
        }
        if let Some(dir) = lookup(ENV_WAREHOUSE).filter(|d| !d.trim().is_empty()) {
            self.warehouse_dir = PathBuf::from(dir.trim());
        }
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.lookback_days <= 0 {
            return Err(PipelineError::Config(format!(
                "lookback_days must be positive, got {}",
                self.lookback_days
            )));
        }
        if self.freshness_max_business_days < 0 {
            return Err(PipelineError::Config(format!(
                "freshness_max_business_days must be >= 0, got {}",
                self.freshness_max_business_days
            )));
        }
        Ok(())
    }
}

/// Split a comma-separated ticker list, trimming and upper-casing, dropping blanks.
pub fn parse_tickers(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|t| t.trim().to_uppercase())
        .filter(|t| !t.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.warehouse_dir, PathBuf::from("warehouse"));
        assert_eq!(config.tickers, vec!["SPY", "AAPL", "MSFT"]);
        assert_eq!(config.lookback_days, 120);
        assert_eq!(config.freshness_max_business_days, 3);
        assert_eq!(config.gap_report_limit, 10);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = PipelineConfig::from_toml("tickers = [\"QQQ\"]\nlookback_days = 30\n").unwrap();
        assert_eq!(config.tickers, vec!["QQQ"]);
        assert_eq!(config.lookback_days, 30);
        assert_eq!(config.gap_report_limit, 10);
    }

    #[test]
    fn invalid_toml_is_config_error() {
        let err = PipelineConfig::from_toml("lookback_days = \"many\"").unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn non_positive_lookback_rejected() {
        assert!(PipelineConfig::from_toml("lookback_days = 0").is_err());
    }

    #[test]
    fn env_overrides() {
        let mut config = PipelineConfig::default();
        config.apply_env(|key| match key {
            ENV_TICKERS => Some(" nvda, amd ,,".into()),
            ENV_WAREHOUSE => Some("/tmp/wh".into()),
            _ => None,
        });
        assert_eq!(config.tickers, vec!["NVDA", "AMD"]);
        assert_eq!(config.warehouse_dir, PathBuf::from("/tmp/wh"));
    }

    #[test]
    fn blank_env_values_ignored() {
        let mut config = PipelineConfig::default();
        config.apply_env(|_| Some("  ".into()));
        assert_eq!(config, PipelineConfig::default());
    }
}
