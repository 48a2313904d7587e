//! EquityLab Core: a daily equity pipeline over a local Parquet warehouse.
//!
//! Stages, each replayable on its own:
//! - Ingestion: provider bars into `raw.equity_prices`, rebuilt into
//!   `core.fct_prices_daily` with daily returns
//! - Normalizer: resolve whichever price relation exists into the canonical
//!   `(ticker, date)` series
//! - Feature engine: RSI-14, 10-day momentum and 21-day volatility per ticker
//! - Feature store: keyed, atomic upsert into `core.feat_equity_daily`
//! - Quality gate: five checks, blocking failures surface as exit status 1
//! - Snapshot queries for the read side

pub mod calendar;
pub mod config;
pub mod dashboard;
pub mod data;
pub mod domain;
pub mod error;
pub mod features;
pub mod indicators;
pub mod normalize;
pub mod quality;

pub use config::PipelineConfig;
pub use error::PipelineError;
