//! Read-side queries behind the snapshot view.
//!
//! Everything is loaded once from the warehouse: the latest prices, the latest
//! features, and the full price history left-joined with features.

use crate::data::warehouse::Warehouse;
use crate::domain::{FeatureRow, PriceRow};
use crate::error::PipelineError;
use crate::features::store::latest_rows;
use crate::features::FeatureStore;
use crate::normalize;
use chrono::NaiveDate;
use std::collections::HashMap;

/// One price row joined with its features, if any were computed.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRow {
    pub date: NaiveDate,
    pub ticker: String,
    pub close: f64,
    pub ret_1d: Option<f64>,
    pub rsi_14: Option<f64>,
    pub momentum_10d: Option<f64>,
    pub vol_21d: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct DashboardData {
    pub latest_date: NaiveDate,
    /// Price rows at `latest_date`, sorted by ticker.
    pub latest_prices: Vec<PriceRow>,
    /// Feature rows at the feature table's latest date, sorted by ticker.
    pub latest_features: Vec<FeatureRow>,
    /// Sorted by `(ticker, date)`.
    pub history: Vec<HistoryRow>,
    pub tickers: Vec<String>,
    pub features_available: bool,
}

impl DashboardData {
    pub fn load(warehouse: &Warehouse) -> Result<Self, PipelineError> {
        let prices = normalize::load_prices(warehouse)?;
        let store = FeatureStore::new(warehouse);
        let features_available = store.exists();
        let features = if features_available {
            store.load()?
        } else {
            log::warn!("feature table not found; snapshot shows prices only");
            Vec::new()
        };
        Self::from_rows(prices, features, features_available)
    }

    /// Assemble the view from already-loaded rows.
    pub fn from_rows(
        prices: Vec<PriceRow>,
        features: Vec<FeatureRow>,
        features_available: bool,
    ) -> Result<Self, PipelineError> {
        let latest_date = prices
            .iter()
            .map(|p| p.date)
            .max()
            .ok_or_else(|| PipelineError::NoData("no price rows to show".into()))?;

        let mut latest_prices: Vec<PriceRow> = prices
            .iter()
            .filter(|p| p.date == latest_date)
            .cloned()
            .collect();
        latest_prices.sort_by(|a, b| a.ticker.cmp(&b.ticker));

        let latest_features = latest_rows(&features);

        let by_key: HashMap<(NaiveDate, &str), &FeatureRow> = features
            .iter()
            .map(|f| ((f.date, f.ticker.as_str()), f))
            .collect();

        let mut history: Vec<HistoryRow> = prices
            .iter()
            .map(|p| {
                let feat = by_key.get(&(p.date, p.ticker.as_str()));
                HistoryRow {
                    date: p.date,
                    ticker: p.ticker.clone(),
                    close: p.close,
                    ret_1d: p.ret_1d,
                    rsi_14: feat.and_then(|f| f.rsi_14),
                    momentum_10d: feat.and_then(|f| f.momentum_10d),
                    vol_21d: feat.and_then(|f| f.vol_21d),
                }
            })
            .collect();
        history.sort_by(|a, b| a.ticker.cmp(&b.ticker).then(a.date.cmp(&b.date)));

        let mut tickers: Vec<String> = history.iter().map(|h| h.ticker.clone()).collect();
        tickers.dedup();

        Ok(Self {
            latest_date,
            latest_prices,
            latest_features,
            history,
            tickers,
            features_available,
        })
    }

    /// History rows of one ticker, oldest first.
    pub fn ticker_history(&self, ticker: &str) -> Vec<&HistoryRow> {
        self.history.iter().filter(|h| h.ticker == ticker).collect()
    }
}
