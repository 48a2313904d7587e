//! Feature engine and feature store.
//!
//! The engine turns the canonical price series into one `FeatureRow` per
//! `(ticker, date)`. Tickers are computed independently and in isolation:
//! nothing from one ticker's history reaches another's values.

pub mod store;

pub use store::{FeatureStore, StoreError, UpsertSummary};

use crate::data::warehouse::Warehouse;
use crate::domain::{FeatureRow, PriceRow};
use crate::error::PipelineError;
use crate::indicators::{Indicator, Momentum, Rsi, Volatility};
use crate::normalize;
use std::collections::BTreeMap;

/// Computes `rsi_14`, `momentum_10d` and `vol_21d` per ticker.
#[derive(Debug, Clone)]
pub struct FeatureEngine {
    rsi: Rsi,
    momentum: Momentum,
    volatility: Volatility,
}

impl Default for FeatureEngine {
    fn default() -> Self {
        Self {
            rsi: Rsi::new(14),
            momentum: Momentum::new(10),
            volatility: Volatility::new(21),
        }
    }
}

impl FeatureEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows of history a ticker needs before every feature can be defined.
    pub fn warmup(&self) -> usize {
        self.rsi
            .lookback()
            .max(self.momentum.lookback())
            .max(self.volatility.lookback())
    }

    /// Compute features for every ticker in `rows`.
    ///
    /// Input order is irrelevant; output is sorted by `(ticker, date)` with
    /// exactly one row per input row.
    pub fn compute(&self, rows: &[PriceRow]) -> Vec<FeatureRow> {
        let mut by_ticker: BTreeMap<&str, Vec<&PriceRow>> = BTreeMap::new();
        for row in rows {
            by_ticker.entry(row.ticker.as_str()).or_default().push(row);
        }

        let mut out = Vec::with_capacity(rows.len());
        for (ticker, mut group) in by_ticker {
            group.sort_by_key(|r| r.date);
            let series: Vec<PriceRow> = group.into_iter().cloned().collect();
            log::debug!("{ticker}: computing features over {} rows", series.len());
            out.extend(self.compute_ticker(&series));
        }
        out
    }

    /// Compute features for one ticker's date-ordered rows.
    pub fn compute_ticker(&self, series: &[PriceRow]) -> Vec<FeatureRow> {
        let rsi = self.rsi.compute(series);
        let momentum = self.momentum.compute(series);
        let vol = self.volatility.compute(series);

        series
            .iter()
            .enumerate()
            .map(|(i, r)| FeatureRow {
                date: r.date,
                ticker: r.ticker.clone(),
                rsi_14: rsi[i],
                momentum_10d: momentum[i],
                vol_21d: vol[i],
            })
            .collect()
    }
}

/// Summary of a feature build.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureBuildSummary {
    pub tickers: usize,
    pub rows: usize,
    pub inserted: usize,
    pub updated: usize,
    /// Tickers too short for any row to carry every feature.
    pub short_tickers: usize,
}

/// Load the canonical series, compute features and upsert them.
pub fn build_features(warehouse: &Warehouse) -> Result<FeatureBuildSummary, PipelineError> {
    let prices = normalize::load_prices(warehouse)?;
    if prices.is_empty() {
        return Err(PipelineError::NoData(
            "no complete price rows to compute features from".into(),
        ));
    }

    let engine = FeatureEngine::new();
    let features = engine.compute(&prices);
    let mut per_ticker: BTreeMap<&str, usize> = BTreeMap::new();
    for f in &features {
        *per_ticker.entry(f.ticker.as_str()).or_default() += 1;
    }
    let tickers = per_ticker.len();
    let short_tickers = per_ticker.values().filter(|&&n| n <= engine.warmup()).count();
    if short_tickers > 0 {
        log::warn!(
            "{short_tickers} of {tickers} tickers have {} rows or fewer; their features stay partly empty",
            engine.warmup()
        );
    }

    let store = FeatureStore::new(warehouse);
    let summary = store.upsert(&features)?;
    log::info!(
        "features: {} rows over {tickers} tickers ({} inserted, {} updated)",
        features.len(),
        summary.inserted,
        summary.updated
    );

    Ok(FeatureBuildSummary {
        tickers,
        rows: features.len(),
        inserted: summary.inserted,
        updated: summary.updated,
        short_tickers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::price::simple_return;
    use chrono::NaiveDate;

    fn series(ticker: &str, closes: &[f64]) -> Vec<PriceRow> {
        let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                let ret = if i == 0 {
                    None
                } else {
                    simple_return(closes[i - 1], c)
                };
                PriceRow::new(base + chrono::Duration::days(i as i64), ticker, c, ret)
            })
            .collect()
    }

    fn wave(n: usize, offset: f64) -> Vec<f64> {
        (0..n)
            .map(|i| offset + (i as f64 * 0.7).sin() * 5.0 + i as f64 * 0.1)
            .collect()
    }

    #[test]
    fn output_sorted_by_ticker_then_date() {
        let mut rows = series("ZZZ", &wave(30, 50.0));
        rows.extend(series("AAA", &wave(30, 80.0)));
        rows.reverse();

        let out = FeatureEngine::new().compute(&rows);
        assert_eq!(out.len(), 60);
        assert_eq!(out[0].ticker, "AAA");
        assert_eq!(out[59].ticker, "ZZZ");
        for pair in out.windows(2) {
            assert!((&pair[0].ticker, pair[0].date) < (&pair[1].ticker, pair[1].date));
        }
    }

    #[test]
    fn tickers_do_not_leak_into_each_other() {
        let aaa = series("AAA", &wave(40, 80.0));
        let bbb = series("BBB", &wave(40, 20.0));

        let engine = FeatureEngine::new();
        let alone = engine.compute(&aaa);
        let mut mixed_input = bbb.clone();
        mixed_input.extend(aaa.iter().cloned());
        let mixed = engine.compute(&mixed_input);

        let from_mixed: Vec<&FeatureRow> = mixed.iter().filter(|f| f.ticker == "AAA").collect();
        assert_eq!(from_mixed.len(), alone.len());
        for (a, b) in alone.iter().zip(from_mixed) {
            assert_eq!(a, b);
        }
    }

    #[test]
    fn warmup_is_longest_lookback() {
        assert_eq!(FeatureEngine::new().warmup(), 21);
    }
}
