//! Price rows at the three stages of the pipeline.
//!
//! - `RawPriceRow`: a fetched daily OHLCV bar, as stored in `raw.equity_prices`.
//! - `SourceRow`: a row of whichever price relation the normalizer resolved,
//!   with every attribute optional so quality checks can count nulls.
//! - `PriceRow`: the canonical `(date, ticker, close, ret_1d)` series the
//!   feature engine consumes.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Daily OHLCV bar for one symbol, before any derivation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPriceRow {
    pub date: NaiveDate,
    pub symbol: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl RawPriceRow {
    /// Returns true if any price field is NaN.
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }

    /// Basic OHLC sanity check: high >= low, open/close inside the range, positive prices.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
    }
}

/// One row of a resolved price relation. Nothing is guaranteed present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceRow {
    pub date: Option<NaiveDate>,
    pub ticker: Option<String>,
    pub close: Option<f64>,
    pub ret_1d: Option<f64>,
}

/// Canonical daily price observation for one ticker.
///
/// Unique per `(date, ticker)`. `ret_1d` is absent on the first observation
/// of a ticker; anywhere else an absent return is a data-quality failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRow {
    pub date: NaiveDate,
    pub ticker: String,
    pub close: f64,
    pub ret_1d: Option<f64>,
}

impl PriceRow {
    pub fn new(date: NaiveDate, ticker: impl Into<String>, close: f64, ret_1d: Option<f64>) -> Self {
        Self {
            date,
            ticker: ticker.into(),
            close,
            ret_1d,
        }
    }
}

/// Simple return `curr / prev - 1`, absent when `prev` is zero or either side is non-finite.
pub fn simple_return(prev: f64, curr: f64) -> Option<f64> {
    if !prev.is_finite() || !curr.is_finite() || prev == 0.0 {
        return None;
    }
    Some(curr / prev - 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(open: f64, high: f64, low: f64, close: f64) -> RawPriceRow {
        RawPriceRow {
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            symbol: "SPY".into(),
            open,
            high,
            low,
            close,
            volume: 1000,
        }
    }

    #[test]
    fn sane_bar_passes() {
        assert!(bar(100.0, 105.0, 99.0, 103.0).is_sane());
    }

    #[test]
    fn inverted_bar_fails() {
        assert!(!bar(100.0, 95.0, 105.0, 100.0).is_sane());
    }

    #[test]
    fn void_bar_fails() {
        let b = bar(f64::NAN, 105.0, 99.0, 103.0);
        assert!(b.is_void());
        assert!(!b.is_sane());
    }

    #[test]
    fn simple_return_basic() {
        let r = simple_return(100.0, 110.0).unwrap();
        assert!((r - 0.1).abs() < 1e-12);
    }

    #[test]
    fn simple_return_zero_prev_is_absent() {
        assert_eq!(simple_return(0.0, 10.0), None);
        assert_eq!(simple_return(f64::NAN, 10.0), None);
    }
}
