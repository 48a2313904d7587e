//! Feature row: the unit stored in `core.feat_equity_daily`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Derived indicators for one `(date, ticker)`.
///
/// Each field is absent while its indicator is warming up, and `rsi_14` is
/// also absent whenever the average loss is exactly zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub date: NaiveDate,
    pub ticker: String,
    pub rsi_14: Option<f64>,
    pub momentum_10d: Option<f64>,
    pub vol_21d: Option<f64>,
}

impl FeatureRow {
    /// Store key.
    pub fn key(&self) -> (NaiveDate, String) {
        (self.date, self.ticker.clone())
    }
}
