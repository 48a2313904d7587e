//! Per-ticker indicators over the canonical price series.
//!
//! Every indicator is a pure function of one ticker's date-ordered history:
//! the value at row t reads rows 0..=t and nothing after. Warmup rows and
//! undefined values are `None`.

pub mod momentum;
pub mod rsi;
pub mod volatility;

pub use momentum::Momentum;
pub use rsi::Rsi;
pub use volatility::Volatility;

use crate::domain::PriceRow;

/// Trait for indicators.
///
/// `compute` takes one ticker's rows sorted ascending by date and returns a
/// series of the same length. The first `lookback()` values are `None`.
///
/// # Look-ahead contamination guard
/// No value at row t may depend on row t+1 or later. Every indicator must
/// pass the truncated-vs-full series test.
pub trait Indicator: Send + Sync {
    /// Output column name (e.g. "rsi_14").
    fn name(&self) -> &str;

    /// Rows needed before the indicator can produce a value.
    fn lookback(&self) -> usize;

    fn compute(&self, rows: &[PriceRow]) -> Vec<Option<f64>>;
}

/// Synthetic single-ticker rows from closes, one per calendar day.
///
/// `ret_1d` is derived from consecutive closes.
#[cfg(test)]
pub fn make_rows(closes: &[f64]) -> Vec<PriceRow> {
    use crate::domain::price::simple_return;
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let ret = if i == 0 {
                None
            } else {
                simple_return(closes[i - 1], close)
            };
            PriceRow::new(
                base_date + chrono::Duration::days(i as i64),
                "TEST",
                close,
                ret,
            )
        })
        .collect()
}

/// Assert an indicator value is present and approximately equal to `expected`.
#[cfg(test)]
pub fn assert_approx(actual: Option<f64>, expected: f64, epsilon: f64) {
    let actual = actual.unwrap_or_else(|| panic!("expected {expected}, got None"));
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
