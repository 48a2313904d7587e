//! Realized volatility: sample standard deviation of daily returns.
//!
//! vol[t] = stddev(ret_1d[t-period+1..=t]), divisor n - 1.
//! Absent unless every return in the window is present. Not annualized.

use super::Indicator;
use crate::domain::PriceRow;

#[derive(Debug, Clone)]
pub struct Volatility {
    period: usize,
    name: String,
}

impl Volatility {
    pub fn new(period: usize) -> Self {
        assert!(period >= 2, "Volatility period must be >= 2");
        Self {
            period,
            name: format!("vol_{period}d"),
        }
    }
}

impl Default for Volatility {
    fn default() -> Self {
        Self::new(21)
    }
}

impl Indicator for Volatility {
    fn name(&self) -> &str {
        &self.name
    }

    /// The first row never has a return, so a full window ends at row `period`.
    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, rows: &[PriceRow]) -> Vec<Option<f64>> {
        let n = rows.len();
        let mut result = vec![None; n];
        if n < self.period {
            return result;
        }

        for i in (self.period - 1)..n {
            let window: Option<Vec<f64>> = rows[i + 1 - self.period..=i]
                .iter()
                .map(|r| r.ret_1d.filter(|v| v.is_finite()))
                .collect();
            result[i] = window.map(|w| sample_std(&w));
        }

        result
    }
}

fn sample_std(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    (ss / (n - 1.0)).max(0.0).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_rows};

    #[test]
    fn volatility_needs_full_window_of_returns() {
        let closes: Vec<f64> = (0..25).map(|i| 100.0 + i as f64).collect();
        let result = Volatility::default().compute(&make_rows(&closes));
        // Row 0 has no return, so the first complete window ends at row 21
        assert!(result[..21].iter().all(Option::is_none));
        assert!(result[21..].iter().all(Option::is_some));
    }

    #[test]
    fn volatility_matches_sample_std() {
        let mut rows = make_rows(&[1.0, 1.0, 1.0, 1.0]);
        rows[1].ret_1d = Some(0.01);
        rows[2].ret_1d = Some(-0.01);
        rows[3].ret_1d = Some(0.03);
        let result = Volatility::new(3).compute(&rows);
        assert_eq!(result[2], None);
        // mean 0.01, deviations 0, -0.02, 0.02 → ss = 0.0008, /2 → 0.0004
        assert_approx(result[3], 0.02, 1e-12);
    }

    #[test]
    fn constant_returns_have_zero_volatility() {
        let mut rows = make_rows(&[1.0; 6]);
        for r in rows.iter_mut().skip(1) {
            r.ret_1d = Some(0.002);
        }
        let result = Volatility::new(5).compute(&rows);
        assert_approx(result[5], 0.0, 1e-12);
    }

    #[test]
    fn missing_return_in_window_is_absent() {
        let closes: Vec<f64> = (0..8).map(|i| 10.0 + (i % 3) as f64).collect();
        let mut rows = make_rows(&closes);
        rows[4].ret_1d = None;
        let result = Volatility::new(3).compute(&rows);
        assert!(result[3].is_some());
        assert!(result[4..=6].iter().all(Option::is_none));
        assert!(result[7].is_some());
    }
}
