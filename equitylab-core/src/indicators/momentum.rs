//! Momentum: percentage change over a fixed lookback.
//!
//! momentum[t] = close[t] / close[t-period] - 1
//! Lookback: period.

use super::Indicator;
use crate::domain::price::simple_return;
use crate::domain::PriceRow;

#[derive(Debug, Clone)]
pub struct Momentum {
    period: usize,
    name: String,
}

impl Momentum {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "Momentum period must be >= 1");
        Self {
            period,
            name: format!("momentum_{period}d"),
        }
    }
}

impl Default for Momentum {
    fn default() -> Self {
        Self::new(10)
    }
}

impl Indicator for Momentum {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, rows: &[PriceRow]) -> Vec<Option<f64>> {
        let n = rows.len();
        let mut result = vec![None; n];

        for i in self.period..n {
            result[i] = simple_return(rows[i - self.period].close, rows[i].close);
        }

        result
    }
}
