//! Relative Strength Index (RSI).
//!
//! Wilder smoothing of average gains and average losses.
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss)
//! Lookback: period.
//! Edge case: avg_loss == 0 → no value (RS is undefined), including the
//! flat-series case where avg_gain is also 0.

use super::Indicator;
use crate::domain::PriceRow;

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    name: String,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        Self {
            period,
            name: format!("rsi_{period}"),
        }
    }
}

impl Default for Rsi {
    fn default() -> Self {
        Self::new(14)
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, rows: &[PriceRow]) -> Vec<Option<f64>> {
        let n = rows.len();
        let mut result = vec![None; n];

        if n < self.period + 1 {
            return result;
        }

        // changes[0] is undefined: there is no prior close
        let mut changes = vec![f64::NAN; n];
        for i in 1..n {
            changes[i] = rows[i].close - rows[i - 1].close;
        }

        // Seed: arithmetic mean of the first `period` changes
        let mut avg_gain = 0.0;
        let mut avg_loss = 0.0;
        for &ch in &changes[1..=self.period] {
            if !ch.is_finite() {
                return result;
            }
            if ch > 0.0 {
                avg_gain += ch;
            } else {
                avg_loss -= ch;
            }
        }
        avg_gain /= self.period as f64;
        avg_loss /= self.period as f64;

        result[self.period] = rsi_value(avg_gain, avg_loss);

        let period = self.period as f64;
        for i in (self.period + 1)..n {
            let ch = changes[i];
            if !ch.is_finite() {
                // Smoothed averages are poisoned from here on
                return result;
            }

            let gain = ch.max(0.0);
            let loss = (-ch).max(0.0);
            avg_gain += (gain - avg_gain) / period;
            avg_loss += (loss - avg_loss) / period;

            result[i] = rsi_value(avg_gain, avg_loss);
        }

        result
    }
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> Option<f64> {
    if avg_loss == 0.0 {
        return None;
    }
    Some(100.0 - 100.0 / (1.0 + avg_gain / avg_loss))
}
