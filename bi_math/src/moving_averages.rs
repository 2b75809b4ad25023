//! Moving average calculation implementations
//!
//! Contains:
//! - Simple Moving Average (SMA), as a streaming accumulator
//! - Trailing rolling mean over a series with missing observations
//! - Centered moving average used by classical seasonal decomposition

use crate::{MathError, Result};
use std::collections::VecDeque;

/// Simple Moving Average (SMA) implementation
#[derive(Debug, Clone)]
pub struct SimpleMovingAverage {
    period: usize,
    values: VecDeque<f64>,
    sum: f64,
}

impl SimpleMovingAverage {
    /// Create a new Simple Moving Average with the specified period
    pub fn new(period: usize) -> Result<Self> {
        if period == 0 {
            return Err(MathError::InvalidInput(
                "Period must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            period,
            values: VecDeque::with_capacity(period),
            sum: 0.0,
        })
    }

    /// Update the SMA with a new value
    pub fn update(&mut self, value: f64) {
        self.values.push_back(value);
        self.sum += value;

        if self.values.len() > self.period {
            if let Some(old_value) = self.values.pop_front() {
                self.sum -= old_value;
            }
        }
    }

    /// Get the current SMA value, `None` until the window is full
    pub fn value(&self) -> Option<f64> {
        if self.values.len() < self.period {
            return None;
        }

        Some(self.sum / self.period as f64)
    }

    /// Reset the SMA, clearing all values
    pub fn reset(&mut self) {
        self.values.clear();
        self.sum = 0.0;
    }
}

/// Trailing rolling mean with a full-window requirement.
///
/// The first `window - 1` outputs are `None`, and so is every output whose
/// window contains a missing observation.
pub fn rolling_mean(values: &[Option<f64>], window: usize) -> Result<Vec<Option<f64>>> {
    let mut sma = SimpleMovingAverage::new(window)?;
    let mut output = Vec::with_capacity(values.len());

    for value in values {
        match value {
            Some(v) => {
                sma.update(*v);
                output.push(sma.value());
            }
            None => {
                sma.reset();
                output.push(None);
            }
        }
    }

    Ok(output)
}

/// Two-sided moving average over `period` observations.
///
/// Even periods use a `2 x period` filter (half weights on both ends) so the
/// window stays centered. Positions where the filter does not fit are `None`.
pub fn centered_moving_average(values: &[f64], period: usize) -> Result<Vec<Option<f64>>> {
    if period == 0 {
        return Err(MathError::InvalidInput(
            "Period must be greater than zero".to_string(),
        ));
    }

    let weights: Vec<f64> = if period % 2 == 0 {
        let mut w = vec![1.0 / period as f64; period + 1];
        w[0] = 0.5 / period as f64;
        w[period] = 0.5 / period as f64;
        w
    } else {
        vec![1.0 / period as f64; period]
    };
    let half = weights.len() / 2;

    let n = values.len();
    let mut output = vec![None; n];
    if n < weights.len() {
        return Ok(output);
    }

    for (t, slot) in output.iter_mut().enumerate().take(n - half).skip(half) {
        let start = t - half;
        let acc: f64 = weights
            .iter()
            .zip(&values[start..start + weights.len()])
            .map(|(w, x)| w * x)
            .sum();
        *slot = Some(acc);
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sma_calculation() {
        let mut sma = SimpleMovingAverage::new(3).unwrap();

        assert!(sma.value().is_none());

        sma.update(2.0);
        sma.update(4.0);
        assert!(sma.value().is_none());

        sma.update(6.0);
        assert_eq!(sma.value(), Some(4.0)); // (2 + 4 + 6) / 3

        sma.update(8.0);
        assert_eq!(sma.value(), Some(6.0)); // (4 + 6 + 8) / 3
    }

    #[test]
    fn test_sma_rejects_zero_period() {
        assert!(SimpleMovingAverage::new(0).is_err());
    }

    #[test]
    fn test_rolling_mean_leading_nulls() {
        let values: Vec<Option<f64>> = [1.0, 2.0, 3.0, 4.0, 5.0].iter().map(|v| Some(*v)).collect();
        let ma = rolling_mean(&values, 3).unwrap();
        assert_eq!(ma, vec![None, None, Some(2.0), Some(3.0), Some(4.0)]);
    }

    #[test]
    fn test_rolling_mean_gap_restarts_window() {
        let values = vec![Some(1.0), Some(2.0), None, Some(4.0), Some(6.0), Some(8.0)];
        let ma = rolling_mean(&values, 2).unwrap();
        assert_eq!(ma, vec![None, Some(1.5), None, None, Some(5.0), Some(7.0)]);
    }

    #[test]
    fn test_centered_moving_average_odd_period() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        let trend = centered_moving_average(&values, 3).unwrap();
        assert_eq!(trend, vec![None, Some(2.0), Some(3.0), Some(4.0), None]);
    }

    #[test]
    fn test_centered_moving_average_even_period() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let trend = centered_moving_average(&values, 4).unwrap();
        // Linear input: centered average reproduces the line where defined
        assert!(trend[0].is_none() && trend[1].is_none());
        assert_relative_eq!(trend[2].unwrap(), 3.0);
        assert_relative_eq!(trend[3].unwrap(), 4.0);
        assert!(trend[4].is_none() && trend[5].is_none());
    }
}
