//! Simple exponential smoothing

use crate::{MathError, Result};

/// Simple exponential smoothing seeded by the first observation:
/// `S_0 = X_0`, `S_t = alpha * X_t + (1 - alpha) * S_{t-1}`.
#[derive(Debug, Clone)]
pub struct ExponentialSmoothing {
    alpha: f64,
    level: Option<f64>,
}

impl ExponentialSmoothing {
    /// Create a new smoother; `alpha` must lie in `(0, 1]`
    pub fn new(alpha: f64) -> Result<Self> {
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(MathError::InvalidInput(format!(
                "Alpha must be in (0, 1], got {}",
                alpha
            )));
        }

        Ok(Self { alpha, level: None })
    }

    /// Feed one observation and return the new level
    pub fn update(&mut self, value: f64) -> f64 {
        let level = match self.level {
            None => value,
            Some(previous) => self.alpha * value + (1.0 - self.alpha) * previous,
        };
        self.level = Some(level);
        level
    }

    /// Current smoothed level, if any observation has been seen
    pub fn value(&self) -> Option<f64> {
        self.level
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn reset(&mut self) {
        self.level = None;
    }
}

/// Smooth a whole series. Missing observations carry the previous level
/// forward; positions before the first observation stay `None`.
pub fn exponential_smoothing(values: &[Option<f64>], alpha: f64) -> Result<Vec<Option<f64>>> {
    let mut smoother = ExponentialSmoothing::new(alpha)?;

    Ok(values
        .iter()
        .map(|value| match value {
            Some(v) => Some(smoother.update(*v)),
            None => smoother.value(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_exponential_smoothing_recursion() {
        let mut es = ExponentialSmoothing::new(0.3).unwrap();

        assert_relative_eq!(es.update(10.0), 10.0); // seeded by first value
        assert_relative_eq!(es.update(20.0), 13.0); // 0.3*20 + 0.7*10
        assert_relative_eq!(es.value().unwrap(), 13.0);
    }

    #[test]
    fn test_alpha_one_returns_raw_series() {
        let values = vec![Some(3.0), Some(-1.0), Some(7.5), Some(2.0)];
        let smoothed = exponential_smoothing(&values, 1.0).unwrap();
        assert_eq!(smoothed, values);
    }

    #[test]
    fn test_invalid_alpha() {
        assert!(ExponentialSmoothing::new(0.0).is_err());
        assert!(ExponentialSmoothing::new(1.5).is_err());
        assert!(ExponentialSmoothing::new(f64::NAN).is_err());
    }

    #[test]
    fn test_missing_values_carry_level() {
        let values = vec![None, Some(10.0), None, Some(20.0)];
        let smoothed = exponential_smoothing(&values, 0.5).unwrap();
        assert_eq!(smoothed, vec![None, Some(10.0), Some(10.0), Some(15.0)]);
    }
}
