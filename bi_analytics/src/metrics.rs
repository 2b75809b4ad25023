//! Metrics for evaluating forecast performance

use crate::error::{AnalyticsError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Forecast accuracy metrics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastMetrics {
    /// Mean Squared Error
    pub mse: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Mean Absolute Error
    pub mae: f64,
    /// Mean Absolute Percentage Error; rows with a zero actual contribute nothing
    pub mape: f64,
    /// Symmetric Mean Absolute Percentage Error
    pub smape: f64,
}

/// Calculate accuracy metrics for a forecast vs actual values
pub fn forecast_accuracy(forecast: &[f64], actual: &[f64]) -> Result<ForecastMetrics> {
    if forecast.len() != actual.len() {
        return Err(AnalyticsError::InvalidParameter(format!(
            "Forecast has {} values but actual has {}",
            forecast.len(),
            actual.len()
        )));
    }
    if forecast.is_empty() {
        return Err(AnalyticsError::InvalidParameter(
            "Cannot evaluate an empty forecast".to_string(),
        ));
    }

    let n = forecast.len() as f64;
    let errors: Vec<f64> = forecast
        .iter()
        .zip(actual.iter())
        .map(|(&f, &a)| a - f)
        .collect();

    let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / n;
    let mse = errors.iter().map(|e| e.powi(2)).sum::<f64>() / n;
    let rmse = mse.sqrt();

    let mape = actual
        .iter()
        .zip(errors.iter())
        .filter(|(&a, _)| a != 0.0)
        .map(|(&a, &e)| (e.abs() / a.abs()) * 100.0)
        .sum::<f64>()
        / n;

    let smape = actual
        .iter()
        .zip(forecast.iter())
        .map(|(&a, &f)| {
            let denominator = a.abs() + f.abs();
            if denominator == 0.0 {
                0.0
            } else {
                200.0 * (a - f).abs() / denominator
            }
        })
        .sum::<f64>()
        / n;

    Ok(ForecastMetrics {
        mse,
        rmse,
        mae,
        mape,
        smape,
    })
}

impl fmt::Display for ForecastMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Forecast Accuracy Metrics:")?;
        writeln!(f, "  MSE:   {:.4}", self.mse)?;
        writeln!(f, "  RMSE:  {:.4}", self.rmse)?;
        writeln!(f, "  MAE:   {:.4}", self.mae)?;
        writeln!(f, "  MAPE:  {:.4}%", self.mape)?;
        writeln!(f, "  SMAPE: {:.4}%", self.smape)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_metrics() {
        let metrics = forecast_accuracy(&[10.0, 20.0, 30.0], &[12.0, 18.0, 30.0]).unwrap();
        assert_relative_eq!(metrics.mae, 4.0 / 3.0);
        assert_relative_eq!(metrics.mse, 8.0 / 3.0);
        assert_relative_eq!(metrics.rmse, (8.0f64 / 3.0).sqrt());
        assert_relative_eq!(metrics.mape, (2.0 / 12.0 + 2.0 / 18.0) * 100.0 / 3.0);
    }

    #[test]
    fn test_length_mismatch() {
        assert!(matches!(
            forecast_accuracy(&[1.0, 2.0], &[1.0]),
            Err(AnalyticsError::InvalidParameter(_))
        ));
    }
}
