//! Linear regression of a target column on feature columns

use crate::error::{AnalyticsError, Result};
use bi_math::least_squares;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Ordinary least squares fit with intercept
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearRegression {
    pub target: String,
    pub features: Vec<String>,
    pub intercept: f64,
    /// One coefficient per feature, in feature order
    pub coefficients: Vec<f64>,
    pub r_squared: f64,
    /// Rows used after dropping incomplete ones
    pub observations: usize,
}

impl LinearRegression {
    /// Fit `target ~ 1 + features`. Rows with a null in any column are
    /// dropped.
    pub fn fit(
        target: &str,
        y: &[Option<f64>],
        features: &[(String, Vec<Option<f64>>)],
    ) -> Result<Self> {
        if features.is_empty() {
            return Err(AnalyticsError::InvalidParameter(format!(
                "No feature columns to regress {} on",
                target
            )));
        }

        let mut design = Vec::with_capacity(y.len());
        let mut response = Vec::with_capacity(y.len());
        for (row, value) in y.iter().enumerate() {
            let Some(value) = value else { continue };
            let values: Option<Vec<f64>> = features.iter().map(|(_, column)| column[row]).collect();
            if let Some(values) = values {
                let mut design_row = Vec::with_capacity(values.len() + 1);
                design_row.push(1.0);
                design_row.extend(values);
                design.push(design_row);
                response.push(*value);
            }
        }

        let fit = least_squares(&design, &response)?;
        let mut coefficients = fit.coefficients.into_iter();
        let intercept = coefficients.next().unwrap_or(0.0);

        let model = Self {
            target: target.to_string(),
            features: features.iter().map(|(name, _)| name.clone()).collect(),
            intercept,
            coefficients: coefficients.collect(),
            r_squared: fit.r_squared,
            observations: fit.nobs,
        };
        debug!(
            "Fitted linear regression of {} on {} feature(s), R² {:.4}",
            model.target,
            model.features.len(),
            model.r_squared
        );
        Ok(model)
    }

    pub fn name(&self) -> String {
        format!("LinearRegression({} ~ {})", self.target, self.features.join(" + "))
    }
}
