//! ARIMA models for time series forecasting

use crate::error::{AnalyticsError, Result};
use crate::models::{
    apply_differencing, differencing_polynomial, fit_arma, forecast_arma, integrate, ArmaFit,
    ArmaOrder, ForecastModel, TrainedForecastModel,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// ARIMA model (AutoRegressive Integrated Moving Average)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArimaModel {
    /// AR order (p)
    pub p: usize,
    /// Differencing order (d)
    pub d: usize,
    /// MA order (q)
    pub q: usize,
}

/// Trained ARIMA model
#[derive(Debug, Clone)]
pub struct TrainedArimaModel {
    spec: ArimaModel,
    fit: ArmaFit,
    /// Training series in levels
    history: Vec<f64>,
    /// Training series after differencing
    differenced: Vec<f64>,
    differencing: Vec<f64>,
}

impl ArimaModel {
    /// Create a new ARIMA model
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }

    pub fn order(&self) -> (usize, usize, usize) {
        (self.p, self.d, self.q)
    }
}

impl Default for ArimaModel {
    fn default() -> Self {
        Self::new(1, 1, 1)
    }
}

impl ForecastModel for ArimaModel {
    type Trained = TrainedArimaModel;

    fn train(&self, series: &[f64]) -> Result<TrainedArimaModel> {
        let minimum = self.p + self.d + self.q + 2;
        if series.len() < minimum {
            return Err(AnalyticsError::InsufficientData(format!(
                "{} needs at least {} observations, have {}",
                self.name(),
                minimum,
                series.len()
            )));
        }

        let differencing = differencing_polynomial(self.d, 0, 1);
        let differenced = apply_differencing(series, &differencing);
        let fit = fit_arma(
            &differenced,
            ArmaOrder {
                p: self.p,
                q: self.q,
                seasonal_p: 0,
                seasonal_q: 0,
                period: 1,
                constant: self.d == 0,
            },
        )?;

        debug!(
            "Fitted {}: constant {:.4}, sigma2 {:.4}",
            self.name(),
            fit.constant,
            fit.sigma2
        );
        Ok(TrainedArimaModel {
            spec: *self,
            fit,
            history: series.to_vec(),
            differenced,
            differencing,
        })
    }

    fn name(&self) -> String {
        format!("ARIMA({},{},{})", self.p, self.d, self.q)
    }
}

impl TrainedArimaModel {
    pub fn spec(&self) -> &ArimaModel {
        &self.spec
    }

    /// Estimated AR coefficients `a1..ap` in `w_t = c + a1 w_(t-1) + ...`
    pub fn ar_coefficients(&self) -> Vec<f64> {
        self.fit.ar.iter().skip(1).map(|a| -a).collect()
    }

    /// Estimated MA coefficients `b1..bq`
    pub fn ma_coefficients(&self) -> Vec<f64> {
        self.fit.ma.iter().skip(1).copied().collect()
    }

    pub fn constant(&self) -> f64 {
        self.fit.constant
    }

    /// Innovation variance estimate
    pub fn sigma2(&self) -> f64 {
        self.fit.sigma2
    }
}

impl TrainedForecastModel for TrainedArimaModel {
    fn forecast(&self, horizon: usize) -> Result<Vec<f64>> {
        let w_forecast = forecast_arma(&self.differenced, &self.fit, horizon);
        Ok(integrate(&self.history, &w_forecast, &self.differencing))
    }

    fn residuals(&self) -> &[f64] {
        &self.fit.residuals
    }

    fn name(&self) -> String {
        self.spec.name()
    }
}
