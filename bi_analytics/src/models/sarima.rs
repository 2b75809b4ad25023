//! Seasonal ARIMA

use crate::error::{AnalyticsError, Result};
use crate::models::{
    apply_differencing, differencing_polynomial, fit_arma, forecast_arma, integrate, ArmaFit,
    ArmaOrder, ForecastModel, TrainedForecastModel,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Seasonal part `(P, D, Q, s)` of a SARIMA order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonalOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
    /// Observations per season
    pub period: usize,
}

impl SeasonalOrder {
    pub fn new(p: usize, d: usize, q: usize, period: usize) -> Self {
        Self { p, d, q, period }
    }
}

impl Default for SeasonalOrder {
    fn default() -> Self {
        Self::new(1, 1, 1, 12)
    }
}

/// SARIMA(p,d,q)(P,D,Q,s)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SarimaModel {
    pub p: usize,
    pub d: usize,
    pub q: usize,
    pub seasonal: SeasonalOrder,
}

/// Trained SARIMA model
#[derive(Debug, Clone)]
pub struct TrainedSarimaModel {
    spec: SarimaModel,
    fit: ArmaFit,
    history: Vec<f64>,
    differenced: Vec<f64>,
    differencing: Vec<f64>,
}

impl SarimaModel {
    pub fn new(order: (usize, usize, usize), seasonal: SeasonalOrder) -> Self {
        Self {
            p: order.0,
            d: order.1,
            q: order.2,
            seasonal,
        }
    }
}

impl Default for SarimaModel {
    fn default() -> Self {
        Self::new((1, 1, 1), SeasonalOrder::default())
    }
}

impl ForecastModel for SarimaModel {
    type Trained = TrainedSarimaModel;

    fn train(&self, series: &[f64]) -> Result<TrainedSarimaModel> {
        let s = self.seasonal;
        if s.period == 0 && (s.p + s.d + s.q) > 0 {
            return Err(AnalyticsError::InvalidParameter(
                "Seasonal period must be at least 1".to_string(),
            ));
        }
        let period = s.period.max(1);

        let differencing = differencing_polynomial(self.d, s.d, period);
        let lost = differencing.len() - 1;
        if series.len() <= lost + 1 {
            return Err(AnalyticsError::InsufficientData(format!(
                "{} loses {} observations to differencing, have {}",
                self.name(),
                lost,
                series.len()
            )));
        }

        let differenced = apply_differencing(series, &differencing);
        let fit = fit_arma(
            &differenced,
            ArmaOrder {
                p: self.p,
                q: self.q,
                seasonal_p: s.p,
                seasonal_q: s.q,
                period,
                constant: self.d + s.d == 0,
            },
        )?;

        debug!("Fitted {}: sigma2 {:.4}", self.name(), fit.sigma2);
        Ok(TrainedSarimaModel {
            spec: *self,
            fit,
            history: series.to_vec(),
            differenced,
            differencing,
        })
    }

    fn name(&self) -> String {
        format!(
            "SARIMA({},{},{})({},{},{},{})",
            self.p, self.d, self.q, self.seasonal.p, self.seasonal.d, self.seasonal.q, self.seasonal.period
        )
    }
}

impl TrainedSarimaModel {
    pub fn spec(&self) -> &SarimaModel {
        &self.spec
    }

    /// Full AR lag polynomial after multiplying the seasonal factor in
    pub fn ar_polynomial(&self) -> &[f64] {
        &self.fit.ar
    }

    /// Full MA lag polynomial after multiplying the seasonal factor in
    pub fn ma_polynomial(&self) -> &[f64] {
        &self.fit.ma
    }

    pub fn sigma2(&self) -> f64 {
        self.fit.sigma2
    }
}

impl TrainedForecastModel for TrainedSarimaModel {
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

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_seasonal_random_walk_repeats_last_season() {
        let series: Vec<f64> = (0..36).map(|t| 10.0 + (t % 12) as f64 + (t / 12) as f64).collect();
        let model = SarimaModel::new((0, 0, 0), SeasonalOrder::new(0, 1, 0, 12))
            .train(&series)
            .unwrap();

        let forecast = model.forecast(12).unwrap();
        for (h, value) in forecast.iter().enumerate() {
            assert_relative_eq!(*value, series[24 + h], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_seasonal_polynomial_has_cross_term() {
        let series: Vec<f64> = (0..96)
            .map(|t| {
                let season = [3.0, 1.0, -2.0, -1.0, 0.5, -1.5][t % 6];
                0.2 * t as f64 + season + 0.3 * ((t * 7919) % 13) as f64 / 13.0
            })
            .collect();
        let model = SarimaModel::new((1, 0, 0), SeasonalOrder::new(1, 1, 0, 6))
            .train(&series)
            .unwrap();

        // (1 - a B)(1 - A B^6) has degree 7
        assert_eq!(model.ar_polynomial().len(), 8);
        assert_relative_eq!(
            model.ar_polynomial()[7],
            model.ar_polynomial()[1] * model.ar_polynomial()[6],
            epsilon = 1e-12
        );
        assert_eq!(model.forecast(6).unwrap().len(), 6);
    }

    #[test]
    fn test_name() {
        assert_eq!(SarimaModel::default().name(), "SARIMA(1,1,1)(1,1,1,12)");
    }
}
