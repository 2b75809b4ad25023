//! Forecasting models for univariate time series
//!
//! ARIMA and SARIMA share one estimator: the series is differenced, an
//! ARMA model is fitted to the differenced values by Hannan-Rissanen
//! two-stage least squares, and forecasts are integrated back.

use crate::error::{AnalyticsError, Result};
use bi_math::{least_squares, multiply_polynomials};
use std::fmt::Debug;

pub mod arima;
pub mod linear;
pub mod sarima;

/// Model specification that can be trained on a series
pub trait ForecastModel: Debug + Clone {
    /// The type of trained model produced
    type Trained: TrainedForecastModel;

    /// Train the model on a series without missing values
    fn train(&self, series: &[f64]) -> Result<Self::Trained>;

    /// Get the name of the model
    fn name(&self) -> String;
}

/// Trained forecast model
pub trait TrainedForecastModel: Debug {
    /// Point forecasts for the next `horizon` periods
    fn forecast(&self, horizon: usize) -> Result<Vec<f64>>;

    /// In-sample one-step residuals of the differenced series
    fn residuals(&self) -> &[f64];

    /// Name of the model
    fn name(&self) -> String;
}

/// A fitted ARMA model on an already differenced series.
///
/// Polynomials use ascending coefficients in the lag operator:
/// `ar = [1, -a1, -a2, ...]` and `ma = [1, b1, b2, ...]`.
#[derive(Debug, Clone)]
pub struct ArmaFit {
    pub constant: f64,
    pub ar: Vec<f64>,
    pub ma: Vec<f64>,
    pub residuals: Vec<f64>,
    pub sigma2: f64,
}

/// Lag structure of a (possibly seasonal) ARMA model
#[derive(Debug, Clone, Copy)]
pub(crate) struct ArmaOrder {
    pub p: usize,
    pub q: usize,
    pub seasonal_p: usize,
    pub seasonal_q: usize,
    pub period: usize,
    pub constant: bool,
}

impl ArmaOrder {
    fn ar_lags(&self) -> Vec<usize> {
        lags(self.p, self.seasonal_p, self.period)
    }

    fn ma_lags(&self) -> Vec<usize> {
        lags(self.q, self.seasonal_q, self.period)
    }
}

fn lags(order: usize, seasonal_order: usize, period: usize) -> Vec<usize> {
    let mut lags: Vec<usize> = (1..=order).collect();
    lags.extend((1..=seasonal_order).map(|j| j * period));
    lags
}

/// Fit an ARMA model by Hannan-Rissanen.
///
/// Stage one fits a long autoregression whose residuals stand in for the
/// unobserved innovations. Stage two regresses the series on its own lags
/// and the lagged stage-one residuals. Seasonal and nonseasonal factors are
/// estimated side by side and multiplied into full lag polynomials.
pub(crate) fn fit_arma(w: &[f64], order: ArmaOrder) -> Result<ArmaFit> {
    let n = w.len();
    let ar_lags = order.ar_lags();
    let ma_lags = order.ma_lags();
    let max_ar = ar_lags.iter().copied().max().unwrap_or(0);
    let max_ma = ma_lags.iter().copied().max().unwrap_or(0);
    let regressors = ar_lags.len() + ma_lags.len() + usize::from(order.constant);

    if regressors == 0 {
        let fit = ArmaFit {
            constant: 0.0,
            ar: vec![1.0],
            ma: vec![1.0],
            residuals: w.to_vec(),
            sigma2: w.iter().map(|x| x * x).sum::<f64>() / n.max(1) as f64,
        };
        return Ok(fit);
    }

    // Stage one: innovations from a long autoregression
    let (innovations, start) = if ma_lags.is_empty() {
        (Vec::new(), max_ar)
    } else {
        let long_order = long_ar_order(n, max_ar, max_ma, regressors)?;
        let innovations = long_ar_residuals(w, long_order)?;
        (innovations, max_ar.max(long_order + max_ma))
    };

    if n <= start + regressors {
        return Err(AnalyticsError::InsufficientData(format!(
            "{} observations after differencing are too few for {} parameters",
            n, regressors
        )));
    }

    // Stage two
    let mut design = Vec::with_capacity(n - start);
    let mut response = Vec::with_capacity(n - start);
    for t in start..n {
        let mut row = Vec::with_capacity(regressors);
        if order.constant {
            row.push(1.0);
        }
        row.extend(ar_lags.iter().map(|&lag| w[t - lag]));
        row.extend(ma_lags.iter().map(|&lag| innovations[t - lag]));
        design.push(row);
        response.push(w[t]);
    }
    let ols = least_squares(&design, &response)?;

    let mut coefficients = ols.coefficients.into_iter();
    let constant = if order.constant {
        coefficients.next().unwrap_or(0.0)
    } else {
        0.0
    };
    let ar_coefficients: Vec<f64> = coefficients.by_ref().take(ar_lags.len()).collect();
    let ma_coefficients: Vec<f64> = coefficients.collect();

    let ar = multiply_polynomials(
        &lag_polynomial(&ar_coefficients[..order.p], 1, -1.0),
        &lag_polynomial(&ar_coefficients[order.p..], order.period, -1.0),
    );
    let ma = multiply_polynomials(
        &lag_polynomial(&ma_coefficients[..order.q], 1, 1.0),
        &lag_polynomial(&ma_coefficients[order.q..], order.period, 1.0),
    );

    let residuals = arma_residuals(w, constant, &ar, &ma);
    let tail = &residuals[start.min(n)..];
    let sigma2 = tail.iter().map(|e| e * e).sum::<f64>() / tail.len().max(1) as f64;

    Ok(ArmaFit {
        constant,
        ar,
        ma,
        residuals,
        sigma2,
    })
}

/// `1 + sign * (c1 B^step + c2 B^(2 step) + ...)`
fn lag_polynomial(coefficients: &[f64], step: usize, sign: f64) -> Vec<f64> {
    let mut poly = vec![0.0; coefficients.len() * step + 1];
    poly[0] = 1.0;
    for (j, c) in coefficients.iter().enumerate() {
        poly[(j + 1) * step] = sign * c;
    }
    poly
}

fn long_ar_order(n: usize, max_ar: usize, max_ma: usize, regressors: usize) -> Result<usize> {
    let desired = ((n as f64).ln().powi(2).floor() as usize).max(max_ar + max_ma);
    let stage_one_limit = n.saturating_sub(2) / 2;
    let stage_two_limit = n.saturating_sub(max_ma + regressors + 1);
    let order = desired.min(stage_one_limit).min(stage_two_limit);
    if order == 0 {
        return Err(AnalyticsError::InsufficientData(format!(
            "{} observations after differencing are too few to estimate moving-average terms",
            n
        )));
    }
    Ok(order)
}

/// Residuals of an AR(`order`) fit with intercept; zero before `order`
fn long_ar_residuals(w: &[f64], order: usize) -> Result<Vec<f64>> {
    let design: Vec<Vec<f64>> = (order..w.len())
        .map(|t| {
            std::iter::once(1.0)
                .chain((1..=order).map(|lag| w[t - lag]))
                .collect()
        })
        .collect();
    let fit = least_squares(&design, &w[order..])?;

    let mut residuals = vec![0.0; order];
    residuals.extend(fit.residuals);
    Ok(residuals)
}

/// Conditional residuals with pre-sample values and innovations at zero
fn arma_residuals(w: &[f64], constant: f64, ar: &[f64], ma: &[f64]) -> Vec<f64> {
    let mut residuals = vec![0.0; w.len()];
    for t in 0..w.len() {
        let mut prediction = constant;
        for (k, a) in ar.iter().enumerate().skip(1) {
            if k <= t {
                prediction -= a * w[t - k];
            }
        }
        for (k, b) in ma.iter().enumerate().skip(1) {
            if k <= t {
                prediction += b * residuals[t - k];
            }
        }
        residuals[t] = w[t] - prediction;
    }
    residuals
}

/// Recursive forecasts of the ARMA process with future innovations at zero
pub(crate) fn forecast_arma(w: &[f64], fit: &ArmaFit, horizon: usize) -> Vec<f64> {
    let n = w.len();
    let mut history = w.to_vec();
    let mut innovations = fit.residuals.clone();

    for h in 0..horizon {
        let t = n + h;
        let mut value = fit.constant;
        for (k, a) in fit.ar.iter().enumerate().skip(1) {
            if k <= t {
                value -= a * history[t - k];
            }
        }
        for (k, b) in fit.ma.iter().enumerate().skip(1) {
            if k <= t {
                value += b * innovations[t - k];
            }
        }
        history.push(value);
        innovations.push(0.0);
    }

    history.split_off(n)
}

/// `(1 - B)^d (1 - B^s)^D` as ascending coefficients
pub(crate) fn differencing_polynomial(d: usize, seasonal_d: usize, period: usize) -> Vec<f64> {
    let mut poly = vec![1.0];
    for _ in 0..d {
        poly = multiply_polynomials(&poly, &[1.0, -1.0]);
    }
    for _ in 0..seasonal_d {
        poly = multiply_polynomials(&poly, &lag_polynomial(&[1.0], period, -1.0));
    }
    poly
}

/// Apply a differencing polynomial; the output is `deg` values shorter
pub(crate) fn apply_differencing(y: &[f64], poly: &[f64]) -> Vec<f64> {
    let degree = poly.len() - 1;
    (degree..y.len())
        .map(|t| poly.iter().enumerate().map(|(k, c)| c * y[t - k]).sum())
        .collect()
}

/// Turn forecasts of the differenced series back into levels
pub(crate) fn integrate(y: &[f64], w_forecast: &[f64], poly: &[f64]) -> Vec<f64> {
    let n = y.len();
    let mut levels = y.to_vec();
    for (h, w) in w_forecast.iter().enumerate() {
        let t = n + h;
        let carried: f64 = poly
            .iter()
            .enumerate()
            .skip(1)
            .map(|(k, c)| c * levels[t - k])
            .sum();
        levels.push(w - carried);
    }
    levels.split_off(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::{Distribution, Normal};

    #[test]
    fn test_differencing_polynomial() {
        assert_eq!(differencing_polynomial(1, 0, 12), vec![1.0, -1.0]);
        assert_eq!(differencing_polynomial(2, 0, 12), vec![1.0, -2.0, 1.0]);
        let seasonal = differencing_polynomial(1, 1, 4);
        assert_eq!(seasonal, vec![1.0, -1.0, 0.0, 0.0, -1.0, 1.0]);
    }

    #[test]
    fn test_integrate_inverts_differencing() {
        let y = vec![3.0, 5.0, 4.0, 8.0, 9.0, 7.0, 12.0];
        let poly = differencing_polynomial(1, 1, 2);
        let w = apply_differencing(&y, &poly);

        // Levels rebuilt from the first rows plus the differenced tail
        let head = &y[..3];
        let rebuilt = integrate(head, &w, &poly);
        for (a, b) in rebuilt.iter().zip(&y[3..]) {
            assert_relative_eq!(*a, *b, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_pure_autoregression_recovers_coefficient() {
        let mut rng = StdRng::seed_from_u64(42);
        let noise = Normal::new(0.0, 1.0).unwrap();
        let mut w = vec![0.0];
        for t in 1..1000 {
            w.push(0.6 * w[t - 1] + noise.sample(&mut rng));
        }
        let order = ArmaOrder {
            p: 1,
            q: 0,
            seasonal_p: 0,
            seasonal_q: 0,
            period: 1,
            constant: true,
        };
        let fit = fit_arma(&w, order).unwrap();
        assert!((fit.ar[1] + 0.6).abs() < 0.1);
    }
}
