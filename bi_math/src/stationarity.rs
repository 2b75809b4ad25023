//! Augmented Dickey-Fuller unit-root test (constant, no trend)
//!
//! Lag length is picked by AIC over `0..=maxlag` on a common sample, then the
//! test regression is refit on the largest sample the chosen lag allows.
//! P-values use the MacKinnon (1994) response surface; critical values use
//! MacKinnon (2010).

use crate::regression::{least_squares, OlsFit};
use crate::{MathError, Result};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use std::collections::BTreeMap;

const TAU_MAX: f64 = 2.74;
const TAU_MIN: f64 = -18.83;
const TAU_STAR: f64 = -1.61;
const TAU_SMALL_P: [f64; 3] = [2.1659, 1.4412, 0.038269];
const TAU_LARGE_P: [f64; 4] = [1.7339, 0.93202, -0.12745, -0.010368];

/// (label, b0, b1, b2, b3) for `b0 + b1/n + b2/n^2 + b3/n^3`
const CRITICAL_SURFACE: [(&str, [f64; 4]); 3] = [
    ("1%", [-3.43035, -6.5393, -16.786, -79.433]),
    ("5%", [-2.86154, -2.8903, -4.234, -40.040]),
    ("10%", [-2.56677, -1.5384, -2.809, 0.0]),
];

/// Outcome of an Augmented Dickey-Fuller test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdfResult {
    pub test_statistic: f64,
    pub p_value: f64,
    /// Number of lagged differences in the final regression
    pub lags: usize,
    /// Observations in the final regression
    pub observations: usize,
    /// Critical values keyed by significance level ("1%", "5%", "10%")
    pub critical_values: BTreeMap<String, f64>,
    /// AIC of the selected lag length
    pub information_criterion: f64,
}

/// Run the ADF test on a series without missing values
pub fn adf_test(values: &[f64]) -> Result<AdfResult> {
    let n = values.len();
    if values.iter().any(|v| !v.is_finite()) {
        return Err(MathError::InvalidInput(
            "ADF input contains non-finite values".to_string(),
        ));
    }

    let default_lag = (12.0 * (n as f64 / 100.0).powf(0.25)).ceil() as i64;
    let cap = (n / 2) as i64 - 2;
    let maxlag = default_lag.min(cap);
    if maxlag < 0 {
        return Err(MathError::InsufficientData(format!(
            "ADF test needs at least 4 observations, have {}",
            n
        )));
    }
    let maxlag = maxlag as usize;

    let diffs: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();

    // Lag search on the sample that the largest lag leaves
    let mut best: Option<(f64, usize)> = None;
    for lag in 0..=maxlag {
        let fit = adf_regression(values, &diffs, lag, maxlag)?;
        let aic = fit.aic();
        if best.map_or(true, |(best_aic, _)| aic < best_aic) {
            best = Some((aic, lag));
        }
    }
    let (information_criterion, lags) = best.ok_or_else(|| {
        MathError::InsufficientData("No admissible lag length for ADF test".to_string())
    })?;

    let fit = adf_regression(values, &diffs, lags, lags)?;
    let test_statistic = fit.t_value(1).ok_or_else(|| {
        MathError::InsufficientData("ADF regression has no level coefficient".to_string())
    })?;
    let observations = fit.nobs;

    Ok(AdfResult {
        test_statistic,
        p_value: mackinnon_p_value(test_statistic),
        lags,
        observations,
        critical_values: critical_values(observations),
        information_criterion,
    })
}

/// Regress `dx[t]` on `[1, x[t-1], dx[t-1], ..., dx[t-lag]]` using the
/// sample left after dropping `skip` leading differences.
fn adf_regression(values: &[f64], diffs: &[f64], lag: usize, skip: usize) -> Result<OlsFit> {
    let mut design = Vec::with_capacity(diffs.len().saturating_sub(skip));
    let mut response = Vec::with_capacity(diffs.len().saturating_sub(skip));

    for t in skip..diffs.len() {
        let mut row = Vec::with_capacity(lag + 2);
        row.push(1.0);
        // diffs[t] = values[t + 1] - values[t], so the lagged level is values[t]
        row.push(values[t]);
        for j in 1..=lag {
            row.push(diffs[t - j]);
        }
        design.push(row);
        response.push(diffs[t]);
    }

    least_squares(&design, &response)
}

/// Approximate p-value for the constant-only, single-series case
pub fn mackinnon_p_value(test_statistic: f64) -> f64 {
    if test_statistic > TAU_MAX {
        return 1.0;
    }
    if test_statistic < TAU_MIN {
        return 0.0;
    }

    let z = if test_statistic <= TAU_STAR {
        polyval(&TAU_SMALL_P, test_statistic)
    } else {
        polyval(&TAU_LARGE_P, test_statistic)
    };

    match Normal::new(0.0, 1.0) {
        Ok(normal) => normal.cdf(z),
        Err(_) => f64::NAN,
    }
}

/// Finite-sample critical values for `nobs` observations
pub fn critical_values(nobs: usize) -> BTreeMap<String, f64> {
    let inv = 1.0 / nobs as f64;
    CRITICAL_SURFACE
        .iter()
        .map(|(label, b)| {
            let value = b[0] + b[1] * inv + b[2] * inv.powi(2) + b[3] * inv.powi(3);
            (label.to_string(), value)
        })
        .collect()
}

/// Evaluate ascending coefficients at `x`
fn polyval(coefficients: &[f64], x: f64) -> f64 {
    coefficients
        .iter()
        .rev()
        .fold(0.0, |acc, c| acc * x + c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::{Distribution, Normal as NormalDist};

    fn white_noise(n: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let dist = NormalDist::new(0.0, 1.0).unwrap();
        (0..n).map(|_| dist.sample(&mut rng)).collect()
    }

    #[test]
    fn test_white_noise_is_stationary() {
        let series = white_noise(200, 7);
        let result = adf_test(&series).unwrap();
        assert!(result.p_value < 0.05, "p = {}", result.p_value);
        assert!(result.test_statistic < result.critical_values["5%"]);
        assert_eq!(result.critical_values.len(), 3);
    }

    #[test]
    fn test_drifting_random_walk_is_not_stationary() {
        let shocks = white_noise(200, 11);
        let mut level = 0.0;
        let series: Vec<f64> = shocks
            .iter()
            .map(|e| {
                level += 1.0 + 0.5 * e;
                level
            })
            .collect();

        let result = adf_test(&series).unwrap();
        assert!(result.p_value > 0.05, "p = {}", result.p_value);
    }

    #[test]
    fn test_lag_and_observation_bookkeeping() {
        let series = white_noise(100, 3);
        let result = adf_test(&series).unwrap();
        // 12 * (100/100)^0.25 = 12 lags at most
        assert!(result.lags <= 12);
        assert_eq!(result.observations, 100 - 1 - result.lags);
    }

    #[test]
    fn test_mackinnon_surface() {
        // Asymptotic 5% critical value maps to roughly p = 0.05
        assert_relative_eq!(mackinnon_p_value(-2.8615), 0.05, epsilon = 0.003);
        assert_eq!(mackinnon_p_value(5.0), 1.0);
        assert_eq!(mackinnon_p_value(-25.0), 0.0);
    }

    #[test]
    fn test_critical_values_approach_asymptote() {
        let crit = critical_values(100_000);
        assert_relative_eq!(crit["1%"], -3.43035, epsilon = 1e-3);
        assert_relative_eq!(crit["10%"], -2.56677, epsilon = 1e-3);
    }

    #[test]
    fn test_too_short_series() {
        assert!(matches!(
            adf_test(&[1.0, 2.0, 3.0]),
            Err(MathError::InsufficientData(_))
        ));
    }
}
