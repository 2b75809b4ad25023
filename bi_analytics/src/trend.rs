//! Trend analysis of a single time series
//!
//! Decomposition, unit-root testing, smoothing and outlier flags over one
//! column of a dataset. The column is optional everywhere; when omitted the
//! dataset's first value column is used.

use crate::data::{DataLoader, Dataset};
use crate::error::{AnalyticsError, Result};
use crate::utils::{infer_frequency, Frequency};
use bi_math::{
    adf_test, centered_moving_average, exponential_smoothing, mean, quantile, rolling_mean,
    sample_std_dev,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

pub const DEFAULT_MA_WINDOW: usize = 7;
pub const DEFAULT_ES_ALPHA: f64 = 0.3;
pub const DEFAULT_OUTLIER_THRESHOLD: f64 = 3.0;

/// How the seasonal component combines with trend and residual
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecompositionModel {
    #[default]
    Additive,
    Multiplicative,
}

impl FromStr for DecompositionModel {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "additive" | "add" => Ok(DecompositionModel::Additive),
            "multiplicative" | "mul" => Ok(DecompositionModel::Multiplicative),
            other => Err(AnalyticsError::UnsupportedConfiguration(format!(
                "Unsupported decomposition model: {}",
                other
            ))),
        }
    }
}

/// Outlier detection rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutlierMethod {
    ZScore,
    Iqr,
}

impl FromStr for OutlierMethod {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "zscore" | "z-score" => Ok(OutlierMethod::ZScore),
            "iqr" => Ok(OutlierMethod::Iqr),
            other => Err(AnalyticsError::UnsupportedConfiguration(format!(
                "Unsupported method: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for OutlierMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutlierMethod::ZScore => write!(f, "zscore"),
            OutlierMethod::Iqr => write!(f, "iqr"),
        }
    }
}

/// Classical decomposition of a series
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decomposition {
    pub model: DecompositionModel,
    pub period: usize,
    pub observed: Vec<f64>,
    /// Centred moving average; `None` where the window does not fit
    pub trend: Vec<Option<f64>>,
    pub seasonal: Vec<f64>,
    pub residual: Vec<Option<f64>>,
}

/// Augmented Dickey-Fuller outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationarityReport {
    pub test_statistic: f64,
    pub p_value: f64,
    pub lags: usize,
    pub observations: usize,
    pub critical_values: BTreeMap<String, f64>,
    /// Unit root rejected at the 5% level
    pub is_stationary: bool,
}

/// Which analyses [`TrendAnalyzer::analyze`] runs, and their parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    pub decompose: bool,
    pub test_stationarity: bool,
    pub moving_average: bool,
    pub exponential_smoothing: bool,
    pub detect_outliers: bool,
    pub model: DecompositionModel,
    pub period: Option<usize>,
    pub ma_window: usize,
    pub es_alpha: f64,
    pub outlier_method: String,
    pub outlier_threshold: f64,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            decompose: true,
            test_stationarity: true,
            moving_average: true,
            exponential_smoothing: true,
            detect_outliers: true,
            model: DecompositionModel::Additive,
            period: None,
            ma_window: DEFAULT_MA_WINDOW,
            es_alpha: DEFAULT_ES_ALPHA,
            outlier_method: OutlierMethod::ZScore.to_string(),
            outlier_threshold: DEFAULT_OUTLIER_THRESHOLD,
        }
    }
}

/// Results of the enabled analyses for one column
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendReport {
    pub column: String,
    pub dates: Option<Vec<NaiveDate>>,
    pub decomposition: Option<Decomposition>,
    pub stationarity: Option<StationarityReport>,
    pub moving_average: Option<Vec<Option<f64>>>,
    pub exponential_smoothing: Option<Vec<Option<f64>>>,
    pub outliers: Option<Vec<bool>>,
}

/// Analyzer over a loaded dataset
#[derive(Debug, Clone, Default)]
pub struct TrendAnalyzer {
    data: Option<Dataset>,
}

impl TrendAnalyzer {
    pub fn new(data: Option<Dataset>) -> Self {
        Self { data }
    }

    /// Load a dataset, indexing it by `date_col` when given
    pub fn load(
        &mut self,
        dataset: Dataset,
        date_col: Option<&str>,
        value_col: Option<&str>,
    ) -> Result<()> {
        self.data = Some(dataset.indexed(date_col, value_col)?);
        Ok(())
    }

    /// Load from a `.csv`/`.xlsx` file
    pub fn load_path<P: AsRef<Path>>(
        &mut self,
        path: P,
        date_col: Option<&str>,
        value_col: Option<&str>,
    ) -> Result<()> {
        self.data = Some(DataLoader::load(path, date_col, value_col)?);
        Ok(())
    }

    pub fn data(&self) -> Result<&Dataset> {
        self.data
            .as_ref()
            .ok_or_else(|| AnalyticsError::DataAbsent("No data loaded".to_string()))
    }

    /// Inferred frequency of the date index, if any
    pub fn frequency(&self) -> Option<Frequency> {
        self.data
            .as_ref()
            .and_then(|d| d.dates())
            .and_then(infer_frequency)
    }

    fn column_values(&self, column: Option<&str>) -> Result<Vec<Option<f64>>> {
        let data = self.data()?;
        let column = data.resolve_column(column)?;
        data.optional_values(&column)
    }

    /// Split the series into trend, seasonal and residual components
    pub fn decompose(
        &self,
        column: Option<&str>,
        model: DecompositionModel,
        period: Option<usize>,
    ) -> Result<Decomposition> {
        let data = self.data()?;
        let column = data.resolve_column(column)?;
        let observed = data.complete_values(&column)?;
        let period = period.unwrap_or_else(|| Frequency::seasonal_period(self.frequency()));

        let decomposition = seasonal_decompose(&observed, model, period)?;
        debug!("Decomposed {} with period {}", column, period);
        Ok(decomposition)
    }

    /// Augmented Dickey-Fuller test on the non-null values
    pub fn test_stationarity(&self, column: Option<&str>) -> Result<StationarityReport> {
        let values: Vec<f64> = self.column_values(column)?.into_iter().flatten().collect();
        let adf = adf_test(&values)?;

        Ok(StationarityReport {
            test_statistic: adf.test_statistic,
            p_value: adf.p_value,
            lags: adf.lags,
            observations: adf.observations,
            critical_values: adf.critical_values,
            is_stationary: adf.p_value < 0.05,
        })
    }

    /// Trailing rolling mean over `window` observations
    pub fn moving_average(&self, column: Option<&str>, window: usize) -> Result<Vec<Option<f64>>> {
        if window == 0 {
            return Err(AnalyticsError::InvalidParameter(
                "Window must be at least 1".to_string(),
            ));
        }
        Ok(rolling_mean(&self.column_values(column)?, window)?)
    }

    /// Simple exponential smoothing seeded with the first observation
    pub fn exponential_smoothing(
        &self,
        column: Option<&str>,
        alpha: f64,
    ) -> Result<Vec<Option<f64>>> {
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(AnalyticsError::InvalidParameter(format!(
                "Alpha must be in (0, 1], got {}",
                alpha
            )));
        }
        Ok(exponential_smoothing(&self.column_values(column)?, alpha)?)
    }

    /// Flag outliers by method name (`zscore` or `iqr`)
    pub fn detect_outliers(
        &self,
        column: Option<&str>,
        method: &str,
        threshold: f64,
    ) -> Result<Vec<bool>> {
        self.detect_outliers_with(column, method.parse()?, threshold)
    }

    /// Flag outliers. Null rows are never flagged.
    pub fn detect_outliers_with(
        &self,
        column: Option<&str>,
        method: OutlierMethod,
        threshold: f64,
    ) -> Result<Vec<bool>> {
        let values = self.column_values(column)?;
        let present: Vec<f64> = values.iter().flatten().copied().collect();

        let flags = match method {
            OutlierMethod::ZScore => {
                if present.len() < 2 {
                    vec![false; values.len()]
                } else {
                    let m = mean(&present)?;
                    let sd = sample_std_dev(&present)?;
                    values
                        .iter()
                        .map(|v| v.map_or(false, |x| ((x - m) / sd).abs() > threshold))
                        .collect()
                }
            }
            OutlierMethod::Iqr => {
                if present.is_empty() {
                    vec![false; values.len()]
                } else {
                    let q1 = quantile(&present, 0.25)?;
                    let q3 = quantile(&present, 0.75)?;
                    let iqr = q3 - q1;
                    let (lower, upper) = (q1 - threshold * iqr, q3 + threshold * iqr);
                    values
                        .iter()
                        .map(|v| v.map_or(false, |x| x < lower || x > upper))
                        .collect()
                }
            }
        };

        Ok(flags)
    }

    /// Run every analysis enabled in `config`
    pub fn analyze(&self, column: Option<&str>, config: &TrendConfig) -> Result<TrendReport> {
        let data = self.data()?;
        let column = data.resolve_column(column)?;
        let target = Some(column.as_str());

        let report = TrendReport {
            column: column.clone(),
            dates: data.dates().map(|d| d.to_vec()),
            decomposition: if config.decompose {
                Some(self.decompose(target, config.model, config.period)?)
            } else {
                None
            },
            stationarity: if config.test_stationarity {
                Some(self.test_stationarity(target)?)
            } else {
                None
            },
            moving_average: if config.moving_average {
                Some(self.moving_average(target, config.ma_window)?)
            } else {
                None
            },
            exponential_smoothing: if config.exponential_smoothing {
                Some(self.exponential_smoothing(target, config.es_alpha)?)
            } else {
                None
            },
            outliers: if config.detect_outliers {
                Some(self.detect_outliers(
                    target,
                    &config.outlier_method,
                    config.outlier_threshold,
                )?)
            } else {
                None
            },
        };

        info!("Trend analysis of {} complete", column);
        Ok(report)
    }
}

/// Classical moving-average decomposition
pub fn seasonal_decompose(
    observed: &[f64],
    model: DecompositionModel,
    period: usize,
) -> Result<Decomposition> {
    if period == 0 {
        return Err(AnalyticsError::InvalidParameter(
            "Period must be at least 1".to_string(),
        ));
    }
    if observed.len() < 2 * period {
        return Err(AnalyticsError::InsufficientData(format!(
            "Decomposition with period {} needs {} observations, have {}",
            period,
            2 * period,
            observed.len()
        )));
    }
    if observed.iter().any(|v| !v.is_finite()) {
        return Err(AnalyticsError::InvalidParameter(
            "Series contains non-finite values".to_string(),
        ));
    }
    if model == DecompositionModel::Multiplicative && observed.iter().any(|&v| v <= 0.0) {
        return Err(AnalyticsError::InvalidParameter(
            "Multiplicative decomposition requires strictly positive values".to_string(),
        ));
    }

    let trend = centered_moving_average(observed, period)?;
    let detrended: Vec<Option<f64>> = observed
        .iter()
        .zip(&trend)
        .map(|(x, t)| {
            t.map(|t| match model {
                DecompositionModel::Additive => x - t,
                DecompositionModel::Multiplicative => x / t,
            })
        })
        .collect();

    let mut phase_means: Vec<f64> = (0..period)
        .map(|phase| {
            let cycle: Vec<f64> = detrended
                .iter()
                .skip(phase)
                .step_by(period)
                .flatten()
                .copied()
                .collect();
            cycle.iter().sum::<f64>() / cycle.len() as f64
        })
        .collect();
    let overall = phase_means.iter().sum::<f64>() / period as f64;
    for m in phase_means.iter_mut() {
        match model {
            DecompositionModel::Additive => *m -= overall,
            DecompositionModel::Multiplicative => *m /= overall,
        }
    }

    let seasonal: Vec<f64> = (0..observed.len()).map(|i| phase_means[i % period]).collect();
    let residual = observed
        .iter()
        .zip(&trend)
        .zip(&seasonal)
        .map(|((x, t), s)| {
            t.map(|t| match model {
                DecompositionModel::Additive => x - t - s,
                DecompositionModel::Multiplicative => x / (t * s),
            })
        })
        .collect();

    Ok(Decomposition {
        model,
        period,
        observed: observed.to_vec(),
        trend,
        seasonal,
        residual,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use polars::prelude::*;

    fn analyzer(values: &[f64]) -> TrendAnalyzer {
        let df = df!("value" => values).unwrap();
        TrendAnalyzer::new(Some(Dataset::new(df)))
    }

    #[test]
    fn test_moving_average_window_three() {
        let ma = analyzer(&[1.0, 2.0, 3.0, 4.0, 5.0])
            .moving_average(None, 3)
            .unwrap();
        assert_eq!(ma, vec![None, None, Some(2.0), Some(3.0), Some(4.0)]);
    }

    #[test]
    fn test_zero_window_is_invalid() {
        assert!(matches!(
            analyzer(&[1.0, 2.0]).moving_average(None, 0),
            Err(AnalyticsError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_alpha_bounds() {
        let a = analyzer(&[1.0, 2.0]);
        assert!(a.exponential_smoothing(None, 0.0).is_err());
        assert!(a.exponential_smoothing(None, 1.5).is_err());
        assert_eq!(
            a.exponential_smoothing(None, 1.0).unwrap(),
            vec![Some(1.0), Some(2.0)]
        );
    }

    #[test]
    fn test_unknown_outlier_method() {
        assert!(matches!(
            analyzer(&[1.0, 2.0, 3.0]).detect_outliers(None, "mad", 3.0),
            Err(AnalyticsError::UnsupportedConfiguration(_))
        ));
    }

    #[test]
    fn test_iqr_flags_extreme_value() {
        let flags = analyzer(&[10.0, 11.0, 9.0, 10.5, 9.5, 100.0])
            .detect_outliers(None, "iqr", 1.5)
            .unwrap();
        assert_eq!(flags, vec![false, false, false, false, false, true]);
    }

    #[test]
    fn test_decompose_odd_period() {
        let observed: Vec<f64> = (0..9).map(|i| i as f64 + [0.0, 3.0, -3.0][i % 3]).collect();
        let d = seasonal_decompose(&observed, DecompositionModel::Additive, 3).unwrap();

        assert_eq!(d.trend[0], None);
        assert_relative_eq!(d.trend[1].unwrap(), 1.0);
        assert_relative_eq!(d.seasonal[1], 3.0, epsilon = 1e-12);
        assert_relative_eq!(d.residual[4].unwrap(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_decompose_needs_two_cycles() {
        assert!(matches!(
            seasonal_decompose(&[1.0; 23], DecompositionModel::Additive, 12),
            Err(AnalyticsError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_no_data() {
        let analyzer = TrendAnalyzer::default();
        assert!(matches!(
            analyzer.test_stationarity(None),
            Err(AnalyticsError::DataAbsent(_))
        ));
    }
}
