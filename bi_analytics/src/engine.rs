//! Forecast engine
//!
//! The engine moves through four states. Loading data resets it to
//! `DataLoaded`, training moves it to `ModelTrained`, and forecasting to
//! `Forecasted`. Each operation checks the state it needs and fails with a
//! distinct error otherwise.

use crate::data::{date_series, DataLoader, Dataset};
use crate::error::{AnalyticsError, Result};
use crate::metrics::{forecast_accuracy, ForecastMetrics};
use crate::models::arima::{ArimaModel, TrainedArimaModel};
use crate::models::linear::LinearRegression;
use crate::models::sarima::{SarimaModel, SeasonalOrder, TrainedSarimaModel};
use crate::models::{ForecastModel, TrainedForecastModel};
use crate::utils::{future_dates, infer_frequency};
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

/// What to train
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ModelSpec {
    Arima {
        column: Option<String>,
        order: (usize, usize, usize),
    },
    Sarima {
        column: Option<String>,
        order: (usize, usize, usize),
        seasonal_order: SeasonalOrder,
    },
    Linear {
        column: Option<String>,
        /// Defaults to every other numeric column
        features: Option<Vec<String>>,
    },
}

impl ModelSpec {
    /// ARIMA with the default (1,1,1) order
    pub fn arima(column: Option<&str>) -> Self {
        ModelSpec::Arima {
            column: column.map(str::to_string),
            order: ArimaModel::default().order(),
        }
    }

    /// SARIMA with the default (1,1,1)(1,1,1,12) orders
    pub fn sarima(column: Option<&str>) -> Self {
        ModelSpec::Sarima {
            column: column.map(str::to_string),
            order: (1, 1, 1),
            seasonal_order: SeasonalOrder::default(),
        }
    }

    pub fn linear(column: Option<&str>, features: Option<Vec<String>>) -> Self {
        ModelSpec::Linear {
            column: column.map(str::to_string),
            features,
        }
    }

    fn column(&self) -> Option<&str> {
        match self {
            ModelSpec::Arima { column, .. }
            | ModelSpec::Sarima { column, .. }
            | ModelSpec::Linear { column, .. } => column.as_deref(),
        }
    }
}

/// A trained model and the column it was trained on
#[derive(Debug, Clone)]
pub enum FittedModel {
    Arima {
        column: String,
        model: TrainedArimaModel,
    },
    Sarima {
        column: String,
        model: TrainedSarimaModel,
    },
    Linear {
        column: String,
        model: LinearRegression,
    },
}

impl FittedModel {
    pub fn name(&self) -> String {
        match self {
            FittedModel::Arima { model, .. } => model.name(),
            FittedModel::Sarima { model, .. } => model.name(),
            FittedModel::Linear { model, .. } => model.name(),
        }
    }

    pub fn column(&self) -> &str {
        match self {
            FittedModel::Arima { column, .. }
            | FittedModel::Sarima { column, .. }
            | FittedModel::Linear { column, .. } => column,
        }
    }
}

/// Periods a forecast is indexed by
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForecastIndex {
    Dates(Vec<NaiveDate>),
    /// Row positions continuing after the training rows
    Positions(Vec<usize>),
}

/// Point forecasts for the periods after the training data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub column: String,
    pub model: String,
    pub index: ForecastIndex,
    pub values: Vec<f64>,
}

impl Forecast {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Two-column frame: `date` (or `index`) and the forecast column
    pub fn to_frame(&self) -> Result<DataFrame> {
        let index = match &self.index {
            ForecastIndex::Dates(dates) => date_series("date", dates)?,
            ForecastIndex::Positions(positions) => Series::new(
                "index",
                positions.iter().map(|&p| p as u64).collect::<Vec<_>>(),
            ),
        };
        Ok(DataFrame::new(vec![
            index,
            Series::new(&self.column, self.values.clone()),
        ])?)
    }
}

/// Engine state with the data each state owns
#[derive(Debug, Clone, Default)]
pub enum EngineState {
    #[default]
    Empty,
    DataLoaded {
        data: Dataset,
    },
    ModelTrained {
        data: Dataset,
        model: FittedModel,
    },
    Forecasted {
        data: Dataset,
        model: FittedModel,
        forecast: Forecast,
    },
}

impl EngineState {
    pub fn name(&self) -> &'static str {
        match self {
            EngineState::Empty => "empty",
            EngineState::DataLoaded { .. } => "data_loaded",
            EngineState::ModelTrained { .. } => "model_trained",
            EngineState::Forecasted { .. } => "forecasted",
        }
    }

    fn data(&self) -> Option<&Dataset> {
        match self {
            EngineState::Empty => None,
            EngineState::DataLoaded { data }
            | EngineState::ModelTrained { data, .. }
            | EngineState::Forecasted { data, .. } => Some(data),
        }
    }

    fn model(&self) -> Option<&FittedModel> {
        match self {
            EngineState::ModelTrained { model, .. } | EngineState::Forecasted { model, .. } => {
                Some(model)
            }
            _ => None,
        }
    }

    fn into_data_and_model(self) -> (Option<Dataset>, Option<FittedModel>) {
        match self {
            EngineState::Empty => (None, None),
            EngineState::DataLoaded { data } => (Some(data), None),
            EngineState::ModelTrained { data, model }
            | EngineState::Forecasted { data, model, .. } => (Some(data), Some(model)),
        }
    }
}

/// Trains one model at a time on a loaded dataset and forecasts from it
#[derive(Debug, Clone, Default)]
pub struct ForecastEngine {
    state: EngineState,
}

impl ForecastEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn state_name(&self) -> &'static str {
        self.state.name()
    }

    pub fn model(&self) -> Option<&FittedModel> {
        self.state.model()
    }

    pub fn last_forecast(&self) -> Option<&Forecast> {
        match &self.state {
            EngineState::Forecasted { forecast, .. } => Some(forecast),
            _ => None,
        }
    }

    /// Load a dataset, discarding any model and forecast
    pub fn load(
        &mut self,
        dataset: Dataset,
        date_col: Option<&str>,
        value_col: Option<&str>,
    ) -> Result<()> {
        let data = dataset.indexed(date_col, value_col)?;
        debug!("Forecast engine loaded {} rows", data.height());
        self.state = EngineState::DataLoaded { data };
        Ok(())
    }

    /// Load a dataset from a `.csv`/`.xlsx` file
    pub fn load_path<P: AsRef<Path>>(
        &mut self,
        path: P,
        date_col: Option<&str>,
        value_col: Option<&str>,
    ) -> Result<()> {
        let data = DataLoader::load(path, date_col, value_col)?;
        self.state = EngineState::DataLoaded { data };
        Ok(())
    }

    /// Train a model, replacing any previous model and forecast
    pub fn train(&mut self, spec: ModelSpec) -> Result<&FittedModel> {
        let data = self
            .state
            .data()
            .ok_or_else(|| AnalyticsError::DataAbsent("No data loaded".to_string()))?;
        let column = data.resolve_column(spec.column())?;

        let model = match spec {
            ModelSpec::Arima { order, .. } => {
                let series = data.complete_values(&column)?;
                let model = ArimaModel::new(order.0, order.1, order.2).train(&series)?;
                FittedModel::Arima { column, model }
            }
            ModelSpec::Sarima {
                order,
                seasonal_order,
                ..
            } => {
                let series = data.complete_values(&column)?;
                let model = SarimaModel::new(order, seasonal_order).train(&series)?;
                FittedModel::Sarima { column, model }
            }
            ModelSpec::Linear { features, .. } => {
                let features = match features {
                    Some(features) => features,
                    None => data
                        .numeric_columns()
                        .into_iter()
                        .filter(|name| name != &column)
                        .collect(),
                };
                let feature_values = features
                    .iter()
                    .map(|name| Ok((name.clone(), data.optional_values(name)?)))
                    .collect::<Result<Vec<_>>>()?;
                let target = data.optional_values(&column)?;
                let model = LinearRegression::fit(&column, &target, &feature_values)?;
                FittedModel::Linear { column, model }
            }
        };

        info!("Trained {} on {}", model.name(), model.column());
        let (data, _) = std::mem::take(&mut self.state).into_data_and_model();
        let data = data.ok_or_else(|| AnalyticsError::DataAbsent("No data loaded".to_string()))?;
        self.state = EngineState::ModelTrained { data, model };

        self.state
            .model()
            .ok_or_else(|| AnalyticsError::ModelAbsent("No model trained".to_string()))
    }

    /// Forecast `steps` periods past the end of the training data
    pub fn forecast(&mut self, steps: usize, column: Option<&str>) -> Result<&Forecast> {
        let (data, model) = match (self.state.data(), self.state.model()) {
            (Some(data), Some(model)) => (data, model),
            _ => return Err(AnalyticsError::ModelAbsent("No model trained".to_string())),
        };
        // Linear models never forecast, whatever the arguments
        let values = match model {
            FittedModel::Arima { model: arima, .. } => {
                check_forecast_request(model, steps, column)?;
                arima.forecast(steps)?
            }
            FittedModel::Sarima { model: sarima, .. } => {
                check_forecast_request(model, steps, column)?;
                sarima.forecast(steps)?
            }
            FittedModel::Linear { .. } => {
                return Err(AnalyticsError::NotImplemented(
                    "Forecasting with linear regression is not implemented".to_string(),
                ))
            }
        };

        let forecast = Forecast {
            column: model.column().to_string(),
            model: model.name(),
            index: forecast_index(data, steps),
            values,
        };
        info!("Forecast {} steps of {}", steps, forecast.column);

        let (data, model) = std::mem::take(&mut self.state).into_data_and_model();
        match (data, model) {
            (Some(data), Some(model)) => {
                self.state = EngineState::Forecasted {
                    data,
                    model,
                    forecast,
                };
            }
            _ => return Err(AnalyticsError::ModelAbsent("No model trained".to_string())),
        }

        self.last_forecast()
            .ok_or_else(|| AnalyticsError::ForecastAbsent("No forecast available".to_string()))
    }

    /// Compare the last forecast with observed values of the same length
    pub fn evaluate(&self, truth: &[f64]) -> Result<ForecastMetrics> {
        let forecast = self
            .last_forecast()
            .ok_or_else(|| AnalyticsError::ForecastAbsent("No forecast available".to_string()))?;
        forecast_accuracy(&forecast.values, truth)
    }

    /// Compare the last forecast with the leading non-null values of a test
    /// dataset column
    pub fn evaluate_dataset(&self, test: &Dataset, column: Option<&str>) -> Result<ForecastMetrics> {
        let forecast = self
            .last_forecast()
            .ok_or_else(|| AnalyticsError::ForecastAbsent("No forecast available".to_string()))?;
        let column = test.resolve_column(column)?;
        let truth = test.values(&column)?;
        if truth.len() < forecast.len() {
            return Err(AnalyticsError::InvalidParameter(format!(
                "Test column {} has {} values, forecast has {}",
                column,
                truth.len(),
                forecast.len()
            )));
        }
        forecast_accuracy(&forecast.values, &truth[..forecast.len()])
    }
}

/// Dates after the last indexed date when the spacing is recognisable,
/// otherwise row positions after the last row
fn check_forecast_request(model: &FittedModel, steps: usize, column: Option<&str>) -> Result<()> {
    if steps == 0 {
        return Err(AnalyticsError::InvalidParameter(
            "Steps must be at least 1".to_string(),
        ));
    }
    match column {
        Some(column) if column != model.column() => Err(AnalyticsError::InvalidParameter(format!(
            "Model was trained on {}, not {}",
            model.column(),
            column
        ))),
        _ => Ok(()),
    }
}

fn forecast_index(data: &Dataset, steps: usize) -> ForecastIndex {
    if let Some(dates) = data.dates() {
        match (infer_frequency(dates), dates.last()) {
            (Some(frequency), Some(&last)) => {
                return ForecastIndex::Dates(future_dates(last, frequency, steps));
            }
            _ => warn!("Date index has no regular frequency, forecasting by position"),
        }
    }
    let n = data.height();
    ForecastIndex::Positions((n..n + steps).collect())
}
