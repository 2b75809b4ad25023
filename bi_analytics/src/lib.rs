//! # BI Analytics
//!
//! Business analytics over tabular data: KPIs, trend analysis and
//! time-series forecasting.
//!
//! ## Features
//!
//! - Loading csv and xlsx files into a [`Dataset`], optionally indexed by date
//! - Period KPIs (revenue growth, acquisition cost, lifetime value, conversion, churn)
//! - Trend analysis (decomposition, ADF stationarity, smoothing, outliers)
//! - ARIMA and SARIMA forecasting through a stateful [`ForecastEngine`]
//! - Forecast accuracy metrics and data quality rules
//!
//! ## Quick Start
//!
//! ```no_run
//! use bi_analytics::{DataLoader, ForecastEngine, ModelSpec};
//!
//! let data = DataLoader::load("sales.csv", Some("date"), Some("revenue"))?;
//!
//! let mut engine = ForecastEngine::new();
//! engine.load(data, None, None)?;
//! engine.train(ModelSpec::arima(None))?;
//!
//! let forecast = engine.forecast(12, None)?;
//! println!("{:?}", forecast.values);
//! # Ok::<(), bi_analytics::AnalyticsError>(())
//! ```

pub mod data;
pub mod engine;
pub mod error;
pub mod kpi;
pub mod metrics;
pub mod models;
pub mod quality;
pub mod trend;
pub mod utils;

// Re-export commonly used types
pub use crate::data::{DataLoader, Dataset, DateIndex};
pub use crate::engine::{
    EngineState, FittedModel, Forecast, ForecastEngine, ForecastIndex, ModelSpec,
};
pub use crate::error::{AnalyticsError, Result};
pub use crate::kpi::KpiCalculator;
pub use crate::metrics::{forecast_accuracy, ForecastMetrics};
pub use crate::models::sarima::SeasonalOrder;
pub use crate::models::{ForecastModel, TrainedForecastModel};
pub use crate::quality::{DataQualityChecker, QualityReport, QualityRule};
pub use crate::trend::{TrendAnalyzer, TrendConfig, TrendReport};
pub use crate::utils::Frequency;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
