//! Error types for the bi_analytics crate

use bi_excel::ExcelError;
use bi_math::MathError;
use polars::prelude::PolarsError;
use thiserror::Error;

/// Custom error types for the bi_analytics crate
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// An operation ran before any dataset was loaded
    #[error("No data loaded: {0}")]
    DataAbsent(String),

    /// Forecast requested before a model was trained
    #[error("No trained model: {0}")]
    ModelAbsent(String),

    /// Evaluation requested before a forecast was produced
    #[error("No forecast available: {0}")]
    ForecastAbsent(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Unknown method, model type or option value
    #[error("Unsupported configuration: {0}")]
    UnsupportedConfiguration(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Error related to data validation or processing
    #[error("Data error: {0}")]
    DataError(String),

    /// Error from mathematical operations
    #[error("Math error: {0}")]
    Math(MathError),

    #[error("Excel error: {0}")]
    Excel(ExcelError),

    /// Error from IO operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    Polars(String),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, AnalyticsError>;

impl From<PolarsError> for AnalyticsError {
    fn from(err: PolarsError) -> Self {
        AnalyticsError::Polars(err.to_string())
    }
}

impl From<MathError> for AnalyticsError {
    fn from(err: MathError) -> Self {
        match err {
            MathError::InsufficientData(msg) => AnalyticsError::InsufficientData(msg),
            other => AnalyticsError::Math(other),
        }
    }
}

impl From<ExcelError> for AnalyticsError {
    fn from(err: ExcelError) -> Self {
        match err {
            ExcelError::UnsupportedFormat(msg) => AnalyticsError::UnsupportedFormat(msg),
            ExcelError::UnsupportedConfiguration(msg) => {
                AnalyticsError::UnsupportedConfiguration(msg)
            }
            ExcelError::ColumnNotFound(name) => AnalyticsError::ColumnNotFound(name),
            ExcelError::Io(e) => AnalyticsError::Io(e),
            other => AnalyticsError::Excel(other),
        }
    }
}
