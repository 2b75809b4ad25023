//! Error types for the platform facade

use bi_analytics::AnalyticsError;
use bi_excel::ExcelError;
use polars::prelude::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error(transparent)]
    Analytics(#[from] AnalyticsError),

    #[error(transparent)]
    Excel(#[from] ExcelError),

    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Missing or inconsistent caller input
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<PolarsError> for PlatformError {
    fn from(err: PolarsError) -> Self {
        PlatformError::Analytics(AnalyticsError::from(err))
    }
}

pub type Result<T> = std::result::Result<T, PlatformError>;
