//! Error types for the bi_excel crate

use polars::prelude::PolarsError;
use thiserror::Error;

/// Errors raised while reading, analysing or writing workbooks
#[derive(Debug, Error)]
pub enum ExcelError {
    /// Error from IO operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The workbook container could not be read or written
    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// A workbook part is not well-formed XML
    #[error("XML error: {0}")]
    Xml(String),

    /// A required workbook part is missing
    #[error("Missing workbook part: {0}")]
    MissingPart(String),

    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    /// File extension or container the reader cannot handle
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Unknown option name (aggregation function and the like)
    #[error("Unsupported configuration: {0}")]
    UnsupportedConfiguration(String),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    Polars(String),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ExcelError>;

impl From<PolarsError> for ExcelError {
    fn from(err: PolarsError) -> Self {
        ExcelError::Polars(err.to_string())
    }
}

impl From<quick_xml::Error> for ExcelError {
    fn from(err: quick_xml::Error) -> Self {
        ExcelError::Xml(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for ExcelError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        ExcelError::Xml(err.to_string())
    }
}
