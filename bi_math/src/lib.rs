//! # BI Math
//!
//! Numeric kernels used by the analytics layer.
//! Everything in this crate works on plain `f64` slices (or `Option<f64>`
//! where missing observations matter) and knows nothing about data frames.

use thiserror::Error;

pub mod descriptive;
pub mod moving_averages;
pub mod regression;
pub mod series;
pub mod smoothing;
pub mod stationarity;

pub use descriptive::{mean, median, quantile, sample_std_dev, sample_variance};
pub use moving_averages::{centered_moving_average, rolling_mean, SimpleMovingAverage};
pub use regression::{least_squares, OlsFit};
pub use series::multiply_polynomials;
pub use smoothing::{exponential_smoothing, ExponentialSmoothing};
pub use stationarity::{adf_test, AdfResult};

/// Errors that can occur in numeric calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Singular matrix: {0}")]
    SingularMatrix(String),
}

/// Result type for numeric operations
pub type Result<T> = std::result::Result<T, MathError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MathError::InsufficientData("need 3 values".to_string());
        assert_eq!(
            err.to_string(),
            "Insufficient data for calculation: need 3 values"
        );
    }
}
