//! Error types for the inventory_forecast crate

use thiserror::Error;

/// Errors raised while fitting or applying forecast models
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Too few observations to fit a model
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error related to forecasting operations
    #[error("Forecasting error: {0}")]
    ForecastingError(String),

    /// No saved model at the given path
    #[error("Not found: {0}")]
    NotFound(String),

    /// A saved model could not be encoded or decoded
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Saved by a newer release
    #[error("Unsupported model artifact version {found} (max supported {max_supported})")]
    UnsupportedVersion { found: u32, max_supported: u32 },

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from numeric helpers
    #[error("Math error: {0}")]
    Math(#[from] inventory_math::MathError),

    /// Error from data handling
    #[error("Data error: {0}")]
    Data(#[from] inventory_data::DataError),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;
