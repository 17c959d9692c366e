//! Error types for the inventory_data crate

use polars::prelude::PolarsError;
use thiserror::Error;

/// Errors raised while loading, validating and transforming inventory data
#[derive(Debug, Error)]
pub enum DataError {
    /// Missing required columns, empty input or rows that cannot be coerced
    #[error("Schema error: {0}")]
    SchemaError(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// A requested product or column does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Error from numeric helpers
    #[error("Math error: {0}")]
    Math(#[from] inventory_math::MathError),

    /// Error from IO operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    Polars(String),

    /// Error while writing delimited output
    #[error("CSV error: {0}")]
    Csv(String),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, DataError>;

impl From<PolarsError> for DataError {
    fn from(err: PolarsError) -> Self {
        DataError::Polars(err.to_string())
    }
}

impl From<csv::Error> for DataError {
    fn from(err: csv::Error) -> Self {
        DataError::Csv(err.to_string())
    }
}
