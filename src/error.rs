//! Error types for the inventory_sentinel crate

use thiserror::Error;

/// Errors that halt a pipeline run
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error from loading, validating or transforming the input
    #[error(transparent)]
    Data(#[from] inventory_data::DataError),

    /// Error from the forecasting stage
    #[error(transparent)]
    Forecast(#[from] inventory_forecast::ForecastError),

    /// Error from anomaly detection or model persistence
    #[error(transparent)]
    Anomaly(#[from] inventory_anomaly::AnomalyError),

    /// Error from numeric helpers
    #[error(transparent)]
    Math(#[from] inventory_math::MathError),

    /// Error from IO operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from JSON encoding or decoding
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, PipelineError>;
