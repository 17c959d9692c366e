//! Error types for the inventory_anomaly crate

use thiserror::Error;

/// Errors raised while training, scoring or persisting anomaly models
#[derive(Debug, Error)]
pub enum AnomalyError {
    /// Feature columns absent from the data, or no row with complete features
    #[error("Data error: {0}")]
    DataError(String),

    /// Scoring with a column list different from the one the model was trained on
    #[error("Feature mismatch: model expects {expected:?}, got {found:?}")]
    FeatureMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// No model artifact at the requested path or its compressed alternative
    #[error("Model not found: {0}")]
    NotFound(String),

    /// Encoding or decoding a model artifact failed
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Artifact written by a newer format version
    #[error("Unsupported model artifact version: {found} (max supported: {max_supported})")]
    UnsupportedVersion { found: u32, max_supported: u32 },

    /// Error from IO operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from numeric helpers
    #[error("Math error: {0}")]
    Math(#[from] inventory_math::MathError),

    /// Error from tabular export
    #[error("Export error: {0}")]
    Export(#[from] inventory_data::DataError),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, AnomalyError>;
