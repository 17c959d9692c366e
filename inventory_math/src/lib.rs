//! # Inventory Math
//!
//! Numeric building blocks shared by the inventory pipeline crates.
//! Missing values are represented as `f64::NAN` throughout and are skipped
//! by every statistic in this crate.

use thiserror::Error;

pub mod regression;
pub mod rolling;
pub mod stats;

pub use regression::{solve_least_squares, LinearRegression};
pub use rolling::{rolling_apply, RollingStat, RollingWindow};

/// Errors that can occur in numeric calculations
#[derive(Error, Debug)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),
}

/// Result type for numeric operations
pub type Result<T> = std::result::Result<T, MathError>;
