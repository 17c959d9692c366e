//! # Inventory Forecast
//!
//! Short-horizon consumption forecasts, one independent model per product.
//!
//! ## Quick Start
//!
//! ```no_run
//! use inventory_data::{clean_consumption, CleaningOptions, DataLoader};
//! use inventory_forecast::{forecast_7_days_by_product, AdditiveModel};
//!
//! let data = DataLoader::from_csv("inventory.csv")?;
//! let cleaned = data
//!     .consumption_series()
//!     .iter()
//!     .map(|s| clean_consumption(s, &CleaningOptions::default()).map(|(c, _)| c))
//!     .collect::<Result<Vec<_>, _>>()?;
//!
//! let (batch, forecasts) = forecast_7_days_by_product(&AdditiveModel::default(), &cleaned)?;
//! println!("{} models, {} forecast rows", batch.models_trained(), forecasts.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod batch;
pub mod error;
pub mod metrics;
pub mod models;
pub mod persistence;

pub use batch::{
    forecast_7_days_by_product, forecast_by_product, train_models_by_product,
    write_forecasts_csv, ForecastBatch, ForecastFailure, ProductForecast,
};
pub use error::{ForecastError, Result};
pub use metrics::{evaluate, forecast_accuracy, ForecastAccuracy};
pub use models::additive::{AdditiveConfig, AdditiveModel, TrainedAdditiveModel};
pub use models::{Forecast, ForecastModel, ForecastPoint, TrainedForecastModel};
pub use persistence::{
    forecast_model_path, load_forecast_artifact, load_forecast_model, load_models_by_product,
    save_forecast_model, save_models_by_product, ForecastArtifact,
};
