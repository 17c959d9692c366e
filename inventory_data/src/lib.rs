//! # Inventory Data
//!
//! Typed access to daily inventory observations and the transformations
//! applied before forecasting and anomaly detection.
//!
//! ## Features
//!
//! - Loading from CSV or a polars `DataFrame`, with schema checks and
//!   data-quality warnings
//! - Cleaning of consumption series (negative values, clamping, outliers,
//!   gap filling, duplicate dates)
//! - Lag, rolling-window and calendar features
//! - Daily per-product aggregation with optional date-gap filling
//!
//! ## Quick Start
//!
//! ```no_run
//! use inventory_data::{aggregate_daily_by_item, validate, DataLoader};
//!
//! let data = DataLoader::from_csv("inventory.csv")?;
//! let report = validate(&data, 30)?;
//! println!("{} records, {} products", report.total_records, report.product_count);
//!
//! let daily = aggregate_daily_by_item(data.observations(), None, false)?;
//! println!("{} aggregated rows", daily.len());
//! # Ok::<(), inventory_data::DataError>(())
//! ```

pub mod aggregator;
pub mod cleaner;
pub mod error;
pub mod export;
pub mod features;
pub mod loader;
pub mod observation;

pub use aggregator::{
    aggregate_daily_by_item, aggregate_dataframe, AggFunc, AggregatedFrame, AggregatedRow,
    AggregationEntry, AggregationSpec,
};
pub use cleaner::{
    clean_consumption, CleanedSeries, CleaningOptions, CleaningReport, FillMethod, OutlierMethod,
};
pub use error::{DataError, Result};
pub use features::{FeatureConfig, FeatureFrame, FeatureRow, FeatureSelection};
pub use loader::{validate, DataLoader, DataQualityWarning, InventoryData, ValidationReport};
pub use observation::{ConsumptionSeries, RawObservation, SeriesPoint};
