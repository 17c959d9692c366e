//! # Inventory Sentinel
//!
//! Batch pipeline over daily per-product inventory data: validation,
//! cleaning, lag features, daily aggregation, per-product consumption
//! forecasts, and anomaly detection with alerts and a run report.
//!
//! The work is split across the workspace crates, re-exported here:
//!
//! - [`inventory_math`]: statistics, rolling windows, least squares
//! - [`inventory_data`]: loading, cleaning, features, aggregation
//! - [`inventory_forecast`]: additive forecasts per product
//! - [`inventory_anomaly`]: isolation forest scoring, severity, alerts, persistence
//!
//! ## Example
//!
//! ```no_run
//! use inventory_sentinel::{LogChannel, Pipeline, PipelineConfig, RunOptions};
//!
//! let pipeline = Pipeline::new(PipelineConfig::default())?.with_channel(LogChannel::default());
//! let summary = pipeline.run(&RunOptions::default())?;
//! println!(
//!     "{} of {} rows flagged ({:.2}%)",
//!     summary.anomalies_detected, summary.total_records, summary.anomaly_percentage
//! );
//! # Ok::<(), inventory_sentinel::PipelineError>(())
//! ```

pub mod config;
pub mod delivery;
pub mod error;
pub mod pipeline;
pub mod report;

pub use config::PipelineConfig;
pub use delivery::{AlertChannel, AlertMessage, ChannelKind, DeliveryError, LogChannel, OutboxChannel};
pub use error::{PipelineError, Result};
pub use pipeline::{score_file, Pipeline, PipelineSummary, RunOptions};
pub use report::AnomalyReport;

pub use inventory_anomaly;
pub use inventory_data;
pub use inventory_forecast;
pub use inventory_math;
