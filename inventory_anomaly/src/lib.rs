//! # Inventory Anomaly
//!
//! Unsupervised anomaly detection over daily per-product inventory
//! aggregates.
//!
//! ## Features
//!
//! - Isolation forest trained on the complete rows of an aggregated frame
//! - Scores where larger means more anomalous, with an outlier flag
//!   calibrated to the expected contamination
//! - Severity classification and alert record selection
//! - Model persistence with optional gzip compression
//!
//! ## Quick Start
//!
//! ```no_run
//! use inventory_anomaly::{detect_anomalies, save_model, CONSUMPTION_FEATURE, STOCK_FEATURE};
//! use inventory_data::{aggregate_daily_by_item, DataLoader};
//!
//! let data = DataLoader::from_csv("inventory.csv")?;
//! let daily = aggregate_daily_by_item(data.observations(), None, false)?;
//!
//! let (scored, model) = detect_anomalies(&daily, CONSUMPTION_FEATURE, STOCK_FEATURE, 0.1)?;
//! println!("{} anomalies ({:.1}%)", scored.anomaly_count(), scored.anomaly_percentage());
//!
//! save_model(&model, "models/", true)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod alerts;
pub mod engine;
pub mod error;
pub mod forest;
pub mod persistence;
pub mod scored;
pub mod severity;

pub use alerts::{
    alert_title, format_alert_text, select_alert_records, select_alert_records_by_product,
    AlertRecord,
};
pub use engine::{
    detect_anomalies, detect_anomalies_with, score, train, AnomalyModel, TrainingParams,
    CONSUMPTION_FEATURE, STOCK_FEATURE,
};
pub use error::{AnomalyError, Result};
pub use forest::{ForestParams, IsolationForest};
pub use persistence::{
    artifact_path, load_artifact, load_model, save_model, ModelArtifact, DEFAULT_MODEL_STEM,
    MODEL_ARTIFACT_VERSION,
};
pub use scored::{ScoredFrame, ScoredRow, FLAG_COLUMN, SCORE_COLUMN};
pub use severity::{classify_severity, Severity, SeverityThresholds};
