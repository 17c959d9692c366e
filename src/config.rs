//! Pipeline configuration
//!
//! One immutable [`PipelineConfig`] is built per run and passed by reference
//! to every stage. Every field has a default, so a JSON file only needs the
//! values it overrides.

use crate::error::{PipelineError, Result};
use inventory_anomaly::{SeverityThresholds, TrainingParams, CONSUMPTION_FEATURE, STOCK_FEATURE};
use inventory_data::loader::DEFAULT_MIN_RECORDS;
use inventory_data::{AggregationSpec, CleaningOptions, FeatureConfig};
use inventory_forecast::AdditiveConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Input and output locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub data_file: PathBuf,
    pub output_dir: PathBuf,
    pub models_dir: PathBuf,
    pub reports_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from("data/raw/inventory.csv"),
            output_dir: PathBuf::from("data/processed"),
            models_dir: PathBuf::from("models"),
            reports_dir: PathBuf::from("reports"),
        }
    }
}

impl PathsConfig {
    /// Rebase every path onto `root`
    pub fn rooted_at<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref();
        let defaults = Self::default();
        Self {
            data_file: root.join(defaults.data_file),
            output_dir: root.join(defaults.output_dir),
            models_dir: root.join(defaults.models_dir),
            reports_dir: root.join(defaults.reports_dir),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub min_records: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_records: DEFAULT_MIN_RECORDS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// `None` uses the default consumption and stock statistics
    pub spec: Option<AggregationSpec>,
    pub fill_missing_dates: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub horizon: usize,
    pub model: AdditiveConfig,
    /// Keep one model artifact per product under `paths.models_dir`
    pub save_models: bool,
    pub compress_models: bool,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            horizon: inventory_forecast::batch::DEFAULT_HORIZON,
            model: AdditiveConfig::default(),
            save_models: true,
            compress_models: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyConfig {
    pub training: TrainingParams,
    pub consumption_column: String,
    pub stock_column: String,
    pub compress_model: bool,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            training: TrainingParams::default(),
            consumption_column: CONSUMPTION_FEATURE.to_string(),
            stock_column: STOCK_FEATURE.to_string(),
            compress_model: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Only flagged rows scoring at least this much are alerted
    pub min_anomaly_score: f64,
    /// Rows listed in the alert body
    pub max_listed: usize,
    /// One alert per product instead of a single combined alert
    pub per_product: bool,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            min_anomaly_score: 0.7,
            max_listed: 20,
            per_product: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub title: String,
    /// Anomalies listed in the report
    pub top_anomalies: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: "Inventory Anomaly Report".to_string(),
            top_anomalies: 20,
        }
    }
}

/// Settings for a whole pipeline run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub paths: PathsConfig,
    pub validation: ValidationConfig,
    pub cleaning: CleaningOptions,
    pub features: FeatureConfig,
    pub aggregation: AggregationConfig,
    pub forecast: ForecastConfig,
    pub anomaly: AnomalyConfig,
    pub alerts: AlertConfig,
    pub severity: SeverityThresholds,
    pub report: ReportConfig,
}

impl PipelineConfig {
    /// Read a JSON configuration file and validate it
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        let contamination = self.anomaly.training.contamination;
        if !(contamination > 0.0 && contamination <= 0.5) {
            return Err(PipelineError::Config(format!(
                "anomaly.training.contamination must be in (0, 0.5], got {}",
                contamination
            )));
        }
        if self.anomaly.training.n_estimators == 0 {
            return Err(PipelineError::Config(
                "anomaly.training.n_estimators must be at least 1".to_string(),
            ));
        }
        if self.forecast.horizon == 0 {
            return Err(PipelineError::Config(
                "forecast.horizon must be at least 1".to_string(),
            ));
        }
        if self.validation.min_records == 0 {
            return Err(PipelineError::Config(
                "validation.min_records must be at least 1".to_string(),
            ));
        }
        if self.features.lags.contains(&0) || self.features.windows.contains(&0) {
            return Err(PipelineError::Config(
                "features.lags and features.windows must be positive".to_string(),
            ));
        }
        self.severity
            .validate()
            .map_err(|e| PipelineError::Config(e.to_string()))?;
        Ok(())
    }
}
