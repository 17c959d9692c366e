//! End-to-end pipeline run
//!
//! Stages run strictly in order: load, validate, clean, features, aggregate,
//! forecast, anomalies, alerts, report. Every stage reads the full output of
//! the previous one. A fatal error returns immediately and leaves files from
//! earlier stages as they were written.

use crate::config::PipelineConfig;
use crate::delivery::{AlertChannel, AlertMessage, ChannelKind};
use crate::error::Result;
use crate::report::AnomalyReport;
use chrono::Utc;
use inventory_anomaly::{
    alert_title, detect_anomalies_with, format_alert_text, load_model, save_model, score,
    select_alert_records, select_alert_records_by_product, AlertRecord, ScoredFrame,
};
use inventory_data::{
    aggregate_daily_by_item, clean_consumption, validate, AggregatedFrame, CleanedSeries,
    CleaningReport, DataLoader, FeatureFrame, FeatureSelection, InventoryData,
};
use inventory_forecast::{
    forecast_by_product, save_models_by_product, train_models_by_product, write_forecasts_csv,
    AdditiveModel, ForecastFailure,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, info_span, warn};

/// Scored rows, all of them
pub const ANOMALIES_FILE: &str = "anomalies_detected.csv";
/// Scored rows flagged as anomalies
pub const ANOMALIES_ONLY_FILE: &str = "anomalies_only.csv";
pub const FORECAST_FILE: &str = "forecasts.csv";
pub const FEATURES_FILE: &str = "consumption_features.csv";
pub const AGGREGATED_FILE: &str = "daily_aggregated.csv";

/// Per-run switches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Overrides `paths.data_file`
    pub input: Option<PathBuf>,
    pub send_alerts: bool,
    pub send_email: bool,
    pub generate_report: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            input: None,
            send_alerts: true,
            send_email: false,
            generate_report: true,
        }
    }
}

/// Outcome of a successful run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineSummary {
    pub total_records: usize,
    pub data_quality_warnings: usize,
    pub anomalies_detected: usize,
    pub anomaly_percentage: f64,
    pub models_trained: usize,
    pub forecast_failures: Vec<ForecastFailure>,
    /// Saved forecast model per product
    pub forecast_models: BTreeMap<String, PathBuf>,
    /// Delivery success per channel name
    pub alert_results: BTreeMap<String, bool>,
    pub report_path: Option<PathBuf>,
    pub anomalies_file: PathBuf,
    pub anomalies_only_file: Option<PathBuf>,
    pub forecast_file: Option<PathBuf>,
    pub features_file: PathBuf,
    pub model_path: PathBuf,
}

struct ForecastOutcome {
    models_trained: usize,
    failures: Vec<ForecastFailure>,
    forecast_file: Option<PathBuf>,
    model_paths: BTreeMap<String, PathBuf>,
}

/// The inventory pipeline with its alert channels
#[derive(Debug)]
pub struct Pipeline {
    config: PipelineConfig,
    channels: Vec<Box<dyn AlertChannel>>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            channels: Vec::new(),
        })
    }

    /// Add an alert destination
    pub fn with_channel<C: AlertChannel + 'static>(mut self, channel: C) -> Self {
        self.channels.push(Box::new(channel));
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn run(&self, options: &RunOptions) -> Result<PipelineSummary> {
        let config = &self.config;
        let input = options
            .input
            .clone()
            .unwrap_or_else(|| config.paths.data_file.clone());
        let output_dir = &config.paths.output_dir;
        info!(input = %input.display(), "Starting inventory pipeline");

        let data = {
            let _stage = info_span!("stage", name = "load").entered();
            let data = DataLoader::from_csv(&input)?;
            let report = validate(&data, config.validation.min_records)?;
            info!(
                records = report.total_records,
                products = report.product_count,
                start = %report.start_date,
                end = %report.end_date,
                warnings = report.warnings.len(),
                "Loaded and validated input"
            );
            data
        };

        let cleaned = {
            let _stage = info_span!("stage", name = "clean").entered();
            self.clean(&data)?
        };

        let features_file = {
            let _stage = info_span!("stage", name = "features").entered();
            let mut frame = FeatureFrame::from_cleaned("consumption", &cleaned);
            frame.build_features(&config.features, FeatureSelection::lags_only())?;
            let path = output_dir.join(FEATURES_FILE);
            frame.write_csv(&path)?;
            info!(
                rows = frame.len(),
                features = frame.feature_columns().len(),
                "Built lag features"
            );
            path
        };

        let aggregated = {
            let _stage = info_span!("stage", name = "aggregate").entered();
            let aggregated = aggregate_daily_by_item(
                data.observations(),
                config.aggregation.spec.as_ref(),
                config.aggregation.fill_missing_dates,
            )?;
            aggregated.write_csv(output_dir.join(AGGREGATED_FILE))?;
            aggregated
        };

        let ForecastOutcome {
            models_trained,
            failures: forecast_failures,
            forecast_file,
            model_paths: forecast_models,
        } = {
            let _stage = info_span!("stage", name = "forecast").entered();
            self.forecast(&cleaned, output_dir)?
        };

        let (scored, model_path, anomalies_file, anomalies_only_file) = {
            let _stage = info_span!("stage", name = "anomalies").entered();
            self.detect(&aggregated, output_dir)?
        };

        let alert_results = if options.send_alerts {
            let _stage = info_span!("stage", name = "alerts").entered();
            self.send_alerts(&scored, options.send_email)
        } else {
            BTreeMap::new()
        };

        let report_path = if options.generate_report {
            let _stage = info_span!("stage", name = "report").entered();
            let report = AnomalyReport::from_scored(
                config.report.title.clone(),
                &scored,
                &config.severity,
                config.report.top_anomalies,
            );
            let path = report.write_to_dir(&config.paths.reports_dir)?;
            info!(path = %path.display(), "Wrote anomaly report");
            Some(path)
        } else {
            None
        };

        let summary = PipelineSummary {
            total_records: scored.len(),
            data_quality_warnings: data.warnings().len(),
            anomalies_detected: scored.anomaly_count(),
            anomaly_percentage: scored.anomaly_percentage(),
            models_trained,
            forecast_failures,
            forecast_models,
            alert_results,
            report_path,
            anomalies_file,
            anomalies_only_file,
            forecast_file,
            features_file,
            model_path,
        };
        info!(
            total_records = summary.total_records,
            anomalies = summary.anomalies_detected,
            percentage = summary.anomaly_percentage,
            models_trained = summary.models_trained,
            forecast_failures = summary.forecast_failures.len(),
            alerts = ?summary.alert_results,
            "Pipeline finished"
        );
        Ok(summary)
    }

    /// Clean each product's consumption series on its own
    fn clean(&self, data: &InventoryData) -> Result<Vec<CleanedSeries>> {
        let mut cleaned = Vec::new();
        let mut totals = CleaningReport::default();
        for series in data.consumption_series() {
            let (series, report) = clean_consumption(&series, &self.config.cleaning)?;
            totals.absorb(&report);
            cleaned.push(series);
        }
        info!(
            series = cleaned.len(),
            initial_rows = totals.initial_rows,
            negatives = totals.negative_values_replaced,
            clamped = totals.values_clamped,
            outliers = totals.outliers_detected,
            missing_before_fill = totals.missing_before_fill,
            missing_after_fill = totals.missing_after_fill,
            dropped = totals.rows_dropped_missing,
            duplicates = totals.duplicates_removed,
            final_rows = totals.final_rows,
            "Cleaned consumption series"
        );
        Ok(cleaned)
    }

    fn forecast(
        &self,
        cleaned: &[CleanedSeries],
        output_dir: &Path,
    ) -> Result<ForecastOutcome> {
        let forecast = &self.config.forecast;
        let model = AdditiveModel::new(forecast.model.clone())?;
        let batch = train_models_by_product(&model, cleaned);
        let forecasts = forecast_by_product(&batch, forecast.horizon)?;

        let model_paths = if forecast.save_models {
            save_models_by_product(&batch, &self.config.paths.models_dir, forecast.compress_models)?
        } else {
            BTreeMap::new()
        };

        let path = if forecasts.is_empty() {
            None
        } else {
            let path = output_dir.join(FORECAST_FILE);
            write_forecasts_csv(&path, &forecasts)?;
            Some(path)
        };
        info!(
            trained = batch.models_trained(),
            failed = batch.failures.len(),
            rows = forecasts.len(),
            saved = model_paths.len(),
            "Forecast stage complete"
        );
        Ok(ForecastOutcome {
            models_trained: batch.models_trained(),
            failures: batch.failures,
            forecast_file: path,
            model_paths,
        })
    }

    fn detect(
        &self,
        aggregated: &AggregatedFrame,
        output_dir: &Path,
    ) -> Result<(ScoredFrame, PathBuf, PathBuf, Option<PathBuf>)> {
        let anomaly = &self.config.anomaly;
        let (scored, model) = detect_anomalies_with(
            aggregated,
            &anomaly.consumption_column,
            &anomaly.stock_column,
            &anomaly.training,
        )?;

        let model_path = save_model(
            &model,
            self.config.paths.models_dir.join(inventory_anomaly::DEFAULT_MODEL_STEM),
            anomaly.compress_model,
        )?;

        let all_path = output_dir.join(ANOMALIES_FILE);
        scored.write_csv(&all_path)?;

        let only_path = if scored.anomaly_count() > 0 {
            let path = output_dir.join(ANOMALIES_ONLY_FILE);
            scored.anomalies().write_csv(&path)?;
            Some(path)
        } else {
            None
        };

        info!(
            rows = scored.len(),
            scored = scored.scored_count(),
            anomalies = scored.anomaly_count(),
            percentage = scored.anomaly_percentage(),
            model = %model_path.display(),
            "Anomaly stage complete"
        );
        Ok((scored, model_path, all_path, only_path))
    }

    /// Deliver alerts; each channel reports success independently
    fn send_alerts(&self, scored: &ScoredFrame, send_email: bool) -> BTreeMap<String, bool> {
        let alerts = &self.config.alerts;
        let mut results: BTreeMap<String, bool> = self
            .channels
            .iter()
            .map(|c| (c.name().to_string(), false))
            .collect();

        let messages = self.alert_messages(scored);
        if messages.is_empty() {
            info!(
                min_score = alerts.min_anomaly_score,
                "No anomalies above the alert threshold; nothing sent"
            );
            return results;
        }

        for channel in &self.channels {
            if channel.kind() == ChannelKind::Email && !send_email {
                continue;
            }
            let mut delivered = true;
            for message in &messages {
                if let Err(err) = channel.send(message) {
                    warn!(channel = channel.name(), error = %err, "Alert delivery failed");
                    delivered = false;
                }
            }
            results.insert(channel.name().to_string(), delivered);
        }
        info!(results = ?results, messages = messages.len(), "Alerts processed");
        results
    }

    fn alert_messages(&self, scored: &ScoredFrame) -> Vec<AlertMessage> {
        let alerts = &self.config.alerts;
        let thresholds = &self.config.severity;
        let build = |product_id: Option<String>, records: Vec<AlertRecord>| AlertMessage {
            title: alert_title(product_id.as_deref()),
            body: format_alert_text(&records, alerts.max_listed),
            product_id,
            records,
            created_at: Utc::now(),
        };

        if alerts.per_product {
            select_alert_records_by_product(scored, alerts.min_anomaly_score, thresholds)
                .into_iter()
                .map(|(product, records)| build(Some(product), records))
                .collect()
        } else {
            let records = select_alert_records(scored, alerts.min_anomaly_score, thresholds);
            if records.is_empty() {
                Vec::new()
            } else {
                vec![build(None, records)]
            }
        }
    }
}

/// Score a new input file with a previously saved model
///
/// The input is aggregated the way the pipeline aggregates it and scored
/// with the model's own feature columns. Scored rows are written as CSV.
pub fn score_file(
    config: &PipelineConfig,
    model_path: &Path,
    input: &Path,
    output: &Path,
) -> Result<ScoredFrame> {
    let model = load_model(model_path)?;
    let data = DataLoader::from_csv(input)?;
    let aggregated = aggregate_daily_by_item(
        data.observations(),
        config.aggregation.spec.as_ref(),
        config.aggregation.fill_missing_dates,
    )?;
    let scored = score(&model, &aggregated, model.feature_columns())?;
    scored.write_csv(output)?;
    info!(
        rows = scored.len(),
        anomalies = scored.anomaly_count(),
        output = %output.display(),
        "Scored input with saved model"
    );
    Ok(scored)
}
