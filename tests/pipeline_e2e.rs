mod common;

use common::{start, write_inventory_csv};
use inventory_sentinel::config::PathsConfig;
use inventory_sentinel::inventory_data::{validate, DataError, DataLoader};
use inventory_sentinel::{
    score_file, AlertChannel, AlertMessage, ChannelKind, DeliveryError, OutboxChannel, Pipeline,
    PipelineConfig, PipelineError, RunOptions,
};
use approx::assert_relative_eq;
use inventory_sentinel::inventory_forecast::{load_forecast_model, TrainedAdditiveModel};
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::fs;
use std::io::Write;
use std::path::Path;

fn config_in(root: &Path) -> PipelineConfig {
    let mut config = PipelineConfig {
        paths: PathsConfig::rooted_at(root),
        ..Default::default()
    };
    config.alerts.min_anomaly_score = 0.0;
    config
}

#[derive(Debug)]
struct FailingChannel;

impl AlertChannel for FailingChannel {
    fn name(&self) -> &str {
        "unreachable"
    }

    fn send(&self, _message: &AlertMessage) -> Result<(), DeliveryError> {
        Err(DeliveryError::Transport("connection refused".to_string()))
    }
}

#[test]
fn test_full_run_writes_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    write_inventory_csv(&config.paths.data_file, 3, 120, 17);

    let outbox = dir.path().join("outbox").join("webhook.jsonl");
    let pipeline = Pipeline::new(config.clone())
        .unwrap()
        .with_channel(OutboxChannel::new("webhook", ChannelKind::Webhook, &outbox))
        .with_channel(OutboxChannel::new(
            "email",
            ChannelKind::Email,
            dir.path().join("outbox").join("email.jsonl"),
        ));
    let summary = pipeline.run(&RunOptions::default()).unwrap();

    assert_eq!(summary.total_records, 360);
    assert_eq!(summary.models_trained, 3);
    assert!(summary.forecast_failures.is_empty());
    assert!(summary.anomalies_detected > 0);
    let expected_pct = summary.anomalies_detected as f64 / 360.0 * 100.0;
    assert_relative_eq!(summary.anomaly_percentage, expected_pct, epsilon = 1e-9);

    // one saved forecast model per product, next to the anomaly model
    assert_eq!(
        summary.forecast_models.keys().cloned().collect::<Vec<_>>(),
        vec!["SKU-01", "SKU-02", "SKU-03"]
    );
    for path in summary.forecast_models.values() {
        assert_eq!(path.parent(), Some(config.paths.models_dir.as_path()));
        let _: TrainedAdditiveModel = load_forecast_model(path).unwrap();
    }

    // scored CSV agrees with the summary
    let scored = fs::read_to_string(&summary.anomalies_file).unwrap();
    assert_eq!(scored.lines().count(), 361);
    let flagged = scored.lines().skip(1).filter(|l| l.ends_with(",true")).count();
    assert_eq!(flagged, summary.anomalies_detected);

    let only = summary.anomalies_only_file.as_ref().unwrap();
    assert_eq!(fs::read_to_string(only).unwrap().lines().count(), flagged + 1);

    let forecasts = fs::read_to_string(summary.forecast_file.as_ref().unwrap()).unwrap();
    assert_eq!(forecasts.lines().count(), 3 * 7 + 1);
    assert!(summary.features_file.is_file());

    assert!(summary.model_path.is_file());
    assert!(summary.model_path.to_string_lossy().ends_with("isolation_forest_model.iforest.gz"));

    // webhook delivered, email not requested
    assert_eq!(summary.alert_results.get("webhook"), Some(&true));
    assert_eq!(summary.alert_results.get("email"), Some(&false));
    assert_eq!(fs::read_to_string(&outbox).unwrap().lines().count(), 1);
    assert!(!dir.path().join("outbox").join("email.jsonl").exists());

    let report_path = summary.report_path.as_ref().unwrap();
    let name = report_path.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("anomaly_report_") && name.ends_with(".json"));
    let report: serde_json::Value = serde_json::from_str(&fs::read_to_string(report_path).unwrap()).unwrap();
    assert_eq!(report["anomalies_detected"], summary.anomalies_detected);
    assert_eq!(report["total_records"], 360);
    let severities = &report["severity_counts"];
    let severity_total = severities["critical"].as_u64().unwrap()
        + severities["high"].as_u64().unwrap()
        + severities["medium"].as_u64().unwrap();
    assert_eq!(severity_total as usize, summary.anomalies_detected);
}

#[test]
fn test_failed_channel_does_not_stop_others() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    write_inventory_csv(&config.paths.data_file, 2, 90, 5);

    let outbox = dir.path().join("webhook.jsonl");
    let pipeline = Pipeline::new(config)
        .unwrap()
        .with_channel(FailingChannel)
        .with_channel(OutboxChannel::new("webhook", ChannelKind::Webhook, &outbox));
    let summary = pipeline.run(&RunOptions::default()).unwrap();

    assert_eq!(summary.alert_results.get("unreachable"), Some(&false));
    assert_eq!(summary.alert_results.get("webhook"), Some(&true));
    assert!(summary.report_path.unwrap().is_file());
}

#[rstest]
#[case(false, false)]
#[case(true, false)]
#[case(false, true)]
fn test_switches_skip_alerts_and_report(#[case] send_alerts: bool, #[case] generate_report: bool) {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    write_inventory_csv(&config.paths.data_file, 1, 60, 9);

    let outbox = dir.path().join("webhook.jsonl");
    let pipeline = Pipeline::new(config.clone())
        .unwrap()
        .with_channel(OutboxChannel::new("webhook", ChannelKind::Webhook, &outbox));
    let summary = pipeline
        .run(&RunOptions {
            send_alerts,
            generate_report,
            ..Default::default()
        })
        .unwrap();

    assert_eq!(summary.alert_results.is_empty(), !send_alerts);
    assert_eq!(outbox.exists(), send_alerts);
    assert_eq!(summary.report_path.is_some(), generate_report);
    assert_eq!(config.paths.reports_dir.exists(), generate_report);
}

#[test]
fn test_forecast_models_can_be_left_unsaved() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config_in(dir.path());
    config.forecast.save_models = false;
    write_inventory_csv(&config.paths.data_file, 2, 60, 4);

    let summary = Pipeline::new(config)
        .unwrap()
        .run(&RunOptions {
            send_alerts: false,
            generate_report: false,
            ..Default::default()
        })
        .unwrap();
    assert_eq!(summary.models_trained, 2);
    assert!(summary.forecast_models.is_empty());
}

#[test]
fn test_single_row_input_fails_validation_without_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    fs::create_dir_all(config.paths.data_file.parent().unwrap()).unwrap();
    fs::write(
        &config.paths.data_file,
        "date,product_id,stock,consumption\n2024-01-01,SKU-01,100,5\n",
    )
    .unwrap();

    let result = Pipeline::new(config.clone()).unwrap().run(&RunOptions::default());
    assert!(matches!(
        result,
        Err(PipelineError::Data(DataError::SchemaError(_)))
    ));
    assert!(!config.paths.output_dir.exists());
    assert!(!config.paths.models_dir.exists());
}

#[test]
fn test_thirty_five_rows_validate_without_warnings() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("small.csv");
    let mut file = fs::File::create(&path).unwrap();
    writeln!(file, "date,product_id,stock,consumption").unwrap();
    for d in 0..35 {
        writeln!(
            file,
            "{},SKU-01,{},{}",
            start() + chrono::Duration::days(d),
            200 - d,
            3 + d % 4
        )
        .unwrap();
    }
    drop(file);

    let data = DataLoader::from_csv(&path).unwrap();
    let report = validate(&data, 30).unwrap();
    assert_eq!(report.total_records, 35);
    assert!(report.warnings.is_empty());
}

#[test]
fn test_missing_column_is_schema_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    fs::create_dir_all(config.paths.data_file.parent().unwrap()).unwrap();
    fs::write(&config.paths.data_file, "date,product_id,stock\n2024-01-01,SKU-01,100\n").unwrap();

    let result = Pipeline::new(config).unwrap().run(&RunOptions::default());
    assert!(matches!(
        result,
        Err(PipelineError::Data(DataError::SchemaError(_)))
    ));
}

#[test]
fn test_saved_model_rescores_the_same_input() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    write_inventory_csv(&config.paths.data_file, 2, 100, 23);

    let summary = Pipeline::new(config.clone())
        .unwrap()
        .run(&RunOptions {
            send_alerts: false,
            generate_report: false,
            ..Default::default()
        })
        .unwrap();

    let output = dir.path().join("rescored.csv");
    let scored = score_file(&config, &summary.model_path, &config.paths.data_file, &output).unwrap();
    assert_eq!(scored.anomaly_count(), summary.anomalies_detected);
    assert_eq!(
        fs::read_to_string(&output).unwrap(),
        fs::read_to_string(&summary.anomalies_file).unwrap()
    );
}

#[test]
fn test_invalid_config_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pipeline.json");
    fs::write(&path, r#"{ "anomaly": { "training": { "contamination": 0.9 } } }"#).unwrap();
    assert!(matches!(
        PipelineConfig::from_json_file(&path),
        Err(PipelineError::Config(_))
    ));
}
