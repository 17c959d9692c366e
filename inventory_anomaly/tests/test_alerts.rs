mod common;

use common::synthetic_frame;
use inventory_anomaly::{
    classify_severity, detect_anomalies, format_alert_text, select_alert_records,
    select_alert_records_by_product, SeverityThresholds, CONSUMPTION_FEATURE, STOCK_FEATURE,
};
use pretty_assertions::assert_eq;

#[test]
fn test_records_are_flagged_rows_sorted_by_score() {
    let frame = synthetic_frame(3, 180, 4);
    let (scored, _) = detect_anomalies(&frame, CONSUMPTION_FEATURE, STOCK_FEATURE, 0.1).unwrap();
    let thresholds = SeverityThresholds::default();

    let all = select_alert_records(&scored, 0.0, &thresholds);
    assert_eq!(all.len(), scored.anomaly_count());
    assert!(all.windows(2).all(|w| w[0].anomaly_score >= w[1].anomaly_score));
    for record in &all {
        assert_eq!(record.severity, classify_severity(record.anomaly_score, &thresholds));
        assert!(!record.consumption.is_nan());
        assert!(!record.stock.is_nan());
    }

    let strong = select_alert_records(&scored, 0.6, &thresholds);
    assert!(strong.iter().all(|r| r.anomaly_score >= 0.6));
    assert_eq!(
        strong.len(),
        all.iter().filter(|r| r.anomaly_score >= 0.6).count()
    );
}

#[test]
fn test_grouped_by_product() {
    let frame = synthetic_frame(3, 180, 4);
    let (scored, _) = detect_anomalies(&frame, CONSUMPTION_FEATURE, STOCK_FEATURE, 0.1).unwrap();
    let thresholds = SeverityThresholds::default();

    let grouped = select_alert_records_by_product(&scored, 0.0, &thresholds);
    let total: usize = grouped.values().map(Vec::len).sum();
    assert_eq!(total, scored.anomaly_count());
    for (product, records) in &grouped {
        assert!(records.iter().all(|r| &r.product_id == product));
    }
}

#[test]
fn test_text_for_selected_records() {
    let frame = synthetic_frame(2, 120, 8);
    let (scored, _) = detect_anomalies(&frame, CONSUMPTION_FEATURE, STOCK_FEATURE, 0.1).unwrap();
    let records = select_alert_records(&scored, 0.0, &SeverityThresholds::default());

    let text = format_alert_text(&records, 5);
    assert!(text.starts_with(&"=".repeat(60)));
    assert!(text.contains(&format!("ALERT: {} ANOMALY(IES) DETECTED", records.len())));
    assert!(text.contains(&format!("Product: {}", records[0].product_id)));
    assert!(text.contains(&format!("... and {} more not listed.", records.len() - 5)));
}
