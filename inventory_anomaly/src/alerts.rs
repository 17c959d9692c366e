//! Alert payload selection and plain-text rendering
//!
//! Selection keeps flagged rows at or above a minimum score, most anomalous
//! first. Delivery of the rendered text is left to the caller.

use crate::engine::{CONSUMPTION_FEATURE, STOCK_FEATURE};
use crate::scored::ScoredFrame;
use crate::severity::{classify_severity, Severity, SeverityThresholds};
use chrono::NaiveDate;
use inventory_math::stats;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt::Write;

const RULE_WIDTH: usize = 60;
const ITEM_RULE_WIDTH: usize = 40;

/// One alert-worthy row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertRecord {
    pub product_id: String,
    pub date: NaiveDate,
    /// `NaN` when the consumption aggregate is absent
    pub consumption: f64,
    /// `NaN` when the stock aggregate is absent
    pub stock: f64,
    pub anomaly_score: f64,
    pub severity: Severity,
}

/// Flagged rows with `anomaly_score >= min_score`, highest score first
///
/// Ties keep their row order (product, then date).
pub fn select_alert_records(
    scored: &ScoredFrame,
    min_score: f64,
    thresholds: &SeverityThresholds,
) -> Vec<AlertRecord> {
    let frame = scored.frame();
    let consumption_idx = frame.column_index(CONSUMPTION_FEATURE);
    let stock_idx = frame.column_index(STOCK_FEATURE);
    let lookup = |values: &[f64], idx: Option<usize>| idx.map_or(f64::NAN, |i| values[i]);

    let mut records: Vec<AlertRecord> = scored
        .rows()
        .filter(|r| r.is_anomaly && r.anomaly_score >= min_score)
        .map(|r| AlertRecord {
            product_id: r.row.product_id.clone(),
            date: r.row.date,
            consumption: lookup(&r.row.values, consumption_idx),
            stock: lookup(&r.row.values, stock_idx),
            anomaly_score: r.anomaly_score,
            severity: classify_severity(r.anomaly_score, thresholds),
        })
        .collect();

    records.sort_by(|a, b| {
        b.anomaly_score
            .partial_cmp(&a.anomaly_score)
            .unwrap_or(Ordering::Equal)
    });
    records
}

/// [`select_alert_records`] grouped by product
pub fn select_alert_records_by_product(
    scored: &ScoredFrame,
    min_score: f64,
    thresholds: &SeverityThresholds,
) -> BTreeMap<String, Vec<AlertRecord>> {
    let mut grouped: BTreeMap<String, Vec<AlertRecord>> = BTreeMap::new();
    for record in select_alert_records(scored, min_score, thresholds) {
        grouped
            .entry(record.product_id.clone())
            .or_default()
            .push(record);
    }
    grouped
}

/// Subject line for an alert about `records`
pub fn alert_title(product_id: Option<&str>) -> String {
    match product_id {
        Some(product) => format!("Anomaly Alert - {}", product),
        None => "Anomaly Alert".to_string(),
    }
}

/// Render the plain-text alert body, listing at most `max_listed` records
///
/// `records` are expected in the order returned by [`select_alert_records`].
pub fn format_alert_text(records: &[AlertRecord], max_listed: usize) -> String {
    if records.is_empty() {
        return "No anomalies detected.".to_string();
    }

    let rule = "=".repeat(RULE_WIDTH);
    let thin = "-".repeat(RULE_WIDTH);
    let total = records.len();
    let scores: Vec<f64> = records.iter().map(|r| r.anomaly_score).collect();

    // writeln! into a String cannot fail
    let mut out = String::new();
    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "ALERT: {} ANOMALY(IES) DETECTED", total);
    let _ = writeln!(out, "{}\n", rule);
    let _ = writeln!(out, "Statistics:");
    let _ = writeln!(out, "  - Mean score: {:.4}", stats::mean(&scores));
    let _ = writeln!(out, "  - Max score: {:.4}", stats::max(&scores));
    let _ = writeln!(out, "\n{}", thin);
    let _ = writeln!(out, "ANOMALY DETAILS:");
    let _ = writeln!(out, "{}\n", thin);

    for (i, record) in records.iter().take(max_listed).enumerate() {
        let _ = writeln!(out, "[{}] Anomaly detected", i + 1);
        let _ = writeln!(out, "{}", "-".repeat(ITEM_RULE_WIDTH));
        let _ = writeln!(out, "  Date: {}", record.date.format("%Y-%m-%d"));
        let _ = writeln!(out, "  Product: {}", record.product_id);
        if !record.consumption.is_nan() {
            let _ = writeln!(out, "  Consumption: {:.2}", record.consumption);
        }
        if !record.stock.is_nan() {
            let _ = writeln!(out, "  Stock: {:.2}", record.stock);
        }
        let _ = writeln!(
            out,
            "  Score: {:.4} ({})\n",
            record.anomaly_score, record.severity
        );
    }

    if total > max_listed {
        let _ = writeln!(out, "... and {} more not listed.", total - max_listed);
    }
    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "Total: {} anomaly(ies) detected", total);
    out.push_str(&rule);
    out
}
