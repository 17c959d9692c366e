//! Run report
//!
//! [`AnomalyReport`] is the document handed to the renderer of the human
//! readable report. It is written as pretty JSON.

use crate::error::Result;
use chrono::{DateTime, Local, NaiveDate, Utc};
use inventory_anomaly::{select_alert_records, AlertRecord, ScoredFrame, Severity, SeverityThresholds};
use inventory_math::stats;
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Products and dates ranked in the report
const RANKED_ENTRIES: usize = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeverityCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
}

/// Anomalies of one product
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductSummary {
    pub product_id: String,
    pub rows: usize,
    pub anomalies: usize,
    pub max_score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateCount {
    pub date: NaiveDate,
    pub anomalies: usize,
}

/// Summary of one scoring run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyReport {
    pub title: String,
    pub generated_at: DateTime<Utc>,
    pub total_records: usize,
    pub scored_records: usize,
    pub anomalies_detected: usize,
    pub anomaly_percentage: f64,
    pub mean_anomaly_score: Option<f64>,
    pub max_anomaly_score: Option<f64>,
    pub severity_counts: SeverityCounts,
    /// Products with the most anomalies
    pub top_products: Vec<ProductSummary>,
    /// Dates with the most anomalies
    pub top_dates: Vec<DateCount>,
    /// Highest scoring anomalies
    pub top_anomalies: Vec<AlertRecord>,
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

impl AnomalyReport {
    pub fn from_scored(
        title: impl Into<String>,
        scored: &ScoredFrame,
        thresholds: &SeverityThresholds,
        top_anomalies: usize,
    ) -> Self {
        let records = select_alert_records(scored, f64::NEG_INFINITY, thresholds);

        let mut severity_counts = SeverityCounts::default();
        for record in &records {
            match record.severity {
                Severity::Critical => severity_counts.critical += 1,
                Severity::High => severity_counts.high += 1,
                Severity::Medium => severity_counts.medium += 1,
            }
        }

        let mut products: BTreeMap<&str, ProductSummary> = BTreeMap::new();
        let mut dates: BTreeMap<NaiveDate, usize> = BTreeMap::new();
        for row in scored.rows() {
            let summary = products
                .entry(row.row.product_id.as_str())
                .or_insert_with(|| ProductSummary {
                    product_id: row.row.product_id.clone(),
                    rows: 0,
                    anomalies: 0,
                    max_score: None,
                });
            summary.rows += 1;
            if row.is_anomaly {
                summary.anomalies += 1;
                summary.max_score = Some(
                    summary
                        .max_score
                        .map_or(row.anomaly_score, |m| m.max(row.anomaly_score)),
                );
                *dates.entry(row.row.date).or_default() += 1;
            }
        }

        // stable sorts keep product and date order among ties
        let mut top_products: Vec<ProductSummary> =
            products.into_values().filter(|p| p.anomalies > 0).collect();
        top_products.sort_by_key(|p| Reverse(p.anomalies));
        top_products.truncate(RANKED_ENTRIES);

        let mut top_dates: Vec<DateCount> = dates
            .into_iter()
            .map(|(date, anomalies)| DateCount { date, anomalies })
            .collect();
        top_dates.sort_by_key(|d| Reverse(d.anomalies));
        top_dates.truncate(RANKED_ENTRIES);

        let scores: Vec<f64> = records.iter().map(|r| r.anomaly_score).collect();
        Self {
            title: title.into(),
            generated_at: Utc::now(),
            total_records: scored.len(),
            scored_records: scored.scored_count(),
            anomalies_detected: scored.anomaly_count(),
            anomaly_percentage: scored.anomaly_percentage(),
            mean_anomaly_score: finite(stats::mean(&scores)),
            max_anomaly_score: finite(stats::max(&scores)),
            severity_counts,
            top_products,
            top_dates,
            top_anomalies: records.into_iter().take(top_anomalies).collect(),
        }
    }

    /// Write to `dir/anomaly_report_{YYYYmmdd_HHMMSS}.json` and return the path
    pub fn write_to_dir<P: AsRef<Path>>(&self, dir: P) -> Result<PathBuf> {
        let stamp = self.generated_at.with_timezone(&Local).format("%Y%m%d_%H%M%S");
        let path = dir.as_ref().join(format!("anomaly_report_{}.json", stamp));
        self.write_json(&path)?;
        Ok(path)
    }

    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
