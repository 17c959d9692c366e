//! Aggregated rows with anomaly scores attached

use crate::error::Result;
use inventory_data::export::{format_value, write_table};
use inventory_data::{AggregatedFrame, AggregatedRow};
use inventory_math::stats;
use polars::prelude::*;
use std::path::Path;

/// Output column holding the anomaly score
pub const SCORE_COLUMN: &str = "anomaly_score";
/// Output column holding the outlier flag
pub const FLAG_COLUMN: &str = "is_anomaly";

/// One scored row
#[derive(Debug, Clone, Copy)]
pub struct ScoredRow<'a> {
    pub row: &'a AggregatedRow,
    /// Larger is more anomalous; `NaN` for rows that were not scored
    pub anomaly_score: f64,
    pub is_anomaly: bool,
}

/// An [`AggregatedFrame`] plus `anomaly_score` and `is_anomaly` per row
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredFrame {
    frame: AggregatedFrame,
    anomaly_score: Vec<f64>,
    is_anomaly: Vec<bool>,
}

impl ScoredFrame {
    pub(crate) fn new(frame: AggregatedFrame, anomaly_score: Vec<f64>, is_anomaly: Vec<bool>) -> Self {
        debug_assert_eq!(frame.len(), anomaly_score.len());
        debug_assert_eq!(frame.len(), is_anomaly.len());
        Self {
            frame,
            anomaly_score,
            is_anomaly,
        }
    }

    /// The underlying aggregated rows
    pub fn frame(&self) -> &AggregatedFrame {
        &self.frame
    }

    pub fn scores(&self) -> &[f64] {
        &self.anomaly_score
    }

    pub fn flags(&self) -> &[bool] {
        &self.is_anomaly
    }

    pub fn len(&self) -> usize {
        self.frame.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = ScoredRow<'_>> {
        self.frame
            .rows()
            .iter()
            .zip(&self.anomaly_score)
            .zip(&self.is_anomaly)
            .map(|((row, score), flag)| ScoredRow {
                row,
                anomaly_score: *score,
                is_anomaly: *flag,
            })
    }

    /// Rows that received a score
    pub fn scored_count(&self) -> usize {
        stats::count(&self.anomaly_score)
    }

    pub fn anomaly_count(&self) -> usize {
        self.is_anomaly.iter().filter(|f| **f).count()
    }

    /// Flagged rows as a percentage of all rows
    pub fn anomaly_percentage(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.anomaly_count() as f64 / self.len() as f64 * 100.0
        }
    }

    /// Mean score of flagged rows
    pub fn mean_score_flagged(&self) -> f64 {
        self.mean_score_where(true)
    }

    /// Mean score of scored rows that were not flagged
    pub fn mean_score_unflagged(&self) -> f64 {
        self.mean_score_where(false)
    }

    fn mean_score_where(&self, flagged: bool) -> f64 {
        let selected: Vec<f64> = self
            .rows()
            .filter(|r| r.is_anomaly == flagged)
            .map(|r| r.anomaly_score)
            .collect();
        stats::mean(&selected)
    }

    /// Only the flagged rows
    pub fn anomalies(&self) -> ScoredFrame {
        let scores = self
            .rows()
            .filter(|r| r.is_anomaly)
            .map(|r| r.anomaly_score)
            .collect::<Vec<f64>>();
        let flags = vec![true; scores.len()];
        ScoredFrame::new(self.frame.filter_rows(&self.is_anomaly), scores, flags)
    }

    pub fn headers(&self) -> Vec<String> {
        let mut headers = self.frame.headers();
        headers.push(SCORE_COLUMN.to_string());
        headers.push(FLAG_COLUMN.to_string());
        headers
    }

    /// Write all rows as CSV with the score columns appended
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let records = (0..self.len()).map(|i| {
            let mut record = self.frame.record(i);
            record.push(format_value(self.anomaly_score[i]));
            record.push(self.is_anomaly[i].to_string());
            record
        });
        write_table(path, &self.headers(), records)?;
        Ok(())
    }

    /// Convert to a DataFrame for downstream consumers
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let mut df = self.frame.to_dataframe()?;
        let scores: Vec<Option<f64>> = self
            .anomaly_score
            .iter()
            .map(|s| (!s.is_nan()).then_some(*s))
            .collect();
        df.with_column(Series::new(SCORE_COLUMN, scores))
            .map_err(inventory_data::DataError::from)?;
        df.with_column(Series::new(FLAG_COLUMN, self.is_anomaly.clone()))
            .map_err(inventory_data::DataError::from)?;
        Ok(df)
    }
}
