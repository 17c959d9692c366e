//! Lag, rolling-window and calendar features
//!
//! A [`FeatureFrame`] is a time-ordered sequence of `(group, date, value)`
//! rows with derived feature columns attached. When rows carry a group key
//! the frame is ordered by `(group, date)` and lags and windows restart at
//! each group boundary.

use crate::cleaner::CleanedSeries;
use crate::error::{DataError, Result};
use crate::export::{format_value, write_table};
use chrono::{Datelike, NaiveDate};
use inventory_math::{rolling_apply, RollingStat};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::ops::Range;
use std::path::Path;

/// Names of the calendar columns, in the order they are added
pub const TEMPORAL_COLUMNS: [&str; 13] = [
    "year",
    "month",
    "day",
    "day_of_week",
    "day_of_year",
    "week_of_year",
    "quarter",
    "month_sin",
    "month_cos",
    "day_of_week_sin",
    "day_of_week_cos",
    "day_of_year_sin",
    "day_of_year_cos",
];

/// One input row of a feature frame
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub group: Option<String>,
    pub date: NaiveDate,
    pub value: f64,
}

/// Lag and window settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    pub lags: Vec<usize>,
    pub windows: Vec<usize>,
    pub rolling_stats: Vec<RollingStat>,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            lags: vec![1, 7, 30],
            windows: vec![7, 30],
            rolling_stats: vec![
                RollingStat::Mean,
                RollingStat::Std,
                RollingStat::Min,
                RollingStat::Max,
            ],
        }
    }
}

/// Which feature families [`FeatureFrame::build_features`] adds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSelection {
    pub lags: bool,
    pub rolling: bool,
    pub temporal: bool,
}

impl FeatureSelection {
    pub fn all() -> Self {
        Self {
            lags: true,
            rolling: true,
            temporal: true,
        }
    }

    pub fn lags_only() -> Self {
        Self {
            lags: true,
            rolling: false,
            temporal: false,
        }
    }
}

impl Default for FeatureSelection {
    fn default() -> Self {
        Self::all()
    }
}

/// Time-ordered rows with derived feature columns
#[derive(Debug, Clone)]
pub struct FeatureFrame {
    value_name: String,
    rows: Vec<FeatureRow>,
    columns: Vec<(String, Vec<f64>)>,
}

impl FeatureFrame {
    /// Build a frame, ordering rows by `(group, date)`
    pub fn new(value_name: impl Into<String>, mut rows: Vec<FeatureRow>) -> Self {
        rows.sort_by(|a, b| a.group.cmp(&b.group).then(a.date.cmp(&b.date)));
        Self {
            value_name: value_name.into(),
            rows,
            columns: Vec::new(),
        }
    }

    /// Frame over cleaned series, grouped by their product keys
    pub fn from_cleaned(value_name: impl Into<String>, series: &[CleanedSeries]) -> Self {
        let rows = series
            .iter()
            .flat_map(|s| {
                s.points().iter().map(move |p| FeatureRow {
                    group: s.product_id().map(str::to_string),
                    date: p.date,
                    value: p.value,
                })
            })
            .collect();
        Self::new(value_name, rows)
    }

    pub fn value_name(&self) -> &str {
        &self.value_name
    }

    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Names of the derived columns, in insertion order
    pub fn feature_columns(&self) -> Vec<&str> {
        self.columns.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, values)| values.as_slice())
    }

    /// Add `{value}_lag_{k}` for every `k`; undefined leading lags are `NaN`
    pub fn add_lag_features(&mut self, lags: &[usize]) -> Result<()> {
        if lags.contains(&0) {
            return Err(DataError::InvalidParameter(
                "Lag periods must be greater than zero".to_string(),
            ));
        }

        let ranges = self.group_ranges();
        for &lag in lags {
            let mut column = vec![f64::NAN; self.rows.len()];
            for range in &ranges {
                for i in (range.start + lag)..range.end {
                    column[i] = self.rows[i - lag].value;
                }
            }
            self.set_column(format!("{}_lag_{}", self.value_name, lag), column);
        }
        Ok(())
    }

    /// Add `{value}_rolling_{w}d_{stat}` for every window and statistic
    ///
    /// Windows trail the current row and need a single non-missing value
    /// to produce a result.
    pub fn add_rolling_features(&mut self, windows: &[usize], stats: &[RollingStat]) -> Result<()> {
        if windows.contains(&0) {
            return Err(DataError::InvalidParameter(
                "Window sizes must be greater than zero".to_string(),
            ));
        }

        let ranges = self.group_ranges();
        for &window in windows {
            for &stat in stats {
                let mut column = Vec::with_capacity(self.rows.len());
                for range in &ranges {
                    let values: Vec<f64> =
                        self.rows[range.clone()].iter().map(|r| r.value).collect();
                    column.extend(rolling_apply(&values, window, stat, 1)?);
                }
                self.set_column(
                    format!("{}_rolling_{}d_{}", self.value_name, window, stat.name()),
                    column,
                );
            }
        }
        Ok(())
    }

    /// Add the calendar columns listed in [`TEMPORAL_COLUMNS`]
    pub fn add_temporal_features(&mut self) {
        let calendar: Vec<[f64; 13]> = self.rows.iter().map(|r| calendar_features(r.date)).collect();
        for (idx, name) in TEMPORAL_COLUMNS.iter().enumerate() {
            let column = calendar.iter().map(|c| c[idx]).collect();
            self.set_column(name.to_string(), column);
        }
    }

    /// Add the selected feature families
    pub fn build_features(&mut self, config: &FeatureConfig, selection: FeatureSelection) -> Result<()> {
        if selection.lags {
            self.add_lag_features(&config.lags)?;
        }
        if selection.rolling {
            self.add_rolling_features(&config.windows, &config.rolling_stats)?;
        }
        if selection.temporal {
            self.add_temporal_features();
        }
        Ok(())
    }

    /// Convert to a DataFrame with `product_id`, `date`, value and feature columns
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let mut series = vec![
            Series::new(
                "product_id",
                self.rows.iter().map(|r| r.group.clone()).collect::<Vec<Option<String>>>(),
            ),
            Series::new(
                "date",
                self.rows.iter().map(|r| r.date.to_string()).collect::<Vec<String>>(),
            ),
            Series::new(
                &self.value_name,
                self.rows.iter().map(|r| r.value).collect::<Vec<f64>>(),
            ),
        ];
        for (name, values) in &self.columns {
            let nullable: Vec<Option<f64>> =
                values.iter().map(|v| (!v.is_nan()).then_some(*v)).collect();
            series.push(Series::new(name, nullable));
        }
        Ok(DataFrame::new(series)?)
    }

    /// Write the frame as CSV, missing values as empty fields
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut headers = vec![
            "product_id".to_string(),
            "date".to_string(),
            self.value_name.clone(),
        ];
        headers.extend(self.columns.iter().map(|(name, _)| name.clone()));

        let rows = self.rows.iter().enumerate().map(|(i, row)| {
            let mut record = vec![
                row.group.clone().unwrap_or_default(),
                row.date.to_string(),
                format_value(row.value),
            ];
            record.extend(self.columns.iter().map(|(_, values)| format_value(values[i])));
            record
        });
        write_table(path, &headers, rows)
    }

    fn set_column(&mut self, name: String, values: Vec<f64>) {
        match self.columns.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = values,
            None => self.columns.push((name, values)),
        }
    }

    /// Contiguous row ranges sharing a group key
    fn group_ranges(&self) -> Vec<Range<usize>> {
        let mut ranges = Vec::new();
        let mut start = 0;
        for i in 1..=self.rows.len() {
            if i == self.rows.len() || self.rows[i].group != self.rows[start].group {
                ranges.push(start..i);
                start = i;
            }
        }
        ranges
    }
}

fn calendar_features(date: NaiveDate) -> [f64; 13] {
    let month = date.month() as f64;
    let day_of_week = date.weekday().num_days_from_monday() as f64;
    let day_of_year = date.ordinal() as f64;

    [
        date.year() as f64,
        month,
        date.day() as f64,
        day_of_week,
        day_of_year,
        date.iso_week().week() as f64,
        ((date.month() - 1) / 3 + 1) as f64,
        (2.0 * PI * month / 12.0).sin(),
        (2.0 * PI * month / 12.0).cos(),
        (2.0 * PI * day_of_week / 7.0).sin(),
        (2.0 * PI * day_of_week / 7.0).cos(),
        (2.0 * PI * day_of_year / 365.0).sin(),
        (2.0 * PI * day_of_year / 365.0).cos(),
    ]
}
