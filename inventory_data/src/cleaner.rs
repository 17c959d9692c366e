//! Outlier suppression and gap filling for consumption series
//!
//! [`clean_consumption`] applies a fixed sequence of steps and reports
//! what each step changed in a [`CleaningReport`]:
//!
//! 1. negative values become zero
//! 2. values are clamped to the optional `[min_value, max_value]` envelope
//! 3. outliers (IQR or z-score) become missing
//! 4. missing values are filled
//! 5. rows still missing are dropped
//! 6. duplicate dates are dropped, keeping the first occurrence

use crate::error::{DataError, Result};
use crate::observation::{ConsumptionSeries, SeriesPoint};
use inventory_math::stats;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

const IQR_FACTOR: f64 = 1.5;
const Z_SCORE_LIMIT: f64 = 3.0;

/// Outlier detection rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlierMethod {
    /// Outside `[Q1 - 1.5·IQR, Q3 + 1.5·IQR]`
    Iqr,
    /// `|z| > 3` using the sample standard deviation
    ZScore,
}

/// How missing values are filled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillMethod {
    /// Forward fill, then backward fill for leading gaps
    ForwardFill,
    /// Backward fill, then forward fill for trailing gaps
    BackwardFill,
    /// Linear interpolation by position, edges filled from the nearest value
    Interpolate,
    /// Mean of the non-missing values
    Mean,
}

/// Options for [`clean_consumption`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningOptions {
    pub remove_negative: bool,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub remove_outliers: bool,
    pub outlier_method: OutlierMethod,
    pub fill_missing: bool,
    pub fill_method: FillMethod,
}

impl Default for CleaningOptions {
    fn default() -> Self {
        Self {
            remove_negative: true,
            min_value: None,
            max_value: None,
            remove_outliers: true,
            outlier_method: OutlierMethod::Iqr,
            fill_missing: true,
            fill_method: FillMethod::ForwardFill,
        }
    }
}

/// Per-step diagnostics of one cleaning run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleaningReport {
    pub initial_rows: usize,
    pub negative_values_replaced: usize,
    pub values_clamped: usize,
    pub outliers_detected: usize,
    pub missing_before_fill: usize,
    pub missing_after_fill: usize,
    pub rows_dropped_missing: usize,
    pub duplicates_removed: usize,
    pub final_rows: usize,
}

impl CleaningReport {
    /// Add every count of `other` into `self`
    pub fn absorb(&mut self, other: &CleaningReport) {
        self.initial_rows += other.initial_rows;
        self.negative_values_replaced += other.negative_values_replaced;
        self.values_clamped += other.values_clamped;
        self.outliers_detected += other.outliers_detected;
        self.missing_before_fill += other.missing_before_fill;
        self.missing_after_fill += other.missing_after_fill;
        self.rows_dropped_missing += other.rows_dropped_missing;
        self.duplicates_removed += other.duplicates_removed;
        self.final_rows += other.final_rows;
    }
}

/// A consumption series with no missing values and unique, ascending dates
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedSeries {
    product_id: Option<String>,
    points: Vec<SeriesPoint>,
}

impl CleanedSeries {
    pub fn product_id(&self) -> Option<&str> {
        self.product_id.as_deref()
    }

    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Clean one consumption series
pub fn clean_consumption(
    series: &ConsumptionSeries,
    options: &CleaningOptions,
) -> Result<(CleanedSeries, CleaningReport)> {
    if let (Some(min), Some(max)) = (options.min_value, options.max_value) {
        if min > max {
            return Err(DataError::InvalidParameter(format!(
                "min_value ({}) must not exceed max_value ({})",
                min, max
            )));
        }
    }

    let mut points = series.points.clone();
    points.sort_by_key(|p| p.date);
    let mut values: Vec<f64> = points.iter().map(|p| p.value).collect();

    let mut report = CleaningReport {
        initial_rows: values.len(),
        ..Default::default()
    };

    if options.remove_negative {
        for v in values.iter_mut().filter(|v| **v < 0.0) {
            *v = 0.0;
            report.negative_values_replaced += 1;
        }
    }

    for v in values.iter_mut().filter(|v| !v.is_nan()) {
        let mut clamped = *v;
        if let Some(min) = options.min_value {
            clamped = clamped.max(min);
        }
        if let Some(max) = options.max_value {
            clamped = clamped.min(max);
        }
        if clamped != *v {
            *v = clamped;
            report.values_clamped += 1;
        }
    }

    if options.remove_outliers {
        let is_outlier = outlier_rule(&values, options.outlier_method)?;
        for v in values.iter_mut().filter(|v| !v.is_nan()) {
            if is_outlier(*v) {
                *v = f64::NAN;
                report.outliers_detected += 1;
            }
        }
    }

    report.missing_before_fill = stats::count_missing(&values);
    if options.fill_missing {
        match options.fill_method {
            FillMethod::ForwardFill => {
                forward_fill(&mut values);
                backward_fill(&mut values);
            }
            FillMethod::BackwardFill => {
                backward_fill(&mut values);
                forward_fill(&mut values);
            }
            FillMethod::Interpolate => {
                interpolate_linear(&mut values);
                forward_fill(&mut values);
                backward_fill(&mut values);
            }
            FillMethod::Mean => {
                let mean = stats::mean(&values);
                for v in values.iter_mut().filter(|v| v.is_nan()) {
                    *v = mean;
                }
            }
        }
    }
    report.missing_after_fill = stats::count_missing(&values);

    let mut cleaned = Vec::with_capacity(points.len());
    let mut seen_dates = HashSet::new();
    for (point, value) in points.iter().zip(values) {
        if value.is_nan() {
            report.rows_dropped_missing += 1;
            continue;
        }
        if !seen_dates.insert(point.date) {
            report.duplicates_removed += 1;
            continue;
        }
        cleaned.push(SeriesPoint::new(point.date, value));
    }
    report.final_rows = cleaned.len();

    debug!(
        product = series.product_id.as_deref().unwrap_or("all"),
        negatives = report.negative_values_replaced,
        clamped = report.values_clamped,
        outliers = report.outliers_detected,
        missing_before = report.missing_before_fill,
        missing_after = report.missing_after_fill,
        duplicates = report.duplicates_removed,
        rows = report.final_rows,
        "Cleaned consumption series"
    );

    Ok((
        CleanedSeries {
            product_id: series.product_id.clone(),
            points: cleaned,
        },
        report,
    ))
}

fn outlier_rule(values: &[f64], method: OutlierMethod) -> Result<Box<dyn Fn(f64) -> bool>> {
    match method {
        OutlierMethod::Iqr => {
            let q1 = stats::quantile(values, 0.25)?;
            let q3 = stats::quantile(values, 0.75)?;
            if q1.is_nan() || q3.is_nan() {
                return Ok(Box::new(|_| false));
            }
            let iqr = q3 - q1;
            let lower = q1 - IQR_FACTOR * iqr;
            let upper = q3 + IQR_FACTOR * iqr;
            Ok(Box::new(move |v| v < lower || v > upper))
        }
        OutlierMethod::ZScore => {
            let mean = stats::mean(values);
            let std = stats::sample_std(values);
            if std.is_nan() || std == 0.0 {
                return Ok(Box::new(|_| false));
            }
            Ok(Box::new(move |v| ((v - mean) / std).abs() > Z_SCORE_LIMIT))
        }
    }
}

fn forward_fill(values: &mut [f64]) {
    let mut last = f64::NAN;
    for v in values.iter_mut() {
        if v.is_nan() {
            *v = last;
        } else {
            last = *v;
        }
    }
}

fn backward_fill(values: &mut [f64]) {
    let mut next = f64::NAN;
    for v in values.iter_mut().rev() {
        if v.is_nan() {
            *v = next;
        } else {
            next = *v;
        }
    }
}

/// Interpolate interior gaps linearly by position; edge gaps are left missing
fn interpolate_linear(values: &mut [f64]) {
    let known: Vec<usize> = (0..values.len()).filter(|&i| !values[i].is_nan()).collect();
    for pair in known.windows(2) {
        let (start, end) = (pair[0], pair[1]);
        if end - start < 2 {
            continue;
        }
        let (a, b) = (values[start], values[end]);
        let span = (end - start) as f64;
        for i in (start + 1)..end {
            values[i] = a + (b - a) * (i - start) as f64 / span;
        }
    }
}
