//! Loading and validation of raw inventory rows

use crate::error::{DataError, Result};
use crate::observation::{
    ConsumptionSeries, RawObservation, SeriesPoint, CONSUMPTION_COLUMN, DATE_COLUMN,
    PRODUCT_COLUMN, STOCK_COLUMN,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use polars::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs::File;
use std::path::Path;
use tracing::{info, warn};

/// Minimum number of rows, in total and per product, expected by validation
pub const DEFAULT_MIN_RECORDS: usize = 30;

/// Non-fatal finding about the input; processing continues
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataQualityWarning {
    /// Negative values in a column that should be non-negative
    NegativeValues { column: String, count: usize },
    /// Values that could not be read as numbers
    MissingValues { column: String, count: usize },
    /// A product has fewer rows than the validation minimum
    ShortHistory {
        product_id: String,
        rows: usize,
        minimum: usize,
    },
    /// Repeated (product, date) pairs
    DuplicateDates { product_id: String, count: usize },
}

impl fmt::Display for DataQualityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataQualityWarning::NegativeValues { column, count } => {
                write!(f, "{} negative values found in column '{}'", count, column)
            }
            DataQualityWarning::MissingValues { column, count } => {
                write!(f, "{} missing or non-numeric values in column '{}'", count, column)
            }
            DataQualityWarning::ShortHistory {
                product_id,
                rows,
                minimum,
            } => write!(
                f,
                "Product {} has only {} records (minimum {})",
                product_id, rows, minimum
            ),
            DataQualityWarning::DuplicateDates { product_id, count } => {
                write!(f, "Product {} has {} duplicated dates", product_id, count)
            }
        }
    }
}

/// Raw observations sorted by (product_id, timestamp) plus the warnings found loading them
#[derive(Debug, Clone)]
pub struct InventoryData {
    observations: Vec<RawObservation>,
    warnings: Vec<DataQualityWarning>,
}

/// Outcome of [`validate`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub total_records: usize,
    pub product_count: usize,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub warnings: Vec<DataQualityWarning>,
}

/// Data loader for inventory observations
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Load observations from a CSV file with `date,product_id,stock,consumption` columns
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<InventoryData> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DataError::NotFound(format!(
                "Input file not found: {}",
                path.display()
            )));
        }

        let file = File::open(path)?;
        let df = CsvReader::new(file)
            .infer_schema(None)
            .has_header(true)
            .finish()?;

        info!(path = %path.display(), rows = df.height(), "Read input file");
        Self::from_dataframe(df)
    }

    /// Coerce an existing DataFrame into typed observations
    pub fn from_dataframe(df: DataFrame) -> Result<InventoryData> {
        require_columns(
            &df,
            &[DATE_COLUMN, PRODUCT_COLUMN, STOCK_COLUMN, CONSUMPTION_COLUMN],
        )?;

        if df.height() == 0 {
            return Err(DataError::SchemaError("Input contains no rows".to_string()));
        }

        let dates = string_column(&df, DATE_COLUMN)?;
        let products = string_column(&df, PRODUCT_COLUMN)?;
        let stock = numeric_column(&df, STOCK_COLUMN)?;
        let consumption = numeric_column(&df, CONSUMPTION_COLUMN)?;

        let mut observations = Vec::with_capacity(df.height());
        for (row, (date, product)) in dates.iter().zip(&products).enumerate() {
            let raw_date = date.as_deref().ok_or_else(|| {
                DataError::SchemaError(format!("Missing date at row {}", row + 1))
            })?;
            let timestamp = parse_timestamp(raw_date).ok_or_else(|| {
                DataError::SchemaError(format!(
                    "Unparseable date '{}' at row {}",
                    raw_date,
                    row + 1
                ))
            })?;
            let product_id = product.clone().ok_or_else(|| {
                DataError::SchemaError(format!("Missing product_id at row {}", row + 1))
            })?;

            observations.push(RawObservation {
                timestamp,
                product_id,
                stock: stock[row],
                consumption: consumption[row],
            });
        }

        Ok(InventoryData::new(observations))
    }
}

impl InventoryData {
    /// Sort observations and collect the load-time data-quality warnings
    pub fn new(mut observations: Vec<RawObservation>) -> Self {
        observations.sort_by(|a, b| {
            a.product_id
                .cmp(&b.product_id)
                .then(a.timestamp.cmp(&b.timestamp))
        });

        let mut warnings = Vec::new();
        for column in [STOCK_COLUMN, CONSUMPTION_COLUMN] {
            let values: Vec<f64> = observations
                .iter()
                .filter_map(|o| o.numeric(column))
                .collect();

            let missing = values.iter().filter(|v| v.is_nan()).count();
            if missing > 0 {
                warnings.push(DataQualityWarning::MissingValues {
                    column: column.to_string(),
                    count: missing,
                });
            }

            let negative = values.iter().filter(|v| **v < 0.0).count();
            if negative > 0 {
                warnings.push(DataQualityWarning::NegativeValues {
                    column: column.to_string(),
                    count: negative,
                });
            }
        }

        let mut seen: BTreeMap<&str, BTreeSet<NaiveDate>> = BTreeMap::new();
        let mut duplicates: BTreeMap<&str, usize> = BTreeMap::new();
        for obs in &observations {
            if !seen.entry(obs.product_id.as_str()).or_default().insert(obs.date()) {
                *duplicates.entry(obs.product_id.as_str()).or_default() += 1;
            }
        }
        for (product_id, count) in duplicates {
            warnings.push(DataQualityWarning::DuplicateDates {
                product_id: product_id.to_string(),
                count,
            });
        }

        for warning in &warnings {
            warn!(%warning, "Data quality warning");
        }

        Self {
            observations,
            warnings,
        }
    }

    pub fn observations(&self) -> &[RawObservation] {
        &self.observations
    }

    pub fn warnings(&self) -> &[DataQualityWarning] {
        &self.warnings
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Distinct product keys in ascending order
    pub fn products(&self) -> Vec<String> {
        let set: BTreeSet<&str> = self
            .observations
            .iter()
            .map(|o| o.product_id.as_str())
            .collect();
        set.into_iter().map(str::to_string).collect()
    }

    /// First and last calendar day present
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let start = self.observations.iter().map(|o| o.date()).min()?;
        let end = self.observations.iter().map(|o| o.date()).max()?;
        Some((start, end))
    }

    /// One consumption series per product, rows with missing consumption dropped
    pub fn consumption_series(&self) -> Vec<ConsumptionSeries> {
        let mut by_product: BTreeMap<&str, Vec<SeriesPoint>> = BTreeMap::new();
        for obs in &self.observations {
            let points = by_product.entry(obs.product_id.as_str()).or_default();
            if !obs.consumption.is_nan() {
                points.push(SeriesPoint::new(obs.date(), obs.consumption));
            }
        }

        by_product
            .into_iter()
            .map(|(product_id, mut points)| {
                points.sort_by_key(|p| p.date);
                ConsumptionSeries::new(Some(product_id.to_string()), points)
            })
            .collect()
    }

    /// Consumption series of a single product
    pub fn consumption_series_for(&self, product_id: &str) -> Result<ConsumptionSeries> {
        self.consumption_series()
            .into_iter()
            .find(|s| s.product_id.as_deref() == Some(product_id))
            .ok_or_else(|| {
                DataError::NotFound(format!(
                    "Product {} not found. Available products: {}",
                    product_id,
                    self.products().join(", ")
                ))
            })
    }
}

/// Check row counts and per-product history length
///
/// Fewer than `min_records` rows overall is fatal; short per-product
/// histories only add [`DataQualityWarning::ShortHistory`] entries.
pub fn validate(data: &InventoryData, min_records: usize) -> Result<ValidationReport> {
    let (start_date, end_date) = data
        .date_range()
        .ok_or_else(|| DataError::SchemaError("Input contains no rows".to_string()))?;

    if data.len() < min_records {
        return Err(DataError::SchemaError(format!(
            "Insufficient data: {} records (minimum {})",
            data.len(),
            min_records
        )));
    }

    let mut per_product: BTreeMap<&str, usize> = BTreeMap::new();
    for obs in data.observations() {
        *per_product.entry(obs.product_id.as_str()).or_default() += 1;
    }

    let mut warnings = data.warnings().to_vec();
    for (product_id, rows) in &per_product {
        if *rows < min_records {
            let warning = DataQualityWarning::ShortHistory {
                product_id: product_id.to_string(),
                rows: *rows,
                minimum: min_records,
            };
            warn!(%warning, "Data quality warning");
            warnings.push(warning);
        }
    }

    info!(
        records = data.len(),
        products = per_product.len(),
        %start_date,
        %end_date,
        "Validation passed"
    );

    Ok(ValidationReport {
        total_records: data.len(),
        product_count: per_product.len(),
        start_date,
        end_date,
        warnings,
    })
}

/// Parse a date or date-time in the formats accepted on input
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date.and_time(NaiveTime::MIN));
    }

    const FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
    ];
    for format in FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(ts);
        }
    }

    DateTime::parse_from_rfc3339(trimmed)
        .ok()
        .map(|dt| dt.naive_utc())
}

/// Fail with a SchemaError naming every absent column
pub(crate) fn require_columns(df: &DataFrame, required: &[&str]) -> Result<()> {
    let names = df.get_column_names();
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|c| !names.contains(c))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(DataError::SchemaError(format!(
            "Missing required columns: {}",
            missing.join(", ")
        )))
    }
}

pub(crate) fn string_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let series = df.column(name)?.cast(&DataType::Utf8)?;
    let values = series
        .utf8()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect();
    Ok(values)
}

pub(crate) fn numeric_column(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let series = df.column(name)?.cast(&DataType::Float64)?;
    let values = series
        .f64()?
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect();
    Ok(values)
}
