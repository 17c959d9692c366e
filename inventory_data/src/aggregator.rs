//! Daily per-product aggregation
//!
//! Raw rows are grouped by `(product_id, calendar day)` and every resolvable
//! `(column, function)` pair of an [`AggregationSpec`] becomes an output
//! column named `{column}_{function}`. Output rows are sorted by
//! `(product_id, date)`.

use crate::error::{DataError, Result};
use crate::export::{format_value, write_table};
use crate::loader::{numeric_column, parse_timestamp, require_columns, string_column};
use crate::observation::{RawObservation, CONSUMPTION_COLUMN, DATE_COLUMN, PRODUCT_COLUMN, STOCK_COLUMN};
use chrono::{Duration, NaiveDate};
use inventory_math::stats;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::{info, warn};

/// Column produced when no spec entry resolves
pub const FALLBACK_COUNT_COLUMN: &str = "count";

/// Statistic computed per group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggFunc {
    Mean,
    Sum,
    Min,
    Max,
    Std,
    Count,
}

impl AggFunc {
    pub fn name(&self) -> &'static str {
        match self {
            AggFunc::Mean => "mean",
            AggFunc::Sum => "sum",
            AggFunc::Min => "min",
            AggFunc::Max => "max",
            AggFunc::Std => "std",
            AggFunc::Count => "count",
        }
    }

    /// Evaluate over a group's values, skipping missing ones
    pub fn apply(&self, values: &[f64]) -> f64 {
        match self {
            AggFunc::Mean => stats::mean(values),
            AggFunc::Sum => stats::sum(values),
            AggFunc::Min => stats::min(values),
            AggFunc::Max => stats::max(values),
            AggFunc::Std => stats::sample_std(values),
            AggFunc::Count => stats::count(values) as f64,
        }
    }
}

impl fmt::Display for AggFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AggFunc {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "mean" => Ok(AggFunc::Mean),
            "sum" => Ok(AggFunc::Sum),
            "min" => Ok(AggFunc::Min),
            "max" => Ok(AggFunc::Max),
            "std" => Ok(AggFunc::Std),
            "count" => Ok(AggFunc::Count),
            other => Err(DataError::InvalidParameter(format!(
                "Unsupported aggregation function: {}",
                other
            ))),
        }
    }
}

/// Statistics requested for one source column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationEntry {
    pub column: String,
    pub functions: Vec<AggFunc>,
}

/// Ordered mapping from source column to statistics
///
/// Serialized as a map, `{"consumption": ["mean", "sum"], "stock": ["mean"]}`,
/// keeping the order the columns appear in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationSpec {
    entries: Vec<AggregationEntry>,
}

impl Serialize for AggregationSpec {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(&entry.column, &entry.functions)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for AggregationSpec {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_map(SpecVisitor)
    }
}

struct SpecVisitor;

impl<'de> serde::de::Visitor<'de> for SpecVisitor {
    type Value = AggregationSpec;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map from column name to a list of statistics")
    }

    fn visit_map<A>(self, mut access: A) -> std::result::Result<Self::Value, A::Error>
    where
        A: serde::de::MapAccess<'de>,
    {
        let mut spec = AggregationSpec::empty();
        while let Some((column, functions)) = access.next_entry::<String, Vec<AggFunc>>()? {
            if spec.entries.iter().any(|e| e.column == column) {
                return Err(serde::de::Error::custom(format!(
                    "duplicate aggregation column '{}'",
                    column
                )));
            }
            spec = spec.with(column, &functions);
        }
        Ok(spec)
    }
}

impl AggregationSpec {
    /// Spec with no entries; aggregating with it yields the `count` fallback
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append an entry, keeping caller order
    pub fn with(mut self, column: impl Into<String>, functions: &[AggFunc]) -> Self {
        self.entries.push(AggregationEntry {
            column: column.into(),
            functions: functions.to_vec(),
        });
        self
    }

    /// consumption: mean, sum, min, max, std, count
    pub fn consumption_only() -> Self {
        Self::empty().with(
            CONSUMPTION_COLUMN,
            &[
                AggFunc::Mean,
                AggFunc::Sum,
                AggFunc::Min,
                AggFunc::Max,
                AggFunc::Std,
                AggFunc::Count,
            ],
        )
    }

    /// stock: mean, min, max, std
    pub fn stock_only() -> Self {
        Self::empty().with(
            STOCK_COLUMN,
            &[AggFunc::Mean, AggFunc::Min, AggFunc::Max, AggFunc::Std],
        )
    }

    pub fn entries(&self) -> &[AggregationEntry] {
        &self.entries
    }
}

impl Default for AggregationSpec {
    /// consumption: mean, sum, min, max, std; stock: mean, min, max, std
    fn default() -> Self {
        Self::empty()
            .with(
                CONSUMPTION_COLUMN,
                &[
                    AggFunc::Mean,
                    AggFunc::Sum,
                    AggFunc::Min,
                    AggFunc::Max,
                    AggFunc::Std,
                ],
            )
            .with(
                STOCK_COLUMN,
                &[AggFunc::Mean, AggFunc::Min, AggFunc::Max, AggFunc::Std],
            )
    }
}

/// One `(product_id, day)` row; `values` follows [`AggregatedFrame::columns`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedRow {
    pub product_id: String,
    pub date: NaiveDate,
    pub values: Vec<f64>,
}

/// Aggregated rows sorted by `(product_id, date)`
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedFrame {
    columns: Vec<String>,
    rows: Vec<AggregatedRow>,
}

impl AggregatedFrame {
    /// Build a frame from already-aggregated rows
    pub fn new(columns: Vec<String>, mut rows: Vec<AggregatedRow>) -> Result<Self> {
        if let Some(bad) = rows.iter().find(|r| r.values.len() != columns.len()) {
            return Err(DataError::InvalidParameter(format!(
                "Row for {} on {} has {} values, expected {}",
                bad.product_id,
                bad.date,
                bad.values.len(),
                columns.len()
            )));
        }
        rows.sort_by(|a, b| a.product_id.cmp(&b.product_id).then(a.date.cmp(&b.date)));
        Ok(Self { columns, rows })
    }

    /// Aggregate value column names
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[AggregatedRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Values of one aggregate column across all rows
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|r| r.values[idx]).collect())
    }

    /// Value of a named column in one row
    pub fn value(&self, row: usize, name: &str) -> Option<f64> {
        let idx = self.column_index(name)?;
        self.rows.get(row).map(|r| r.values[idx])
    }

    /// Rows whose `keep` entry is true, order preserved
    pub fn filter_rows(&self, keep: &[bool]) -> AggregatedFrame {
        let rows = self
            .rows
            .iter()
            .zip(keep)
            .filter(|(_, k)| **k)
            .map(|(r, _)| r.clone())
            .collect();
        AggregatedFrame {
            columns: self.columns.clone(),
            rows,
        }
    }

    /// Distinct products in output order
    pub fn products(&self) -> Vec<String> {
        let set: BTreeSet<&str> = self.rows.iter().map(|r| r.product_id.as_str()).collect();
        set.into_iter().map(str::to_string).collect()
    }

    /// Header row for tabular export: `product_id`, `date`, then the aggregate columns
    pub fn headers(&self) -> Vec<String> {
        let mut headers = vec![PRODUCT_COLUMN.to_string(), DATE_COLUMN.to_string()];
        headers.extend(self.columns.iter().cloned());
        headers
    }

    /// Formatted fields of one row, matching [`AggregatedFrame::headers`]
    pub fn record(&self, row: usize) -> Vec<String> {
        let r = &self.rows[row];
        let mut record = vec![r.product_id.clone(), r.date.to_string()];
        record.extend(r.values.iter().map(|v| format_value(*v)));
        record
    }

    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        write_table(path, &self.headers(), (0..self.len()).map(|i| self.record(i)))
    }

    /// Convert to a DataFrame; missing aggregates become nulls and dates ISO strings
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let mut series = vec![
            Series::new(
                PRODUCT_COLUMN,
                self.rows.iter().map(|r| r.product_id.clone()).collect::<Vec<String>>(),
            ),
            Series::new(
                DATE_COLUMN,
                self.rows.iter().map(|r| r.date.to_string()).collect::<Vec<String>>(),
            ),
        ];
        for (idx, name) in self.columns.iter().enumerate() {
            let values: Vec<Option<f64>> = self
                .rows
                .iter()
                .map(|r| {
                    let v = r.values[idx];
                    (!v.is_nan()).then_some(v)
                })
                .collect();
            series.push(Series::new(name, values));
        }
        Ok(DataFrame::new(series)?)
    }
}

/// Column-oriented view of raw rows used by both aggregation entry points
struct RawTable {
    keys: Vec<(String, NaiveDate)>,
    columns: Vec<(String, Vec<f64>)>,
}

impl RawTable {
    fn from_observations(observations: &[RawObservation]) -> Self {
        let keys = observations
            .iter()
            .map(|o| (o.product_id.clone(), o.date()))
            .collect();
        let columns = [CONSUMPTION_COLUMN, STOCK_COLUMN]
            .iter()
            .map(|&name| {
                let values = observations
                    .iter()
                    .map(|o| o.numeric(name).unwrap_or(f64::NAN))
                    .collect();
                (name.to_string(), values)
            })
            .collect();
        Self { keys, columns }
    }

    fn from_dataframe(df: &DataFrame, spec: &AggregationSpec) -> Result<Self> {
        require_columns(df, &[DATE_COLUMN, PRODUCT_COLUMN])?;

        let dates = string_column(df, DATE_COLUMN)?;
        let products = string_column(df, PRODUCT_COLUMN)?;
        let mut keys = Vec::with_capacity(df.height());
        for (row, (date, product)) in dates.iter().zip(&products).enumerate() {
            let date = date
                .as_deref()
                .and_then(parse_timestamp)
                .ok_or_else(|| {
                    DataError::SchemaError(format!("Invalid or missing date at row {}", row + 1))
                })?
                .date();
            let product = product.clone().ok_or_else(|| {
                DataError::SchemaError(format!("Missing product_id at row {}", row + 1))
            })?;
            keys.push((product, date));
        }

        let names = df.get_column_names();
        let mut columns = Vec::new();
        for entry in spec.entries() {
            let name = entry.column.as_str();
            let reserved = name == DATE_COLUMN || name == PRODUCT_COLUMN;
            if !reserved && names.contains(&name) && !columns.iter().any(|(n, _)| n == name) {
                columns.push((name.to_string(), numeric_column(df, name)?));
            }
        }

        Ok(Self { keys, columns })
    }

    fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
    }
}

/// Aggregate typed observations per `(product_id, day)`
///
/// `spec` defaults to [`AggregationSpec::default`]. With `fill_missing_dates`
/// every product gets one row per day of the global date span, days without
/// observations holding `NaN` aggregates.
pub fn aggregate_daily_by_item(
    observations: &[RawObservation],
    spec: Option<&AggregationSpec>,
    fill_missing_dates: bool,
) -> Result<AggregatedFrame> {
    let default_spec = AggregationSpec::default();
    let spec = spec.unwrap_or(&default_spec);
    aggregate_table(&RawTable::from_observations(observations), spec, fill_missing_dates)
}

/// Aggregate a DataFrame that has `date` and `product_id` columns
pub fn aggregate_dataframe(
    df: &DataFrame,
    spec: Option<&AggregationSpec>,
    fill_missing_dates: bool,
) -> Result<AggregatedFrame> {
    let default_spec = AggregationSpec::default();
    let spec = spec.unwrap_or(&default_spec);
    let table = RawTable::from_dataframe(df, spec)?;
    aggregate_table(&table, spec, fill_missing_dates)
}

fn aggregate_table(
    table: &RawTable,
    spec: &AggregationSpec,
    fill_missing_dates: bool,
) -> Result<AggregatedFrame> {
    let mut resolved: Vec<(&[f64], AggFunc)> = Vec::new();
    let mut columns = Vec::new();
    for entry in spec.entries() {
        let Some(values) = table.column(&entry.column) else {
            continue;
        };
        for &func in &entry.functions {
            let name = format!("{}_{}", entry.column, func);
            if !columns.contains(&name) {
                columns.push(name);
                resolved.push((values, func));
            }
        }
    }

    let fallback = resolved.is_empty();
    if fallback {
        warn!("No aggregation resolved against the input columns; falling back to row counts");
        columns = vec![FALLBACK_COUNT_COLUMN.to_string()];
    }

    let mut groups: BTreeMap<(&str, NaiveDate), Vec<usize>> = BTreeMap::new();
    for (idx, (product, date)) in table.keys.iter().enumerate() {
        groups.entry((product.as_str(), *date)).or_default().push(idx);
    }

    let mut aggregated: BTreeMap<(&str, NaiveDate), Vec<f64>> = BTreeMap::new();
    for (key, indices) in &groups {
        let values = if fallback {
            vec![indices.len() as f64]
        } else {
            resolved
                .iter()
                .map(|(source, func)| {
                    let group: Vec<f64> = indices.iter().map(|&i| source[i]).collect();
                    func.apply(&group)
                })
                .collect()
        };
        aggregated.insert(*key, values);
    }

    let mut rows = Vec::new();
    if fill_missing_dates && !aggregated.is_empty() {
        let start = table.keys.iter().map(|(_, d)| *d).min();
        let end = table.keys.iter().map(|(_, d)| *d).max();
        if let (Some(start), Some(end)) = (start, end) {
            let products: BTreeSet<&str> = aggregated.keys().map(|(p, _)| *p).collect();
            for product in products {
                let mut day = start;
                while day <= end {
                    let values = aggregated
                        .get(&(product, day))
                        .cloned()
                        .unwrap_or_else(|| vec![f64::NAN; columns.len()]);
                    rows.push(AggregatedRow {
                        product_id: product.to_string(),
                        date: day,
                        values,
                    });
                    day += Duration::days(1);
                }
            }
        }
    } else {
        rows = aggregated
            .into_iter()
            .map(|((product, date), values)| AggregatedRow {
                product_id: product.to_string(),
                date,
                values,
            })
            .collect();
    }

    info!(
        input_rows = table.keys.len(),
        output_rows = rows.len(),
        columns = columns.len(),
        fill_missing_dates,
        "Aggregated daily rows"
    );

    AggregatedFrame::new(columns, rows)
}
