//! Raw inventory rows and per-product consumption series

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Required input column holding the observation date
pub const DATE_COLUMN: &str = "date";
/// Required input column holding the product key
pub const PRODUCT_COLUMN: &str = "product_id";
/// Required input column holding the stock level
pub const STOCK_COLUMN: &str = "stock";
/// Required input column holding the consumed quantity
pub const CONSUMPTION_COLUMN: &str = "consumption";

/// One raw input row
///
/// The timestamp keeps any time-of-day present in the source; aggregation
/// truncates it to the calendar day. Missing numeric values are `NaN`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawObservation {
    pub timestamp: NaiveDateTime,
    pub product_id: String,
    pub stock: f64,
    pub consumption: f64,
}

impl RawObservation {
    /// Observation at midnight of `date`
    pub fn new(date: NaiveDate, product_id: impl Into<String>, stock: f64, consumption: f64) -> Self {
        Self {
            timestamp: date.and_time(NaiveTime::MIN),
            product_id: product_id.into(),
            stock,
            consumption,
        }
    }

    /// Calendar day of the observation
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }

    /// Value of a named numeric column, if this row type carries it
    pub fn numeric(&self, column: &str) -> Option<f64> {
        match column {
            STOCK_COLUMN => Some(self.stock),
            CONSUMPTION_COLUMN => Some(self.consumption),
            _ => None,
        }
    }
}

/// A dated value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: f64,
}

impl SeriesPoint {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}

/// Time-ordered consumption values of one product, or of the whole ungrouped input
#[derive(Debug, Clone, PartialEq)]
pub struct ConsumptionSeries {
    pub product_id: Option<String>,
    pub points: Vec<SeriesPoint>,
}

impl ConsumptionSeries {
    pub fn new(product_id: Option<String>, points: Vec<SeriesPoint>) -> Self {
        Self { product_id, points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }
}
