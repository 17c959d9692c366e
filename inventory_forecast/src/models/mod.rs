//! Forecasting models for daily consumption series

use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use inventory_data::SeriesPoint;
use serde::Serialize;
use std::fmt::Debug;

pub mod additive;

/// Point forecast with its uncertainty bounds
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub yhat: f64,
    pub yhat_lower: f64,
    pub yhat_upper: f64,
}

/// Forecast result containing dated predictions
#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    points: Vec<ForecastPoint>,
}

impl Forecast {
    /// Create a forecast, rejecting bounds that do not enclose the point value
    pub fn new(points: Vec<ForecastPoint>) -> Result<Self> {
        if let Some(bad) = points
            .iter()
            .find(|p| !(p.yhat_lower <= p.yhat && p.yhat <= p.yhat_upper))
        {
            return Err(ForecastError::ForecastingError(format!(
                "Interval [{}, {}] does not contain forecast {} on {}",
                bad.yhat_lower, bad.yhat_upper, bad.yhat, bad.date
            )));
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[ForecastPoint] {
        &self.points
    }

    /// Get the forecasted values
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.yhat).collect()
    }

    /// Get the `(lower, upper)` bounds
    pub fn intervals(&self) -> Vec<(f64, f64)> {
        self.points
            .iter()
            .map(|p| (p.yhat_lower, p.yhat_upper))
            .collect()
    }

    /// Get the number of periods forecasted
    pub fn horizons(&self) -> usize {
        self.points.len()
    }
}

/// Trained model that can produce forecasts
pub trait TrainedForecastModel: Debug {
    /// Generate forecast for the days following the training data
    fn forecast(&self, horizon: usize) -> Result<Forecast>;

    /// Predict values for arbitrary dates
    fn predict(&self, dates: &[NaiveDate]) -> Result<Forecast>;

    /// Last date seen during training
    fn last_date(&self) -> NaiveDate;

    /// Name of the model
    fn name(&self) -> &str;
}

/// Forecast model that can be trained on a dated series
pub trait ForecastModel: Debug + Clone {
    /// The type of trained model produced
    type Trained: TrainedForecastModel;

    /// Train the model on a series; missing values are ignored
    fn train(&self, series: &[SeriesPoint]) -> Result<Self::Trained>;

    /// Get the name of the model
    fn name(&self) -> &str;
}
