//! Additive trend plus seasonality model
//!
//! `y(t) = trend(t) + weekly(t) + yearly(t) + ε`
//!
//! The trend is linear in time. Each seasonal component is a truncated
//! Fourier series, and all coefficients are fitted jointly by least squares.
//! Intervals assume normally distributed residuals.

use crate::error::{ForecastError, Result};
use crate::models::{Forecast, ForecastModel, ForecastPoint, TrainedForecastModel};
use chrono::{Datelike, Duration, NaiveDate};
use inventory_data::SeriesPoint;
use inventory_math::solve_least_squares;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use std::f64::consts::PI;
use tracing::debug;

const WEEK_DAYS: f64 = 7.0;
const YEAR_DAYS: f64 = 365.25;

/// Settings of the additive model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdditiveConfig {
    pub weekly_seasonality: bool,
    pub yearly_seasonality: bool,
    pub weekly_order: usize,
    pub yearly_order: usize,
    /// Coverage of the uncertainty interval, in (0, 1)
    pub interval_width: f64,
    pub ridge: f64,
}

impl Default for AdditiveConfig {
    fn default() -> Self {
        Self {
            weekly_seasonality: true,
            yearly_seasonality: true,
            weekly_order: 3,
            yearly_order: 10,
            interval_width: 0.95,
            ridge: 1e-6,
        }
    }
}

/// Untrained additive model
#[derive(Debug, Clone)]
pub struct AdditiveModel {
    name: String,
    config: AdditiveConfig,
}

/// Fitted additive model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedAdditiveModel {
    name: String,
    origin: NaiveDate,
    scale: f64,
    weekly_order: usize,
    yearly_order: usize,
    coefficients: Vec<f64>,
    sigma: f64,
    z: f64,
    last_date: NaiveDate,
}

impl AdditiveModel {
    pub fn new(config: AdditiveConfig) -> Result<Self> {
        if !(config.interval_width > 0.0 && config.interval_width < 1.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "Interval width must be between 0 and 1, got {}",
                config.interval_width
            )));
        }
        if config.ridge < 0.0 {
            return Err(ForecastError::InvalidParameter(
                "Ridge penalty must be non-negative".to_string(),
            ));
        }

        Ok(Self {
            name: format!(
                "Additive (weekly={}, yearly={}, interval={})",
                config.weekly_seasonality, config.yearly_seasonality, config.interval_width
            ),
            config,
        })
    }

    pub fn config(&self) -> &AdditiveConfig {
        &self.config
    }
}

impl Default for AdditiveModel {
    fn default() -> Self {
        Self {
            name: "Additive (weekly=true, yearly=true, interval=0.95)".to_string(),
            config: AdditiveConfig::default(),
        }
    }
}

impl ForecastModel for AdditiveModel {
    type Trained = TrainedAdditiveModel;

    fn train(&self, series: &[SeriesPoint]) -> Result<Self::Trained> {
        let mut points: Vec<SeriesPoint> =
            series.iter().copied().filter(|p| !p.value.is_nan()).collect();
        if points.len() < 2 {
            return Err(ForecastError::InsufficientData(format!(
                "Need at least 2 observations to fit, have {}",
                points.len()
            )));
        }
        points.sort_by_key(|p| p.date);

        let origin = points[0].date;
        let last_date = points[points.len() - 1].date;
        let span = (last_date - origin).num_days();
        if span == 0 {
            return Err(ForecastError::InsufficientData(
                "All observations fall on the same date".to_string(),
            ));
        }

        // Seasonal terms need enough history to be identifiable
        let weekly_order = if self.config.weekly_seasonality && span >= 14 {
            self.config.weekly_order
        } else {
            0
        };
        let yearly_order = if self.config.yearly_seasonality && span >= 365 {
            self.config.yearly_order
        } else {
            0
        };

        let mut fit = TrainedAdditiveModel {
            name: self.name.clone(),
            origin,
            scale: span as f64,
            weekly_order,
            yearly_order,
            coefficients: Vec::new(),
            sigma: 0.0,
            z: 0.0,
            last_date,
        };

        let design: Vec<Vec<f64>> = points.iter().map(|p| fit.design_row(p.date)).collect();
        let targets: Vec<f64> = points.iter().map(|p| p.value).collect();
        fit.coefficients = solve_least_squares(&design, &targets, self.config.ridge)?;

        let ssr: f64 = design
            .iter()
            .zip(&targets)
            .map(|(row, y)| (y - fit.evaluate(row)).powi(2))
            .sum();
        let n = targets.len();
        let dof = if n > fit.coefficients.len() {
            n - fit.coefficients.len()
        } else {
            n
        };
        fit.sigma = (ssr / dof as f64).sqrt();

        let normal = Normal::new(0.0, 1.0)
            .map_err(|e| ForecastError::ForecastingError(e.to_string()))?;
        fit.z = normal.inverse_cdf(0.5 + self.config.interval_width / 2.0);

        debug!(
            points = n,
            weekly_order,
            yearly_order,
            sigma = fit.sigma,
            "Fitted additive model"
        );

        Ok(fit)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedAdditiveModel {
    fn design_row(&self, date: NaiveDate) -> Vec<f64> {
        let t = (date - self.origin).num_days() as f64 / self.scale;
        let absolute = date.num_days_from_ce() as f64;

        let mut row = Vec::with_capacity(2 + 2 * (self.weekly_order + self.yearly_order));
        row.push(1.0);
        row.push(t);
        for (order, period) in [(self.weekly_order, WEEK_DAYS), (self.yearly_order, YEAR_DAYS)] {
            for k in 1..=order {
                let angle = 2.0 * PI * k as f64 * absolute / period;
                row.push(angle.sin());
                row.push(angle.cos());
            }
        }
        row
    }

    fn evaluate(&self, row: &[f64]) -> f64 {
        row.iter().zip(&self.coefficients).map(|(x, b)| x * b).sum()
    }

    /// Residual standard deviation of the fit
    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }
}

impl TrainedForecastModel for TrainedAdditiveModel {
    fn forecast(&self, horizon: usize) -> Result<Forecast> {
        if horizon == 0 {
            return Err(ForecastError::InvalidParameter(
                "Horizon must be greater than zero".to_string(),
            ));
        }
        let dates: Vec<NaiveDate> = (1..=horizon as i64)
            .map(|d| self.last_date + Duration::days(d))
            .collect();
        self.predict(&dates)
    }

    fn predict(&self, dates: &[NaiveDate]) -> Result<Forecast> {
        let margin = self.z * self.sigma;
        let points = dates
            .iter()
            .map(|&date| {
                let yhat = self.evaluate(&self.design_row(date));
                ForecastPoint {
                    date,
                    yhat,
                    yhat_lower: yhat - margin,
                    yhat_upper: yhat + margin,
                }
            })
            .collect();
        Forecast::new(points)
    }

    fn last_date(&self) -> NaiveDate {
        self.last_date
    }

    fn name(&self) -> &str {
        &self.name
    }
}
