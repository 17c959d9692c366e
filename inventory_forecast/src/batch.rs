//! Per-product forecasting
//!
//! Each product is fitted independently. A product that fails to train is
//! logged and recorded in [`ForecastBatch::failures`]; the others proceed.

use crate::error::Result;
use crate::models::{ForecastModel, TrainedForecastModel};
use chrono::NaiveDate;
use inventory_data::export::{format_value, write_table};
use inventory_data::CleanedSeries;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

/// Horizon of the standard weekly forecast
pub const DEFAULT_HORIZON: usize = 7;

/// Key used for a series that has no product id
pub const UNGROUPED_KEY: &str = "all";

/// One forecasted day of one product
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductForecast {
    pub product_id: String,
    pub date: NaiveDate,
    pub yhat: f64,
    pub yhat_lower: f64,
    pub yhat_upper: f64,
}

/// A product that could not be trained
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForecastFailure {
    pub product_id: String,
    pub reason: String,
}

/// Trained models keyed by product plus the products that failed
#[derive(Debug, Clone)]
pub struct ForecastBatch<T> {
    pub models: BTreeMap<String, T>,
    pub failures: Vec<ForecastFailure>,
}

impl<T> ForecastBatch<T> {
    pub fn models_trained(&self) -> usize {
        self.models.len()
    }
}

/// Fit one model per product
pub fn train_models_by_product<M: ForecastModel>(
    model: &M,
    series: &[CleanedSeries],
) -> ForecastBatch<M::Trained> {
    let outcomes: Vec<(String, Result<M::Trained>)> = series
        .iter()
        .map(|s| {
            let product_id = s.product_id().unwrap_or(UNGROUPED_KEY).to_string();
            (product_id, model.train(s.points()))
        })
        .collect();

    let mut batch = ForecastBatch {
        models: BTreeMap::new(),
        failures: Vec::new(),
    };
    for (product_id, outcome) in outcomes {
        match outcome {
            Ok(trained) => {
                batch.models.insert(product_id, trained);
            }
            Err(err) => {
                warn!(product = %product_id, error = %err, "Skipping product: model training failed");
                batch.failures.push(ForecastFailure {
                    product_id,
                    reason: err.to_string(),
                });
            }
        }
    }

    info!(
        model = model.name(),
        trained = batch.models.len(),
        failed = batch.failures.len(),
        "Trained forecast models"
    );
    batch
}

/// Forecast `horizon` days ahead for every trained product
pub fn forecast_by_product<T: TrainedForecastModel>(
    batch: &ForecastBatch<T>,
    horizon: usize,
) -> Result<Vec<ProductForecast>> {
    let mut rows = Vec::with_capacity(batch.models.len() * horizon);
    for (product_id, model) in &batch.models {
        let forecast = model.forecast(horizon)?;
        rows.extend(forecast.points().iter().map(|p| ProductForecast {
            product_id: product_id.clone(),
            date: p.date,
            yhat: p.yhat,
            yhat_lower: p.yhat_lower,
            yhat_upper: p.yhat_upper,
        }));
    }
    Ok(rows)
}

/// Train per product and forecast the following seven days
pub fn forecast_7_days_by_product<M: ForecastModel>(
    model: &M,
    series: &[CleanedSeries],
) -> Result<(ForecastBatch<M::Trained>, Vec<ProductForecast>)> {
    let batch = train_models_by_product(model, series);
    let forecasts = forecast_by_product(&batch, DEFAULT_HORIZON)?;
    Ok((batch, forecasts))
}

/// Write forecasts as CSV
pub fn write_forecasts_csv<P: AsRef<Path>>(path: P, forecasts: &[ProductForecast]) -> Result<()> {
    let headers: Vec<String> = ["product_id", "date", "yhat", "yhat_lower", "yhat_upper"]
        .iter()
        .map(|h| h.to_string())
        .collect();
    let rows = forecasts.iter().map(|f| {
        vec![
            f.product_id.clone(),
            f.date.to_string(),
            format_value(f.yhat),
            format_value(f.yhat_lower),
            format_value(f.yhat_upper),
        ]
    });
    write_table(path, &headers, rows)?;
    Ok(())
}
