//! Metrics for evaluating forecast performance

use crate::error::{ForecastError, Result};
use crate::models::TrainedForecastModel;
use chrono::NaiveDate;
use inventory_data::SeriesPoint;
use serde::Serialize;

/// Forecast accuracy metrics
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastAccuracy {
    /// Mean Absolute Error
    pub mae: f64,
    /// Mean Squared Error
    pub mse: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Mean Absolute Percentage Error over non-zero actuals, `NaN` if there are none
    pub mape: f64,
}

impl std::fmt::Display for ForecastAccuracy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Forecast Accuracy Metrics:")?;
        writeln!(f, "  MAE:   {:.4}", self.mae)?;
        writeln!(f, "  MSE:   {:.4}", self.mse)?;
        writeln!(f, "  RMSE:  {:.4}", self.rmse)?;
        writeln!(f, "  MAPE:  {:.4}%", self.mape)?;
        Ok(())
    }
}

/// Accuracy of paired forecast and actual values
pub fn forecast_accuracy(forecast: &[f64], actual: &[f64]) -> Result<ForecastAccuracy> {
    if forecast.len() != actual.len() || forecast.is_empty() {
        return Err(ForecastError::InvalidParameter(
            "Forecast and actual values must have the same non-zero length".to_string(),
        ));
    }

    let n = forecast.len() as f64;
    let errors: Vec<f64> = forecast
        .iter()
        .zip(actual)
        .map(|(f, a)| a - f)
        .collect();

    let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / n;
    let mse = errors.iter().map(|e| e.powi(2)).sum::<f64>() / n;

    let percentage: Vec<f64> = actual
        .iter()
        .zip(&errors)
        .filter(|(a, _)| **a != 0.0)
        .map(|(a, e)| (e / a).abs() * 100.0)
        .collect();
    let mape = if percentage.is_empty() {
        f64::NAN
    } else {
        percentage.iter().sum::<f64>() / percentage.len() as f64
    };

    Ok(ForecastAccuracy {
        mae,
        mse,
        rmse: mse.sqrt(),
        mape,
    })
}

/// Score a trained model against held-out observations
pub fn evaluate<T: TrainedForecastModel>(model: &T, test: &[SeriesPoint]) -> Result<ForecastAccuracy> {
    let observed: Vec<&SeriesPoint> = test.iter().filter(|p| !p.value.is_nan()).collect();
    let dates: Vec<NaiveDate> = observed.iter().map(|p| p.date).collect();
    let actual: Vec<f64> = observed.iter().map(|p| p.value).collect();

    let predicted = model.predict(&dates)?;
    forecast_accuracy(&predicted.values(), &actual)
}

/// Split a series into leading training and trailing test parts
pub fn train_test_split(points: &[SeriesPoint], test_ratio: f64) -> (Vec<SeriesPoint>, Vec<SeriesPoint>) {
    if points.is_empty() || test_ratio <= 0.0 || test_ratio >= 1.0 {
        return (points.to_vec(), Vec::new());
    }

    let test_size = (points.len() as f64 * test_ratio).round() as usize;
    let train_size = points.len() - test_size;
    (points[..train_size].to_vec(), points[train_size..].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_forecast_accuracy() {
        let acc = forecast_accuracy(&[1.0, 2.0, 4.0], &[2.0, 2.0, 2.0]).unwrap();
        assert_relative_eq!(acc.mae, 1.0);
        assert_relative_eq!(acc.mse, 5.0 / 3.0);
        assert_relative_eq!(acc.rmse, (5.0f64 / 3.0).sqrt());
        assert_relative_eq!(acc.mape, 50.0);
    }

    #[test]
    fn test_mape_skips_zero_actuals() {
        let acc = forecast_accuracy(&[1.0, 1.0], &[0.0, 2.0]).unwrap();
        assert_relative_eq!(acc.mape, 50.0);
        let acc = forecast_accuracy(&[1.0], &[0.0]).unwrap();
        assert!(acc.mape.is_nan());
    }

    #[test]
    fn test_length_mismatch() {
        assert!(forecast_accuracy(&[1.0], &[]).is_err());
    }
}
