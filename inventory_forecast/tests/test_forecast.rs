use approx::assert_relative_eq;
use chrono::{Duration, NaiveDate};
use inventory_data::{clean_consumption, CleaningOptions, ConsumptionSeries, SeriesPoint};
use inventory_forecast::metrics::train_test_split;
use inventory_forecast::{
    evaluate, forecast_7_days_by_product, train_models_by_product, write_forecasts_csv,
    AdditiveConfig, AdditiveModel, ForecastError, ForecastModel, TrainedForecastModel,
};
use rstest::rstest;
use std::f64::consts::PI;

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 2).unwrap()
}

/// Trend plus a weekly cycle
fn weekly_series(days: i64, base: f64) -> Vec<SeriesPoint> {
    (0..days)
        .map(|i| {
            let value = base + 0.05 * i as f64 + 3.0 * (2.0 * PI * i as f64 / 7.0).sin();
            SeriesPoint::new(start() + Duration::days(i), value)
        })
        .collect()
}

fn cleaned(product: &str, points: Vec<SeriesPoint>) -> inventory_data::CleanedSeries {
    let options = CleaningOptions {
        remove_outliers: false,
        ..Default::default()
    };
    clean_consumption(&ConsumptionSeries::new(Some(product.to_string()), points), &options)
        .unwrap()
        .0
}

#[test]
fn test_weekly_pattern_is_recovered() {
    let series = weekly_series(120, 20.0);
    let (train, test) = train_test_split(&series, 0.1);
    assert_eq!(test.len(), 12);

    let trained = AdditiveModel::default().train(&train).unwrap();
    let accuracy = evaluate(&trained, &test).unwrap();
    assert!(accuracy.mae < 0.5, "mae was {}", accuracy.mae);
}

#[test]
fn test_forecast_dates_and_intervals() {
    let trained = AdditiveModel::default()
        .train(&weekly_series(60, 10.0))
        .unwrap();
    let forecast = trained.forecast(7).unwrap();

    assert_eq!(forecast.horizons(), 7);
    assert_eq!(forecast.points()[0].date, trained.last_date() + Duration::days(1));
    for point in forecast.points() {
        assert!(point.yhat_lower <= point.yhat && point.yhat <= point.yhat_upper);
    }
}

#[rstest]
#[case(0.8)]
#[case(0.95)]
fn test_interval_width_orders_bounds(#[case] width: f64) {
    let noisy: Vec<SeriesPoint> = weekly_series(40, 10.0)
        .into_iter()
        .enumerate()
        .map(|(i, p)| SeriesPoint::new(p.date, p.value + if i % 2 == 0 { 1.0 } else { -1.0 }))
        .collect();
    let config = AdditiveConfig {
        interval_width: width,
        ..Default::default()
    };
    let trained = AdditiveModel::new(config).unwrap().train(&noisy).unwrap();
    let (lower, upper) = trained.forecast(1).unwrap().intervals()[0];

    // z(0.8) = 1.2816, z(0.95) = 1.9600
    let z = if width < 0.9 { 1.2816 } else { 1.9600 };
    assert_relative_eq!((upper - lower) / 2.0, z * trained.sigma(), epsilon = 1e-3);
}

#[test]
fn test_single_point_is_insufficient() {
    let one = vec![SeriesPoint::new(start(), 4.0)];
    assert!(matches!(
        AdditiveModel::default().train(&one),
        Err(ForecastError::InsufficientData(_))
    ));
}

#[test]
fn test_failed_product_does_not_abort_others() {
    let series = vec![
        cleaned("A", weekly_series(30, 5.0)),
        cleaned("B", vec![SeriesPoint::new(start(), 1.0)]),
        cleaned("C", weekly_series(45, 8.0)),
    ];

    let batch = train_models_by_product(&AdditiveModel::default(), &series);
    assert_eq!(batch.models_trained(), 2);
    assert_eq!(batch.failures.len(), 1);
    assert_eq!(batch.failures[0].product_id, "B");
    assert!(batch.models.contains_key("A") && batch.models.contains_key("C"));
}

#[test]
fn test_seven_day_forecasts_written() {
    let series = vec![cleaned("A", weekly_series(30, 5.0)), cleaned("C", weekly_series(45, 8.0))];
    let (batch, forecasts) = forecast_7_days_by_product(&AdditiveModel::default(), &series).unwrap();
    assert_eq!(batch.models_trained(), 2);
    assert_eq!(forecasts.len(), 14);
    assert!(forecasts[..7].iter().all(|f| f.product_id == "A"));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("forecasts.csv");
    write_forecasts_csv(&path, &forecasts).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("product_id,date,yhat,yhat_lower,yhat_upper\n"));
    assert_eq!(text.lines().count(), 15);
}
