use approx::assert_relative_eq;
use chrono::NaiveDate;
use inventory_data::features::TEMPORAL_COLUMNS;
use inventory_data::{DataError, FeatureConfig, FeatureFrame, FeatureRow, FeatureSelection};
use inventory_math::RollingStat;
use pretty_assertions::assert_eq;

fn rows(group: &str, values: &[f64]) -> Vec<FeatureRow> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    values
        .iter()
        .enumerate()
        .map(|(i, v)| FeatureRow {
            group: Some(group.to_string()),
            date: start + chrono::Duration::days(i as i64),
            value: *v,
        })
        .collect()
}

fn two_product_frame() -> FeatureFrame {
    let mut all = rows("B", &[10.0, 20.0, 30.0]);
    all.extend(rows("A", &[1.0, 2.0, 3.0, 4.0]));
    FeatureFrame::new("consumption", all)
}

#[test]
fn test_lags_reset_at_group_boundaries() {
    let mut frame = two_product_frame();
    frame.add_lag_features(&[1, 2]).unwrap();

    let lag1 = frame.column("consumption_lag_1").unwrap();
    let lag2 = frame.column("consumption_lag_2").unwrap();

    // Rows are ordered A(4) then B(3)
    assert!(lag1[0].is_nan());
    assert_eq!(&lag1[1..4], &[1.0, 2.0, 3.0]);
    assert!(lag1[4].is_nan());
    assert_eq!(&lag1[5..], &[10.0, 20.0]);

    assert!(lag2[..2].iter().all(|v| v.is_nan()));
    assert_eq!(&lag2[2..4], &[1.0, 2.0]);
    assert!(lag2[4..6].iter().all(|v| v.is_nan()));
    assert_eq!(lag2[6], 10.0);
}

#[test]
fn test_rolling_first_row_equals_value() {
    let mut frame = two_product_frame();
    frame
        .add_rolling_features(&[7], &[RollingStat::Mean, RollingStat::Std, RollingStat::Max])
        .unwrap();

    let mean = frame.column("consumption_rolling_7d_mean").unwrap();
    let std = frame.column("consumption_rolling_7d_std").unwrap();
    let max = frame.column("consumption_rolling_7d_max").unwrap();

    assert_relative_eq!(mean[0], 1.0);
    assert_relative_eq!(mean[3], 2.5);
    assert_relative_eq!(mean[4], 10.0);
    assert_relative_eq!(mean[6], 20.0);
    assert!(std[0].is_nan());
    assert!(std[4].is_nan());
    assert_relative_eq!(std[5], 50.0f64.sqrt(), epsilon = 1e-12);
    assert_eq!(max[4], 10.0);
}

#[test]
fn test_build_features_column_names() {
    let mut frame = FeatureFrame::new("consumption", rows("A", &[1.0; 10]));
    frame
        .build_features(&FeatureConfig::default(), FeatureSelection::all())
        .unwrap();

    let columns = frame.feature_columns();
    assert_eq!(&columns[..3], &["consumption_lag_1", "consumption_lag_7", "consumption_lag_30"]);
    assert!(columns.contains(&"consumption_rolling_30d_min"));
    assert!(columns.contains(&"day_of_year_cos"));
    assert_eq!(columns.len(), 3 + 2 * 4 + TEMPORAL_COLUMNS.len());

    // lag 30 never resolves on a ten-day series
    assert!(frame
        .column("consumption_lag_30")
        .unwrap()
        .iter()
        .all(|v| v.is_nan()));
}

#[test]
fn test_selection_subset() {
    let mut frame = FeatureFrame::new("consumption", rows("A", &[1.0, 2.0]));
    frame
        .build_features(&FeatureConfig::default(), FeatureSelection::lags_only())
        .unwrap();
    assert_eq!(
        frame.feature_columns(),
        vec!["consumption_lag_1", "consumption_lag_7", "consumption_lag_30"]
    );
}

#[test]
fn test_zero_lag_rejected() {
    let mut frame = two_product_frame();
    assert!(matches!(
        frame.add_lag_features(&[0]),
        Err(DataError::InvalidParameter(_))
    ));
    assert!(matches!(
        frame.add_rolling_features(&[0], &[RollingStat::Mean]),
        Err(DataError::InvalidParameter(_))
    ));
}

#[test]
fn test_temporal_features_are_ungrouped() {
    let mut frame = two_product_frame();
    frame.add_temporal_features();
    let day_of_week = frame.column("day_of_week").unwrap();
    // 2024-01-01 is a Monday for both groups
    assert_eq!(day_of_week[0], 0.0);
    assert_eq!(day_of_week[4], 0.0);
    assert_eq!(frame.column("quarter").unwrap()[0], 1.0);
}
