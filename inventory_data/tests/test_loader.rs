use chrono::NaiveDate;
use inventory_data::{validate, DataError, DataLoader, DataQualityWarning};
use pretty_assertions::assert_eq;
use std::io::Write;
use tempfile::NamedTempFile;

fn day(offset: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(offset)
}

fn write_rows(rows: &[(NaiveDate, &str, f64, f64)]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "date,product_id,stock,consumption").unwrap();
    for (date, product, stock, consumption) in rows {
        writeln!(file, "{},{},{},{}", date, product, stock, consumption).unwrap();
    }
    file
}

#[test]
fn test_from_csv_sorts_by_product_and_date() {
    let file = write_rows(&[
        (day(1), "B", 10.0, 1.0),
        (day(0), "B", 12.0, 2.0),
        (day(0), "A", 50.0, 5.0),
    ]);

    let data = DataLoader::from_csv(file.path()).unwrap();
    let keys: Vec<(String, NaiveDate)> = data
        .observations()
        .iter()
        .map(|o| (o.product_id.clone(), o.date()))
        .collect();

    assert_eq!(
        keys,
        vec![
            ("A".to_string(), day(0)),
            ("B".to_string(), day(0)),
            ("B".to_string(), day(1)),
        ]
    );
    assert_eq!(data.products(), vec!["A".to_string(), "B".to_string()]);
    assert!(data.warnings().is_empty());
}

#[test]
fn test_missing_column_is_schema_error() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "date,product_id,stock").unwrap();
    writeln!(file, "2024-01-01,A,10").unwrap();

    match DataLoader::from_csv(file.path()) {
        Err(DataError::SchemaError(msg)) => assert!(msg.contains("consumption")),
        other => panic!("expected schema error, got {:?}", other),
    }
}

#[test]
fn test_unparseable_date_is_schema_error() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "date,product_id,stock,consumption").unwrap();
    writeln!(file, "not-a-date,A,10,1").unwrap();

    assert!(matches!(
        DataLoader::from_csv(file.path()),
        Err(DataError::SchemaError(_))
    ));
}

#[test]
fn test_missing_file_is_not_found() {
    assert!(matches!(
        DataLoader::from_csv("definitely_missing_inventory.csv"),
        Err(DataError::NotFound(_))
    ));
}

#[test]
fn test_negative_and_duplicate_warnings() {
    let file = write_rows(&[
        (day(0), "A", -1.0, 3.0),
        (day(0), "A", 5.0, -2.0),
        (day(1), "A", 5.0, -4.0),
    ]);

    let data = DataLoader::from_csv(file.path()).unwrap();
    assert_eq!(
        data.warnings().to_vec(),
        vec![
            DataQualityWarning::NegativeValues {
                column: "stock".to_string(),
                count: 1
            },
            DataQualityWarning::NegativeValues {
                column: "consumption".to_string(),
                count: 2
            },
            DataQualityWarning::DuplicateDates {
                product_id: "A".to_string(),
                count: 1
            },
        ]
    );
}

#[test]
fn test_single_row_fails_validation() {
    let file = write_rows(&[(day(0), "A", 10.0, 1.0)]);
    let data = DataLoader::from_csv(file.path()).unwrap();

    assert!(matches!(validate(&data, 30), Err(DataError::SchemaError(_))));
}

#[test]
fn test_thirty_five_rows_pass_without_warning() {
    let rows: Vec<(NaiveDate, &str, f64, f64)> = (0..35)
        .map(|i| (day(i), "A", 100.0 + i as f64, 5.0 + (i % 3) as f64))
        .collect();
    let file = write_rows(&rows);
    let data = DataLoader::from_csv(file.path()).unwrap();

    let report = validate(&data, 30).unwrap();
    assert_eq!(report.total_records, 35);
    assert_eq!(report.product_count, 1);
    assert_eq!(report.start_date, day(0));
    assert_eq!(report.end_date, day(34));
    assert!(report.warnings.is_empty());
}

#[test]
fn test_short_product_history_warns() {
    let mut rows: Vec<(NaiveDate, &str, f64, f64)> =
        (0..30).map(|i| (day(i), "A", 10.0, 1.0)).collect();
    rows.push((day(0), "B", 10.0, 1.0));
    let file = write_rows(&rows);
    let data = DataLoader::from_csv(file.path()).unwrap();

    let report = validate(&data, 30).unwrap();
    assert_eq!(
        report.warnings,
        vec![DataQualityWarning::ShortHistory {
            product_id: "B".to_string(),
            rows: 1,
            minimum: 30
        }]
    );
}

#[test]
fn test_consumption_series_for_unknown_product() {
    let file = write_rows(&[(day(0), "A", 10.0, 1.0)]);
    let data = DataLoader::from_csv(file.path()).unwrap();

    assert_eq!(data.consumption_series_for("A").unwrap().len(), 1);
    match data.consumption_series_for("Z") {
        Err(DataError::NotFound(msg)) => assert!(msg.contains("A")),
        other => panic!("expected not found, got {:?}", other),
    }
}
