mod common;

use common::{write_csv, ymd};
use polars::prelude::*;
use rstest::rstest;
use tempfile::TempDir;
use unrate_forecast::data::SchemaNormalizer;
use unrate_forecast::DashboardError;

#[rstest]
#[case("DATE,UNRATE")]
#[case("observation_date,unrate")]
#[case("date,value")]
#[case("Date,Value")]
fn test_normalizer_accepts_alias_casing(#[case] header: &str) {
    let dir = TempDir::new().unwrap();
    let body = format!("{}\n2020-03-01,4.4\n2020-01-01,3.5\n2020-02-01,3.5\n", header);
    let path = write_csv(dir.path(), "series.csv", &body);

    let series = SchemaNormalizer::from_csv(&path).unwrap();

    assert_eq!(series.len(), 3);
    assert_eq!(
        series.dates(),
        vec![ymd(2020, 1, 1), ymd(2020, 2, 1), ymd(2020, 3, 1)]
    );
    assert_eq!(series.values(), vec![3.5, 3.5, 4.4]);
    assert_eq!(series.last_date(), ymd(2020, 3, 1));
}

#[test]
fn test_normalizer_ignores_extra_columns() {
    let dir = TempDir::new().unwrap();
    let body = "realtime_start,observation_date,UNRATE,notes\n\
                2024-01-01,2023-11-01,3.7,a\n\
                2024-01-01,2023-12-01,3.7,b\n";
    let path = write_csv(dir.path(), "series.csv", body);

    let series = SchemaNormalizer::from_csv(&path).unwrap();
    assert_eq!(series.dates(), vec![ymd(2023, 11, 1), ymd(2023, 12, 1)]);
}

#[test]
fn test_normalizer_drops_missing_rows() {
    let dir = TempDir::new().unwrap();
    let body = "DATE,UNRATE\n\
                2020-01-01,3.5\n\
                2020-02-01,\n\
                ,3.9\n\
                2020-04-01,.\n\
                2020-05-01,13.2\n";
    let path = write_csv(dir.path(), "series.csv", body);

    let series = SchemaNormalizer::from_csv(&path).unwrap();

    assert_eq!(series.dates(), vec![ymd(2020, 1, 1), ymd(2020, 5, 1)]);
    assert_eq!(series.values(), vec![3.5, 13.2]);
}

#[test]
fn test_normalizer_rejects_unknown_columns() {
    let dir = TempDir::new().unwrap();
    let path = write_csv(dir.path(), "series.csv", "foo,bar\n2020-01-01,3.5\n");

    let result = SchemaNormalizer::from_csv(&path);
    assert!(matches!(result, Err(DashboardError::SchemaError(_))));
}

#[test]
fn test_normalizer_rejects_unparseable_date() {
    let dir = TempDir::new().unwrap();
    let body = "DATE,UNRATE\n2020-01-01,3.5\nsometime,3.6\n";
    let path = write_csv(dir.path(), "series.csv", body);

    match SchemaNormalizer::from_csv(&path) {
        Err(DashboardError::SchemaError(msg)) => assert!(msg.contains("sometime")),
        other => panic!("Expected SchemaError, got {:?}", other),
    }
}

#[test]
fn test_normalizer_all_rows_missing() {
    let dir = TempDir::new().unwrap();
    let path = write_csv(dir.path(), "series.csv", "DATE,UNRATE\n2020-01-01,.\n");

    let result = SchemaNormalizer::from_csv(&path);
    assert!(matches!(result, Err(DashboardError::DataError(_))));
}

#[test]
fn test_normalizer_missing_file() {
    let result = SchemaNormalizer::from_csv("nonexistent_file.csv");
    assert!(matches!(result, Err(DashboardError::IoError(_))));
}

#[test]
fn test_normalizer_from_dataframe() {
    let df = df!(
        "Observation_Date" => &[Some("2021-02-01"), Some("2021-01-01"), None],
        "VALUE" => &[Some(6.2), Some(6.4), Some(6.0)]
    )
    .unwrap();

    let series = SchemaNormalizer::from_dataframe(&df).unwrap();

    assert_eq!(series.dates(), vec![ymd(2021, 1, 1), ymd(2021, 2, 1)]);
    assert_eq!(series.values(), vec![6.4, 6.2]);
}
