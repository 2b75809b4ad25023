use bi_analytics::{AnalyticsError, DataLoader, Dataset};
use bi_excel::{write_xlsx, Cell};
use chrono::NaiveDate;
use polars::prelude::*;
use pretty_assertions::assert_eq;
use std::io::Write;
use tempfile::{Builder, NamedTempFile};

fn sales_csv() -> NamedTempFile {
    let mut file = Builder::new().suffix(".csv").tempfile().unwrap();

    writeln!(file, "date,region,revenue").unwrap();
    writeln!(file, "2023-01-01,north,100.0").unwrap();
    writeln!(file, "2023-02-01,south,120.5").unwrap();
    writeln!(file, "2023-03-01,north,").unwrap();
    writeln!(file, "2023-04-01,east,131.0").unwrap();

    file
}

#[test]
fn test_load_csv_with_date_index() {
    let file = sales_csv();
    let data = DataLoader::load(file.path(), Some("date"), Some("revenue")).unwrap();

    assert_eq!(data.height(), 4);
    assert_eq!(data.column_names(), vec!["revenue".to_string()]);
    assert_eq!(
        data.dates().map(|d| d[3]),
        NaiveDate::from_ymd_opt(2023, 4, 1)
    );
    assert_eq!(
        data.optional_values("revenue").unwrap(),
        vec![Some(100.0), Some(120.5), None, Some(131.0)]
    );
    assert_eq!(data.values("revenue").unwrap().len(), 3);
    assert!(matches!(
        data.complete_values("revenue"),
        Err(AnalyticsError::DataError(_))
    ));
}

#[test]
fn test_load_csv_without_index_keeps_all_columns() {
    let file = sales_csv();
    let data = DataLoader::load(file.path(), None, None).unwrap();

    assert!(data.index().is_none());
    assert_eq!(data.width(), 3);
    assert_eq!(data.numeric_columns(), vec!["revenue".to_string()]);
    assert_eq!(data.default_column().unwrap(), "date");
    assert!(matches!(
        data.optional_values("region"),
        Err(AnalyticsError::DataError(_))
    ));
}

#[test]
fn test_load_xlsx() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sales.xlsx");
    let rows = vec![
        vec![Cell::Text("month".into()), Cell::Text("units".into())],
        vec![
            Cell::Date(NaiveDate::from_ymd_opt(2023, 1, 31).unwrap()),
            Cell::Number(12.0),
        ],
        vec![
            Cell::Date(NaiveDate::from_ymd_opt(2023, 2, 28).unwrap()),
            Cell::Number(15.0),
        ],
    ];
    write_xlsx(&path, "Sales", &rows).unwrap();

    let data = DataLoader::load(&path, Some("month"), None).unwrap();
    assert_eq!(data.values("units").unwrap(), vec![12.0, 15.0]);
    assert_eq!(
        data.dates().map(|d| d.to_vec()),
        Some(vec![
            NaiveDate::from_ymd_opt(2023, 1, 31).unwrap(),
            NaiveDate::from_ymd_opt(2023, 2, 28).unwrap(),
        ])
    );
}

#[test]
fn test_unsupported_formats() {
    for name in ["report.json", "legacy.xls", "no_extension"] {
        assert!(
            matches!(
                DataLoader::from_path(name),
                Err(AnalyticsError::UnsupportedFormat(_))
            ),
            "{}",
            name
        );
    }
}

#[test]
fn test_missing_file() {
    assert!(matches!(
        DataLoader::from_csv("/nonexistent/sales.csv"),
        Err(AnalyticsError::Io(_))
    ));
}

#[test]
fn test_unparseable_index_date() {
    let df = df!("date" => &["2023-01-01", "soon"], "v" => &[1.0, 2.0]).unwrap();
    assert!(matches!(
        Dataset::new(df).indexed(Some("date"), None),
        Err(AnalyticsError::DataError(_))
    ));
}

#[test]
fn test_unknown_value_column() {
    let df = df!("v" => &[1.0, 2.0]).unwrap();
    assert!(matches!(
        Dataset::new(df).indexed(None, Some("w")),
        Err(AnalyticsError::ColumnNotFound(_))
    ));
}
