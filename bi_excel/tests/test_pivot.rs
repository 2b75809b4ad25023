use bi_excel::{AggFunc, ExcelError, PivotGenerator, Workbook};
use polars::prelude::*;
use pretty_assertions::assert_eq;
use tempfile::tempdir;

fn sales() -> DataFrame {
    df!(
        "region" => &["west", "east", "north", "east", "west", "north"],
        "quarter" => &["Q1", "Q1", "Q2", "Q2", "Q2", "Q1"],
        "revenue" => &[10.0, 20.0, 5.0, 30.0, 15.0, 7.0]
    )
    .unwrap()
}

fn f64_column(df: &DataFrame, name: &str) -> Vec<Option<f64>> {
    df.column(name).unwrap().f64().unwrap().into_iter().collect()
}

#[test]
fn test_pivot_three_categories_by_sum() {
    let pivot = PivotGenerator::new(sales())
        .create_pivot("region", None, &["revenue"], AggFunc::Sum)
        .unwrap();

    assert_eq!(pivot.height(), 3);
    let regions: Vec<Option<&str>> = pivot.column("region").unwrap().utf8().unwrap().into_iter().collect();
    assert_eq!(regions, vec![Some("east"), Some("north"), Some("west")]);
    assert_eq!(f64_column(&pivot, "revenue"), vec![Some(50.0), Some(12.0), Some(25.0)]);
}

#[test]
fn test_pivot_with_columns() {
    let pivot = PivotGenerator::new(sales())
        .create_pivot("region", Some("quarter"), &["revenue"], AggFunc::Mean)
        .unwrap();

    assert_eq!(
        pivot.get_column_names(),
        vec!["region", "revenue_Q1", "revenue_Q2"]
    );
    assert_eq!(f64_column(&pivot, "revenue_Q1"), vec![Some(20.0), Some(7.0), Some(10.0)]);
    assert_eq!(f64_column(&pivot, "revenue_Q2"), vec![Some(30.0), Some(5.0), Some(15.0)]);
}

#[test]
fn test_count_of_text_values() {
    let df = df!(
        "region" => &["east", "west", "east", "west"],
        "order_id" => &[Some("A-1"), Some("A-2"), Some("A-3"), None]
    )
    .unwrap();
    let generator = PivotGenerator::new(df);

    let pivot = generator
        .create_pivot("region", None, &["order_id"], AggFunc::Count)
        .unwrap();
    assert_eq!(f64_column(&pivot, "order_id"), vec![Some(2.0), Some(1.0)]);

    assert!(matches!(
        generator.create_pivot("region", None, &["order_id"], AggFunc::Sum),
        Err(ExcelError::UnsupportedConfiguration(_))
    ));
}

#[test]
fn test_missing_combination_is_null() {
    let df = df!(
        "region" => &["east", "west"],
        "quarter" => &["Q1", "Q2"],
        "revenue" => &[1.0, 2.0]
    )
    .unwrap();
    let pivot = PivotGenerator::new(df)
        .create_pivot("region", Some("quarter"), &["revenue"], AggFunc::Count)
        .unwrap();

    assert_eq!(f64_column(&pivot, "revenue_Q1"), vec![Some(1.0), None]);
    assert_eq!(f64_column(&pivot, "revenue_Q2"), vec![None, Some(1.0)]);
}

#[test]
fn test_export_xlsx_and_reload() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("pivot.xlsx");
    let pivot = PivotGenerator::new(sales())
        .create_pivot("region", None, &["revenue"], AggFunc::Max)
        .unwrap();
    bi_excel::export_xlsx(&pivot, &path, "Pivot").unwrap();

    let workbook = Workbook::open(&path).unwrap();
    assert_eq!(workbook.sheet_names(), vec!["Pivot"]);

    let reloaded = PivotGenerator::from_path(&path).unwrap();
    assert_eq!(reloaded.data().height(), 3);
    assert_eq!(f64_column(reloaded.data(), "revenue"), vec![Some(30.0), Some(7.0), Some(15.0)]);
}

#[test]
fn test_export_csv() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("pivot.csv");
    let pivot = PivotGenerator::new(sales())
        .create_pivot("quarter", None, &["revenue"], AggFunc::Sum)
        .unwrap();
    bi_excel::export(&pivot, &path, "Pivot").unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    let mut lines = content.lines();
    assert_eq!(lines.next(), Some("quarter,revenue"));
    assert_eq!(lines.count(), 2);
}

#[test]
fn test_export_rejects_unknown_extension() {
    let dir = tempdir().unwrap();
    let result = bi_excel::export(&sales(), dir.path().join("pivot.json"), "Pivot");
    assert!(matches!(result, Err(ExcelError::UnsupportedFormat(_))));
}
