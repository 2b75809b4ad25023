use std::io::Write;
use std::process::Command;
use tempfile::{Builder, NamedTempFile};

fn main_platform() -> Command {
    Command::new(env!("CARGO_BIN_EXE_main_platform"))
}

fn sales_csv() -> NamedTempFile {
    let mut file = Builder::new().suffix(".csv").tempfile().unwrap();
    writeln!(file, "category,amount").unwrap();
    writeln!(file, "toys,10").unwrap();
    writeln!(file, "books,5").unwrap();
    writeln!(file, "toys,7").unwrap();
    file
}

#[test]
fn test_pivot_mode() {
    let data = sales_csv();
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("pivot.csv");

    let status = main_platform()
        .args(["--mode", "pivot", "--index", "category", "--values", "amount"])
        .arg("--file")
        .arg(data.path())
        .arg("--output")
        .arg(&output)
        .status()
        .unwrap();

    assert!(status.success());
    let written = std::fs::read_to_string(&output).unwrap();
    assert!(written.starts_with("category,amount"));
    assert!(written.contains("toys,17"));
}

#[test]
fn test_missing_file_fails() {
    let output = main_platform().args(["--mode", "trend"]).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Data file path is required"));
}

#[test]
fn test_unsupported_extension_fails() {
    let file = Builder::new().suffix(".parquet").tempfile().unwrap();
    let status = main_platform()
        .args(["--mode", "kpi", "--file"])
        .arg(file.path())
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(1));
}

#[test]
fn test_interactive_dashboard_is_rejected() {
    let data = sales_csv();
    let status = main_platform()
        .args(["--mode", "dashboard", "--run", "--file"])
        .arg(data.path())
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(1));
}

#[test]
fn test_dashboard_mode_writes_html() {
    let data = sales_csv();
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("report.html");

    let status = main_platform()
        .args(["--mode", "dashboard", "--title", "Sales"])
        .arg("--file")
        .arg(data.path())
        .arg("--output")
        .arg(&output)
        .status()
        .unwrap();

    assert!(status.success());
    let html = std::fs::read_to_string(&output).unwrap();
    assert!(html.contains("<h1>Sales</h1>"));
}

#[test]
fn test_invalid_arguments_exit_with_one() {
    let cases: [&[&str]; 3] = [
        &["--mode", "report"],
        &["--mode", "forecast", "--model-type", "prophet"],
        &["--file", "sales.csv"],
    ];
    for args in cases {
        let output = main_platform().args(args).output().unwrap();
        assert_eq!(output.status.code(), Some(1), "args {:?}", args);
        assert!(!output.stderr.is_empty());
    }
}

#[test]
fn test_help_exits_with_zero() {
    let output = main_platform().arg("--help").output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("--mode"));
}
