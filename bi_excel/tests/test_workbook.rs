use bi_excel::{Cell, ExcelAnalyzer, ExcelError, Workbook};
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use std::io::Write;
use tempfile::tempdir;
use zip::write::FileOptions;

fn sample_rows() -> Vec<Vec<Cell>> {
    let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
    vec![
        vec![
            Cell::Text("date".into()),
            Cell::Text("region".into()),
            Cell::Text("revenue".into()),
        ],
        vec![Cell::Date(date), Cell::Text("east & west".into()), Cell::Number(120.5)],
        vec![Cell::Date(date), Cell::Empty, Cell::Number(80.0)],
    ]
}

#[test]
fn test_written_workbook_reads_back() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sales.xlsx");
    bi_excel::write_xlsx(&path, "Sales", &sample_rows()).unwrap();

    let mut workbook = Workbook::open(&path).unwrap();
    assert_eq!(workbook.sheet_names(), vec!["Sales"]);

    let rows = workbook.read_sheet("Sales").unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[1], sample_rows()[1]);
    assert_eq!(rows[2][1], Cell::Empty);
    assert_eq!(workbook.chart_count("Sales").unwrap(), 0);
    assert!(workbook.formulas("Sales").unwrap().is_empty());
}

#[test]
fn test_missing_sheet() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sales.xlsx");
    bi_excel::write_xlsx(&path, "Sales", &sample_rows()).unwrap();

    let mut workbook = Workbook::open(&path).unwrap();
    assert!(matches!(
        workbook.read_sheet("Other"),
        Err(ExcelError::SheetNotFound(_))
    ));
}

#[test]
fn test_unsupported_extensions() {
    let dir = tempdir().unwrap();
    for name in ["legacy.xls", "notes.txt"] {
        let path = dir.path().join(name);
        std::fs::write(&path, b"not a workbook").unwrap();
        assert!(matches!(
            Workbook::open(&path),
            Err(ExcelError::UnsupportedFormat(_))
        ));
    }
}

/// Hand-built workbook with shared strings, a formula, a defined name and a
/// chart hanging off the sheet's drawing
fn write_rich_workbook(path: &std::path::Path) {
    let parts: [(&str, &str); 9] = [
        (
            "xl/workbook.xml",
            r#"<workbook xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Data" sheetId="1" r:id="rId1"/></sheets><definedNames><definedName name="Totals">Data!$B$2:$B$3</definedName></definedNames></workbook>"#,
        ),
        (
            "xl/_rels/workbook.xml.rels",
            r#"<Relationships><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#,
        ),
        (
            "xl/sharedStrings.xml",
            r#"<sst><si><t>item</t></si><si><t>amount</t></si><si><t>widget</t></si></sst>"#,
        ),
        (
            "xl/styles.xml",
            r#"<styleSheet><numFmts count="1"><numFmt numFmtId="164" formatCode="dd/mm/yyyy"/></numFmts><cellXfs count="2"><xf numFmtId="0"/><xf numFmtId="164"/></cellXfs></styleSheet>"#,
        ),
        (
            "xl/worksheets/sheet1.xml",
            r#"<worksheet><sheetData><row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c><c r="C1" t="inlineStr"><is><t>when</t></is></c></row><row r="2"><c r="A2" t="s"><v>2</v></c><c r="B2"><v>3</v></c><c r="C2" s="1"><v>45000</v></c></row><row r="3"><c r="B3"><f>SUM(B2:B2)*2</f><v>6</v></c></row></sheetData></worksheet>"#,
        ),
        (
            "xl/worksheets/_rels/sheet1.xml.rels",
            r#"<Relationships><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/drawing" Target="../drawings/drawing1.xml"/></Relationships>"#,
        ),
        ("xl/drawings/drawing1.xml", r#"<wsDr/>"#),
        (
            "xl/drawings/_rels/drawing1.xml.rels",
            r#"<Relationships><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/chart" Target="../charts/chart1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/chart" Target="../charts/chart2.xml"/></Relationships>"#,
        ),
        ("[Content_Types].xml", r#"<Types/>"#),
    ];

    let file = std::fs::File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    for (name, content) in parts {
        zip.start_file(name, FileOptions::default()).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

#[test]
fn test_rich_workbook_structure() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("rich.xlsx");
    write_rich_workbook(&path);

    let mut workbook = Workbook::open(&path).unwrap();
    assert_eq!(workbook.defined_names()["Totals"], "Data!$B$2:$B$3");
    assert_eq!(workbook.chart_count("Data").unwrap(), 2);

    let formulas = workbook.formulas("Data").unwrap();
    assert_eq!(formulas.get("B3").map(String::as_str), Some("=SUM(B2:B2)*2"));

    let rows = workbook.read_sheet("Data").unwrap();
    assert_eq!(rows[0][0], Cell::Text("item".into()));
    assert_eq!(rows[1][0], Cell::Text("widget".into()));
    assert_eq!(rows[1][2], Cell::Date(NaiveDate::from_ymd_opt(2023, 3, 15).unwrap()));
    assert_eq!(rows[2][1], Cell::Number(6.0));
}

#[test]
fn test_analyze_workbook() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("rich.xlsx");
    write_rich_workbook(&path);

    let mut analyzer = ExcelAnalyzer::open(&path).unwrap();
    let report = analyzer.analyze_workbook().unwrap();

    assert_eq!(report.sheet_names, vec!["Data"]);
    let sheet = &report.sheets[0];
    assert_eq!(sheet.row_count, 2);
    assert_eq!(sheet.column_count, 3);
    assert_eq!(sheet.numeric_columns, vec!["amount"]);
    assert_eq!(sheet.text_columns, vec!["item"]);
    assert_eq!(sheet.date_columns, vec!["when"]);
    assert_eq!(sheet.missing_values["item"], 1);
    assert_eq!(sheet.chart_count, 2);
    assert_eq!(sheet.formulas.len(), 1);
}
