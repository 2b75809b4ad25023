//! Minimal `.xlsx` writer
//!
//! Produces a single-sheet workbook with inline strings and one date style,
//! enough for exported pivot tables and frames to open in Excel.

use crate::cell::{cell_reference, Cell};
use crate::error::{ExcelError, Result};
use chrono::NaiveDate;
use quick_xml::escape::escape;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::debug;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

// Style 1 is the built-in short date format (numFmtId 14)
const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="1"><font><sz val="11"/><name val="Calibri"/></font></fonts><fills count="1"><fill><patternFill patternType="none"/></fill></fills><borders count="1"><border/></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="2"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="14" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/></cellXfs></styleSheet>"#;

/// Write `rows` as the only sheet of a new workbook at `path`
pub fn write_xlsx<P: AsRef<Path>>(path: P, sheet_name: &str, rows: &[Vec<Cell>]) -> Result<()> {
    let path = path.as_ref();
    if sheet_name.is_empty() || sheet_name.chars().count() > 31 {
        return Err(ExcelError::UnsupportedConfiguration(format!(
            "sheet name must be 1 to 31 characters: {:?}",
            sheet_name
        )));
    }

    let file = File::create(path)?;
    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let parts = [
        ("[Content_Types].xml", CONTENT_TYPES.to_string()),
        ("_rels/.rels", ROOT_RELS.to_string()),
        ("xl/workbook.xml", workbook_xml(sheet_name)),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS.to_string()),
        ("xl/styles.xml", STYLES.to_string()),
        ("xl/worksheets/sheet1.xml", sheet_xml(rows)),
    ];
    for (name, content) in parts {
        zip.start_file(name, options)?;
        zip.write_all(content.as_bytes())?;
    }
    zip.finish()?;

    debug!("Wrote {} row(s) to {}", rows.len(), path.display());
    Ok(())
}

fn workbook_xml(sheet_name: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="{}" sheetId="1" r:id="rId1"/></sheets></workbook>"#,
        escape(sheet_name)
    )
}

fn sheet_xml(rows: &[Vec<Cell>]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );

    for (r, row) in rows.iter().enumerate() {
        xml.push_str(&format!(r#"<row r="{}">"#, r + 1));
        for (c, cell) in row.iter().enumerate() {
            let reference = cell_reference(r, c);
            match cell {
                Cell::Empty => {}
                Cell::Number(v) if v.is_finite() => {
                    xml.push_str(&format!(r#"<c r="{}"><v>{}</v></c>"#, reference, v));
                }
                // Excel has no representation for NaN or infinity
                Cell::Number(v) => xml.push_str(&inline_string(&reference, &v.to_string())),
                Cell::Text(s) => xml.push_str(&inline_string(&reference, s)),
                Cell::Bool(b) => {
                    xml.push_str(&format!(
                        r#"<c r="{}" t="b"><v>{}</v></c>"#,
                        reference,
                        u8::from(*b)
                    ));
                }
                Cell::Date(d) => {
                    xml.push_str(&format!(
                        r#"<c r="{}" s="1"><v>{}</v></c>"#,
                        reference,
                        date_to_serial(*d)
                    ));
                }
                Cell::Error(e) => {
                    xml.push_str(&format!(r#"<c r="{}" t="e"><v>{}</v></c>"#, reference, escape(e.as_str())));
                }
            }
        }
        xml.push_str("</row>");
    }

    xml.push_str("</sheetData></worksheet>");
    xml
}

fn inline_string(reference: &str, text: &str) -> String {
    format!(
        r#"<c r="{}" t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
        reference,
        escape(text)
    )
}

fn date_to_serial(date: NaiveDate) -> i64 {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or(NaiveDate::MIN);
    (date - epoch).num_days()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_serial() {
        let date = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        assert_eq!(date_to_serial(date), 44927);
    }

    #[test]
    fn test_sheet_xml_escapes_text() {
        let xml = sheet_xml(&[vec![Cell::Text("a<b & c".to_string()), Cell::Number(2.5)]]);
        assert!(xml.contains("a&lt;b &amp; c"));
        assert!(xml.contains(r#"<c r="B1"><v>2.5</v></c>"#));
    }

    #[test]
    fn test_rejects_long_sheet_name() {
        let dir = tempfile::tempdir().unwrap();
        let result = write_xlsx(dir.path().join("out.xlsx"), &"x".repeat(40), &[]);
        assert!(matches!(result, Err(ExcelError::UnsupportedConfiguration(_))));
    }
}
