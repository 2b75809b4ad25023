//! Read-only access to `.xlsx` workbooks
//!
//! An `.xlsx` file is a zip container of XML parts. The reader keeps the
//! archive bytes in memory and parses parts on demand: workbook and
//! relationship parts on open, sheet parts when a sheet is requested.

use crate::cell::{excel_serial_to_date, parse_reference, Cell};
use crate::error::{ExcelError, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A worksheet entry from the workbook part
#[derive(Debug, Clone)]
struct SheetEntry {
    name: String,
    /// Archive path of the worksheet part, e.g. `xl/worksheets/sheet1.xml`
    part: String,
}

/// An opened workbook
#[derive(Debug)]
pub struct Workbook {
    path: PathBuf,
    archive: zip::ZipArchive<Cursor<Vec<u8>>>,
    sheets: Vec<SheetEntry>,
    shared_strings: Vec<String>,
    /// Style index -> whether the number format is a date format
    date_styles: Vec<bool>,
    defined_names: BTreeMap<String, String>,
}

impl Workbook {
    /// Open an `.xlsx` workbook
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        match extension(path).as_deref() {
            Some("xlsx") | Some("xlsm") => {}
            Some("xls") => {
                return Err(ExcelError::UnsupportedFormat(format!(
                    "{}: legacy binary .xls workbooks cannot be read, save as .xlsx",
                    path.display()
                )))
            }
            _ => {
                return Err(ExcelError::UnsupportedFormat(format!(
                    "{}: not an Excel workbook",
                    path.display()
                )))
            }
        }

        let mut bytes = Vec::new();
        std::fs::File::open(path)?.read_to_end(&mut bytes)?;
        let archive = zip::ZipArchive::new(Cursor::new(bytes))?;

        let mut workbook = Self {
            path: path.to_path_buf(),
            archive,
            sheets: Vec::new(),
            shared_strings: Vec::new(),
            date_styles: Vec::new(),
            defined_names: BTreeMap::new(),
        };
        workbook.load_structure()?;

        debug!(
            "Opened workbook {} with {} sheet(s)",
            workbook.path.display(),
            workbook.sheets.len()
        );
        Ok(workbook)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sheet names in workbook order
    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }

    /// Defined names (named ranges) and the ranges they refer to
    pub fn defined_names(&self) -> &BTreeMap<String, String> {
        &self.defined_names
    }

    /// Cell grid of a sheet. Rows are padded to the widest row.
    pub fn read_sheet(&mut self, sheet_name: &str) -> Result<Vec<Vec<Cell>>> {
        let xml = self.sheet_xml(sheet_name)?;
        let parsed = self.parse_sheet(&xml)?;

        let width = parsed.cells.keys().map(|(_, c)| c + 1).max().unwrap_or(0);
        let height = parsed.cells.keys().map(|(r, _)| r + 1).max().unwrap_or(0);
        let mut grid = vec![vec![Cell::Empty; width]; height];
        for ((row, column), cell) in parsed.cells {
            grid[row][column] = cell;
        }

        Ok(grid)
    }

    /// Formulas of a sheet keyed by cell reference, each prefixed with `=`
    pub fn formulas(&mut self, sheet_name: &str) -> Result<BTreeMap<String, String>> {
        let xml = self.sheet_xml(sheet_name)?;
        Ok(self.parse_sheet(&xml)?.formulas)
    }

    /// Number of charts anchored on a sheet's drawing parts
    pub fn chart_count(&mut self, sheet_name: &str) -> Result<usize> {
        let part = self.sheet_entry(sheet_name)?.part.clone();
        let sheet_rels = relationships_part(&part);
        let Some(rels_xml) = self.read_optional_part(&sheet_rels)? else {
            return Ok(0);
        };

        let mut charts = 0;
        for rel in parse_relationships(&rels_xml)? {
            if !rel.kind.ends_with("/drawing") {
                continue;
            }
            let drawing = resolve_target(&part, &rel.target);
            if let Some(drawing_rels) = self.read_optional_part(&relationships_part(&drawing))? {
                charts += parse_relationships(&drawing_rels)?
                    .iter()
                    .filter(|r| r.kind.ends_with("/chart"))
                    .count();
            }
        }

        Ok(charts)
    }

    fn sheet_entry(&self, sheet_name: &str) -> Result<&SheetEntry> {
        self.sheets
            .iter()
            .find(|s| s.name == sheet_name)
            .ok_or_else(|| ExcelError::SheetNotFound(sheet_name.to_string()))
    }

    fn sheet_xml(&mut self, sheet_name: &str) -> Result<String> {
        let part = self.sheet_entry(sheet_name)?.part.clone();
        self.read_part(&part)
    }

    fn read_part(&mut self, name: &str) -> Result<String> {
        self.read_optional_part(name)?
            .ok_or_else(|| ExcelError::MissingPart(name.to_string()))
    }

    fn read_optional_part(&mut self, name: &str) -> Result<Option<String>> {
        let mut file = match self.archive.by_name(name) {
            Ok(file) => file,
            Err(zip::result::ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut content = String::new();
        file.read_to_string(&mut content)?;
        Ok(Some(content))
    }

    fn load_structure(&mut self) -> Result<()> {
        let workbook_xml = self.read_part("xl/workbook.xml")?;
        let rels_xml = self.read_part("xl/_rels/workbook.xml.rels")?;
        let targets: HashMap<String, String> = parse_relationships(&rels_xml)?
            .into_iter()
            .map(|rel| (rel.id, resolve_target("xl/workbook.xml", &rel.target)))
            .collect();

        let mut reader = Reader::from_str(&workbook_xml);
        let mut buf = Vec::new();
        let mut current_name: Option<String> = None;
        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(ref e) | Event::Empty(ref e)
                    if e.local_name().as_ref() == b"sheet" =>
                {
                    let name = attribute(e, b"name")?.unwrap_or_default();
                    let rel_id = attribute(e, b"r:id")?.unwrap_or_default();
                    if let Some(part) = targets.get(&rel_id) {
                        self.sheets.push(SheetEntry {
                            name,
                            part: part.clone(),
                        });
                    }
                }
                Event::Start(ref e) if e.local_name().as_ref() == b"definedName" => {
                    current_name = attribute(e, b"name")?;
                }
                Event::Text(ref t) => {
                    if let Some(name) = current_name.take() {
                        self.defined_names.insert(name, t.unescape()?.into_owned());
                    }
                }
                Event::End(ref e) if e.local_name().as_ref() == b"definedName" => {
                    current_name = None;
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if let Some(xml) = self.read_optional_part("xl/sharedStrings.xml")? {
            self.shared_strings = parse_shared_strings(&xml)?;
        }
        if let Some(xml) = self.read_optional_part("xl/styles.xml")? {
            self.date_styles = parse_date_styles(&xml)?;
        }

        Ok(())
    }

    fn parse_sheet(&self, xml: &str) -> Result<ParsedSheet> {
        let mut parsed = ParsedSheet::default();
        let mut reader = Reader::from_str(xml);
        let mut buf = Vec::new();

        let mut current: Option<PendingCell> = None;
        let mut in_value = false;
        let mut in_formula = false;
        let mut in_inline_text = false;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(ref e) => match e.local_name().as_ref() {
                    b"c" => current = Some(PendingCell::from_element(e)?),
                    b"v" => in_value = true,
                    b"f" => in_formula = true,
                    b"t" => in_inline_text = true,
                    _ => {}
                },
                Event::Empty(ref e) if e.local_name().as_ref() == b"c" => {
                    // A styled but empty cell still widens the grid
                    let pending = PendingCell::from_element(e)?;
                    if let Some(position) = parse_reference(&pending.reference) {
                        parsed.cells.insert(position, Cell::Empty);
                    }
                }
                Event::Text(ref t) => {
                    if let Some(cell) = current.as_mut() {
                        let text = t.unescape()?;
                        if in_value {
                            cell.value.push_str(&text);
                        } else if in_formula {
                            cell.formula.get_or_insert_with(String::new).push_str(&text);
                        } else if in_inline_text {
                            cell.value.push_str(&text);
                        }
                    }
                }
                Event::End(ref e) => match e.local_name().as_ref() {
                    b"v" => in_value = false,
                    b"f" => in_formula = false,
                    b"t" => in_inline_text = false,
                    b"c" => {
                        if let Some(cell) = current.take() {
                            self.finish_cell(cell, &mut parsed);
                        }
                    }
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(parsed)
    }

    fn finish_cell(&self, cell: PendingCell, parsed: &mut ParsedSheet) {
        let Some(position) = parse_reference(&cell.reference) else {
            return;
        };
        if let Some(formula) = cell.formula {
            parsed
                .formulas
                .insert(cell.reference.clone(), format!("={}", formula));
        }

        let value = match cell.kind.as_deref() {
            Some("s") => cell
                .value
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|i| self.shared_strings.get(i).cloned())
                .map(Cell::Text)
                .unwrap_or(Cell::Empty),
            Some("str") | Some("inlineStr") => Cell::Text(cell.value),
            Some("b") => Cell::Bool(cell.value.trim() == "1"),
            Some("e") => Cell::Error(cell.value),
            _ if cell.value.is_empty() => Cell::Empty,
            _ => match cell.value.trim().parse::<f64>() {
                Ok(number) => {
                    let is_date = cell
                        .style
                        .and_then(|s| self.date_styles.get(s).copied())
                        .unwrap_or(false);
                    match (is_date, excel_serial_to_date(number)) {
                        (true, Some(date)) => Cell::Date(date),
                        _ => Cell::Number(number),
                    }
                }
                Err(_) => Cell::Text(cell.value),
            },
        };
        parsed.cells.insert(position, value);
    }
}

#[derive(Debug, Default)]
struct ParsedSheet {
    cells: BTreeMap<(usize, usize), Cell>,
    formulas: BTreeMap<String, String>,
}

#[derive(Debug)]
struct PendingCell {
    reference: String,
    kind: Option<String>,
    style: Option<usize>,
    value: String,
    formula: Option<String>,
}

impl PendingCell {
    fn from_element(e: &BytesStart<'_>) -> Result<Self> {
        Ok(Self {
            reference: attribute(e, b"r")?.unwrap_or_default(),
            kind: attribute(e, b"t")?,
            style: attribute(e, b"s")?.and_then(|s| s.parse().ok()),
            value: String::new(),
            formula: None,
        })
    }
}

#[derive(Debug)]
struct Relationship {
    id: String,
    kind: String,
    target: String,
}

fn parse_relationships(xml: &str) -> Result<Vec<Relationship>> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut relationships = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) | Event::Empty(ref e)
                if e.local_name().as_ref() == b"Relationship" =>
            {
                relationships.push(Relationship {
                    id: attribute(e, b"Id")?.unwrap_or_default(),
                    kind: attribute(e, b"Type")?.unwrap_or_default(),
                    target: attribute(e, b"Target")?.unwrap_or_default(),
                });
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(relationships)
}

fn parse_shared_strings(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_text = false;
    // Phonetic runs repeat the reading of the string; skip them
    let mut in_phonetic = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => match e.local_name().as_ref() {
                b"si" => current.clear(),
                b"t" => in_text = true,
                b"rPh" => in_phonetic = true,
                _ => {}
            },
            Event::Text(ref t) if in_text && !in_phonetic => {
                current.push_str(&t.unescape()?);
            }
            Event::End(ref e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"rPh" => in_phonetic = false,
                b"si" => strings.push(std::mem::take(&mut current)),
                _ => {}
            },
            Event::Empty(ref e) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(strings)
}

/// Map each cell style (`cellXfs` entry) to whether it formats a date
fn parse_date_styles(xml: &str) -> Result<Vec<bool>> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut custom_date_formats: HashSet<u32> = HashSet::new();
    let mut styles = Vec::new();
    let mut in_cell_xfs = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) | Event::Empty(ref e) => match e.local_name().as_ref() {
                b"numFmt" => {
                    let id = attribute(e, b"numFmtId")?.and_then(|v| v.parse().ok());
                    let code = attribute(e, b"formatCode")?.unwrap_or_default();
                    if let Some(id) = id {
                        if is_date_format_code(&code) {
                            custom_date_formats.insert(id);
                        }
                    }
                }
                b"cellXfs" => in_cell_xfs = true,
                b"xf" if in_cell_xfs => {
                    let id: u32 = attribute(e, b"numFmtId")?
                        .and_then(|v| v.parse().ok())
                        .unwrap_or(0);
                    styles.push(is_builtin_date_format(id) || custom_date_formats.contains(&id));
                }
                _ => {}
            },
            Event::End(ref e) if e.local_name().as_ref() == b"cellXfs" => in_cell_xfs = false,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(styles)
}

fn is_builtin_date_format(id: u32) -> bool {
    (14..=22).contains(&id) || (45..=47).contains(&id)
}

fn is_date_format_code(code: &str) -> bool {
    // Ignore quoted literals and bracketed sections such as colours or locales
    let mut plain = String::new();
    let mut in_quote = false;
    let mut in_bracket = false;
    for ch in code.chars() {
        match ch {
            '"' => in_quote = !in_quote,
            '[' if !in_quote => in_bracket = true,
            ']' if !in_quote => in_bracket = false,
            _ if !in_quote && !in_bracket => plain.push(ch.to_ascii_lowercase()),
            _ => {}
        }
    }
    plain.contains('y') || plain.contains('d')
}

fn attribute(e: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == key {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// `xl/worksheets/sheet1.xml` -> `xl/worksheets/_rels/sheet1.xml.rels`
fn relationships_part(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part),
    }
}

/// Resolve a relationship target against the part that declares it
fn resolve_target(source_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = match source_part.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').collect(),
        None => Vec::new(),
    };
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

pub(crate) fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_target() {
        assert_eq!(
            resolve_target("xl/workbook.xml", "worksheets/sheet1.xml"),
            "xl/worksheets/sheet1.xml"
        );
        assert_eq!(
            resolve_target("xl/worksheets/sheet1.xml", "../drawings/drawing1.xml"),
            "xl/drawings/drawing1.xml"
        );
        assert_eq!(
            resolve_target("xl/workbook.xml", "/xl/worksheets/sheet2.xml"),
            "xl/worksheets/sheet2.xml"
        );
    }

    #[test]
    fn test_relationships_part() {
        assert_eq!(
            relationships_part("xl/worksheets/sheet1.xml"),
            "xl/worksheets/_rels/sheet1.xml.rels"
        );
    }

    #[test]
    fn test_date_format_codes() {
        assert!(is_date_format_code("yyyy-mm-dd"));
        assert!(is_date_format_code("[$-409]d-mmm-yy;@"));
        assert!(!is_date_format_code("#,##0.00"));
        assert!(!is_date_format_code("\"days\" 0"));
        assert!(is_builtin_date_format(14));
        assert!(!is_builtin_date_format(2));
    }

    #[test]
    fn test_shared_strings_skip_phonetic_runs() {
        let xml = r#"<sst><si><t>Alpha</t></si><si><r><t>Be</t></r><r><t>ta</t></r><rPh><t>x</t></rPh></si><si/></sst>"#;
        let strings = parse_shared_strings(xml).unwrap();
        assert_eq!(strings, vec!["Alpha", "Beta", ""]);
    }

    #[test]
    fn test_xls_is_rejected() {
        let err = Workbook::open("report.xls").unwrap_err();
        assert!(matches!(err, ExcelError::UnsupportedFormat(_)));
    }
}
