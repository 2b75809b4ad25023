//! Sheet profiling

use crate::cell::Cell;
use crate::error::Result;
use crate::frame::{header_names, infer_kind, ColumnKind};
use crate::workbook::Workbook;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/// Profile of one worksheet, with its first row taken as the header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetAnalysis {
    pub sheet_name: String,
    /// Data rows, header excluded
    pub row_count: usize,
    pub column_count: usize,
    /// Empty cell count per column
    pub missing_values: BTreeMap<String, usize>,
    pub numeric_columns: Vec<String>,
    pub text_columns: Vec<String>,
    pub date_columns: Vec<String>,
    /// Formulas keyed by cell reference
    pub formulas: BTreeMap<String, String>,
    pub chart_count: usize,
}

/// Workbook-level analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkbookAnalysis {
    pub sheet_names: Vec<String>,
    pub defined_names: BTreeMap<String, String>,
    pub sheets: Vec<SheetAnalysis>,
}

/// Analyzer over an opened workbook
#[derive(Debug)]
pub struct ExcelAnalyzer {
    workbook: Workbook,
}

impl ExcelAnalyzer {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self {
            workbook: Workbook::open(path)?,
        })
    }

    pub fn new(workbook: Workbook) -> Self {
        Self { workbook }
    }

    pub fn workbook(&mut self) -> &mut Workbook {
        &mut self.workbook
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.workbook.sheet_names()
    }

    /// Profile one sheet
    pub fn analyze_sheet(&mut self, sheet_name: &str) -> Result<SheetAnalysis> {
        let rows = self.workbook.read_sheet(sheet_name)?;
        let formulas = self.workbook.formulas(sheet_name)?;
        let chart_count = self.workbook.chart_count(sheet_name)?;

        let mut analysis = profile_rows(sheet_name, &rows);
        analysis.formulas = formulas;
        analysis.chart_count = chart_count;

        debug!(
            "Sheet {}: {} rows x {} columns",
            sheet_name, analysis.row_count, analysis.column_count
        );
        Ok(analysis)
    }

    /// Profile every sheet in workbook order
    pub fn analyze_workbook(&mut self) -> Result<WorkbookAnalysis> {
        let sheet_names = self.workbook.sheet_names();
        let mut sheets = Vec::with_capacity(sheet_names.len());
        for name in &sheet_names {
            sheets.push(self.analyze_sheet(name)?);
        }
        info!(
            "Analyzed {} sheet(s) of {}",
            sheets.len(),
            self.workbook.path().display()
        );

        Ok(WorkbookAnalysis {
            sheet_names,
            defined_names: self.workbook.defined_names().clone(),
            sheets,
        })
    }
}

/// Profile a cell grid without formula or chart information
pub fn profile_rows(sheet_name: &str, rows: &[Vec<Cell>]) -> SheetAnalysis {
    let width = rows.iter().map(|r| r.len()).max().unwrap_or(0);
    let (header, body) = match rows.split_first() {
        Some((header, body)) => (header.as_slice(), body),
        None => (&[][..], &[][..]),
    };
    let names = header_names(header, width);

    let mut analysis = SheetAnalysis {
        sheet_name: sheet_name.to_string(),
        row_count: body.len(),
        column_count: width,
        missing_values: BTreeMap::new(),
        numeric_columns: Vec::new(),
        text_columns: Vec::new(),
        date_columns: Vec::new(),
        formulas: BTreeMap::new(),
        chart_count: 0,
    };

    let empty = Cell::Empty;
    for (i, name) in names.into_iter().enumerate() {
        let column = body.iter().map(|r| r.get(i).unwrap_or(&empty));
        let missing = column.clone().filter(|c| c.is_empty()).count();
        analysis.missing_values.insert(name.clone(), missing);

        match infer_kind(column) {
            ColumnKind::Numeric => analysis.numeric_columns.push(name),
            ColumnKind::Date => analysis.date_columns.push(name),
            ColumnKind::Text => analysis.text_columns.push(name),
            ColumnKind::Empty => {}
        }
    }

    analysis
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_profile_rows() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let rows = vec![
            vec![
                Cell::Text("date".into()),
                Cell::Text("region".into()),
                Cell::Text("sales".into()),
            ],
            vec![Cell::Date(date), Cell::Text("north".into()), Cell::Number(10.0)],
            vec![Cell::Date(date), Cell::Empty, Cell::Number(12.0)],
        ];

        let analysis = profile_rows("Data", &rows);
        assert_eq!(analysis.row_count, 2);
        assert_eq!(analysis.column_count, 3);
        assert_eq!(analysis.numeric_columns, vec!["sales"]);
        assert_eq!(analysis.text_columns, vec!["region"]);
        assert_eq!(analysis.date_columns, vec!["date"]);
        assert_eq!(analysis.missing_values["region"], 1);
        assert_eq!(analysis.missing_values["sales"], 0);
    }

    #[test]
    fn test_profile_empty_sheet() {
        let analysis = profile_rows("Blank", &[]);
        assert_eq!(analysis.row_count, 0);
        assert_eq!(analysis.column_count, 0);
        assert!(analysis.missing_values.is_empty());
    }
}
