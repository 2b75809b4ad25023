//! # BI Excel
//!
//! Workbook access for the BI platform.
//!
//! ## Features
//!
//! - `.xlsx` reading: sheet names, cell grids, formulas, chart counts and
//!   defined names
//! - Sheet profiling with [`ExcelAnalyzer`]
//! - Pivot tables over polars frames with [`PivotGenerator`]
//! - `.xlsx` and `.csv` export
//!
//! ## Quick Start
//!
//! ```no_run
//! use bi_excel::{AggFunc, ExcelAnalyzer, PivotGenerator};
//!
//! let mut analyzer = ExcelAnalyzer::open("sales.xlsx")?;
//! let report = analyzer.analyze_workbook()?;
//! println!("{} sheets", report.sheet_names.len());
//!
//! let pivot = PivotGenerator::from_path("sales.xlsx")?
//!     .create_pivot("region", None, &["revenue"], AggFunc::Sum)?;
//! bi_excel::export_xlsx(&pivot, "pivot.xlsx", "Pivot")?;
//! # Ok::<(), bi_excel::ExcelError>(())
//! ```

pub mod analyzer;
pub mod cell;
pub mod error;
pub mod frame;
pub mod keys;
pub mod pivot;
pub mod workbook;
pub mod writer;

pub use crate::analyzer::{ExcelAnalyzer, SheetAnalysis, WorkbookAnalysis};
pub use crate::cell::Cell;
pub use crate::error::{ExcelError, Result};
pub use crate::frame::{frame_to_rows, rows_to_frame};
pub use crate::keys::KeyValue;
pub use crate::pivot::{export, export_csv, export_xlsx, AggFunc, PivotGenerator};
pub use crate::workbook::Workbook;
pub use crate::writer::write_xlsx;

/// Sheet name used for exported pivot tables
pub const DEFAULT_PIVOT_SHEET: &str = "Pivot";
