//! Conversion between cell grids and polars frames

use crate::cell::Cell;
use crate::error::Result;
use chrono::{Days, NaiveDate};
use polars::prelude::*;
use std::collections::HashSet;

/// Inferred type of a worksheet column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Numeric,
    Text,
    Date,
    /// Every data cell is empty
    Empty,
}

/// Infer the kind of a column from its non-empty cells.
///
/// Numbers and booleans are numeric, dates are dates. A column mixing kinds
/// is text.
pub fn infer_kind<'a, I>(cells: I) -> ColumnKind
where
    I: IntoIterator<Item = &'a Cell>,
{
    let mut kind = ColumnKind::Empty;
    for cell in cells {
        let cell_kind = match cell {
            Cell::Empty => continue,
            Cell::Number(_) | Cell::Bool(_) => ColumnKind::Numeric,
            Cell::Date(_) => ColumnKind::Date,
            Cell::Text(_) | Cell::Error(_) => ColumnKind::Text,
        };
        kind = match kind {
            ColumnKind::Empty => cell_kind,
            current if current == cell_kind => current,
            _ => return ColumnKind::Text,
        };
    }
    kind
}

/// Header names from the first row. Blank names become `Unnamed: <i>` and
/// repeated names get a `.<n>` suffix.
pub fn header_names(header: &[Cell], width: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    (0..width)
        .map(|i| {
            let raw = header
                .get(i)
                .map(|c| c.to_string().trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| format!("Unnamed: {}", i));
            let mut name = raw.clone();
            let mut suffix = 1;
            while !seen.insert(name.clone()) {
                name = format!("{}.{}", raw, suffix);
                suffix += 1;
            }
            name
        })
        .collect()
}

/// Build a frame from a cell grid whose first row is the header
pub fn rows_to_frame(rows: &[Vec<Cell>]) -> Result<DataFrame> {
    let Some((header, body)) = rows.split_first() else {
        return Ok(DataFrame::default());
    };
    let width = rows.iter().map(|r| r.len()).max().unwrap_or(0);
    let names = header_names(header, width);

    let empty = Cell::Empty;
    let mut columns = Vec::with_capacity(width);
    for (i, name) in names.iter().enumerate() {
        let cells: Vec<&Cell> = body.iter().map(|r| r.get(i).unwrap_or(&empty)).collect();
        let series = match infer_kind(cells.iter().copied()) {
            ColumnKind::Numeric | ColumnKind::Empty => {
                let values: Vec<Option<f64>> = cells.iter().map(|c| c.as_f64()).collect();
                Series::new(name, values)
            }
            ColumnKind::Date => {
                let days: Vec<Option<i32>> = cells
                    .iter()
                    .map(|c| match c {
                        Cell::Date(d) => Some(days_since_epoch(*d)),
                        _ => None,
                    })
                    .collect();
                Series::new(name, days).cast(&DataType::Date)?
            }
            ColumnKind::Text => {
                let values: Vec<Option<String>> = cells
                    .iter()
                    .map(|c| if c.is_empty() { None } else { Some(c.to_string()) })
                    .collect();
                Series::new(name, values)
            }
        };
        columns.push(series);
    }

    Ok(DataFrame::new(columns)?)
}

/// Header row followed by one row per frame row
pub fn frame_to_rows(df: &DataFrame) -> Result<Vec<Vec<Cell>>> {
    let mut rows: Vec<Vec<Cell>> = Vec::with_capacity(df.height() + 1);
    rows.push(
        df.get_column_names()
            .iter()
            .map(|n| Cell::Text(n.to_string()))
            .collect(),
    );
    for _ in 0..df.height() {
        rows.push(Vec::with_capacity(df.width()));
    }

    for series in df.get_columns() {
        let cells = series_cells(series)?;
        for (row, cell) in rows.iter_mut().skip(1).zip(cells) {
            row.push(cell);
        }
    }

    Ok(rows)
}

fn series_cells(series: &Series) -> Result<Vec<Cell>> {
    let cells = match series.dtype() {
        DataType::Boolean => series
            .bool()?
            .into_iter()
            .map(|v| v.map(Cell::Bool).unwrap_or(Cell::Empty))
            .collect(),
        DataType::Utf8 => series
            .utf8()?
            .into_iter()
            .map(|v| v.map(|s| Cell::Text(s.to_string())).unwrap_or(Cell::Empty))
            .collect(),
        DataType::Date | DataType::Datetime(_, _) => {
            let dates = series.cast(&DataType::Date)?;
            dates
                .date()?
                .into_iter()
                .map(|v| v.and_then(date_from_days).map(Cell::Date).unwrap_or(Cell::Empty))
                .collect()
        }
        dtype if dtype.is_numeric() => series
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .map(|v| v.map(Cell::Number).unwrap_or(Cell::Empty))
            .collect(),
        _ => series
            .cast(&DataType::Utf8)?
            .utf8()?
            .into_iter()
            .map(|v| v.map(|s| Cell::Text(s.to_string())).unwrap_or(Cell::Empty))
            .collect(),
    };
    Ok(cells)
}

fn unix_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// Days since 1970-01-01, the physical value of a polars `Date`
pub fn days_since_epoch(date: NaiveDate) -> i32 {
    (date - unix_epoch()).num_days() as i32
}

/// Inverse of [`days_since_epoch`]
pub fn date_from_days(days: i32) -> Option<NaiveDate> {
    let epoch = unix_epoch();
    if days >= 0 {
        epoch.checked_add_days(Days::new(days as u64))
    } else {
        epoch.checked_sub_days(Days::new(days.unsigned_abs() as u64))
    }
}
