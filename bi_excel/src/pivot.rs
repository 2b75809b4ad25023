//! Pivot tables over polars frames

use crate::error::{ExcelError, Result};
use crate::frame::{frame_to_rows, rows_to_frame};
use crate::keys::{column_keys, KeyValue};
use crate::workbook::{extension, Workbook};
use crate::writer::write_xlsx;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

/// Aggregation applied to the values of each pivot cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggFunc {
    Sum,
    Mean,
    Count,
    Min,
    Max,
    Median,
}

impl Default for AggFunc {
    fn default() -> Self {
        AggFunc::Sum
    }
}

impl FromStr for AggFunc {
    type Err = ExcelError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "sum" => Ok(AggFunc::Sum),
            "mean" | "avg" | "average" => Ok(AggFunc::Mean),
            "count" => Ok(AggFunc::Count),
            "min" => Ok(AggFunc::Min),
            "max" => Ok(AggFunc::Max),
            "median" => Ok(AggFunc::Median),
            other => Err(ExcelError::UnsupportedConfiguration(format!(
                "unknown aggregation function: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for AggFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AggFunc::Sum => "sum",
            AggFunc::Mean => "mean",
            AggFunc::Count => "count",
            AggFunc::Min => "min",
            AggFunc::Max => "max",
            AggFunc::Median => "median",
        };
        write!(f, "{}", name)
    }
}

impl AggFunc {
    /// Aggregate the non-null values of one cell. `None` when the cell has
    /// no rows at all.
    pub fn apply(&self, values: &[Option<f64>]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        let present: Vec<f64> = values.iter().flatten().copied().collect();
        match self {
            AggFunc::Count => Some(present.len() as f64),
            _ if present.is_empty() => None,
            AggFunc::Sum => Some(present.iter().sum()),
            AggFunc::Mean => Some(present.iter().sum::<f64>() / present.len() as f64),
            AggFunc::Min => present.iter().copied().reduce(f64::min),
            AggFunc::Max => present.iter().copied().reduce(f64::max),
            AggFunc::Median => {
                let mut sorted = present;
                sorted.sort_by(|a, b| a.total_cmp(b));
                let mid = sorted.len() / 2;
                if sorted.len() % 2 == 0 {
                    Some((sorted[mid - 1] + sorted[mid]) / 2.0)
                } else {
                    Some(sorted[mid])
                }
            }
        }
    }
}

/// Builds pivot tables from a source frame
#[derive(Debug, Clone)]
pub struct PivotGenerator {
    data: DataFrame,
}

impl PivotGenerator {
    pub fn new(data: DataFrame) -> Self {
        Self { data }
    }

    /// Load the source from a `.csv` file or the first sheet of an `.xlsx`
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = match extension(path).as_deref() {
            Some("csv") => CsvReader::new(File::open(path)?)
                .infer_schema(None)
                .has_header(true)
                .finish()?,
            Some("xlsx") | Some("xlsm") | Some("xls") => {
                let mut workbook = Workbook::open(path)?;
                let first = workbook
                    .sheet_names()
                    .into_iter()
                    .next()
                    .ok_or_else(|| ExcelError::MissingPart("worksheet".to_string()))?;
                rows_to_frame(&workbook.read_sheet(&first)?)?
            }
            _ => {
                return Err(ExcelError::UnsupportedFormat(format!(
                    "{}: expected .csv or .xlsx",
                    path.display()
                )))
            }
        };
        Ok(Self { data })
    }

    pub fn data(&self) -> &DataFrame {
        &self.data
    }

    /// Pivot `values` by the distinct keys of `index` (rows) and optionally
    /// `columns`.
    ///
    /// Rows are sorted by index key; null index keys are dropped. With
    /// `columns`, each value column expands into one output column per
    /// distinct column key, named `<value>_<key>`.
    pub fn create_pivot(
        &self,
        index: &str,
        columns: Option<&str>,
        values: &[&str],
        aggfunc: AggFunc,
    ) -> Result<DataFrame> {
        if values.is_empty() {
            return Err(ExcelError::UnsupportedConfiguration(
                "pivot needs at least one value column".to_string(),
            ));
        }

        let index_series = self.column(index)?;
        let index_keys = column_keys(index_series)?;
        let column_keys_per_row = match columns {
            Some(name) => Some(column_keys(self.column(name)?)?),
            None => None,
        };

        let value_data = values
            .iter()
            .map(|&name| -> Result<Vec<Option<f64>>> {
                let series = self.column(name)?;
                if aggfunc == AggFunc::Count {
                    // Any non-null value counts, whatever its type
                    let present = series.is_not_null();
                    return Ok(present
                        .into_iter()
                        .map(|p| (p == Some(true)).then_some(1.0))
                        .collect());
                }
                let dtype = series.dtype();
                if !(dtype.is_numeric() || dtype == &DataType::Boolean) {
                    return Err(ExcelError::UnsupportedConfiguration(format!(
                        "cannot {} column {} of type {}",
                        aggfunc, name, dtype
                    )));
                }
                let series = series.cast(&DataType::Float64)?;
                let values = series.f64()?.into_iter().collect();
                Ok(values)
            })
            .collect::<Result<Vec<_>>>()?;

        // Row group per index key, remembering the first row for the label
        let mut groups: BTreeMap<KeyValue, (IdxSize, Vec<usize>)> = BTreeMap::new();
        for (row, key) in index_keys.iter().enumerate() {
            if let Some(key) = key {
                groups
                    .entry(key.clone())
                    .or_insert_with(|| (row as IdxSize, Vec::new()))
                    .1
                    .push(row);
            }
        }

        let first_rows: Vec<IdxSize> = groups.values().map(|(first, _)| *first).collect();
        let index_column = index_series.take(&IdxCa::from_vec(index, first_rows))?;
        let mut output = vec![index_column];

        match &column_keys_per_row {
            None => {
                for (name, data) in values.iter().zip(&value_data) {
                    let cells: Vec<Option<f64>> = groups
                        .values()
                        .map(|(_, rows)| {
                            let cell: Vec<Option<f64>> = rows.iter().map(|&r| data[r]).collect();
                            aggfunc.apply(&cell)
                        })
                        .collect();
                    output.push(Series::new(name, cells));
                }
            }
            Some(col_keys) => {
                let mut distinct: Vec<KeyValue> = col_keys.iter().flatten().cloned().collect();
                distinct.sort();
                distinct.dedup();

                for (name, data) in values.iter().zip(&value_data) {
                    for key in &distinct {
                        let cells: Vec<Option<f64>> = groups
                            .values()
                            .map(|(_, rows)| {
                                let cell: Vec<Option<f64>> = rows
                                    .iter()
                                    .filter(|&&r| col_keys[r].as_ref() == Some(key))
                                    .map(|&r| data[r])
                                    .collect();
                                aggfunc.apply(&cell)
                            })
                            .collect();
                        output.push(Series::new(&format!("{}_{}", name, key), cells));
                    }
                }
            }
        }

        let pivot = DataFrame::new(output)?;
        debug!(
            "Pivot on {} by {:?} with {}: {} x {}",
            index,
            columns,
            aggfunc,
            pivot.height(),
            pivot.width()
        );
        Ok(pivot)
    }

    fn column(&self, name: &str) -> Result<&Series> {
        self.data
            .column(name)
            .map_err(|_| ExcelError::ColumnNotFound(name.to_string()))
    }
}

/// Write a frame as the single sheet of a new `.xlsx` workbook
pub fn export_xlsx<P: AsRef<Path>>(df: &DataFrame, path: P, sheet_name: &str) -> Result<()> {
    let path = path.as_ref();
    write_xlsx(path, sheet_name, &frame_to_rows(df)?)?;
    info!("Exported {} rows to {}", df.height(), path.display());
    Ok(())
}

/// Write a frame as CSV with a header row
pub fn export_csv<P: AsRef<Path>>(df: &DataFrame, path: P) -> Result<()> {
    let path = path.as_ref();
    let mut file = File::create(path)?;
    let mut df = df.clone();
    CsvWriter::new(&mut file).has_header(true).finish(&mut df)?;
    info!("Exported {} rows to {}", df.height(), path.display());
    Ok(())
}

/// Export by extension: `.xlsx` or `.csv`
pub fn export<P: AsRef<Path>>(df: &DataFrame, path: P, sheet_name: &str) -> Result<()> {
    let path = path.as_ref();
    match extension(path).as_deref() {
        Some("xlsx") => export_xlsx(df, path, sheet_name),
        Some("csv") => export_csv(df, path),
        _ => Err(ExcelError::UnsupportedFormat(format!(
            "{}: pivot output must be .xlsx or .csv",
            path.display()
        ))),
    }
}
