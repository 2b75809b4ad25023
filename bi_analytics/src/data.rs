//! Tabular data handling for analytics

use crate::error::{AnalyticsError, Result};
use bi_excel::frame::{date_from_days, days_since_epoch};
use bi_excel::keys::column_keys;
use bi_excel::{rows_to_frame, KeyValue, Workbook};
use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use tracing::{debug, info};

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y"];
const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Dates taken from a column and used to index the remaining columns
#[derive(Debug, Clone, PartialEq)]
pub struct DateIndex {
    /// Name of the column the dates came from
    pub column: String,
    pub dates: Vec<NaiveDate>,
}

/// A data frame with an optional date index
#[derive(Debug, Clone)]
pub struct Dataset {
    df: DataFrame,
    index: Option<DateIndex>,
}

/// Loads tabular data from files
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Load a frame from `.csv`, `.xlsx` or `.xls` by extension
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<DataFrame> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match extension.as_deref() {
            Some("csv") => Self::from_csv(path),
            Some("xlsx") | Some("xlsm") | Some("xls") => Self::from_excel(path, None),
            _ => Err(AnalyticsError::UnsupportedFormat(format!(
                "Unsupported file format: {}",
                path.display()
            ))),
        }
    }

    /// Load a frame from a CSV file with a header row
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<DataFrame> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let df = CsvReader::new(file)
            .infer_schema(None)
            .has_header(true)
            .finish()?;

        debug!("Loaded {} rows from {}", df.height(), path.display());
        Ok(df)
    }

    /// Load a sheet (the first one by default) of an Excel workbook
    pub fn from_excel<P: AsRef<Path>>(path: P, sheet: Option<&str>) -> Result<DataFrame> {
        let path = path.as_ref();
        let mut workbook = Workbook::open(path)?;
        let sheet = match sheet {
            Some(name) => name.to_string(),
            None => workbook.sheet_names().into_iter().next().ok_or_else(|| {
                AnalyticsError::DataError(format!("{} has no worksheets", path.display()))
            })?,
        };
        let df = rows_to_frame(&workbook.read_sheet(&sheet)?)?;

        debug!(
            "Loaded {} rows from sheet {} of {}",
            df.height(),
            sheet,
            path.display()
        );
        Ok(df)
    }

    /// Load a file into a dataset, optionally indexed by a date column
    pub fn load<P: AsRef<Path>>(
        path: P,
        date_col: Option<&str>,
        value_col: Option<&str>,
    ) -> Result<Dataset> {
        let path = path.as_ref();
        let dataset = Dataset::new(Self::from_path(path)?).indexed(date_col, value_col)?;
        info!(
            "Loaded dataset from {} ({} rows, {} columns)",
            path.display(),
            dataset.height(),
            dataset.width()
        );
        Ok(dataset)
    }
}

impl Dataset {
    pub fn new(df: DataFrame) -> Self {
        Self { df, index: None }
    }

    /// Index by `date_col` when given. The date column leaves the value
    /// columns and, when `value_col` is given, only that column is kept.
    pub fn indexed(self, date_col: Option<&str>, value_col: Option<&str>) -> Result<Self> {
        match date_col {
            Some(date_col) => self.with_date_index(date_col, value_col),
            None => match value_col {
                Some(value_col) => {
                    self.column(value_col)?;
                    Ok(self)
                }
                None => Ok(self),
            },
        }
    }

    /// Move `date_col` into the date index
    pub fn with_date_index(self, date_col: &str, value_col: Option<&str>) -> Result<Self> {
        let dates = self.date_values(date_col)?;
        let dates = dates
            .into_iter()
            .enumerate()
            .map(|(row, date)| {
                date.ok_or_else(|| {
                    AnalyticsError::DataError(format!(
                        "Column {} has a missing or unparseable date at row {}",
                        date_col, row
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let df = match value_col {
            Some(value_col) => DataFrame::new(vec![self.column(value_col)?.clone()])?,
            None => self.df.drop(date_col)?,
        };

        Ok(Self {
            df,
            index: Some(DateIndex {
                column: date_col.to_string(),
                dates,
            }),
        })
    }

    pub fn frame(&self) -> &DataFrame {
        &self.df
    }

    pub fn into_frame(self) -> DataFrame {
        self.df
    }

    pub fn index(&self) -> Option<&DateIndex> {
        self.index.as_ref()
    }

    pub fn dates(&self) -> Option<&[NaiveDate]> {
        self.index.as_ref().map(|i| i.dates.as_slice())
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    pub fn width(&self) -> usize {
        self.df.width()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    /// First value column, used whenever a caller does not name one
    pub fn default_column(&self) -> Result<String> {
        self.df
            .get_column_names()
            .first()
            .map(|s| s.to_string())
            .ok_or_else(|| AnalyticsError::DataError("Dataset has no value columns".to_string()))
    }

    /// Named column if it exists, else the default column
    pub fn resolve_column(&self, column: Option<&str>) -> Result<String> {
        match column {
            Some(name) => {
                self.column(name)?;
                Ok(name.to_string())
            }
            None => self.default_column(),
        }
    }

    pub fn column(&self, name: &str) -> Result<&Series> {
        self.df
            .column(name)
            .map_err(|_| AnalyticsError::ColumnNotFound(name.to_string()))
    }

    /// Columns with a numeric type
    pub fn numeric_columns(&self) -> Vec<String> {
        self.df
            .get_columns()
            .iter()
            .filter(|s| s.dtype().is_numeric())
            .map(|s| s.name().to_string())
            .collect()
    }

    /// Values of a column as `f64`; nulls stay `None`
    pub fn optional_values(&self, name: &str) -> Result<Vec<Option<f64>>> {
        let series = self.column(name)?;
        if !series.dtype().is_numeric() && series.dtype() != &DataType::Boolean {
            return Err(AnalyticsError::DataError(format!(
                "Column {} is not numeric ({})",
                name,
                series.dtype()
            )));
        }
        let values = series
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .collect();
        Ok(values)
    }

    /// Values of a column with nulls dropped
    pub fn values(&self, name: &str) -> Result<Vec<f64>> {
        Ok(self.optional_values(name)?.into_iter().flatten().collect())
    }

    /// Values of a column that must not contain nulls
    pub fn complete_values(&self, name: &str) -> Result<Vec<f64>> {
        self.optional_values(name)?
            .into_iter()
            .enumerate()
            .map(|(row, v)| {
                v.ok_or_else(|| {
                    AnalyticsError::DataError(format!("Column {} has a null at row {}", name, row))
                })
            })
            .collect()
    }

    /// Dates of a column. Text is parsed with common date layouts; values
    /// that do not parse are `None`.
    pub fn date_values(&self, name: &str) -> Result<Vec<Option<NaiveDate>>> {
        let series = self.column(name)?;
        let dates = match series.dtype() {
            DataType::Date | DataType::Datetime(_, _) => series
                .cast(&DataType::Date)?
                .date()?
                .into_iter()
                .map(|d| d.and_then(date_from_days))
                .collect(),
            DataType::Utf8 => series
                .utf8()?
                .into_iter()
                .map(|s| s.and_then(parse_date))
                .collect(),
            other => {
                return Err(AnalyticsError::DataError(format!(
                    "Column {} of type {} does not hold dates",
                    name, other
                )))
            }
        };
        Ok(dates)
    }

    /// Sort keys of a period column. Text that reads as a date or a number
    /// is keyed as one.
    pub fn period_keys(&self, name: &str) -> Result<Vec<Option<KeyValue>>> {
        let keys = column_keys(self.column(name)?)?
            .into_iter()
            .map(|key| match key {
                Some(KeyValue::Text(text)) => Some(text_key(text)),
                other => other,
            })
            .collect();
        Ok(keys)
    }

    /// Rows at `indices`, in that order. The date index follows the rows.
    pub fn take_rows(&self, indices: &[IdxSize]) -> Result<Self> {
        let df = self
            .df
            .take(&IdxCa::from_vec("idx", indices.to_vec()))?;
        let index = self.index.as_ref().map(|index| DateIndex {
            column: index.column.clone(),
            dates: indices
                .iter()
                .filter_map(|&i| index.dates.get(i as usize).copied())
                .collect(),
        });
        Ok(Self { df, index })
    }
}

impl From<DataFrame> for Dataset {
    fn from(df: DataFrame) -> Self {
        Dataset::new(df)
    }
}

/// Parse a date in one of the accepted text layouts
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(text, f).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(text, f).ok())
                .map(|dt| dt.date())
        })
}

fn text_key(text: String) -> KeyValue {
    if let Some(date) = parse_date(&text) {
        return KeyValue::Date(days_since_epoch(date));
    }
    match text.trim().parse::<f64>() {
        Ok(number) if number.is_finite() => KeyValue::Number(number),
        _ => KeyValue::Text(text),
    }
}

/// Build a polars `Date` series from calendar dates
pub fn date_series(name: &str, dates: &[NaiveDate]) -> Result<Series> {
    let days: Vec<i32> = dates.iter().map(|d| days_since_epoch(*d)).collect();
    Ok(Series::new(name, days).cast(&DataType::Date)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> DataFrame {
        df!(
            "date" => &["2024-01-01", "2024-01-02", "2024-01-03"],
            "sales" => &[10.0, 12.0, 9.0],
            "visits" => &[100i64, 120, 90]
        )
        .unwrap()
    }

    #[test]
    fn test_date_index_removes_date_column() {
        let dataset = Dataset::new(sample()).with_date_index("date", None).unwrap();
        assert_eq!(dataset.column_names(), vec!["sales", "visits"]);
        assert_eq!(dataset.default_column().unwrap(), "sales");
        assert_eq!(
            dataset.dates().unwrap()[2],
            NaiveDate::from_ymd_opt(2024, 1, 3).unwrap()
        );
    }

    #[test]
    fn test_date_index_with_value_column() {
        let dataset = Dataset::new(sample())
            .with_date_index("date", Some("visits"))
            .unwrap();
        assert_eq!(dataset.column_names(), vec!["visits"]);
        assert_eq!(dataset.values("visits").unwrap(), vec![100.0, 120.0, 90.0]);
    }

    #[test]
    fn test_unknown_column() {
        let dataset = Dataset::new(sample());
        assert!(matches!(
            dataset.values("profit"),
            Err(AnalyticsError::ColumnNotFound(_))
        ));
        assert!(matches!(
            dataset.values("date"),
            Err(AnalyticsError::DataError(_))
        ));
    }

    #[test]
    fn test_parse_date_layouts() {
        let expected = NaiveDate::from_ymd_opt(2023, 7, 4);
        assert_eq!(parse_date("2023-07-04"), expected);
        assert_eq!(parse_date("07/04/2023"), expected);
        assert_eq!(parse_date("2023-07-04 13:45:00"), expected);
        assert_eq!(parse_date("July"), None);
    }

    #[test]
    fn test_period_keys_from_text() {
        let df = df!("period" => &["10", "2", "Q1"]).unwrap();
        let keys = Dataset::new(df).period_keys("period").unwrap();
        assert_eq!(
            keys,
            vec![
                Some(KeyValue::Number(10.0)),
                Some(KeyValue::Number(2.0)),
                Some(KeyValue::Text("Q1".into())),
            ]
        );
    }

    #[test]
    fn test_unsupported_extension() {
        assert!(matches!(
            DataLoader::from_path("data.json"),
            Err(AnalyticsError::UnsupportedFormat(_))
        ));
    }
}
