//! Business KPIs over period tables
//!
//! Every period-based KPI filters to the requested periods, sorts rows by
//! period and appends its metric columns after the inputs it used. Division
//! by zero yields a non-finite value for that row instead of an error.

use crate::data::{DataLoader, Dataset};
use crate::error::{AnalyticsError, Result};
use bi_excel::keys::{column_keys, sorted_order};
use bi_excel::KeyValue;
use polars::prelude::*;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Default annualisation window for customer lifetime value
pub const DEFAULT_CLV_PERIOD_DAYS: u32 = 365;

/// KPI calculator over a loaded dataset
#[derive(Debug, Clone, Default)]
pub struct KpiCalculator {
    data: Option<Dataset>,
}

impl KpiCalculator {
    pub fn new(data: Option<Dataset>) -> Self {
        Self { data }
    }

    /// Replace the loaded dataset
    pub fn load(&mut self, data: Dataset) {
        self.data = Some(data);
    }

    /// Load the dataset from a `.csv`/`.xlsx` file
    pub fn load_path<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.data = Some(Dataset::new(DataLoader::from_path(path)?));
        Ok(())
    }

    fn data(&self) -> Result<&Dataset> {
        self.data
            .as_ref()
            .ok_or_else(|| AnalyticsError::DataAbsent("No data loaded".to_string()))
    }

    /// Period-over-period revenue growth in percent. The first row is null.
    pub fn revenue_growth(
        &self,
        period_col: &str,
        revenue_col: &str,
        periods: Option<&[String]>,
    ) -> Result<DataFrame> {
        let table = self.period_table(period_col, &[revenue_col], periods)?;
        let revenue = float_values(&table, revenue_col)?;

        let growth: Vec<Option<f64>> = std::iter::once(None)
            .chain(revenue.windows(2).map(|w| match (w[0], w[1]) {
                (Some(previous), Some(current)) => Some((current - previous) / previous * 100.0),
                _ => None,
            }))
            .take(revenue.len())
            .collect();

        with_metrics(table, vec![Series::new("revenue_growth", growth)])
    }

    /// Marketing spend per newly acquired customer
    pub fn customer_acquisition_cost(
        &self,
        period_col: &str,
        spend_col: &str,
        new_customers_col: &str,
        periods: Option<&[String]>,
    ) -> Result<DataFrame> {
        let table = self.period_table(period_col, &[spend_col, new_customers_col], periods)?;
        let spend = float_values(&table, spend_col)?;
        let new_customers = float_values(&table, new_customers_col)?;

        let cac = zip_with(&spend, &new_customers, |s, n| s / n);
        with_metrics(table, vec![Series::new("cac", cac)])
    }

    /// Customer lifetime value, one row per customer sorted by customer key.
    ///
    /// With a date column the value is annualised over the customer's
    /// purchase span; a customer whose purchases all fall on one day keeps
    /// their total revenue as the value.
    pub fn customer_lifetime_value(
        &self,
        customer_id_col: &str,
        revenue_col: &str,
        date_col: Option<&str>,
        time_period_days: u32,
    ) -> Result<DataFrame> {
        let data = self.data()?;
        let customers = data.column(customer_id_col)?;
        let keys = column_keys(customers)?;
        let revenue = data.optional_values(revenue_col)?;
        let dates = match date_col {
            Some(name) => Some(data.date_values(name)?),
            None => None,
        };

        let mut groups: BTreeMap<KeyValue, (IdxSize, Vec<usize>)> = BTreeMap::new();
        for (row, key) in keys.into_iter().enumerate() {
            if let Some(key) = key {
                groups
                    .entry(key)
                    .or_insert_with(|| (row as IdxSize, Vec::new()))
                    .1
                    .push(row);
            }
        }

        let first_rows: Vec<IdxSize> = groups.values().map(|(first, _)| *first).collect();
        let customer_column = customers.take(&IdxCa::from_vec("idx", first_rows))?;
        let totals: Vec<f64> = groups
            .values()
            .map(|(_, rows)| rows.iter().filter_map(|&r| revenue[r]).sum())
            .collect();

        let result = match dates {
            Some(dates) => {
                let lifespans: Vec<Option<i64>> = groups
                    .values()
                    .map(|(_, rows)| {
                        let mut span = rows.iter().filter_map(|&r| dates[r]);
                        let first = span.next()?;
                        let (min, max) = span.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d)));
                        Some((max - min).num_days())
                    })
                    .collect();
                let clv: Vec<Option<f64>> = lifespans
                    .iter()
                    .zip(&totals)
                    .map(|(lifespan, &total)| match lifespan {
                        Some(0) => Some(total),
                        Some(days) => Some(total / *days as f64 * time_period_days as f64),
                        None => None,
                    })
                    .collect();

                DataFrame::new(vec![
                    customer_column,
                    Series::new("lifespan_days", lifespans),
                    Series::new("total_revenue", totals),
                    Series::new("clv", clv),
                ])?
            }
            None => DataFrame::new(vec![customer_column, Series::new("clv", totals)])?,
        };

        debug!("Computed lifetime value for {} customers", result.height());
        Ok(result)
    }

    /// Conversions per visitor in percent
    pub fn conversion_rate(
        &self,
        period_col: &str,
        visitors_col: &str,
        conversions_col: &str,
        periods: Option<&[String]>,
    ) -> Result<DataFrame> {
        let table = self.period_table(period_col, &[visitors_col, conversions_col], periods)?;
        let visitors = float_values(&table, visitors_col)?;
        let conversions = float_values(&table, conversions_col)?;

        let rate = zip_with(&conversions, &visitors, |c, v| c / v * 100.0);
        with_metrics(table, vec![Series::new("conversion_rate", rate)])
    }

    /// Customers lost during each period and the churn rate in percent
    pub fn churn_rate(
        &self,
        period_col: &str,
        start_col: &str,
        end_col: &str,
        new_col: &str,
        periods: Option<&[String]>,
    ) -> Result<DataFrame> {
        let table = self.period_table(period_col, &[start_col, end_col, new_col], periods)?;
        let start = float_values(&table, start_col)?;
        let end = float_values(&table, end_col)?;
        let new = float_values(&table, new_col)?;

        let churned: Vec<Option<f64>> = start
            .iter()
            .zip(&end)
            .zip(&new)
            .map(|((s, e), n)| Some((*s)? + (*n)? - (*e)?))
            .collect();
        let rate = zip_with(&churned, &start, |c, s| c / s * 100.0);

        with_metrics(
            table,
            vec![
                Series::new("churned_customers", churned),
                Series::new("churn_rate", rate),
            ],
        )
    }

    /// Period column plus `columns`, filtered to `periods` and sorted by
    /// period with nulls last
    fn period_table(
        &self,
        period_col: &str,
        columns: &[&str],
        periods: Option<&[String]>,
    ) -> Result<DataFrame> {
        let data = self.data()?;
        let period_series = data.column(period_col)?;
        for column in columns {
            data.optional_values(column)?;
        }

        let keys = data.period_keys(period_col)?;
        let selected: Vec<usize> = match periods.filter(|p| !p.is_empty()) {
            Some(wanted) => {
                let raw = column_keys(period_series)?;
                (0..keys.len())
                    .filter(|&row| {
                        [&raw[row], &keys[row]].into_iter().any(|key| match key {
                            Some(k) => {
                                let label = k.to_string();
                                wanted.iter().any(|w| w.trim() == label)
                            }
                            None => false,
                        })
                    })
                    .collect()
            }
            None => (0..keys.len()).collect(),
        };

        let selected_keys: Vec<Option<KeyValue>> =
            selected.iter().map(|&row| keys[row].clone()).collect();
        let order: Vec<IdxSize> = sorted_order(&selected_keys)
            .into_iter()
            .map(|i| selected[i as usize] as IdxSize)
            .collect();
        let take = IdxCa::from_vec("idx", order);

        let mut output = vec![period_series.take(&take)?];
        for column in columns {
            output.push(data.column(column)?.take(&take)?);
        }
        Ok(DataFrame::new(output)?)
    }
}

fn float_values(table: &DataFrame, column: &str) -> Result<Vec<Option<f64>>> {
    Ok(table
        .column(column)?
        .cast(&DataType::Float64)?
        .f64()?
        .into_iter()
        .collect())
}

fn zip_with<F>(a: &[Option<f64>], b: &[Option<f64>], f: F) -> Vec<Option<f64>>
where
    F: Fn(f64, f64) -> f64,
{
    a.iter()
        .zip(b)
        .map(|(x, y)| match (x, y) {
            (Some(x), Some(y)) => Some(f(*x, *y)),
            _ => None,
        })
        .collect()
}

fn with_metrics(table: DataFrame, metrics: Vec<Series>) -> Result<DataFrame> {
    let mut columns = table.get_columns().to_vec();
    columns.extend(metrics);
    Ok(DataFrame::new(columns)?)
}
