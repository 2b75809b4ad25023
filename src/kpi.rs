//! KPI requests for batch evaluation

use bi_analytics::{KpiCalculator, Result};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};

/// A named KPI to compute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiSpec {
    pub name: String,
    #[serde(flatten)]
    pub kind: KpiKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KpiKind {
    RevenueGrowth {
        period_col: String,
        revenue_col: String,
        #[serde(default)]
        periods: Option<Vec<String>>,
    },
    CustomerAcquisitionCost {
        period_col: String,
        marketing_expense_col: String,
        new_customers_col: String,
        #[serde(default)]
        periods: Option<Vec<String>>,
    },
    CustomerLifetimeValue {
        customer_id_col: String,
        revenue_col: String,
        #[serde(default)]
        date_col: Option<String>,
        /// Falls back to the configured CLV period
        #[serde(default)]
        time_period_days: Option<u32>,
    },
    ConversionRate {
        period_col: String,
        visitors_col: String,
        conversions_col: String,
        #[serde(default)]
        periods: Option<Vec<String>>,
    },
    ChurnRate {
        period_col: String,
        customers_start_col: String,
        customers_end_col: String,
        new_customers_col: String,
        #[serde(default)]
        periods: Option<Vec<String>>,
    },
}

impl KpiSpec {
    pub fn new(name: &str, kind: KpiKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
        }
    }

    pub(crate) fn evaluate(
        &self,
        calculator: &KpiCalculator,
        clv_period_days: u32,
    ) -> Result<DataFrame> {
        match &self.kind {
            KpiKind::RevenueGrowth {
                period_col,
                revenue_col,
                periods,
            } => calculator.revenue_growth(period_col, revenue_col, periods.as_deref()),
            KpiKind::CustomerAcquisitionCost {
                period_col,
                marketing_expense_col,
                new_customers_col,
                periods,
            } => calculator.customer_acquisition_cost(
                period_col,
                marketing_expense_col,
                new_customers_col,
                periods.as_deref(),
            ),
            KpiKind::CustomerLifetimeValue {
                customer_id_col,
                revenue_col,
                date_col,
                time_period_days,
            } => calculator.customer_lifetime_value(
                customer_id_col,
                revenue_col,
                date_col.as_deref(),
                time_period_days.unwrap_or(clv_period_days),
            ),
            KpiKind::ConversionRate {
                period_col,
                visitors_col,
                conversions_col,
                periods,
            } => calculator.conversion_rate(
                period_col,
                visitors_col,
                conversions_col,
                periods.as_deref(),
            ),
            KpiKind::ChurnRate {
                period_col,
                customers_start_col,
                customers_end_col,
                new_customers_col,
                periods,
            } => calculator.churn_rate(
                period_col,
                customers_start_col,
                customers_end_col,
                new_customers_col,
                periods.as_deref(),
            ),
        }
    }
}
