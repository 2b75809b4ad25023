//! Data quality rules over a dataset

use crate::data::Dataset;
use crate::error::{AnalyticsError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityRule {
    /// No column holds a null
    NoNulls,
    /// Date columns hold only parseable dates. Text columns are checked
    /// when their name mentions a date.
    ValidDates,
    /// Numeric columns hold no negative values
    PositiveAmounts,
    /// No row repeats an earlier row
    UniqueRows,
}

impl QualityRule {
    pub const ALL: [QualityRule; 4] = [
        QualityRule::NoNulls,
        QualityRule::ValidDates,
        QualityRule::PositiveAmounts,
        QualityRule::UniqueRows,
    ];
}

impl FromStr for QualityRule {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "no_nulls" => Ok(QualityRule::NoNulls),
            "valid_dates" => Ok(QualityRule::ValidDates),
            "positive_amounts" => Ok(QualityRule::PositiveAmounts),
            "unique_rows" => Ok(QualityRule::UniqueRows),
            other => Err(AnalyticsError::UnsupportedConfiguration(format!(
                "Unknown quality rule: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for QualityRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QualityRule::NoNulls => "no_nulls",
            QualityRule::ValidDates => "valid_dates",
            QualityRule::PositiveAmounts => "positive_amounts",
            QualityRule::UniqueRows => "unique_rows",
        };
        write!(f, "{}", name)
    }
}

/// Outcome of one rule. `violations` maps a column (or `"<rows>"` for row
/// rules) to the number of offending values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleOutcome {
    pub rule: QualityRule,
    pub passed: bool,
    pub violations: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub row_count: usize,
    pub outcomes: Vec<RuleOutcome>,
}

impl QualityReport {
    pub fn passed(&self) -> bool {
        self.outcomes.iter().all(|o| o.passed)
    }

    pub fn outcome(&self, rule: QualityRule) -> Option<&RuleOutcome> {
        self.outcomes.iter().find(|o| o.rule == rule)
    }
}

/// Key used for whole-row violations
pub const ROWS_KEY: &str = "<rows>";

#[derive(Debug, Clone, Copy, Default)]
pub struct DataQualityChecker;

impl DataQualityChecker {
    /// Run each named rule against the dataset. An unknown rule name fails
    /// before any rule runs.
    pub fn validate(dataset: &Dataset, rules: &[&str]) -> Result<QualityReport> {
        let rules = rules
            .iter()
            .map(|r| r.parse())
            .collect::<Result<Vec<QualityRule>>>()?;
        Self::validate_rules(dataset, &rules)
    }

    pub fn validate_rules(dataset: &Dataset, rules: &[QualityRule]) -> Result<QualityReport> {
        let outcomes = rules
            .iter()
            .map(|&rule| {
                let violations = match rule {
                    QualityRule::NoNulls => null_counts(dataset),
                    QualityRule::ValidDates => invalid_dates(dataset)?,
                    QualityRule::PositiveAmounts => negative_counts(dataset)?,
                    QualityRule::UniqueRows => duplicate_rows(dataset)?,
                };
                let passed = violations.is_empty();
                if !passed {
                    warn!("Quality rule {} failed on {} column(s)", rule, violations.len());
                }
                Ok(RuleOutcome {
                    rule,
                    passed,
                    violations,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!("Checked {} quality rules", outcomes.len());
        Ok(QualityReport {
            row_count: dataset.height(),
            outcomes,
        })
    }
}

fn null_counts(dataset: &Dataset) -> BTreeMap<String, usize> {
    dataset
        .frame()
        .get_columns()
        .iter()
        .filter(|s| s.null_count() > 0)
        .map(|s| (s.name().to_string(), s.null_count()))
        .collect()
}

fn invalid_dates(dataset: &Dataset) -> Result<BTreeMap<String, usize>> {
    let mut violations = BTreeMap::new();
    for series in dataset.frame().get_columns() {
        let checked = match series.dtype() {
            DataType::Date | DataType::Datetime(_, _) => true,
            DataType::Utf8 => series.name().to_lowercase().contains("date"),
            _ => false,
        };
        if !checked {
            continue;
        }
        let present = series.is_not_null();
        let bad = dataset
            .date_values(series.name())?
            .into_iter()
            .zip(present.into_iter())
            .filter(|(date, present)| date.is_none() && present.unwrap_or(false))
            .count();
        if bad > 0 {
            violations.insert(series.name().to_string(), bad);
        }
    }
    Ok(violations)
}

fn negative_counts(dataset: &Dataset) -> Result<BTreeMap<String, usize>> {
    let mut violations = BTreeMap::new();
    for name in dataset.numeric_columns() {
        let bad = dataset
            .optional_values(&name)?
            .into_iter()
            .flatten()
            .filter(|v| *v < 0.0)
            .count();
        if bad > 0 {
            violations.insert(name, bad);
        }
    }
    Ok(violations)
}

fn duplicate_rows(dataset: &Dataset) -> Result<BTreeMap<String, usize>> {
    let df = dataset.frame();
    let mut seen = HashSet::with_capacity(df.height());
    let mut duplicates = 0;
    for i in 0..df.height() {
        let row = df
            .get_columns()
            .iter()
            .map(|s| Ok(format!("{:?}", s.get(i)?)))
            .collect::<Result<Vec<_>>>()?;
        if !seen.insert(row) {
            duplicates += 1;
        }
    }
    let mut violations = BTreeMap::new();
    if duplicates > 0 {
        violations.insert(ROWS_KEY.to_string(), duplicates);
    }
    Ok(violations)
}
