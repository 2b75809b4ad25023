//! Utility functions for the bi_analytics crate

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sampling frequency of a date index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
    /// Regular spacing of some other number of days
    Days(i64),
}

impl Frequency {
    /// Seasonal cycle length used when a caller does not give one
    pub fn seasonal_period(frequency: Option<Frequency>) -> usize {
        match frequency {
            Some(Frequency::Monthly) => 12,
            Some(Frequency::Quarterly) => 4,
            Some(Frequency::Weekly) => 52,
            Some(Frequency::Daily) => 7,
            _ => 12,
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frequency::Daily => write!(f, "daily"),
            Frequency::Weekly => write!(f, "weekly"),
            Frequency::Monthly => write!(f, "monthly"),
            Frequency::Quarterly => write!(f, "quarterly"),
            Frequency::Yearly => write!(f, "yearly"),
            Frequency::Days(n) => write!(f, "every {} days", n),
        }
    }
}

/// Infer the frequency of a date index from the median spacing of
/// consecutive dates
pub fn infer_frequency(dates: &[NaiveDate]) -> Option<Frequency> {
    if dates.len() < 2 {
        return None;
    }

    let mut deltas: Vec<i64> = dates
        .windows(2)
        .map(|w| (w[1] - w[0]).num_days())
        .collect();
    deltas.sort_unstable();
    let median = deltas[deltas.len() / 2];

    match median {
        1 => Some(Frequency::Daily),
        7 => Some(Frequency::Weekly),
        28..=31 => Some(Frequency::Monthly),
        89..=92 => Some(Frequency::Quarterly),
        365 | 366 => Some(Frequency::Yearly),
        n if n > 0 => Some(Frequency::Days(n)),
        _ => None,
    }
}

fn is_month_end(date: NaiveDate) -> bool {
    date.succ_opt()
        .map(|next| next.month() != date.month())
        .unwrap_or(true)
}

fn month_end_after(date: NaiveDate, months: u32) -> Option<NaiveDate> {
    let first = NaiveDate::from_ymd_opt(date.year(), date.month(), 1)?;
    first
        .checked_add_months(Months::new(months + 1))?
        .pred_opt()
}

/// The `steps` dates following `last` at the given frequency.
///
/// Month-based frequencies keep month-end anchoring when `last` is the last
/// day of its month.
pub fn future_dates(last: NaiveDate, frequency: Frequency, steps: usize) -> Vec<NaiveDate> {
    let month_end = is_month_end(last);
    (1..=steps as u32)
        .filter_map(|k| match frequency {
            Frequency::Daily => last.checked_add_days(Days::new(k as u64)),
            Frequency::Weekly => last.checked_add_days(Days::new(7 * k as u64)),
            Frequency::Days(n) => last.checked_add_days(Days::new(n.max(1) as u64 * k as u64)),
            Frequency::Monthly | Frequency::Quarterly | Frequency::Yearly => {
                let months = k * match frequency {
                    Frequency::Quarterly => 3,
                    Frequency::Yearly => 12,
                    _ => 1,
                };
                if month_end {
                    month_end_after(last, months)
                } else {
                    last.checked_add_months(Months::new(months))
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_infer_monthly_month_ends() {
        let dates = vec![ymd(2023, 1, 31), ymd(2023, 2, 28), ymd(2023, 3, 31), ymd(2023, 4, 30)];
        assert_eq!(infer_frequency(&dates), Some(Frequency::Monthly));
        assert_eq!(Frequency::seasonal_period(infer_frequency(&dates)), 12);
    }

    #[test]
    fn test_infer_other_spacings() {
        let daily: Vec<NaiveDate> = (1..=5).map(|d| ymd(2024, 1, d)).collect();
        assert_eq!(infer_frequency(&daily), Some(Frequency::Daily));
        let fortnightly = vec![ymd(2024, 1, 1), ymd(2024, 1, 15), ymd(2024, 1, 29)];
        assert_eq!(infer_frequency(&fortnightly), Some(Frequency::Days(14)));
        assert_eq!(Frequency::seasonal_period(Some(Frequency::Days(14))), 12);
        assert_eq!(infer_frequency(&[ymd(2024, 1, 1)]), None);
    }

    #[test]
    fn test_future_month_ends() {
        let dates = future_dates(ymd(2023, 1, 31), Frequency::Monthly, 3);
        assert_eq!(dates, vec![ymd(2023, 2, 28), ymd(2023, 3, 31), ymd(2023, 4, 30)]);
    }

    #[test]
    fn test_future_month_starts_and_quarters() {
        let dates = future_dates(ymd(2023, 11, 1), Frequency::Monthly, 2);
        assert_eq!(dates, vec![ymd(2023, 12, 1), ymd(2024, 1, 1)]);
        let quarters = future_dates(ymd(2023, 3, 31), Frequency::Quarterly, 2);
        assert_eq!(quarters, vec![ymd(2023, 6, 30), ymd(2023, 9, 30)]);
    }
}
