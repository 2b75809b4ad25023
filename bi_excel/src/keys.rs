//! Orderable keys extracted from frame columns
//!
//! Grouping and period ordering both need to sort column values of mixed
//! types. Dates sort before numbers, numbers before text.

use crate::error::Result;
use crate::frame::date_from_days;
use polars::prelude::*;
use std::cmp::Ordering;
use std::fmt;

/// A non-null column value usable as a sort or group key
#[derive(Debug, Clone)]
pub enum KeyValue {
    /// Days since 1970-01-01
    Date(i32),
    Number(f64),
    Text(String),
}

impl KeyValue {
    fn rank(&self) -> u8 {
        match self {
            KeyValue::Date(_) => 0,
            KeyValue::Number(_) => 1,
            KeyValue::Text(_) => 2,
        }
    }
}

impl PartialEq for KeyValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for KeyValue {}

impl PartialOrd for KeyValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for KeyValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (KeyValue::Date(a), KeyValue::Date(b)) => a.cmp(b),
            (KeyValue::Number(a), KeyValue::Number(b)) => a.total_cmp(b),
            (KeyValue::Text(a), KeyValue::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Date(days) => match date_from_days(*days) {
                Some(date) => write!(f, "{}", date.format("%Y-%m-%d")),
                None => write!(f, "{}", days),
            },
            KeyValue::Number(v) => write!(f, "{}", v),
            KeyValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Per-row keys of a column; `None` for nulls
pub fn column_keys(series: &Series) -> Result<Vec<Option<KeyValue>>> {
    let keys = match series.dtype() {
        DataType::Utf8 => series
            .utf8()?
            .into_iter()
            .map(|v| v.map(|s| KeyValue::Text(s.to_string())))
            .collect(),
        DataType::Date | DataType::Datetime(_, _) => series
            .cast(&DataType::Date)?
            .date()?
            .into_iter()
            .map(|v| v.map(KeyValue::Date))
            .collect(),
        dtype if dtype.is_numeric() => series
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .map(|v| v.filter(|x| !x.is_nan()).map(KeyValue::Number))
            .collect(),
        _ => series
            .cast(&DataType::Utf8)?
            .utf8()?
            .into_iter()
            .map(|v| v.map(|s| KeyValue::Text(s.to_string())))
            .collect(),
    };
    Ok(keys)
}

/// Row order that sorts `keys` ascending with nulls last. Stable.
pub fn sorted_order(keys: &[Option<KeyValue>]) -> Vec<IdxSize> {
    let mut order: Vec<usize> = (0..keys.len()).collect();
    order.sort_by(|&a, &b| match (&keys[a], &keys[b]) {
        (Some(x), Some(y)) => x.cmp(y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    order.into_iter().map(|i| i as IdxSize).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixed_ordering() {
        let mut keys = vec![
            KeyValue::Text("b".into()),
            KeyValue::Number(2.0),
            KeyValue::Date(10),
            KeyValue::Number(-1.0),
            KeyValue::Text("a".into()),
        ];
        keys.sort();
        assert_eq!(
            keys,
            vec![
                KeyValue::Date(10),
                KeyValue::Number(-1.0),
                KeyValue::Number(2.0),
                KeyValue::Text("a".into()),
                KeyValue::Text("b".into()),
            ]
        );
    }

    #[test]
    fn test_sorted_order_puts_nulls_last() {
        let keys = vec![None, Some(KeyValue::Number(3.0)), Some(KeyValue::Number(1.0))];
        assert_eq!(sorted_order(&keys), vec![2, 1, 0]);
    }

    #[test]
    fn test_column_keys_from_strings() {
        let s = Series::new("region", &[Some("north"), None]);
        let keys = column_keys(&s).unwrap();
        assert_eq!(keys, vec![Some(KeyValue::Text("north".into())), None]);
    }

    #[test]
    fn test_key_display() {
        assert_eq!(KeyValue::Number(3.0).to_string(), "3");
        assert_eq!(KeyValue::Date(0).to_string(), "1970-01-01");
    }
}
