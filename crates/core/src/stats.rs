//! Descriptive statistics over a numeric field.
//!
//! Values are projected out of records with [`numeric_values`]; anything
//! that does not coerce to a number is left out of the computation rather
//! than reported.

use serde::Serialize;

use crate::record::Record;

/// Summary of a numeric projection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Statistics {
    pub count: usize,
    pub sum: f64,
    pub average: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
}

/// Numeric values of `key` across `records`, in record order.
///
/// Records lacking the field, nulls and non-numeric text are skipped.
pub fn numeric_values(records: &[Record], key: &str) -> Vec<f64> {
    records.iter().filter_map(|r| r.get(key)).filter_map(|v| v.as_f64()).collect()
}

/// Arithmetic mean; `None` for no values.
///
/// ```rust
/// use gleaner_core::stats::average;
///
/// assert_eq!(average(&[100.0, 150.0, 200.0]), Some(150.0));
/// assert_eq!(average(&[]), None);
/// ```
pub fn average(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Median; the mean of the two central values for an even count.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len();
    if n % 2 == 0 { Some((sorted[n / 2 - 1] + sorted[n / 2]) / 2.0) } else { Some(sorted[n / 2]) }
}

/// Smallest and largest value.
pub fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    let first = *values.first()?;
    Some(values.iter().fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v))))
}

/// Full statistics for `key`, or `None` when no record has a numeric value for it.
pub fn get_statistics(records: &[Record], key: &str) -> Option<Statistics> {
    let values = numeric_values(records, key);
    let (min, max) = min_max(&values)?;

    Some(Statistics {
        count: values.len(),
        sum: values.iter().sum(),
        average: average(&values)?,
        median: median(&values)?,
        min,
        max,
    })
}
