//! Grouping, counting and filtering of [`Record`]s.
//!
//! All functions borrow the input and return references into it; records
//! lacking the field in question never take part.

use std::fmt;

use indexmap::IndexMap;

use crate::record::{Record, Value};

/// How [`filter_data`] decides whether a field value matches.
pub enum FilterSpec<'a> {
    /// Field equals this value.
    Equals(Value),
    /// Field satisfies the predicate.
    Matches(Box<dyn Fn(&Value) -> bool + 'a>),
}

impl<'a> FilterSpec<'a> {
    pub fn equals(value: impl Into<Value>) -> Self {
        Self::Equals(value.into())
    }

    pub fn matches(predicate: impl Fn(&Value) -> bool + 'a) -> Self {
        Self::Matches(Box::new(predicate))
    }

    fn test(&self, value: &Value) -> bool {
        match self {
            Self::Equals(expected) => value == expected,
            Self::Matches(predicate) => predicate(value),
        }
    }
}

impl fmt::Debug for FilterSpec<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equals(value) => f.debug_tuple("Equals").field(value).finish(),
            Self::Matches(_) => f.write_str("Matches(<predicate>)"),
        }
    }
}

/// Groups records by the value of `key`, groups in first-seen order.
///
/// ```rust
/// use gleaner_core::{Record, Value, group_by};
///
/// let records = vec![Record::new().with("cat", "x"), Record::new().with("other", 1)];
/// let groups = group_by(&records, "cat");
///
/// assert_eq!(groups.len(), 1);
/// assert_eq!(groups[&Value::from("x")], vec![&records[0]]);
/// ```
pub fn group_by<'a>(records: &'a [Record], key: &str) -> IndexMap<Value, Vec<&'a Record>> {
    let mut groups: IndexMap<Value, Vec<&Record>> = IndexMap::new();
    for record in records {
        if let Some(value) = record.get(key) {
            groups.entry(value.clone()).or_default().push(record);
        }
    }
    groups
}

/// Counts how often each value of `key` occurs.
pub fn count_occurrences(records: &[Record], key: &str) -> IndexMap<Value, usize> {
    let mut counts: IndexMap<Value, usize> = IndexMap::new();
    for value in records.iter().filter_map(|r| r.get(key)) {
        *counts.entry(value.clone()).or_insert(0) += 1;
    }
    counts
}

/// Records whose `key` field satisfies `spec`.
pub fn filter_data<'a>(records: &'a [Record], key: &str, spec: &FilterSpec<'_>) -> Vec<&'a Record> {
    records
        .iter()
        .filter(|record| record.get(key).is_some_and(|value| spec.test(value)))
        .collect()
}
