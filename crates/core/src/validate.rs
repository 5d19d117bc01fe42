//! Data quality checks and deduplication over [`Record`]s.

use std::collections::HashSet;

use tracing::debug;

use crate::record::{Record, Value};

/// Outcome of [`check_required_fields`].
#[derive(Debug, Clone, PartialEq)]
pub struct FieldCheck<'a> {
    /// `true` when no record is missing a required field.
    pub all_valid: bool,
    /// Records missing at least one required field, in input order.
    pub invalid: Vec<&'a Record>,
}

/// Checks that every record has all `required` fields.
///
/// Only absence counts: a field holding an empty string or null is present.
pub fn check_required_fields<'a, S: AsRef<str>>(records: &'a [Record], required: &[S]) -> FieldCheck<'a> {
    let invalid: Vec<&Record> = records
        .iter()
        .filter(|record| !required.iter().all(|field| record.contains_key(field.as_ref())))
        .collect();

    FieldCheck { all_valid: invalid.is_empty(), invalid }
}

/// Removes duplicate records, keeping the first occurrence of each.
///
/// With a `key`, records are unique on that field's value and records that
/// lack the field are dropped. Without a key, records are compared whole,
/// ignoring field order. Output keeps first-seen order either way.
pub fn remove_duplicates(records: Vec<Record>, key: Option<&str>) -> Vec<Record> {
    let before = records.len();
    let unique = match key {
        Some(key) => dedup_by_key(records, key),
        None => dedup_whole(records),
    };
    debug!(before, after = unique.len(), ?key, "removed duplicates");
    unique
}

fn dedup_by_key(records: Vec<Record>, key: &str) -> Vec<Record> {
    let mut seen: HashSet<Value> = HashSet::new();
    records
        .into_iter()
        .filter(|record| match record.get(key) {
            Some(value) => seen.insert(value.clone()),
            None => false,
        })
        .collect()
}

fn dedup_whole(records: Vec<Record>) -> Vec<Record> {
    let mut keep = vec![false; records.len()];
    {
        let mut seen = HashSet::new();
        for (i, record) in records.iter().enumerate() {
            keep[i] = seen.insert(record.canonical());
        }
    }

    records
        .into_iter()
        .zip(keep)
        .filter_map(|(record, keep)| keep.then_some(record))
        .collect()
}
