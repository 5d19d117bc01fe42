//! Run summaries and data reports.

use indexmap::IndexMap;
use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};

use crate::extract::ExtractedItem;
use crate::record::Record;
use crate::stats::{Statistics, get_statistics};
use crate::urls::netloc_of;

/// Number of domains kept in [`Summary::top_domains`].
pub const TOP_DOMAINS: usize = 5;

/// Quick overview of one extraction run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub count: usize,
    /// Items with non-empty text.
    pub text_items: usize,
    /// Items with a non-empty attribute value.
    pub attr_items: usize,
    /// `(netloc, count)` pairs, most frequent first.
    pub top_domains: Vec<(String, usize)>,
}

/// Summarizes extracted items.
///
/// Domains are counted from each item's attribute value when it has one and
/// from its source URL otherwise. Values that are not absolute URLs count
/// under the empty domain.
///
/// ```rust
/// use gleaner_core::{ExtractedItem, summarize};
///
/// let items = vec![
///     ExtractedItem::attr("https://a.test", "https://cdn.test/x.png"),
///     ExtractedItem::text("https://a.test", "hello"),
/// ];
/// let summary = summarize(&items);
///
/// assert_eq!(summary.count, 2);
/// assert_eq!(summary.top_domains, [("cdn.test".to_string(), 1), ("a.test".to_string(), 1)]);
/// ```
pub fn summarize(items: &[ExtractedItem]) -> Summary {
    let text_items = items.iter().filter(|i| i.text_value().is_some_and(|t| !t.is_empty())).count();
    let attr_items = items.iter().filter(|i| i.attr_value().is_some_and(|a| !a.is_empty())).count();

    let mut domains: IndexMap<String, usize> = IndexMap::new();
    for item in items {
        let target = item.attr_value().filter(|a| !a.is_empty()).unwrap_or_else(|| item.source_url());
        *domains.entry(netloc_of(target).unwrap_or_default()).or_insert(0) += 1;
    }

    let mut top_domains: Vec<(String, usize)> = domains.into_iter().collect();
    // Stable sort keeps first-seen order among equal counts.
    top_domains.sort_by(|a, b| b.1.cmp(&a.1));
    top_domains.truncate(TOP_DOMAINS);

    Summary { count: items.len(), text_items, attr_items, top_domains }
}

/// Shape and statistics of a record collection.
///
/// Serializes as `{"total_records", "fields"}` plus a `"<field>_stats"` entry
/// when statistics were requested.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub total_records: usize,
    pub fields: Vec<String>,
    /// Requested field and its statistics; `None` inside when the field had
    /// no numeric values.
    pub stats: Option<(String, Option<Statistics>)>,
}

impl Serialize for Report {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.stats.is_some() { 3 } else { 2 };
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry("total_records", &self.total_records)?;
        map.serialize_entry("fields", &self.fields)?;
        if let Some((field, stats)) = &self.stats {
            let key = format!("{field}_stats");
            match stats {
                Some(stats) => map.serialize_entry(&key, stats)?,
                None => map.serialize_entry(&key, &IndexMap::<String, f64>::new())?,
            }
        }
        map.end()
    }
}

/// Builds a [`Report`] for `records`.
///
/// Fields are those of the first record. Statistics are only computed when
/// `stats_field` is given and there is at least one record.
pub fn generate_report(records: &[Record], stats_field: Option<&str>) -> Report {
    let fields = records.first().map(|r| r.fields().map(str::to_string).collect()).unwrap_or_default();
    let stats = match stats_field {
        Some(field) if !records.is_empty() => Some((field.to_string(), get_statistics(records, field))),
        _ => None,
    };

    Report { total_records: records.len(), fields, stats }
}
