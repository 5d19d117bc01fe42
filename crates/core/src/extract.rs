//! Selector-driven extraction of items and tables.
//!
//! [`extract_items`] turns every node matched by a CSS selector into an
//! [`ExtractedItem`]: either its text or one of its attributes. Tables are
//! handled by [`extract_table`], which keys each row by the header labels.
//!
//! Nodes that cannot produce a value (no such attribute, a row of the wrong
//! width) are skipped and counted unless [`ExtractConfig::strict`] is set.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::parse::{Document, Element};
use crate::record::{Record, Value};
use crate::urls::resolve_reference;
use crate::{GleanerError, Result};

/// Attributes whose values are references resolved against the page URL.
const URL_ATTRS: &[&str] = &["href", "src"];

/// Configuration for extraction.
#[derive(Debug, Clone, Default)]
pub struct ExtractConfig {
    /// Fail on the first node that would otherwise be skipped.
    pub strict: bool,
}

/// What an [`ExtractedItem`] carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemValue {
    Text(String),
    Attr(String),
}

/// One value pulled out of a page.
///
/// Serializes as `{source_url, text, attr}` with exactly one of `text` and
/// `attr` set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ItemRow", into = "ItemRow")]
pub struct ExtractedItem {
    source_url: String,
    value: ItemValue,
}

/// Flat three-column shape used on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ItemRow {
    source_url: String,
    text: Option<String>,
    attr: Option<String>,
}

impl From<ExtractedItem> for ItemRow {
    fn from(item: ExtractedItem) -> Self {
        let (text, attr) = match item.value {
            ItemValue::Text(text) => (Some(text), None),
            ItemValue::Attr(attr) => (None, Some(attr)),
        };
        Self { source_url: item.source_url, text, attr }
    }
}

impl TryFrom<ItemRow> for ExtractedItem {
    type Error = GleanerError;

    fn try_from(row: ItemRow) -> Result<Self> {
        let value = match (row.text, row.attr) {
            (Some(_), Some(_)) => {
                return Err(GleanerError::InvalidItem(format!(
                    "item from {} has both text and attr",
                    row.source_url
                )));
            }
            (None, Some(attr)) => ItemValue::Attr(attr),
            // Empty text and "no value" look the same in a flat file.
            (text, None) => ItemValue::Text(text.unwrap_or_default()),
        };
        Ok(Self { source_url: row.source_url, value })
    }
}

impl ExtractedItem {
    pub fn text(source_url: impl Into<String>, text: impl Into<String>) -> Self {
        Self { source_url: source_url.into(), value: ItemValue::Text(text.into()) }
    }

    pub fn attr(source_url: impl Into<String>, attr: impl Into<String>) -> Self {
        Self { source_url: source_url.into(), value: ItemValue::Attr(attr.into()) }
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    pub fn value(&self) -> &ItemValue {
        &self.value
    }

    /// The text, when this is a text item.
    pub fn text_value(&self) -> Option<&str> {
        match &self.value {
            ItemValue::Text(text) => Some(text),
            ItemValue::Attr(_) => None,
        }
    }

    /// The attribute value, when this is an attribute item.
    pub fn attr_value(&self) -> Option<&str> {
        match &self.value {
            ItemValue::Attr(attr) => Some(attr),
            ItemValue::Text(_) => None,
        }
    }

    /// The item as a record with `source_url`, `text` and `attr` fields.
    pub fn to_record(&self) -> Record {
        Record::new()
            .with("source_url", self.source_url.as_str())
            .with("text", self.text_value())
            .with("attr", self.attr_value())
    }
}

/// Items extracted from one page.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Items in document order.
    pub items: Vec<ExtractedItem>,
    /// Matched nodes that produced no item.
    pub skipped: usize,
}

/// Rows extracted from one table.
#[derive(Debug, Clone, Default)]
pub struct TableExtraction {
    /// Header labels, in column order.
    pub headers: Vec<String>,
    /// One record per well-formed data row.
    pub records: Vec<Record>,
    /// Data rows whose width did not match the header.
    pub skipped: usize,
}

/// Extracts one item per node matching `selector`.
///
/// With `attr`, each item is that attribute's value (`href`/`src` resolved
/// against `base_url`); without it, each item is the node's cleaned text.
///
/// # Example
///
/// ```rust
/// use gleaner_core::{ExtractConfig, extract_items};
///
/// let html = r#"<a class="link" href="/p">one</a><a class="link">none</a>"#;
/// let config = ExtractConfig::default();
/// let extraction = extract_items(html, "https://example.com", "a.link", Some("href"), &config).unwrap();
///
/// assert_eq!(extraction.items.len(), 1);
/// assert_eq!(extraction.items[0].attr_value(), Some("https://example.com/p"));
/// assert_eq!(extraction.skipped, 1);
/// ```
pub fn extract_items(
    html: &str, base_url: &str, selector: &str, attr: Option<&str>, config: &ExtractConfig,
) -> Result<Extraction> {
    let doc = match Url::parse(base_url) {
        Ok(base) => Document::parse_with_base(html, base)?,
        Err(_) => Document::parse(html)?,
    };
    extract_from_document(&doc, base_url, selector, attr, config)
}

/// [`extract_items`] over an already parsed document.
///
/// `source_url` is recorded on every item; references are resolved against
/// the document's base URL.
pub fn extract_from_document(
    doc: &Document, source_url: &str, selector: &str, attr: Option<&str>, config: &ExtractConfig,
) -> Result<Extraction> {
    let elements = doc.select(selector)?;
    let mut extraction = Extraction { items: Vec::with_capacity(elements.len()), skipped: 0 };

    for (index, element) in elements.iter().enumerate() {
        let Some(name) = attr else {
            extraction.items.push(ExtractedItem::text(source_url, element.clean_text()));
            continue;
        };

        match element.attr(name) {
            Some(raw) => {
                let value = match doc.base_url() {
                    Some(base) if URL_ATTRS.contains(&name) => resolve_reference(base, raw),
                    _ => raw.to_string(),
                };
                extraction.items.push(ExtractedItem::attr(source_url, value));
            }
            None if config.strict => {
                return Err(GleanerError::MissingAttribute {
                    selector: selector.to_string(),
                    attr: name.to_string(),
                    index,
                });
            }
            None => extraction.skipped += 1,
        }
    }

    if extraction.skipped > 0 {
        warn!(selector, attr, skipped = extraction.skipped, "matched elements without the attribute were skipped");
    }
    debug!(selector, items = extraction.items.len(), "extracted items");

    Ok(extraction)
}

/// Extracts the first table matching `selector` into records.
///
/// Header labels come from `thead` when present, otherwise from the first
/// row (which is then not a data row). Data rows use their `td` cells.
///
/// # Example
///
/// ```rust
/// use gleaner_core::{ExtractConfig, Value, extract_table};
///
/// let html = "<table id='t'><tr><th>Name</th><th>Qty</th></tr><tr><td>Bolt</td><td>4</td></tr></table>";
/// let table = extract_table(html, "#t", &ExtractConfig::default()).unwrap();
///
/// assert_eq!(table.headers, ["Name", "Qty"]);
/// assert_eq!(table.records[0].get("Qty"), Some(&Value::from("4")));
/// ```
pub fn extract_table(html: &str, selector: &str, config: &ExtractConfig) -> Result<TableExtraction> {
    let doc = Document::parse(html)?;
    extract_table_from_document(&doc, selector, config)
}

/// [`extract_table`] over an already parsed document.
pub fn extract_table_from_document(doc: &Document, selector: &str, config: &ExtractConfig) -> Result<TableExtraction> {
    let Some(table) = doc.select_one(selector)? else {
        debug!(selector, "no table matched");
        return Ok(TableExtraction::default());
    };

    let rows = table.select("tr")?;
    if rows.is_empty() {
        return Ok(TableExtraction::default());
    }

    let (headers, data_rows): (Vec<String>, Vec<&Element<'_>>) = match table.select("thead")?.first() {
        Some(thead) => {
            let headers = cell_texts(thead, "th, td")?;
            (headers, rows.iter().filter(|row| !row.has_ancestor("thead")).collect())
        }
        None => (cell_texts(&rows[0], "th, td")?, rows.iter().skip(1).collect()),
    };

    let mut extraction = TableExtraction { headers, ..TableExtraction::default() };

    for (row_index, row) in data_rows.into_iter().enumerate() {
        let cells = cell_texts(row, "td")?;
        if cells.len() != extraction.headers.len() {
            if config.strict {
                return Err(GleanerError::MalformedRow {
                    row: row_index,
                    expected: extraction.headers.len(),
                    found: cells.len(),
                });
            }
            extraction.skipped += 1;
            continue;
        }

        let record: Record = extraction
            .headers
            .iter()
            .zip(cells)
            .map(|(header, cell)| (header.clone(), Value::Text(cell)))
            .collect();
        extraction.records.push(record);
    }

    if extraction.skipped > 0 {
        warn!(selector, skipped = extraction.skipped, "table rows with a mismatched cell count were skipped");
    }

    Ok(extraction)
}

fn cell_texts(element: &Element<'_>, selector: &str) -> Result<Vec<String>> {
    Ok(element.select(selector)?.iter().map(Element::clean_text).collect())
}
