//! File export for extracted items and records.
//!
//! Two formats are supported, picked with [`ExportFormat`]: CSV through the
//! `csv` crate and JSON through `serde_json`. Every writer creates missing
//! parent directories before opening the file.
//!
//! # Example
//!
//! ```rust
//! use gleaner_core::{ExportFormat, Record, export_records, read_records};
//!
//! let dir = std::env::temp_dir().join("gleaner-doc-export");
//! let path = dir.join("products.json");
//! let records = vec![Record::new().with("name", "Widget").with("price", 19.99)];
//!
//! export_records(&records, &path, ExportFormat::Json).unwrap();
//! assert_eq!(read_records(&path, ExportFormat::Json).unwrap(), records);
//! # std::fs::remove_dir_all(dir).ok();
//! ```

pub mod csv;
pub mod json;

use std::fmt;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::str::FromStr;

use tracing::{debug, info};

use crate::extract::ExtractedItem;
use crate::record::Record;
use crate::{GleanerError, Result};

pub use json::{JsonConfig, JsonFormatter, read_json, to_json_string, write_json};

/// Output file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = GleanerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            _ => Err(GleanerError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Writes `records` to `path`.
///
/// CSV takes its header from the first record; an empty slice leaves no
/// file behind. JSON writes a pretty-printed array.
pub fn export_records(records: &[Record], path: impl AsRef<Path>, format: ExportFormat) -> Result<()> {
    let path = path.as_ref();
    if records.is_empty() && format == ExportFormat::Csv {
        debug!(path = %path.display(), "no records to export");
        return Ok(());
    }

    let writer = create_file(path)?;
    match format {
        ExportFormat::Csv => self::csv::write_records(records, writer)?,
        ExportFormat::Json => write_json(records, writer, &JsonConfig::default())?,
    }

    info!(path = %path.display(), %format, records = records.len(), "exported records");
    Ok(())
}

/// Writes extracted items to `path` with the `source_url,text,attr` layout.
///
/// # Example
///
/// ```rust
/// use gleaner_core::{ExportFormat, ExtractedItem, save_items};
///
/// let path = std::env::temp_dir().join("gleaner-doc-items").join("items.csv");
/// save_items(&[ExtractedItem::text("https://example.com", "Hello")], &path, ExportFormat::Csv).unwrap();
///
/// let written = std::fs::read_to_string(&path).unwrap();
/// assert_eq!(written, "source_url,text,attr\nhttps://example.com,Hello,\n");
/// ```
pub fn save_items(items: &[ExtractedItem], path: impl AsRef<Path>, format: ExportFormat) -> Result<()> {
    let path = path.as_ref();
    let writer = create_file(path)?;
    match format {
        ExportFormat::Csv => self::csv::write_items(items, writer)?,
        ExportFormat::Json => write_json(items, writer, &JsonConfig::default())?,
    }

    info!(path = %path.display(), %format, items = items.len(), "saved items");
    Ok(())
}

/// Reads items written by [`save_items`].
pub fn read_items(path: impl AsRef<Path>, format: ExportFormat) -> Result<Vec<ExtractedItem>> {
    let reader = BufReader::new(File::open(path)?);
    match format {
        ExportFormat::Csv => self::csv::read_items(reader),
        ExportFormat::Json => read_json(reader),
    }
}

/// Reads records written by [`export_records`]. CSV values come back as text.
pub fn read_records(path: impl AsRef<Path>, format: ExportFormat) -> Result<Vec<Record>> {
    let reader = BufReader::new(File::open(path)?);
    match format {
        ExportFormat::Csv => self::csv::read_records(reader),
        ExportFormat::Json => read_json(reader),
    }
}

/// Opens `path` for writing, creating parent directories first.
fn create_file(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    Ok(BufWriter::new(File::create(path)?))
}
