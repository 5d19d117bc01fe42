use std::io::{Read, Write};

use tracing::warn;

use crate::Result;
use crate::extract::ExtractedItem;
use crate::record::{Record, Value};

/// Header row written for extracted items.
pub const ITEM_HEADERS: [&str; 3] = ["source_url", "text", "attr"];

/// Writes records as CSV, with the header taken from the first record.
///
/// Later records are written against that header: missing fields become
/// empty cells and fields the first record lacks are dropped. An empty
/// slice writes nothing at all, not even a header.
pub fn write_records<W: Write>(records: &[Record], writer: W) -> Result<()> {
    let Some(first) = records.first() else {
        return Ok(());
    };
    let headers: Vec<&str> = first.fields().collect();

    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(&headers)?;

    let mut dropped = 0usize;
    for record in records {
        dropped += record.fields().filter(|field| !headers.contains(field)).count();
        wtr.write_record(
            headers
                .iter()
                .map(|field| record.get(field).map(Value::to_string).unwrap_or_default()),
        )?;
    }

    if dropped > 0 {
        warn!(dropped, "fields missing from the CSV header were dropped");
    }

    wtr.flush()?;
    Ok(())
}

/// Writes items under the fixed `source_url,text,attr` header.
///
/// The header is written even when there are no items.
pub fn write_items<W: Write>(items: &[ExtractedItem], writer: W) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    wtr.write_record(ITEM_HEADERS)?;
    for item in items {
        wtr.serialize(item)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Reads items written by [`write_items`].
pub fn read_items<R: Read>(reader: R) -> Result<Vec<ExtractedItem>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut items = Vec::new();
    for item in rdr.deserialize() {
        items.push(item?);
    }
    Ok(items)
}

/// Reads CSV rows back into records; every value comes back as text.
pub fn read_records<R: Read>(reader: R) -> Result<Vec<Record>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers()?.clone();

    let mut records = Vec::new();
    for row in rdr.records() {
        let row = row?;
        records.push(headers.iter().zip(row.iter()).map(|(h, v)| (h, Value::from(v))).collect());
    }
    Ok(records)
}
