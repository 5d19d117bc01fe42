use std::io::{Read, Write};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::Result;

/// Configuration for JSON output
#[derive(Debug, Clone)]
pub struct JsonConfig {
    /// Pretty print JSON output
    pub pretty: bool,
}

impl Default for JsonConfig {
    fn default() -> Self {
        Self { pretty: true }
    }
}

/// Serializes `value` to a string.
pub fn to_json_string<T: Serialize + ?Sized>(value: &T, config: &JsonConfig) -> Result<String> {
    if config.pretty { Ok(serde_json::to_string_pretty(value)?) } else { Ok(serde_json::to_string(value)?) }
}

/// Writes `value` as JSON, followed by a newline.
pub fn write_json<T: Serialize + ?Sized, W: Write>(value: &T, mut writer: W, config: &JsonConfig) -> Result<()> {
    if config.pretty {
        serde_json::to_writer_pretty(&mut writer, value)?;
    } else {
        serde_json::to_writer(&mut writer, value)?;
    }
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Reads a JSON document into `T`.
pub fn read_json<T: DeserializeOwned, R: Read>(reader: R) -> Result<T> {
    Ok(serde_json::from_reader(reader)?)
}

/// JSON formatter with configurable options
#[derive(Debug, Clone, Default)]
pub struct JsonFormatter {
    config: JsonConfig,
}

impl JsonFormatter {
    pub fn new(config: JsonConfig) -> Self {
        Self { config }
    }

    pub fn to_string<T: Serialize + ?Sized>(&self, value: &T) -> Result<String> {
        to_json_string(value, &self.config)
    }

    pub fn write<T: Serialize + ?Sized, W: Write>(&self, value: &T, writer: W) -> Result<()> {
        write_json(value, writer, &self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ExtractedItem;
    use crate::record::Record;

    #[test]
    fn test_pretty_is_default() {
        let records = vec![Record::new().with("name", "Widget")];
        let json = JsonFormatter::default().to_string(&records).unwrap();

        assert!(json.starts_with("[\n"));
        assert!(json.contains("\"name\": \"Widget\""));
    }

    #[test]
    fn test_compact_output() {
        let records = vec![Record::new().with("b", 1).with("a", 2)];
        let json = to_json_string(&records, &JsonConfig { pretty: false }).unwrap();

        assert_eq!(json, r#"[{"b":1,"a":2}]"#);
    }

    #[test]
    fn test_write_and_read_items() {
        let items = vec![ExtractedItem::text("u", "Hello"), ExtractedItem::attr("u", "https://example.com/p")];
        let mut buf = Vec::new();
        write_json(&items, &mut buf, &JsonConfig::default()).unwrap();

        let text = String::from_utf8(buf.clone()).unwrap();
        assert!(text.contains("\"attr\": null"));
        assert!(text.ends_with("]\n"));

        let back: Vec<ExtractedItem> = read_json(buf.as_slice()).unwrap();
        assert_eq!(back, items);
    }

    #[test]
    fn test_read_invalid_json() {
        let result: Result<Vec<Record>> = read_json("not json".as_bytes());
        assert!(matches!(result, Err(crate::GleanerError::JsonError(_))));
    }
}
