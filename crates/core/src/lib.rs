pub mod aggregate;
pub mod clean;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod formatters;
pub mod parse;
pub mod record;
pub mod report;
pub mod robots;
pub mod scrape;
pub mod stats;
pub mod urls;
pub mod validate;

pub use aggregate::{FilterSpec, count_occurrences, filter_data, group_by};
pub use clean::{clean_list, clean_price, clean_text, normalize_whitespace};
pub use error::{GleanerError, Result};
pub use extract::{ExtractConfig, ExtractedItem, Extraction, ItemValue, TableExtraction};
pub use extract::{extract_from_document, extract_items, extract_table, extract_table_from_document};
pub use fetch::{DEFAULT_USER_AGENT, FetchConfig, FetchedDocument, Fetcher, RetryPolicy};
pub use formatters::{ExportFormat, JsonConfig, JsonFormatter};
pub use formatters::{export_records, read_items, read_records, save_items};
pub use parse::{Document, Element};
pub use record::{Record, Value};
pub use report::{Report, Summary, generate_report, summarize};
pub use robots::{PolicyLoadResult, RobotsPolicy};
pub use scrape::{ScrapeConfig, ScrapeConfigBuilder, ScrapeOutcome, Scraper, fetch_and_extract};
pub use stats::{Statistics, get_statistics};
pub use validate::{FieldCheck, check_required_fields, remove_duplicates};
