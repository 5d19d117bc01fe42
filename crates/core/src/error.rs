//! Error types for Gleaner operations.
//!
//! This module defines the main error type [`GleanerError`] which represents
//! every failure that can terminate a fetch, extract or export step.
//! Lenient skips (a node without the requested attribute, a table row of the
//! wrong width, a value that is not numeric) are not errors and never show up
//! here unless strict extraction is enabled.
//!
//! # Example
//!
//! ```rust
//! use gleaner_core::{GleanerError, Result};
//!
//! fn require_selector(selector: &str) -> Result<&str> {
//!     if selector.trim().is_empty() {
//!         return Err(GleanerError::InvalidSelector("empty selector".to_string()));
//!     }
//!     Ok(selector)
//! }
//! ```

use thiserror::Error;

/// Main error type for fetching, extraction and export.
///
/// The variants fall into four groups:
///
/// - validation: [`InvalidUrl`](Self::InvalidUrl), [`InvalidSelector`](Self::InvalidSelector),
///   [`UnsupportedFormat`](Self::UnsupportedFormat), [`InvalidItem`](Self::InvalidItem)
/// - permission: [`Disallowed`](Self::Disallowed), [`RobotsUnavailable`](Self::RobotsUnavailable)
/// - HTTP: [`HttpError`](Self::HttpError), [`HttpStatus`](Self::HttpStatus), [`Timeout`](Self::Timeout)
/// - strict extraction and I/O: the remaining variants
///
/// # Example
///
/// ```rust
/// use gleaner_core::{ExportFormat, GleanerError};
///
/// match "xml".parse::<ExportFormat>() {
///     Ok(format) => println!("exporting as {format}"),
///     Err(GleanerError::UnsupportedFormat(name)) => println!("no exporter for {name}"),
///     Err(e) => println!("Error: {}", e),
/// }
/// ```
#[derive(Error, Debug)]
pub enum GleanerError {
    /// Transport-level errors from reqwest.
    ///
    /// Connection refused, DNS failures, TLS problems and body decoding
    /// failures end up here once the retry budget is spent.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// The server kept answering with an error status.
    ///
    /// Returned for any non-retryable 4xx/5xx status, and for a retryable
    /// status once every attempt has been used.
    #[error("HTTP {status} for {url} after {attempts} attempt(s)")]
    HttpStatus { status: u16, url: String, attempts: u32 },

    /// Request timeout.
    ///
    /// Returned when the last attempt exceeded the configured timeout.
    #[error("Request timed out after {timeout} seconds")]
    Timeout { timeout: f64 },

    /// Invalid URL provided.
    ///
    /// Returned when a URL cannot be parsed, has no host, or uses a scheme
    /// that cannot be fetched.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The site's robots policy forbids fetching this URL.
    ///
    /// No request is made when this is returned.
    #[error("robots.txt disallows fetching: {0}")]
    Disallowed(String),

    /// robots.txt could not be loaded and the configuration requires it.
    #[error("robots.txt for {url} is unavailable: {reason}")]
    RobotsUnavailable { url: String, reason: String },

    /// CSS selector could not be parsed.
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    /// Export format other than `csv` or `json`.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A serialized item carried both a text and an attribute value.
    #[error("Invalid item: {0}")]
    InvalidItem(String),

    /// Strict extraction: a matched element lacks the requested attribute.
    #[error("Element {index} matched by '{selector}' has no '{attr}' attribute")]
    MissingAttribute { selector: String, attr: String, index: usize },

    /// Strict extraction: a table row does not line up with the header.
    #[error("Table row {row} has {found} cells, header has {expected}")]
    MalformedRow { row: usize, expected: usize, found: usize },

    /// File write errors.
    ///
    /// Wraps standard I/O errors for file operations.
    #[error("Failed to write to file: {0}")]
    WriteError(#[from] std::io::Error),

    /// CSV encoding or decoding errors.
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// JSON encoding or decoding errors.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl GleanerError {
    /// Returns `true` for errors caused by bad input rather than by the
    /// network or the filesystem.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidUrl(_) | Self::InvalidSelector(_) | Self::UnsupportedFormat(_) | Self::InvalidItem(_)
        )
    }

    /// Returns `true` when the robots policy stopped the request.
    pub fn is_permission(&self) -> bool {
        matches!(self, Self::Disallowed(_) | Self::RobotsUnavailable { .. })
    }
}

/// Result type alias for GleanerError.
///
/// This is a convenience alias for `std::result::Result<T, GleanerError>`.
pub type Result<T> = std::result::Result<T, GleanerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GleanerError::InvalidUrl("not a url".to_string());
        assert!(err.to_string().contains("Invalid URL"));
        assert!(err.is_validation());
    }

    #[test]
    fn test_http_status_error() {
        let err = GleanerError::HttpStatus { status: 503, url: "https://example.com/".to_string(), attempts: 5 };
        let message = err.to_string();
        assert!(message.contains("503"));
        assert!(message.contains("5 attempt"));
        assert!(!err.is_validation());
    }

    #[test]
    fn test_timeout_error() {
        let err = GleanerError::Timeout { timeout: 15.0 };
        assert!(err.to_string().contains("15"));
    }

    #[test]
    fn test_permission_errors() {
        let err = GleanerError::Disallowed("https://example.com/private".to_string());
        assert!(err.is_permission());
        assert!(err.to_string().contains("/private"));

        let err = GleanerError::RobotsUnavailable {
            url: "https://example.com/robots.txt".to_string(),
            reason: "HTTP 503".to_string(),
        };
        assert!(err.is_permission());
    }

    #[test]
    fn test_malformed_row_error() {
        let err = GleanerError::MalformedRow { row: 3, expected: 4, found: 2 };
        assert_eq!(err.to_string(), "Table row 3 has 2 cells, header has 4");
    }
}
