//! Text and price normalization for extracted strings.

use std::sync::LazyLock;

use regex::Regex;

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// An ASCII integer, optionally followed by exactly two decimal digits.
static PRICE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]+(?:\.[0-9]{2})?").unwrap());

/// Collapses every run of whitespace (spaces, tabs, newlines) to a single
/// space and trims both ends.
///
/// ```rust
/// use gleaner_core::clean_text;
///
/// assert_eq!(clean_text("  Hello,\n\t world  "), "Hello, world");
/// assert_eq!(clean_text(""), "");
/// ```
pub fn clean_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    WHITESPACE_RE.replace_all(text, " ").trim().to_string()
}

/// Convert all types of whitespace to single spaces.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Removes empty strings and cleans the rest.
pub fn clean_list<S: AsRef<str>>(items: &[S]) -> Vec<String> {
    items
        .iter()
        .filter_map(|item| {
            let item: &str = item.as_ref();
            (!item.is_empty()).then(|| clean_text(item))
        })
        .collect()
}

/// Extracts the first price-like number from a string.
///
/// Only the first run of ASCII digits is considered, with up to two decimal
/// places; thousands separators are not understood.
///
/// ```rust
/// use gleaner_core::clean_price;
///
/// assert_eq!(clean_price("$19.99"), Some(19.99));
/// assert_eq!(clean_price("no digits"), None);
/// ```
pub fn clean_price(price: &str) -> Option<f64> {
    PRICE_RE.find(price).and_then(|m| m.as_str().parse::<f64>().ok())
}
