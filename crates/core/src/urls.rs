//! URL validation and resolution.
//!
//! Small helpers shared by the fetcher, the robots gate and the extractor.
//! They operate on strings so callers can feed raw attribute values straight
//! from a document.

use url::Url;

use crate::{GleanerError, Result};

/// Schemes accepted by [`is_valid_url`].
const RECOGNIZED_SCHEMES: &[&str] = &["http", "https", "ftp", "ws", "wss"];

/// Checks whether `url` is absolute, uses a recognized scheme and has a host.
///
/// ```rust
/// use gleaner_core::urls::is_valid_url;
///
/// assert!(is_valid_url("https://example.com/path"));
/// assert!(!is_valid_url("example.com"));
/// assert!(!is_valid_url("mailto:someone@example.com"));
/// ```
pub fn is_valid_url(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => {
            RECOGNIZED_SCHEMES.contains(&parsed.scheme()) && parsed.host_str().is_some_and(|h| !h.is_empty())
        }
        Err(_) => false,
    }
}

/// Parses `url` and checks it is something the fetcher can request.
pub fn parse_http_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url).map_err(|e| GleanerError::InvalidUrl(format!("{url}: {e}")))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(GleanerError::InvalidUrl(format!(
            "{url}: URL must use http:// or https://"
        )));
    }

    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(GleanerError::InvalidUrl(format!("{url}: URL has no host")));
    }

    Ok(parsed)
}

/// Resolves `relative` against `base` using standard reference resolution.
///
/// Absolute references replace the base entirely; scheme-relative,
/// path-absolute and path-relative references are merged with it.
///
/// ```rust
/// use gleaner_core::urls::resolve;
///
/// let url = resolve("https://example.com/blog/post", "../about").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/about");
/// ```
pub fn resolve(base: &str, relative: &str) -> Result<Url> {
    let base = Url::parse(base).map_err(|e| GleanerError::InvalidUrl(format!("{base}: {e}")))?;
    base.join(relative)
        .map_err(|e| GleanerError::InvalidUrl(format!("{relative}: {e}")))
}

/// Resolves a raw reference found in a document.
///
/// Values that cannot be joined (for example a malformed IPv6 host) are
/// returned unchanged rather than dropped.
pub fn resolve_reference(base: &Url, reference: &str) -> String {
    match base.join(reference) {
        Ok(absolute) => absolute.into(),
        Err(_) => reference.to_string(),
    }
}

/// Returns the network location of `url`: host plus explicit port.
pub fn netloc_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str().filter(|h| !h.is_empty())?;

    Some(match parsed.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

/// Returns the domain of `url` with a leading `www.` removed.
///
/// ```rust
/// use gleaner_core::urls::domain_of;
///
/// assert_eq!(domain_of("https://www.example.com/path"), Some("example.com".to_string()));
/// assert_eq!(domain_of("not a url"), None);
/// ```
pub fn domain_of(url: &str) -> Option<String> {
    let netloc = netloc_of(url)?;
    match netloc.strip_prefix("www.") {
        Some(rest) if !rest.is_empty() => Some(rest.to_string()),
        _ => Some(netloc),
    }
}
