//! HTML parsing and CSS selection.
//!
//! This module provides the [`Document`] and [`Element`] types: a parsed
//! page with an optional base URL, and a handle to one matched node.
//!
//! # Example
//!
//! ```rust
//! use gleaner_core::parse::Document;
//!
//! let html = r#"
//!     <html>
//!         <body>
//!             <h1>Catalogue</h1>
//!             <p class="product-name">Widget</p>
//!             <p class="product-name">Gadget</p>
//!         </body>
//!     </html>
//! "#;
//!
//! let doc = Document::parse(html).unwrap();
//! let names = doc.texts("p.product-name").unwrap();
//! assert_eq!(names, ["Widget", "Gadget"]);
//! ```

use scraper::{Html, Selector};
use url::Url;

use crate::clean::clean_text;
use crate::urls::resolve_reference;
use crate::{GleanerError, Result};

/// Compiles a CSS selector, mapping parse failures to [`GleanerError::InvalidSelector`].
pub fn compile_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| GleanerError::InvalidSelector(format!("{selector}: {e}")))
}

/// Represents a parsed HTML document.
///
/// # Example
///
/// ```rust
/// use gleaner_core::parse::Document;
///
/// let html = "<html><head><title>Test</title></head><body><p>Hello</p></body></html>";
/// let doc = Document::parse(html).unwrap();
/// assert_eq!(doc.title(), Some("Test".to_string()));
/// ```
pub struct Document {
    html: Html,
    base_url: Option<Url>,
}

impl Document {
    /// Parses HTML from a string with no base URL.
    ///
    /// Parsing is lenient: malformed markup is repaired the way browsers do.
    pub fn parse(html: &str) -> Result<Self> {
        let html = Html::parse_document(html);
        Ok(Self { html, base_url: None })
    }

    /// Parses HTML from a string, remembering `base_url` for resolving
    /// relative references.
    pub fn parse_with_base(html: &str, base_url: Url) -> Result<Self> {
        let html = Html::parse_document(html);
        Ok(Self { html, base_url: Some(base_url) })
    }

    /// Gets the base URL used for resolving references.
    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    /// Gets the raw HTML representation.
    pub fn html(&self) -> &Html {
        &self.html
    }

    /// Selects elements using a CSS selector, in document order.
    ///
    /// # Errors
    ///
    /// Returns [`GleanerError::InvalidSelector`] if the selector is invalid.
    ///
    /// # Example
    ///
    /// ```rust
    /// use gleaner_core::parse::Document;
    ///
    /// let html = r#"<p class="content">First</p><p class="content">Second</p>"#;
    /// let doc = Document::parse(html).unwrap();
    /// let elements = doc.select("p.content").unwrap();
    /// assert_eq!(elements.len(), 2);
    /// ```
    pub fn select(&'_ self, selector: &str) -> Result<Vec<Element<'_>>> {
        let sel = compile_selector(selector)?;
        Ok(self.html.select(&sel).map(|el| Element { element: el }).collect())
    }

    /// First element matching `selector`, if any.
    pub fn select_one(&'_ self, selector: &str) -> Result<Option<Element<'_>>> {
        let sel = compile_selector(selector)?;
        Ok(self.html.select(&sel).next().map(|el| Element { element: el }))
    }

    /// Cleaned text of every element matching `selector`.
    pub fn texts(&self, selector: &str) -> Result<Vec<String>> {
        Ok(self.select(selector)?.iter().map(Element::clean_text).collect())
    }

    /// Raw values of attribute `name` on every matching element.
    ///
    /// Elements without the attribute, or with an empty value, are skipped.
    /// Values are not resolved against the base URL.
    pub fn attrs(&self, selector: &str, name: &str) -> Result<Vec<String>> {
        Ok(self
            .select(selector)?
            .iter()
            .filter_map(|el| el.attr(name))
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Resolves `reference` against the base URL; without one, the
    /// reference is returned unchanged.
    pub fn resolve_url(&self, reference: &str) -> String {
        match &self.base_url {
            Some(base) => resolve_reference(base, reference),
            None => reference.to_string(),
        }
    }

    /// Gets the title of the document.
    pub fn title(&self) -> Option<String> {
        let selector = Selector::parse("title").ok()?;
        self.html
            .select(&selector)
            .next()
            .map(|el| clean_text(&el.text().collect::<String>()))
    }
}

/// A wrapper around scraper's ElementRef.
///
/// # Example
///
/// ```rust
/// use gleaner_core::parse::Document;
///
/// let html = r#"<a href="https://example.com">Link text</a>"#;
/// let doc = Document::parse(html).unwrap();
/// let link = &doc.select("a").unwrap()[0];
///
/// assert_eq!(link.text(), "Link text");
/// assert_eq!(link.attr("href"), Some("https://example.com"));
/// ```
#[derive(Clone, Debug)]
pub struct Element<'a> {
    element: scraper::ElementRef<'a>,
}

impl<'a> Element<'a> {
    /// Gets the inner HTML of this element.
    pub fn inner_html(&self) -> String {
        self.element.inner_html()
    }

    /// Gets the text content of this element, unmodified.
    pub fn text(&self) -> String {
        self.element.text().collect()
    }

    /// Text content with whitespace collapsed and trimmed.
    pub fn clean_text(&self) -> String {
        clean_text(&self.text())
    }

    /// Gets the value of an attribute, `None` if absent.
    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.element.value().attr(name)
    }

    /// Gets the lowercase tag name of this element.
    pub fn tag_name(&self) -> String {
        self.element.value().name().to_lowercase()
    }

    /// Selects descendant elements using a CSS selector.
    pub fn select(&self, selector: &str) -> Result<Vec<Element<'a>>> {
        let sel = compile_selector(selector)?;
        Ok(self.element.select(&sel).map(|el| Element { element: el }).collect())
    }

    /// Direct children that are elements.
    pub fn child_elements(&self) -> Vec<Element<'a>> {
        self.element
            .children()
            .filter_map(scraper::ElementRef::wrap)
            .map(|el| Element { element: el })
            .collect()
    }

    /// Whether this element sits inside an ancestor with tag `name`.
    pub fn has_ancestor(&self, name: &str) -> bool {
        self.element
            .ancestors()
            .filter_map(scraper::ElementRef::wrap)
            .any(|el| el.value().name().eq_ignore_ascii_case(name))
    }
}
