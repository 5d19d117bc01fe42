//! Scraping sessions.
//!
//! This module ties the pieces together: a [`Scraper`] owns one [`Fetcher`]
//! bound to a base URL and runs fetch-then-extract passes against it. For a
//! single page, [`fetch_and_extract`] does the whole pass in one call.
//!
//! # Example
//!
//! ```rust,no_run
//! use gleaner_core::{ScrapeConfig, Scraper};
//!
//! # async fn run() -> gleaner_core::Result<()> {
//! let config = ScrapeConfig::builder().strict(false).max_attempts(3).build();
//! let scraper = Scraper::connect("https://example.com/", config).await?;
//!
//! let links = scraper.scrape("a.product", Some("href")).await?;
//! let prices = scraper.scrape_url("/prices", "td.price", None).await?;
//! println!("{} links, {} prices", links.items.len(), prices.items.len());
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use tracing::info;
use url::Url;

use crate::Result;
use crate::extract::{ExtractConfig, ExtractedItem, TableExtraction, extract_from_document, extract_table_from_document};
use crate::fetch::{FetchConfig, FetchedDocument, Fetcher, RetryPolicy};
use crate::parse::{Document, compile_selector};
use crate::record::Record;
use crate::report::{Summary, summarize};

/// Configuration for a scraping session.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use gleaner_core::ScrapeConfig;
///
/// let config = ScrapeConfig::builder()
///     .timeout(Duration::from_secs(30))
///     .user_agent("my-bot/1.0")
///     .strict(true)
///     .build();
///
/// assert_eq!(config.fetch.user_agent, "my-bot/1.0");
/// assert!(config.extract.strict);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ScrapeConfig {
    /// HTTP, retry and robots behaviour.
    pub fetch: FetchConfig,
    /// Extraction behaviour.
    pub extract: ExtractConfig,
}

impl ScrapeConfig {
    /// Creates a new builder for ScrapeConfig.
    pub fn builder() -> ScrapeConfigBuilder {
        ScrapeConfigBuilder::new()
    }
}

/// Builder for ScrapeConfig.
#[derive(Debug, Clone, Default)]
pub struct ScrapeConfigBuilder {
    config: ScrapeConfig,
}

impl ScrapeConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self { config: ScrapeConfig::default() }
    }

    /// Sets the per-request timeout.
    pub fn timeout(mut self, value: Duration) -> Self {
        self.config.fetch.timeout = value;
        self
    }

    /// Sets the User-Agent header.
    pub fn user_agent(mut self, value: impl Into<String>) -> Self {
        self.config.fetch.user_agent = value.into();
        self
    }

    /// Replaces the retry schedule.
    pub fn retry(mut self, value: RetryPolicy) -> Self {
        self.config.fetch.retry = value;
        self
    }

    /// Sets the total number of attempts per request.
    pub fn max_attempts(mut self, value: u32) -> Self {
        self.config.fetch.retry.max_attempts = value;
        self
    }

    /// Sets the minimum spacing between requests.
    pub fn min_delay(mut self, value: Duration) -> Self {
        self.config.fetch.min_delay = value;
        self
    }

    /// Sets whether robots.txt is loaded and applied.
    pub fn respect_robots(mut self, value: bool) -> Self {
        self.config.fetch.respect_robots = value;
        self
    }

    /// Sets whether an unavailable robots.txt aborts the session.
    pub fn require_robots(mut self, value: bool) -> Self {
        self.config.fetch.require_robots = value;
        self
    }

    /// Sets whether skipped elements are errors.
    pub fn strict(mut self, value: bool) -> Self {
        self.config.extract.strict = value;
        self
    }

    /// Builds the config.
    pub fn build(self) -> ScrapeConfig {
        self.config
    }
}

/// Items scraped from one page.
#[derive(Debug, Clone)]
pub struct ScrapeOutcome {
    /// The page the items came from.
    pub url: String,
    pub items: Vec<ExtractedItem>,
    /// Matched elements that produced no item.
    pub skipped: usize,
}

impl ScrapeOutcome {
    pub fn summary(&self) -> Summary {
        summarize(&self.items)
    }

    /// The items as `source_url`/`text`/`attr` records.
    pub fn to_records(&self) -> Vec<Record> {
        self.items.iter().map(ExtractedItem::to_record).collect()
    }
}

/// A scraping session against one site.
#[derive(Debug)]
pub struct Scraper {
    fetcher: Fetcher,
    config: ScrapeConfig,
    /// The base URL as the caller wrote it.
    base_input: String,
}

impl Scraper {
    /// Opens a session on `base_url`: validates it and, unless disabled,
    /// loads the site's robots policy.
    ///
    /// # Errors
    ///
    /// [`GleanerError::InvalidUrl`](crate::GleanerError::InvalidUrl) for a
    /// bad base URL; [`GleanerError::RobotsUnavailable`](crate::GleanerError::RobotsUnavailable)
    /// when robots.txt is required but cannot be loaded.
    pub async fn connect(base_url: &str, config: ScrapeConfig) -> Result<Self> {
        let fetcher = Fetcher::with_base(base_url, config.fetch.clone()).await?;
        info!(base = base_url, "session opened");
        Ok(Self { fetcher, config, base_input: base_url.to_string() })
    }

    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    pub fn config(&self) -> &ScrapeConfig {
        &self.config
    }

    /// Fetches the base URL and extracts items from it.
    ///
    /// Items carry the base URL exactly as passed to [`Scraper::connect`].
    pub async fn scrape(&self, selector: &str, attr: Option<&str>) -> Result<ScrapeOutcome> {
        let base = self.fetcher.base_url().map(Url::to_string).unwrap_or_default();
        self.scrape_page(&base, Some(self.base_input.as_str()), selector, attr).await
    }

    /// Fetches `url` (absolute, or relative to the base URL) and extracts
    /// items from it. Items carry the resolved URL.
    pub async fn scrape_url(&self, url: &str, selector: &str, attr: Option<&str>) -> Result<ScrapeOutcome> {
        self.scrape_page(url, None, selector, attr).await
    }

    async fn scrape_page(
        &self, url: &str, source_url: Option<&str>, selector: &str, attr: Option<&str>,
    ) -> Result<ScrapeOutcome> {
        compile_selector(selector)?;
        let page = self.fetcher.get(url).await?;
        let doc = parse_page(&page)?;

        let source_url = source_url.unwrap_or_else(|| page.url.as_str());
        let extraction = extract_from_document(&doc, source_url, selector, attr, &self.config.extract)?;
        info!(url = %page.url, selector, items = extraction.items.len(), skipped = extraction.skipped, "scraped");

        Ok(ScrapeOutcome { url: page.url.to_string(), items: extraction.items, skipped: extraction.skipped })
    }

    /// Fetches `url` and extracts the first table matching `selector`.
    pub async fn scrape_table(&self, url: &str, selector: &str) -> Result<TableExtraction> {
        compile_selector(selector)?;
        let page = self.fetcher.get(url).await?;
        let doc = parse_page(&page)?;

        let table = extract_table_from_document(&doc, selector, &self.config.extract)?;
        info!(url = %page.url, selector, rows = table.records.len(), skipped = table.skipped, "scraped table");
        Ok(table)
    }
}

/// Parses a fetched body; references resolve against the post-redirect URL.
fn parse_page(page: &FetchedDocument) -> Result<Document> {
    Document::parse_with_base(&page.body, page.final_url.clone())
}

/// Fetches one page and extracts items from it.
///
/// `url` doubles as the session base, so its robots policy applies.
///
/// # Example
///
/// ```rust,no_run
/// use gleaner_core::{ScrapeConfig, fetch_and_extract};
///
/// # async fn run() -> gleaner_core::Result<()> {
/// let outcome = fetch_and_extract("https://example.com", "a", Some("href"), &ScrapeConfig::default()).await?;
/// println!("{}", serde_json::to_string_pretty(&outcome.summary())?);
/// # Ok(())
/// # }
/// ```
pub async fn fetch_and_extract(
    url: &str, selector: &str, attr: Option<&str>, config: &ScrapeConfig,
) -> Result<ScrapeOutcome> {
    compile_selector(selector)?;
    let scraper = Scraper::connect(url, config.clone()).await?;
    scraper.scrape(selector, attr).await
}
