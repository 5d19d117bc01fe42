//! Polite page fetching.
//!
//! [`Fetcher`] wraps a pooled reqwest client with the robots gate, request
//! pacing and a bounded retry loop for transient HTTP failures. One fetcher
//! serves one session against one base URL.

use std::time::{Duration, Instant};

use reqwest::header::RETRY_AFTER;
use reqwest::{Client, Response, StatusCode};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use crate::robots::{PolicyLoadResult, load_policy, robots_url};
use crate::urls::parse_http_url;
use crate::{GleanerError, Result};

/// Default User-Agent sent with every request.
pub const DEFAULT_USER_AGENT: &str = concat!(
    "gleaner/",
    env!("CARGO_PKG_VERSION"),
    " (+https://github.com/gleaner-rs/gleaner)"
);

/// Retry schedule for transient failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, the first request included.
    pub max_attempts: u32,
    /// Delay before the first retry; doubled for every further retry.
    pub backoff_factor: Duration,
    /// Upper bound for any single delay, Retry-After included.
    pub max_backoff: Duration,
    /// Status codes worth retrying.
    pub retry_statuses: Vec<u16>,
    /// Use the server's Retry-After (seconds) instead of the computed delay.
    pub respect_retry_after: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_factor: Duration::from_millis(500),
            max_backoff: Duration::from_secs(120),
            retry_statuses: vec![429, 500, 502, 503, 504],
            respect_retry_after: true,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self { max_attempts: 1, ..Self::default() }
    }

    pub fn is_retryable(&self, status: StatusCode) -> bool {
        self.retry_statuses.contains(&status.as_u16())
    }

    /// Delay before retry number `retry` (1-based): `factor * 2^(retry - 1)`, capped.
    pub fn backoff(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(31);
        self.backoff_factor
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

/// HTTP client configuration for fetching web pages.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Per-request timeout.
    pub timeout: Duration,
    /// User-Agent header, also the identity checked against robots.txt.
    pub user_agent: String,
    /// Retry schedule for transient failures.
    pub retry: RetryPolicy,
    /// Minimum spacing between consecutive requests.
    pub min_delay: Duration,
    /// Load robots.txt at session start and gate requests on it.
    pub respect_robots: bool,
    /// Fail the session when robots.txt cannot be loaded.
    pub require_robots: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            retry: RetryPolicy::default(),
            min_delay: Duration::ZERO,
            respect_robots: true,
            require_robots: false,
        }
    }
}

/// A successfully fetched page.
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    /// The URL that was requested (after resolution against the base).
    pub url: Url,
    /// The URL the body came from, after redirects.
    pub final_url: Url,
    /// HTTP status code of the final response.
    pub status: u16,
    /// Response body as text.
    pub body: String,
    /// Number of requests it took.
    pub attempts: u32,
}

/// Robots state for the session's origin.
#[derive(Debug)]
struct RobotsGate {
    origin: url::Origin,
    result: PolicyLoadResult,
}

/// HTTP fetcher with robots gating, pacing and retries.
///
/// # Example
///
/// ```rust,no_run
/// use gleaner_core::{FetchConfig, Fetcher};
///
/// # async fn run() -> gleaner_core::Result<()> {
/// let fetcher = Fetcher::with_base("https://example.com/", FetchConfig::default()).await?;
/// let page = fetcher.get("/catalogue").await?;
/// println!("{} bytes from {}", page.body.len(), page.final_url);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Fetcher {
    client: Client,
    config: FetchConfig,
    base_url: Option<Url>,
    robots: Option<RobotsGate>,
    last_request: Mutex<Option<Instant>>,
}

impl Fetcher {
    /// Creates a fetcher with no base URL and no robots policy.
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(GleanerError::HttpError)?;

        Ok(Self { client, config, base_url: None, robots: None, last_request: Mutex::new(None) })
    }

    /// Creates a fetcher bound to `base_url`, loading its robots policy
    /// unless `respect_robots` is off.
    ///
    /// Fails with [`GleanerError::RobotsUnavailable`] when the policy cannot
    /// be loaded and `require_robots` is set.
    pub async fn with_base(base_url: &str, config: FetchConfig) -> Result<Self> {
        let base = parse_http_url(base_url)?;
        let mut fetcher = Self::new(config)?;

        if fetcher.config.respect_robots {
            let unavailable = match fetcher.load_robots(&base).await {
                PolicyLoadResult::Unavailable(reason) => Some(reason.clone()),
                PolicyLoadResult::Loaded(_) => None,
            };
            if let Some(reason) = unavailable
                && fetcher.config.require_robots
            {
                let url = robots_url(&base).map(String::from).unwrap_or_else(|| base.to_string());
                return Err(GleanerError::RobotsUnavailable { url, reason });
            }
        }

        fetcher.base_url = Some(base);
        Ok(fetcher)
    }

    /// Loads (or reloads) the robots policy for the origin of `base`.
    pub async fn load_robots(&mut self, base: &Url) -> &PolicyLoadResult {
        let result = load_policy(&self.client, base).await;
        if let PolicyLoadResult::Unavailable(reason) = &result {
            info!(%base, %reason, "proceeding without a robots policy");
        }
        &self.robots.insert(RobotsGate { origin: base.origin(), result }).result
    }

    /// The robots load result for this session, if robots were consulted.
    pub fn robots(&self) -> Option<&PolicyLoadResult> {
        self.robots.as_ref().map(|gate| &gate.result)
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Checks the robots gate for `url`.
    ///
    /// URLs outside the session's origin, and sessions whose policy is
    /// unavailable, are allowed.
    pub fn is_allowed(&self, url: &Url) -> bool {
        let Some(gate) = &self.robots else {
            return true;
        };
        if url.origin() != gate.origin {
            debug!(%url, "no robots policy for this origin");
            return true;
        }
        match gate.result.policy() {
            Some(policy) => policy.is_url_allowed(&self.config.user_agent, url),
            None => true,
        }
    }

    /// Resolves `url` against the base URL (when there is one) and validates it.
    pub fn resolve(&self, url: &str) -> Result<Url> {
        match &self.base_url {
            Some(base) => {
                let joined = base.join(url).map_err(|e| GleanerError::InvalidUrl(format!("{url}: {e}")))?;
                parse_http_url(joined.as_str())
            }
            None => parse_http_url(url),
        }
    }

    /// Fetches `url` with GET.
    ///
    /// Disallowed URLs fail with [`GleanerError::Disallowed`] before any
    /// request is made. Retryable statuses and connection failures are
    /// retried with exponential backoff; anything else, or an exhausted
    /// budget, fails with [`GleanerError::HttpStatus`].
    pub async fn get(&self, url: &str) -> Result<FetchedDocument> {
        let url = self.resolve(url)?;

        if !self.is_allowed(&url) {
            return Err(GleanerError::Disallowed(url.to_string()));
        }

        let retry = &self.config.retry;
        let max_attempts = retry.max_attempts.max(1);
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            self.pace().await;
            debug!(%url, attempt, "GET");

            match self.client.get(url.clone()).send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_client_error() || status.is_server_error() {
                        if retry.is_retryable(status) && attempt < max_attempts {
                            let delay = self.retry_delay(&response, attempt);
                            warn!(%url, %status, attempt, ?delay, "transient HTTP status; retrying");
                            tokio::time::sleep(delay).await;
                            continue;
                        }
                        return Err(GleanerError::HttpStatus {
                            status: status.as_u16(),
                            url: url.to_string(),
                            attempts: attempt,
                        });
                    }

                    let final_url = response.url().clone();
                    let body = match response.text().await {
                        Ok(body) => body,
                        Err(e) if e.is_timeout() && attempt < max_attempts => {
                            let delay = retry.backoff(attempt);
                            warn!(%url, error = %e, attempt, ?delay, "body read timed out; retrying");
                            tokio::time::sleep(delay).await;
                            continue;
                        }
                        Err(e) if e.is_timeout() => {
                            return Err(GleanerError::Timeout { timeout: self.config.timeout.as_secs_f64() });
                        }
                        Err(e) => return Err(GleanerError::HttpError(e)),
                    };
                    info!(%url, %status, bytes = body.len(), attempts = attempt, "fetched");

                    return Ok(FetchedDocument { url, final_url, status: status.as_u16(), body, attempts: attempt });
                }
                Err(e) if (e.is_connect() || e.is_timeout()) && attempt < max_attempts => {
                    let delay = retry.backoff(attempt);
                    warn!(%url, error = %e, attempt, ?delay, "request failed; retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(e) if e.is_timeout() => {
                    return Err(GleanerError::Timeout { timeout: self.config.timeout.as_secs_f64() });
                }
                Err(e) => return Err(GleanerError::HttpError(e)),
            }
        }
    }

    /// Delay before the next attempt after a retryable response.
    fn retry_delay(&self, response: &Response, attempt: u32) -> Duration {
        let retry = &self.config.retry;
        if retry.respect_retry_after
            && let Some(secs) = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok())
        {
            return Duration::from_secs(secs).min(retry.max_backoff);
        }
        retry.backoff(attempt)
    }

    /// Spacing between requests: the larger of `min_delay` and the robots crawl delay.
    fn request_interval(&self) -> Duration {
        let crawl_delay = self
            .robots
            .as_ref()
            .and_then(|gate| gate.result.policy())
            .and_then(|policy| policy.crawl_delay(&self.config.user_agent))
            .unwrap_or(Duration::ZERO);
        self.config.min_delay.max(crawl_delay)
    }

    /// Waits until the request interval has passed since the previous request.
    async fn pace(&self) {
        let interval = self.request_interval();
        let mut last = self.last_request.lock().await;

        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < interval {
                tokio::time::sleep(interval - elapsed).await;
            }
        }

        *last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_config() -> FetchConfig {
        FetchConfig {
            retry: RetryPolicy {
                backoff_factor: Duration::from_millis(1),
                max_backoff: Duration::from_millis(5),
                ..RetryPolicy::default()
            },
            ..FetchConfig::default()
        }
    }

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(15));
        assert!(config.user_agent.starts_with("gleaner/"));
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.retry_statuses, vec![429, 500, 502, 503, 504]);
        assert!(config.respect_robots);
        assert!(!config.require_robots);
    }

    #[test]
    fn test_backoff_schedule() {
        let retry = RetryPolicy::default();
        assert_eq!(retry.backoff(1), Duration::from_millis(500));
        assert_eq!(retry.backoff(2), Duration::from_secs(1));
        assert_eq!(retry.backoff(3), Duration::from_secs(2));
        assert_eq!(retry.backoff(4), Duration::from_secs(4));
        assert_eq!(retry.backoff(40), Duration::from_secs(120));
    }

    #[test]
    fn test_retryable_statuses() {
        let retry = RetryPolicy::default();
        assert!(retry.is_retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(retry.is_retryable(StatusCode::BAD_GATEWAY));
        assert!(!retry.is_retryable(StatusCode::NOT_FOUND));
        assert!(!retry.is_retryable(StatusCode::NOT_IMPLEMENTED));
    }

    #[tokio::test]
    async fn test_get_invalid_url() {
        let fetcher = Fetcher::new(FetchConfig::default()).unwrap();
        let result = fetcher.get("not-a-url").await;
        assert!(matches!(result, Err(GleanerError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_with_base_rejects_non_http() {
        let result = Fetcher::with_base("ftp://example.com/", FetchConfig::default()).await;
        assert!(matches!(result, Err(GleanerError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_get_success_and_relative_resolution() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>hi</p>"))
            .mount(&server)
            .await;

        let fetcher = Fetcher::with_base(&server.uri(), fast_config()).await.unwrap();
        let doc = fetcher.get("/page").await.unwrap();

        assert_eq!(doc.body, "<p>hi</p>");
        assert_eq!(doc.status, 200);
        assert_eq!(doc.attempts, 1);
        assert_eq!(doc.url.path(), "/page");
    }

    #[tokio::test]
    async fn test_retries_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let fetcher = Fetcher::with_base(&server.uri(), fast_config()).await.unwrap();
        let doc = fetcher.get("/flaky").await.unwrap();

        assert_eq!(doc.body, "ok");
        assert_eq!(doc.attempts, 2);
    }

    #[tokio::test]
    async fn test_retries_exhausted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/down"))
            .respond_with(ResponseTemplate::new(503))
            .expect(5)
            .mount(&server)
            .await;

        let fetcher = Fetcher::with_base(&server.uri(), fast_config()).await.unwrap();
        let result = fetcher.get("/down").await;

        assert!(matches!(result, Err(GleanerError::HttpStatus { status: 503, attempts: 5, .. })));
    }

    #[tokio::test]
    async fn test_retry_after_is_capped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/busy"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "3600"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/busy"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ready"))
            .mount(&server)
            .await;

        let fetcher = Fetcher::with_base(&server.uri(), fast_config()).await.unwrap();
        let started = Instant::now();
        let doc = fetcher.get("/busy").await.unwrap();

        assert_eq!(doc.body, "ready");
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_non_retryable_status_fails_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = Fetcher::with_base(&server.uri(), fast_config()).await.unwrap();
        let result = fetcher.get("/missing").await;

        assert!(matches!(result, Err(GleanerError::HttpStatus { status: 404, attempts: 1, .. })));
    }

    #[tokio::test]
    async fn test_robots_disallow_blocks_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private\n"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/private/data"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let fetcher = Fetcher::with_base(&server.uri(), fast_config()).await.unwrap();
        assert!(fetcher.robots().is_some_and(PolicyLoadResult::is_loaded));

        let result = fetcher.get("/private/data").await;
        assert!(matches!(result, Err(GleanerError::Disallowed(_))));
    }

    #[tokio::test]
    async fn test_robots_unavailable_is_permissive_by_default() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let fetcher = Fetcher::with_base(&server.uri(), fast_config()).await.unwrap();
        assert!(matches!(fetcher.robots(), Some(PolicyLoadResult::Unavailable(_))));

        let url = Url::parse(&format!("{}/anything", server.uri())).unwrap();
        assert!(fetcher.is_allowed(&url));
    }

    #[tokio::test]
    async fn test_require_robots_aborts_when_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let config = FetchConfig { require_robots: true, ..fast_config() };
        let result = Fetcher::with_base(&server.uri(), config).await;

        assert!(matches!(result, Err(GleanerError::RobotsUnavailable { .. })));
    }

    #[tokio::test]
    async fn test_robots_forbidden_denies_all() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let fetcher = Fetcher::with_base(&server.uri(), fast_config()).await.unwrap();
        let result = fetcher.get("/").await;

        assert!(matches!(result, Err(GleanerError::Disallowed(_))));
    }

    #[tokio::test]
    async fn test_other_origin_is_not_gated() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /\n"))
            .mount(&server)
            .await;

        let fetcher = Fetcher::with_base(&server.uri(), fast_config()).await.unwrap();
        let same = Url::parse(&format!("{}/x", server.uri())).unwrap();
        let other = Url::parse("https://elsewhere.example/x").unwrap();

        assert!(!fetcher.is_allowed(&same));
        assert!(fetcher.is_allowed(&other));
    }

    #[tokio::test]
    async fn test_min_delay_spaces_requests() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let config = FetchConfig { min_delay: Duration::from_millis(50), respect_robots: false, ..fast_config() };
        let fetcher = Fetcher::with_base(&server.uri(), config).await.unwrap();

        let started = Instant::now();
        fetcher.get("/a").await.unwrap();
        fetcher.get("/a").await.unwrap();

        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    /// Accepts connections, sends headers for a 1000-byte body and then stalls.
    async fn stalled_body_server() -> (String, Arc<AtomicU32>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&requests);

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let counter = Arc::clone(&counter);
                tokio::spawn(async move {
                    let mut buf = [0u8; 2048];
                    let _ = socket.read(&mut buf).await;
                    counter.fetch_add(1, Ordering::SeqCst);
                    let head = "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: 1000\r\n\r\n<html>";
                    let _ = socket.write_all(head.as_bytes()).await;
                    tokio::time::sleep(Duration::from_secs(30)).await;
                });
            }
        });

        (format!("http://{addr}/"), requests)
    }

    #[tokio::test]
    async fn test_body_timeout_is_retried_then_reported() {
        let (url, requests) = stalled_body_server().await;
        let base = fast_config();
        let config = FetchConfig {
            timeout: Duration::from_millis(200),
            retry: RetryPolicy { max_attempts: 2, ..base.retry.clone() },
            respect_robots: false,
            ..base
        };
        let fetcher = Fetcher::new(config).unwrap();

        let err = fetcher.get(&url).await.unwrap_err();

        assert!(matches!(err, GleanerError::Timeout { .. }), "unexpected error: {err:?}");
        assert_eq!(requests.load(Ordering::SeqCst), 2);
    }
}
