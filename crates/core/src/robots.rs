//! robots.txt parsing and permission checks.
//!
//! A [`RobotsPolicy`] is parsed from the text of a site's robots.txt and
//! answers "may this user agent fetch this path". Loading is best-effort:
//! [`load_policy`] reports whether a policy was actually obtained through
//! [`PolicyLoadResult`] so the caller decides what an unknown policy means.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::{debug, warn};
use url::Url;

/// A single Allow/Disallow line.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Rule {
    allow: bool,
    pattern: String,
}

/// Rules shared by one or more consecutive `User-agent` lines.
#[derive(Debug, Clone, Default)]
struct Group {
    /// Lowercased agent tokens; `*` is the wildcard group.
    agents: Vec<String>,
    rules: Vec<Rule>,
    crawl_delay: Option<Duration>,
}

impl Group {
    fn is_wildcard(&self) -> bool {
        self.agents.iter().any(|a| a == "*")
    }

    fn matches_product(&self, product: &str) -> bool {
        self.agents.iter().any(|a| a != "*" && product.contains(a.as_str()))
    }
}

/// Parsed robots.txt rules.
#[derive(Debug, Clone, Default)]
pub struct RobotsPolicy {
    groups: Vec<Group>,
    sitemaps: Vec<String>,
    deny_all: bool,
}

impl RobotsPolicy {
    /// A policy that allows everything, used for a missing robots.txt.
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// A policy that forbids everything, used when robots.txt itself is
    /// behind authentication (401/403).
    pub fn deny_all() -> Self {
        Self { deny_all: true, ..Self::default() }
    }

    /// Parses robots.txt content.
    ///
    /// Unknown directives and lines without a `:` are ignored; rules that
    /// appear before any `User-agent` line belong to no group and are dropped.
    pub fn parse(content: &str) -> Self {
        let mut policy = Self::default();
        let mut current: Option<Group> = None;
        let mut in_rules = false;

        for raw in content.lines() {
            let line = match raw.split_once('#') {
                Some((before, _)) => before,
                None => raw,
            }
            .trim();

            if line.is_empty() {
                continue;
            }

            let Some((directive, value)) = line.split_once(':') else {
                continue;
            };
            let directive = directive.trim().to_ascii_lowercase();
            let value = value.trim();

            match directive.as_str() {
                "user-agent" => {
                    if in_rules || current.is_none() {
                        if let Some(group) = current.take() {
                            policy.groups.push(group);
                        }
                        current = Some(Group::default());
                        in_rules = false;
                    }
                    if let Some(group) = current.as_mut() {
                        group.agents.push(value.to_lowercase());
                    }
                }
                "allow" | "disallow" => {
                    let Some(group) = current.as_mut() else {
                        continue;
                    };
                    in_rules = true;
                    // An empty Disallow means "everything allowed"; no rule needed.
                    if !value.is_empty() {
                        group.rules.push(Rule { allow: directive == "allow", pattern: normalize_path(value) });
                    }
                }
                "crawl-delay" => {
                    let Some(group) = current.as_mut() else {
                        continue;
                    };
                    in_rules = true;
                    if let Ok(secs) = value.parse::<f64>()
                        && secs.is_finite()
                        && secs >= 0.0
                    {
                        group.crawl_delay = Some(Duration::from_secs_f64(secs));
                    }
                }
                "sitemap" => policy.sitemaps.push(value.to_string()),
                _ => {}
            }
        }

        if let Some(group) = current {
            policy.groups.push(group);
        }

        policy
    }

    /// Picks the group that applies to `user_agent`: the first group naming
    /// the agent's product token, else the wildcard group.
    fn group_for(&self, user_agent: &str) -> Option<&Group> {
        let product = product_token(user_agent);
        self.groups
            .iter()
            .find(|g| g.matches_product(&product))
            .or_else(|| self.groups.iter().find(|g| g.is_wildcard()))
    }

    /// Checks if `path` (path plus optional query) may be fetched by `user_agent`.
    ///
    /// The longest matching pattern decides; on a tie, Allow wins. Raw and
    /// percent-encoded forms of the same path are treated alike.
    pub fn is_allowed(&self, user_agent: &str, path: &str) -> bool {
        if self.deny_all {
            return false;
        }

        let Some(group) = self.group_for(user_agent) else {
            return true;
        };

        let path = normalize_path(path);

        let mut best_allow: Option<usize> = None;
        let mut best_disallow: Option<usize> = None;

        for rule in &group.rules {
            if !path_matches(&path, &rule.pattern) {
                continue;
            }
            let slot = if rule.allow { &mut best_allow } else { &mut best_disallow };
            *slot = Some(slot.map_or(rule.pattern.len(), |len| len.max(rule.pattern.len())));
        }

        match (best_allow, best_disallow) {
            (_, None) => true,
            (None, Some(_)) => false,
            (Some(allow), Some(disallow)) => allow >= disallow,
        }
    }

    /// Checks a full URL against the policy.
    pub fn is_url_allowed(&self, user_agent: &str, url: &Url) -> bool {
        self.is_allowed(user_agent, &path_with_query(url))
    }

    /// Crawl delay requested for `user_agent`, if any.
    pub fn crawl_delay(&self, user_agent: &str) -> Option<Duration> {
        self.group_for(user_agent).and_then(|g| g.crawl_delay)
    }

    /// Sitemaps listed in the file.
    pub fn sitemaps(&self) -> &[String] {
        &self.sitemaps
    }

    /// Check if robots.txt disallows all crawling for `user_agent`.
    pub fn disallows_all(&self, user_agent: &str) -> bool {
        !self.is_allowed(user_agent, "/")
    }
}

/// Outcome of trying to obtain a site's robots policy.
#[derive(Debug, Clone)]
pub enum PolicyLoadResult {
    /// A policy was obtained (possibly the allow-all or deny-all policy
    /// implied by the robots.txt status code).
    Loaded(RobotsPolicy),
    /// The policy is unknown: network failure or a server error.
    Unavailable(String),
}

impl PolicyLoadResult {
    /// The loaded policy, if any.
    pub fn policy(&self) -> Option<&RobotsPolicy> {
        match self {
            Self::Loaded(policy) => Some(policy),
            Self::Unavailable(_) => None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }
}

/// Location of robots.txt for the origin of `url`.
pub fn robots_url(url: &Url) -> Option<Url> {
    if url.host_str().is_none() {
        return None;
    }
    let mut robots = url.clone();
    robots.set_path("/robots.txt");
    robots.set_query(None);
    robots.set_fragment(None);
    Some(robots)
}

/// Fetches and parses robots.txt for the site of `base`.
///
/// Single attempt, no retry.
/// - 2xx: the body is parsed
/// - 401/403: deny-all
/// - other 4xx: allow-all
/// - anything else: [`PolicyLoadResult::Unavailable`]
pub async fn load_policy(client: &Client, base: &Url) -> PolicyLoadResult {
    let Some(url) = robots_url(base) else {
        return PolicyLoadResult::Unavailable(format!("{base} has no host"));
    };

    let response = match client.get(url.clone()).send().await {
        Ok(response) => response,
        Err(e) => {
            warn!(%url, error = %e, "robots.txt request failed; policy unknown");
            return PolicyLoadResult::Unavailable(e.to_string());
        }
    };

    let status = response.status();
    if status.is_success() {
        return match response.text().await {
            Ok(body) => {
                let policy = RobotsPolicy::parse(&body);
                debug!(%url, groups = policy.groups.len(), "loaded robots.txt");
                PolicyLoadResult::Loaded(policy)
            }
            Err(e) => {
                warn!(%url, error = %e, "could not read robots.txt body; policy unknown");
                PolicyLoadResult::Unavailable(e.to_string())
            }
        };
    }

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            debug!(%url, %status, "robots.txt is protected; denying all");
            PolicyLoadResult::Loaded(RobotsPolicy::deny_all())
        }
        s if s.is_client_error() => {
            debug!(%url, %status, "no robots.txt; allowing all");
            PolicyLoadResult::Loaded(RobotsPolicy::allow_all())
        }
        s => {
            warn!(%url, status = %s, "robots.txt unavailable; policy unknown");
            PolicyLoadResult::Unavailable(format!("HTTP {}", s.as_u16()))
        }
    }
}

/// Lowercased product token of a user agent: the text before the first `/`.
fn product_token(user_agent: &str) -> String {
    user_agent
        .split('/')
        .next()
        .unwrap_or(user_agent)
        .trim()
        .to_lowercase()
}

fn path_with_query(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}

/// Percent-encodes non-ASCII bytes, spaces and control characters and
/// uppercases existing `%xx` escapes.
fn normalize_path(path: &str) -> String {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";

    let bytes = path.as_bytes();
    let mut out = String::with_capacity(path.len());
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        let escaped = b == b'%' && i + 2 < bytes.len();
        if escaped && bytes[i + 1].is_ascii_hexdigit() && bytes[i + 2].is_ascii_hexdigit() {
            out.push('%');
            out.push(bytes[i + 1].to_ascii_uppercase() as char);
            out.push(bytes[i + 2].to_ascii_uppercase() as char);
            i += 3;
            continue;
        }
        if b.is_ascii_graphic() {
            out.push(b as char);
        } else {
            out.push('%');
            out.push(HEX[usize::from(b >> 4)] as char);
            out.push(HEX[usize::from(b & 0x0f)] as char);
        }
        i += 1;
    }

    out
}

/// Check if a path matches a robots.txt pattern (`*` wildcard, `$` end anchor).
fn path_matches(path: &str, pattern: &str) -> bool {
    let (pattern, anchored) = match pattern.strip_suffix('$') {
        Some(stripped) => (stripped, true),
        None => (pattern, false),
    };

    if !pattern.contains('*') {
        return if anchored { path == pattern } else { path.starts_with(pattern) };
    }

    let parts: Vec<&str> = pattern.split('*').collect();
    let mut pos = 0;

    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        if i == 0 {
            if !path.starts_with(part) {
                return false;
            }
            pos = part.len();
            continue;
        }
        // The last literal of an anchored pattern must sit at the very end.
        if anchored && i == parts.len() - 1 {
            return path.len() >= pos + part.len() && path.ends_with(part);
        }
        match path[pos..].find(part) {
            Some(found) => pos += found + part.len(),
            None => return false,
        }
    }

    // Pattern ends with '*' or is all wildcards.
    !anchored || parts.last().is_some_and(|p| p.is_empty()) || pos == path.len()
}
