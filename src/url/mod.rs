//! URL handling module for Rent-Watch
//!
//! This module builds index-page URLs from a crawl target, checks hosts
//! against the allowed-domain list, and computes per-pass de-duplication keys.

mod domain;
mod matcher;
mod normalize;

use crate::{UrlError, UrlResult};
use url::Url;

// Re-export main functions
pub use domain::extract_domain;
pub use matcher::matches_wildcard;
pub use normalize::dedup_key;

/// Parses a URL that the crawler will request, accepting only HTTP(S)
pub fn parse_http_url(url_str: &str) -> UrlResult<Url> {
    let url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingDomain);
    }

    Ok(url)
}

/// Builds the URL of a numbered index page
///
/// Page 0 is the base URL itself; any other page appends `/page-N` to the
/// base path.
///
/// # Examples
///
/// ```
/// use rent_watch::url::page_url;
///
/// assert_eq!(
///     page_url("https://example.com/apartments", 0).unwrap().as_str(),
///     "https://example.com/apartments"
/// );
/// assert_eq!(
///     page_url("https://example.com/apartments/", 3).unwrap().as_str(),
///     "https://example.com/apartments/page-3"
/// );
/// ```
pub fn page_url(base_url: &str, page: u32) -> UrlResult<Url> {
    if page == 0 {
        return parse_http_url(base_url);
    }
    let trimmed = base_url.trim_end_matches('/');
    parse_http_url(&format!("{}/page-{}", trimmed, page))
}

/// Builds the URL of a target-named index page
///
/// The name is appended directly to the base URL, so a base ending in `/`
/// yields `<base><name>`.
///
/// # Examples
///
/// ```
/// use rent_watch::url::named_url;
///
/// assert_eq!(
///     named_url("https://example.com/apartments/", "amsterdam").unwrap().as_str(),
///     "https://example.com/apartments/amsterdam"
/// );
/// ```
pub fn named_url(base_url: &str, name: &str) -> UrlResult<Url> {
    let name = name.trim();
    if name.is_empty() {
        return Err(UrlError::Malformed("target name cannot be empty".to_string()));
    }
    parse_http_url(&format!("{}{}", base_url, name))
}

/// Checks whether a URL's host is on the allow-list
///
/// An empty list allows every host.
pub fn is_allowed_host(url: &Url, allowed_domains: &[String]) -> bool {
    if allowed_domains.is_empty() {
        return true;
    }

    match extract_domain(url) {
        Some(domain) => allowed_domains
            .iter()
            .any(|pattern| matches_wildcard(pattern, &domain)),
        None => false,
    }
}
