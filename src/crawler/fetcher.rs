//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler:
//! - Building one HTTP client carrying the site identity headers
//! - GET requests for index and detail pages
//! - Error classification
//!
//! Failed requests are not retried here; the caller logs and drops them.

use crate::config::{CrawlerConfig, SiteConfig};
use crate::listing::DetailPage;
use reqwest::header::{HeaderMap, HeaderValue, COOKIE};
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors from a single request
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Request to {url} failed: {reason}")]
    Network { url: String, reason: String },

    #[error("Invalid value for header {name}")]
    InvalidHeader { name: &'static str },

    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Builds the HTTP client shared by the index and detail stages
///
/// The user agent and the optional session cookie are attached to every
/// request, identically for both stages.
///
/// # Example
///
/// ```no_run
/// use rent_watch::config::{CrawlerConfig, SiteConfig};
/// use rent_watch::crawler::build_http_client;
///
/// let site = SiteConfig {
///     base_url: "https://www.example.com/apartments".to_string(),
///     user_agent: "Mozilla/5.0".to_string(),
///     cookie: Some("session=abc".to_string()),
///     ..Default::default()
/// };
///
/// let client = build_http_client(&site, &CrawlerConfig::default()).unwrap();
/// ```
pub fn build_http_client(site: &SiteConfig, crawler: &CrawlerConfig) -> Result<Client, FetchError> {
    let mut headers = HeaderMap::new();
    if let Some(cookie) = &site.cookie {
        let value =
            HeaderValue::from_str(cookie).map_err(|_| FetchError::InvalidHeader { name: "cookie" })?;
        headers.insert(COOKIE, value);
    }

    let client = Client::builder()
        .user_agent(site.user_agent.clone())
        .default_headers(headers)
        .timeout(Duration::from_secs(crawler.request_timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()?;

    Ok(client)
}

/// Fetches one page
///
/// Any non-2xx status is an error. The returned page carries the final URL
/// after redirects.
pub async fn fetch_page(client: &Client, url: &Url) -> Result<DetailPage, FetchError> {
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| classify(url, e))?;

    let status = response.status();
    let final_url = response.url().clone();

    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let body = response.text().await.map_err(|e| classify(url, e))?;

    Ok(DetailPage {
        url: final_url,
        status_code: status.as_u16(),
        body,
    })
}

fn classify(url: &Url, err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else if err.is_connect() {
        FetchError::Network {
            url: url.to_string(),
            reason: "connection refused".to_string(),
        }
    } else {
        FetchError::Network {
            url: url.to_string(),
            reason: err.to_string(),
        }
    }
}
