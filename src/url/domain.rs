use url::Url;

/// Extracts the lowercase host of a URL
///
/// Ports are not part of the host, so `127.0.0.1:8080` and `127.0.0.1:9090`
/// share a domain for per-domain concurrency limits.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use rent_watch::url::extract_domain;
///
/// let url = Url::parse("https://WWW.Example.com/apartments").unwrap();
/// assert_eq!(extract_domain(&url), Some("www.example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}
