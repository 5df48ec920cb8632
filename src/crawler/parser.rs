//! Index-page anchor discovery
//!
//! The index stage only needs the detail links. Every element matching the
//! anchor selector contributes its `href`, resolved against the page URL.

use scraper::{Html, Selector};
use url::Url;

/// Extracts the absolute detail URLs linked from an index page
///
/// # Link Rules
///
/// **Include:** every element matching `selector` that carries an `href`
///
/// **Exclude:**
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs
/// - Fragment-only links
/// - Anything that is not HTTP(S) after resolution
///
/// # Example
///
/// ```
/// use rent_watch::crawler::extract_anchors;
/// use scraper::Selector;
/// use url::Url;
///
/// let html = r#"<h2 class="title"><a href="/rent/utrecht/abc/street">Flat</a></h2>"#;
/// let base = Url::parse("https://example.com/rent/utrecht").unwrap();
/// let selector = Selector::parse("h2.title > a[href]").unwrap();
///
/// let anchors = extract_anchors(html, &base, &selector);
/// assert_eq!(anchors[0].as_str(), "https://example.com/rent/utrecht/abc/street");
/// ```
pub fn extract_anchors(html: &str, base_url: &Url, selector: &Selector) -> Vec<Url> {
    let document = Html::parse_document(html);

    document
        .select(selector)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_link(href, base_url))
        .collect()
}

/// Resolves a link href to an absolute URL
///
/// Returns None if the link should be excluded.
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let absolute = base_url.join(href).ok()?;
    match absolute.scheme() {
        "http" | "https" => Some(absolute),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_url() -> Url {
        Url::parse("https://example.com/apartments/page-2").unwrap()
    }

    fn anchor_selector() -> Selector {
        Selector::parse("h2.listing-search-item__title > a[href]").unwrap()
    }

    fn anchors(html: &str) -> Vec<String> {
        extract_anchors(html, &base_url(), &anchor_selector())
            .into_iter()
            .map(|u| u.to_string())
            .collect()
    }

    #[test]
    fn test_only_selected_anchors() {
        let html = r#"
            <nav><a href="/about">About</a></nav>
            <h2 class="listing-search-item__title"><a href="/apartment-for-rent/utrecht/a1/x">A</a></h2>
            <h2 class="listing-search-item__title"><a href="/apartment-for-rent/utrecht/b2/y">B</a></h2>
            <h3 class="listing-search-item__title"><a href="/apartment-for-rent/utrecht/c3/z">C</a></h3>
        "#;

        assert_eq!(
            anchors(html),
            vec![
                "https://example.com/apartment-for-rent/utrecht/a1/x",
                "https://example.com/apartment-for-rent/utrecht/b2/y",
            ]
        );
    }

    #[test]
    fn test_relative_href_resolved_against_page() {
        let html = r#"<h2 class="listing-search-item__title"><a href="flat/9">Flat</a></h2>"#;
        assert_eq!(anchors(html), vec!["https://example.com/apartments/flat/9"]);
    }

    #[test]
    fn test_absolute_href_kept() {
        let html = r#"<h2 class="listing-search-item__title"><a href="https://other.org/a/b/c">X</a></h2>"#;
        assert_eq!(anchors(html), vec!["https://other.org/a/b/c"]);
    }

    #[test]
    fn test_special_schemes_excluded() {
        let html = r##"
            <h2 class="listing-search-item__title"><a href="javascript:void(0)">J</a></h2>
            <h2 class="listing-search-item__title"><a href="mailto:a@b.c">M</a></h2>
            <h2 class="listing-search-item__title"><a href="#top">F</a></h2>
            <h2 class="listing-search-item__title"><a href="  ">E</a></h2>
            <h2 class="listing-search-item__title"><a href="ftp://files.example.com/x">P</a></h2>
        "##;
        assert!(anchors(html).is_empty());
    }

    #[test]
    fn test_no_anchors() {
        assert!(anchors("<html><body><p>No results</p></body></html>").is_empty());
    }
}
