use rent_watch::cache::{ExpiryRule, MemoryCache, TtlPolicy};
use rent_watch::config::Config;
use rent_watch::crawler::Coordinator;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path of the first index page on the mock site
pub const INDEX_PATH: &str = "/apartments";

/// Creates a test configuration pointed at the mock site
pub fn create_test_config(server: &MockServer, parallelism: u32) -> Config {
    let mut config = Config::default();
    config.site.base_url = format!("{}{}", server.uri(), INDEX_PATH);
    config.site.user_agent = "RentWatchTest/1.0".to_string();
    config.crawler.parallelism = parallelism;
    config.crawler.random_delay_ms = 0;
    config.crawler.request_timeout_secs = 5;
    config.cache.url = "memory://".to_string();
    config
}

/// Creates a coordinator backed by an in-memory cache
pub fn create_coordinator(config: &Config) -> Coordinator {
    let cache = MemoryCache::new(ExpiryRule::new(TtlPolicy::SetOnce, 5));
    Coordinator::from_config(config, Box::new(cache)).expect("coordinator")
}

pub fn detail_path(id: &str) -> String {
    format!("/apartment-for-rent/utrecht/{}/oudegracht", id)
}

pub fn index_html(ids: &[&str]) -> String {
    let hrefs: Vec<String> = ids.iter().map(|id| detail_path(id)).collect();
    index_html_with_links(&hrefs)
}

/// Index page linking to the given hrefs, relative or absolute
pub fn index_html_with_links(hrefs: &[String]) -> String {
    let items: String = hrefs
        .iter()
        .map(|href| {
            format!(
                r#"<li><h2 class="listing-search-item__title"><a href="{}">Apartment</a></h2></li>"#,
                href
            )
        })
        .collect();

    format!("<html><body><ul>{}</ul></body></html>", items)
}

pub fn detail_html(price: Option<&str>) -> String {
    let price = price
        .map(|p| {
            format!(
                r#"<dd class="listing-features__description--for_rent_price"><span>{}</span></dd>"#,
                p
            )
        })
        .unwrap_or_default();

    format!(
        r#"<html><body>
<main class="page__main">
  <div class="listing-detail-summary__location">3511 AB Utrecht (Binnenstad)</div>
  <dl>
    {price}
    <dd class="listing-features__description--surface_area"><span>52 m²</span></dd>
    <dd class="listing-features__description--offered_since"><span>01-03-2024</span></dd>
  </dl>
</main>
</body></html>"#
    )
}

pub async fn mount_index(server: &MockServer, ids: &[&str]) {
    mount_page(server, INDEX_PATH, index_html(ids)).await;
}

pub async fn mount_page(server: &MockServer, page_path: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

pub async fn mount_detail(server: &MockServer, id: &str, price: Option<&str>, delay: Duration) {
    Mock::given(method("GET"))
        .and(path(detail_path(id)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(detail_html(price))
                .set_delay(delay),
        )
        .mount(server)
        .await;
}
