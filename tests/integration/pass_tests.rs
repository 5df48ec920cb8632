use crate::common::*;
use rent_watch::crawler::{CrawlTarget, Fetcher};
use std::collections::HashSet;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_pass_reports_only_complete_listings() {
    let server = MockServer::start().await;
    mount_index(&server, &["aa11", "bb22"]).await;
    mount_detail(&server, "aa11", Some("€1,100 per month"), Duration::ZERO).await;
    mount_detail(&server, "bb22", None, Duration::ZERO).await;

    let config = create_test_config(&server, 2);
    let mut coordinator = create_coordinator(&config);

    let report = coordinator.run_pass(&CrawlTarget::Page(0)).await.unwrap();

    assert_eq!(report.fetched, 2);
    assert_eq!(report.extracted, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.new, 1);
    assert!(!report.cache_degraded);

    let listing = &report.fresh_listings[0];
    assert_eq!(listing.id, "aa11");
    assert_eq!(listing.price, 1100);
    assert_eq!(listing.area, 52);
    assert_eq!(listing.address.district.as_deref(), Some("Binnenstad"));

    // The id of the page without a price is remembered too
    let members = coordinator.cache().members().unwrap();
    assert_eq!(
        members,
        HashSet::from(["aa11".to_string(), "bb22".to_string()])
    );
}

#[tokio::test]
async fn test_second_pass_finds_nothing_new() {
    let server = MockServer::start().await;
    mount_index(&server, &["aa11", "cc33"]).await;
    mount_detail(&server, "aa11", Some("€1,100"), Duration::ZERO).await;
    mount_detail(&server, "cc33", Some("€950"), Duration::ZERO).await;

    let config = create_test_config(&server, 2);
    let mut coordinator = create_coordinator(&config);

    let first = coordinator.run_pass(&CrawlTarget::Page(0)).await.unwrap();
    assert_eq!(first.new, 2);
    let ids: Vec<&str> = first.fresh_listings.iter().map(|l| l.id.as_str()).collect();
    assert_eq!(ids, vec!["aa11", "cc33"]);

    let second = coordinator.run_pass(&CrawlTarget::Page(0)).await.unwrap();
    assert_eq!(second.extracted, 2);
    assert_eq!(second.known, 2);
    assert_eq!(second.new, 0);
    assert!(second.fresh_listings.is_empty());
}

#[tokio::test]
async fn test_index_without_anchors_gives_empty_pass() {
    let server = MockServer::start().await;
    mount_index(&server, &[]).await;

    let config = create_test_config(&server, 2);
    let mut coordinator = create_coordinator(&config);

    let report = coordinator.run_pass(&CrawlTarget::Page(0)).await.unwrap();

    assert_eq!(report.fetched, 0);
    assert_eq!(report.new, 0);
    assert!(coordinator.cache().members().unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_detail_fetch_is_excluded() {
    let server = MockServer::start().await;
    mount_index(&server, &["aa11", "dd44"]).await;
    mount_detail(&server, "aa11", Some("€1,100"), Duration::ZERO).await;
    Mock::given(method("GET"))
        .and(path(detail_path("dd44")))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let config = create_test_config(&server, 2);
    let mut coordinator = create_coordinator(&config);

    let report = coordinator.run_pass(&CrawlTarget::Page(0)).await.unwrap();

    assert_eq!(report.fetched, 1);
    assert_eq!(report.new, 1);
    assert_eq!(report.fresh_listings[0].id, "aa11");

    let members = coordinator.cache().members().unwrap();
    assert!(!members.contains("dd44"));
}

#[tokio::test]
async fn test_duplicate_anchors_fetched_once() {
    let server = MockServer::start().await;
    mount_index(&server, &["aa11", "aa11", "aa11"]).await;
    Mock::given(method("GET"))
        .and(path(detail_path("aa11")))
        .respond_with(ResponseTemplate::new(200).set_body_string(detail_html(Some("€1,100"))))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(&server, 2);
    let mut coordinator = create_coordinator(&config);

    let report = coordinator.run_pass(&CrawlTarget::Page(0)).await.unwrap();
    assert_eq!(report.fetched, 1);
    assert_eq!(report.new, 1);
}

#[tokio::test]
async fn test_in_flight_requests_bounded_by_parallelism() {
    let server = MockServer::start().await;
    let ids: Vec<String> = (0..12).map(|n| format!("id{:02}", n)).collect();
    let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();

    mount_index(&server, &id_refs).await;
    for id in &id_refs {
        mount_detail(&server, id, Some("€800"), Duration::from_millis(50)).await;
    }

    let config = create_test_config(&server, 3);
    let mut coordinator = create_coordinator(&config);

    let report = coordinator.run_pass(&CrawlTarget::Page(0)).await.unwrap();

    assert_eq!(report.fetched, 12);
    assert_eq!(report.new, 12);

    let scheduler = coordinator.fetcher().scheduler();
    assert!(scheduler.peak_in_flight() <= 3);
    assert!(scheduler.peak_in_flight() >= 1);
    assert_eq!(scheduler.in_flight(), 0);
    assert!(scheduler.progress().is_drained());
}

#[tokio::test]
async fn test_same_id_on_two_urls_collapses_to_one_listing() {
    let server = MockServer::start().await;
    let hrefs = vec![
        "/apartment-for-rent/utrecht/same1/first-street".to_string(),
        "/apartment-for-rent/utrecht/same1/second-street".to_string(),
    ];
    mount_page(&server, INDEX_PATH, index_html_with_links(&hrefs)).await;
    mount_page(&server, &hrefs[0], detail_html(Some("€1,000"))).await;
    mount_page(&server, &hrefs[1], detail_html(Some("€1,200"))).await;

    let config = create_test_config(&server, 2);
    let mut coordinator = create_coordinator(&config);

    let report = coordinator.run_pass(&CrawlTarget::Page(0)).await.unwrap();

    assert_eq!(report.fetched, 2);
    assert_eq!(report.extracted, 1);
    assert_eq!(report.new, 1);
    assert_eq!(report.fresh_listings[0].id, "same1");
    assert_eq!(
        coordinator.cache().members().unwrap(),
        HashSet::from(["same1".to_string()])
    );
}

#[tokio::test]
async fn test_city_pass_fills_address_city() {
    let server = MockServer::start().await;
    mount_page(&server, "/apartments/utrecht", index_html(&["ee55"])).await;
    mount_detail(&server, "ee55", Some("€1,400"), Duration::ZERO).await;

    let mut config = create_test_config(&server, 2);
    config.site.base_url = format!("{}/apartments/", server.uri());
    let mut coordinator = create_coordinator(&config);

    let report = coordinator
        .run_pass(&CrawlTarget::City("utrecht".to_string()))
        .await
        .unwrap();

    assert_eq!(report.target, "city utrecht");
    assert_eq!(report.new, 1);

    let listing = &report.fresh_listings[0];
    assert_eq!(listing.id, "ee55");
    assert_eq!(listing.address.city.as_deref(), Some("utrecht"));
    assert_eq!(listing.address.district.as_deref(), Some("Binnenstad"));
}

#[tokio::test]
async fn test_links_outside_allowed_domains_not_fetched() {
    let server = MockServer::start().await;
    let outside = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(detail_html(Some("€700"))))
        .expect(0)
        .mount(&outside)
        .await;

    let hrefs = vec![
        detail_path("aa11"),
        format!(
            "http://localhost:{}{}",
            outside.address().port(),
            detail_path("zz99")
        ),
    ];
    mount_page(&server, INDEX_PATH, index_html_with_links(&hrefs)).await;
    mount_detail(&server, "aa11", Some("€1,100"), Duration::ZERO).await;

    let mut config = create_test_config(&server, 2);
    config.site.allowed_domains = vec!["127.0.0.1".to_string()];

    let fetcher = Fetcher::new(&config).unwrap();
    let mut run = fetcher.spawn(&CrawlTarget::Page(0)).unwrap();
    let mut urls = Vec::new();
    while let Some(page) = run.next_page().await {
        urls.push(page.url.to_string());
    }
    let stats = run.finish().await;

    assert_eq!(urls, vec![format!("{}{}", server.uri(), detail_path("aa11"))]);
    assert_eq!(stats.anchors, 2);
    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.scheduled, 1);
    assert_eq!(stats.fetched, 1);

    let mut coordinator = create_coordinator(&config);
    let report = coordinator.run_pass(&CrawlTarget::Page(0)).await.unwrap();
    assert_eq!(report.fetched, 1);
    assert!(!coordinator.cache().members().unwrap().contains("zz99"));
}

#[tokio::test]
async fn test_index_outside_allowed_domains_not_fetched() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(INDEX_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(index_html(&["aa11"])))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = create_test_config(&server, 2);
    config.site.allowed_domains = vec!["*.example.com".to_string()];

    let fetcher = Fetcher::new(&config).unwrap();
    let pages = fetcher.fetch_all(&CrawlTarget::Page(0)).await.unwrap();

    assert!(pages.is_empty());
}
