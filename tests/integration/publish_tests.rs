use crate::common::*;
use rent_watch::crawler::CrawlTarget;
use rent_watch::publish::{HttpPublisher, StorePublisher};
use rent_watch::storage::{open_shared_store, ListingStore, Partitioning};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_new_listings_posted_to_endpoint() {
    let site = MockServer::start().await;
    mount_index(&site, &["aa11", "bb22"]).await;
    mount_detail(&site, "aa11", Some("€1,100"), Duration::ZERO).await;
    mount_detail(&site, "bb22", Some("€1,300"), Duration::ZERO).await;

    let sink = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/listings"))
        .respond_with(ResponseTemplate::new(200).insert_header("x-message-id", "m-1"))
        .expect(1)
        .mount(&sink)
        .await;

    let config = create_test_config(&site, 2);
    let mut coordinator = create_coordinator(&config);
    let publisher = HttpPublisher::new(&format!("{}/listings", sink.uri()), "RentWatchTest/1.0")
        .unwrap();

    let report = coordinator
        .run_and_publish(&CrawlTarget::Page(0), &publisher)
        .await
        .unwrap();
    assert_eq!(report.ack.as_deref(), Some("m-1"));

    let requests = sink.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body[0]["id"], "aa11");
    assert_eq!(body[1]["id"], "bb22");

    // Nothing new on the second pass, so nothing is posted
    let report = coordinator
        .run_and_publish(&CrawlTarget::Page(0), &publisher)
        .await
        .unwrap();
    assert_eq!(report.new, 0);
    assert!(report.ack.is_none());
}

#[tokio::test]
async fn test_rejected_publish_keeps_report() {
    let site = MockServer::start().await;
    mount_index(&site, &["aa11"]).await;
    mount_detail(&site, "aa11", Some("€1,100"), Duration::ZERO).await;

    let sink = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&sink)
        .await;

    let config = create_test_config(&site, 1);
    let mut coordinator = create_coordinator(&config);
    let publisher = HttpPublisher::new(&sink.uri(), "RentWatchTest/1.0").unwrap();

    let report = coordinator
        .run_and_publish(&CrawlTarget::Page(0), &publisher)
        .await
        .unwrap();

    assert_eq!(report.new, 1);
    assert!(report.ack.is_none());
}

#[tokio::test]
async fn test_listings_stored_with_pass_history() {
    let site = MockServer::start().await;
    mount_index(&site, &["aa11", "bb22"]).await;
    mount_detail(&site, "aa11", Some("€1,100"), Duration::ZERO).await;
    mount_detail(&site, "bb22", Some("€1,300"), Duration::ZERO).await;

    let dir = TempDir::new().unwrap();
    let store = open_shared_store(&dir.path().join("listings.db")).unwrap();

    let config = create_test_config(&site, 2);
    let mut coordinator = create_coordinator(&config).with_history(store.clone(), &config);
    let publisher = StorePublisher::new(store.clone(), Partitioning::Flat);

    let report = coordinator
        .run_and_publish(&CrawlTarget::Page(0), &publisher)
        .await
        .unwrap();
    assert_eq!(report.ack.as_deref(), Some("stored:2"));

    let store = store.lock().await;
    assert_eq!(store.count_listings().unwrap(), 2);

    let passes = store.recent_passes(5).unwrap();
    assert_eq!(passes.len(), 1);
    assert_eq!(passes[0].target, "page 0");
    assert_eq!(passes[0].counts.fetched, 2);
    assert_eq!(passes[0].counts.new, 2);
    assert!(passes[0].finished_at.is_some());
}
