//! Hand-off of new listings
//!
//! A [`Publisher`] takes one batch of new listings and returns an
//! acknowledgement id. Publishing is fire-and-forget from the coordinator's
//! point of view: the outcome is logged, never retried.

mod http;
mod store;

pub use http::HttpPublisher;
pub use store::StorePublisher;

use crate::config::Config;
use crate::listing::Listing;
use crate::storage::{SharedStore, StorageError};
use crate::WatchError;
use async_trait::async_trait;
use thiserror::Error;

/// Errors from publishing a batch
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Failed to serialize batch: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to send batch to {url}: {source}")]
    Transport { url: String, source: reqwest::Error },

    #[error("Batch rejected by {url} with HTTP {status}: {body}")]
    Rejected { url: String, status: u16, body: String },

    #[error("Failed to store batch: {0}")]
    Store(#[from] StorageError),
}

/// Destination for batches of new listings
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publishes one batch and returns the acknowledgement id
    async fn publish(&self, listings: &[Listing]) -> Result<String, PublishError>;

    /// Short name for log lines
    fn name(&self) -> &str;
}

/// Builds the publisher selected by the output configuration
///
/// With a `publish_url` the batch is POSTed there; otherwise it is upserted
/// into the local store.
pub fn build_publisher(
    config: &Config,
    store: SharedStore,
) -> Result<Box<dyn Publisher>, WatchError> {
    match &config.output.publish_url {
        Some(url) => Ok(Box::new(HttpPublisher::new(url, &config.site.user_agent)?)),
        None => Ok(Box::new(StorePublisher::new(store, config.output.partitioning))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteListingStore;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    fn store() -> SharedStore {
        Arc::new(Mutex::new(SqliteListingStore::new_in_memory().unwrap()))
    }

    #[test]
    fn test_build_store_publisher_by_default() {
        let config = Config::default();
        let publisher = build_publisher(&config, store()).unwrap();
        assert_eq!(publisher.name(), "store");
    }

    #[test]
    fn test_build_http_publisher_with_url() {
        let mut config = Config::default();
        config.output.publish_url = Some("http://127.0.0.1:8080/listings".to_string());

        let publisher = build_publisher(&config, store()).unwrap();
        assert_eq!(publisher.name(), "http");
    }

    #[test]
    fn test_build_http_publisher_bad_url() {
        let mut config = Config::default();
        config.output.publish_url = Some("not a url".to_string());

        assert!(build_publisher(&config, store()).is_err());
    }
}
