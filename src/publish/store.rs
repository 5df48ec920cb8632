use super::{PublishError, Publisher};
use crate::listing::Listing;
use crate::storage::{ListingStore, Partitioning, SharedStore};
use async_trait::async_trait;

/// Publishes by upserting into the local listing store
///
/// The acknowledgement is `stored:<n>` with the number of rows written.
pub struct StorePublisher {
    store: SharedStore,
    partitioning: Partitioning,
}

impl StorePublisher {
    pub fn new(store: SharedStore, partitioning: Partitioning) -> Self {
        Self {
            store,
            partitioning,
        }
    }
}

#[async_trait]
impl Publisher for StorePublisher {
    async fn publish(&self, listings: &[Listing]) -> Result<String, PublishError> {
        let groups = self.partitioning.group(listings);
        let mut store = self.store.lock().await;
        let mut written = 0;

        for (partition, group) in groups {
            let batch: Vec<Listing> = group.into_iter().cloned().collect();
            written += store.upsert_batch(&partition, &batch)?;
        }

        Ok(format!("stored:{}", written))
    }

    fn name(&self) -> &str {
        "store"
    }
}
