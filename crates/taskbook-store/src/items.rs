//! Item repository implementation.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::trace;

use taskbook_core::{Error, Item, ItemRepository, KeyValueStore, Result};

use crate::keys::item_key;

/// Key-value implementation of ItemRepository.
///
/// Writes are unconditional, last writer wins.
pub struct KvItemRepository {
    kv: Arc<dyn KeyValueStore>,
}

impl KvItemRepository {
    /// Create a new KvItemRepository over the given backend.
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }
}

#[async_trait]
impl ItemRepository for KvItemRepository {
    async fn save(&self, item: &Item) -> Result<()> {
        let bytes = serde_json::to_vec(item)?;
        self.kv.set(&item_key(&item.id), &bytes).await?;
        trace!(subsystem = "store", component = "items", item_id = %item.id, "Saved item");
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Item> {
        let bytes = self
            .kv
            .get(&item_key(id))
            .await?
            .ok_or_else(|| Error::NotFound(format!("item {}", id)))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn remove(&self, id: &str) -> Result<()> {
        self.kv.delete(&item_key(id)).await
    }

    async fn get_and_remove(&self, id: &str) -> Result<Item> {
        let item = self.get(id).await?;
        self.remove(id).await?;
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryKvStore;
    use crate::test_fixtures::{FaultyKvStore, KvOp};

    fn repo() -> (Arc<MemoryKvStore>, KvItemRepository) {
        let kv = Arc::new(MemoryKvStore::new());
        (kv.clone(), KvItemRepository::new(kv))
    }

    #[tokio::test]
    async fn test_save_and_get() {
        let (kv, items) = repo();
        let item = Item::new("buy milk", "", "");
        items.save(&item).await.unwrap();

        assert_eq!(items.get(&item.id).await.unwrap(), item);
        assert!(kv.get(&format!("item_{}", item.id)).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let (_, items) = repo();
        let mut item = Item::new("draft", "", "");
        items.save(&item).await.unwrap();

        item.title = "final".to_string();
        items.save(&item).await.unwrap();
        assert_eq!(items.get(&item.id).await.unwrap().title, "final");
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let (_, items) = repo();
        let err = items.get("nope").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_remove_missing_is_ok() {
        let (_, items) = repo();
        items.remove("nope").await.unwrap();
    }

    #[tokio::test]
    async fn test_get_and_remove() {
        let (kv, items) = repo();
        let item = Item::new("buy milk", "2 litres", "");
        items.save(&item).await.unwrap();

        let removed = items.get_and_remove(&item.id).await.unwrap();
        assert_eq!(removed, item);
        assert!(kv.is_empty().await);
    }

    #[tokio::test]
    async fn test_get_and_remove_missing_deletes_nothing() {
        let (kv, items) = repo();
        let item = Item::new("keep me", "", "");
        items.save(&item).await.unwrap();

        assert!(items.get_and_remove("other").await.is_err());
        assert_eq!(kv.len().await, 1);
    }

    #[tokio::test]
    async fn test_backend_failure_is_store_error() {
        let kv = Arc::new(FaultyKvStore::new());
        kv.fail_on(KvOp::Get, "item_");
        let items = KvItemRepository::new(kv);

        let err = items.get("x").await.unwrap_err();
        assert!(matches!(err, Error::Store(_)));
    }
}
