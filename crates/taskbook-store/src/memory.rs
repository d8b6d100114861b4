//! In-process key-value backend.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use taskbook_core::{KeyValueStore, Result};

/// Key-value store held in memory. Used for tests and single-process
/// deployments; contents are lost on restart.
#[derive(Default)]
pub struct MemoryKvStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// All keys starting with `prefix`, sorted.
    pub async fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .entries
            .read()
            .await
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl KeyValueStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn compare_and_set(
        &self,
        key: &str,
        expected: Option<&[u8]>,
        value: &[u8],
    ) -> Result<bool> {
        let mut entries = self.entries.write().await;
        let current = entries.get(key).map(Vec::as_slice);
        if current != expected {
            return Ok(false);
        }
        entries.insert(key.to_string(), value.to_vec());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_set_delete() {
        let kv = MemoryKvStore::new();
        assert_eq!(kv.get("k").await.unwrap(), None);

        kv.set("k", b"v1").await.unwrap();
        assert_eq!(kv.get("k").await.unwrap(), Some(b"v1".to_vec()));

        kv.delete("k").await.unwrap();
        assert_eq!(kv.get("k").await.unwrap(), None);
        // Deleting again is fine
        kv.delete("k").await.unwrap();
    }

    #[tokio::test]
    async fn test_compare_and_set_insert_if_absent() {
        let kv = MemoryKvStore::new();
        assert!(kv.compare_and_set("k", None, b"v1").await.unwrap());
        assert!(!kv.compare_and_set("k", None, b"v2").await.unwrap());
        assert_eq!(kv.get("k").await.unwrap(), Some(b"v1".to_vec()));
    }

    #[tokio::test]
    async fn test_compare_and_set_requires_matching_value() {
        let kv = MemoryKvStore::new();
        kv.set("k", b"v1").await.unwrap();

        assert!(!kv.compare_and_set("k", Some(b"other"), b"v2").await.unwrap());
        assert!(kv.compare_and_set("k", Some(b"v1"), b"v2").await.unwrap());
        assert_eq!(kv.get("k").await.unwrap(), Some(b"v2".to_vec()));
    }

    #[tokio::test]
    async fn test_compare_and_set_on_absent_key_with_expectation_fails() {
        let kv = MemoryKvStore::new();
        assert!(!kv.compare_and_set("k", Some(b"v1"), b"v2").await.unwrap());
        assert!(kv.is_empty().await);
    }

    #[tokio::test]
    async fn test_keys_with_prefix() {
        let kv = MemoryKvStore::new();
        kv.set("item_b", b"1").await.unwrap();
        kv.set("item_a", b"1").await.unwrap();
        kv.set("order_u1", b"[]").await.unwrap();

        assert_eq!(kv.keys_with_prefix("item_").await, vec!["item_a", "item_b"]);
        assert_eq!(kv.len().await, 3);
    }
}
