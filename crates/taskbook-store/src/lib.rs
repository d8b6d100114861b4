//! # taskbook-store
//!
//! Key-value backed storage layer for taskbook.
//!
//! This crate provides:
//! - The key layout shared with data written by earlier deployments
//! - An optimistic read-modify-compare-and-set helper with bounded retries
//! - Repository implementations for items, reference lists and preferences
//! - In-memory and Redis key-value backends
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use taskbook_store::{MemoryKvStore, Store, ListKind, ReferenceStore};
//!
//! #[tokio::main]
//! async fn main() -> taskbook_store::Result<()> {
//!     let store = Store::new(Arc::new(MemoryKvStore::new()));
//!     store.references.add_reference("alice", "item1", ListKind::Own, "", "").await?;
//!     Ok(())
//! }
//! ```

pub mod cas;
pub mod items;
pub mod keys;
pub mod memory;
pub mod preferences;
pub mod redis_kv;
pub mod references;

// Fault-injecting backend for integration tests.
// Note: Always compiled so integration tests (in tests/) of dependent crates can use it
pub mod test_fixtures;

use std::sync::Arc;

// Re-export core types
pub use taskbook_core::*;

pub use cas::{read_modify_write, CasValue};
pub use items::KvItemRepository;
pub use memory::MemoryKvStore;
pub use preferences::KvPreferenceStore;
pub use redis_kv::RedisKvStore;
pub use references::{KvReferenceStore, ReferenceList};

/// Combined storage context with all repositories over one backend.
pub struct Store {
    /// The underlying key-value backend.
    pub kv: Arc<dyn KeyValueStore>,
    /// Item repository.
    pub items: Arc<KvItemRepository>,
    /// Reference list store.
    pub references: Arc<KvReferenceStore>,
    /// Preference and reminder state.
    pub preferences: Arc<KvPreferenceStore>,
}

impl Store {
    /// Create all repositories over `kv` with the default attempt budget.
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self::with_attempts(kv, defaults::STORE_RETRIES)
    }

    /// Create all repositories over `kv`, retrying list mutations up to
    /// `attempts` times.
    pub fn with_attempts(kv: Arc<dyn KeyValueStore>, attempts: u32) -> Self {
        Self {
            items: Arc::new(KvItemRepository::new(kv.clone())),
            references: Arc::new(KvReferenceStore::new(kv.clone()).with_attempts(attempts)),
            preferences: Arc::new(KvPreferenceStore::new(kv.clone())),
            kv,
        }
    }
}
