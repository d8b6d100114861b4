//! Core traits for taskbook abstractions.
//!
//! These traits define the seams between the list manager, the stores it
//! composes, and the host platform collaborators (key-value backend and
//! user directory), enabling pluggable backends and testability.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// KEY-VALUE BACKEND
// =============================================================================

/// Host key-value store. Each call is atomic for its single key; there are
/// no cross-key transactions.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetch the raw bytes stored under `key`, `None` if absent.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store `value` under `key`, overwriting unconditionally.
    async fn set(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Delete `key`. Deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Write `value` only if the stored bytes still equal `expected`.
    ///
    /// `expected == None` means the key must be absent. Returns `false`
    /// when the stored value changed concurrently.
    async fn compare_and_set(&self, key: &str, expected: Option<&[u8]>, value: &[u8])
        -> Result<bool>;
}

// =============================================================================
// ITEM REPOSITORY
// =============================================================================

/// CRUD for individual items keyed by item ID.
#[async_trait]
pub trait ItemRepository: Send + Sync {
    /// Store an item, overwriting any previous version.
    async fn save(&self, item: &Item) -> Result<()>;

    /// Fetch an item. Fails with `NotFound` if absent.
    async fn get(&self, id: &str) -> Result<Item>;

    /// Delete an item. Absence is not an error.
    async fn remove(&self, id: &str) -> Result<()>;

    /// Fetch then delete an item. Nothing is deleted if the fetch fails.
    async fn get_and_remove(&self, id: &str) -> Result<Item>;
}

// =============================================================================
// LIST REFERENCE STORE
// =============================================================================

/// Ordered reference lists per (user, list kind).
///
/// Every mutation is an optimistic read-modify-compare-and-set loop with a
/// bounded attempt budget; exhausting it fails with `Conflict`.
#[async_trait]
pub trait ReferenceStore: Send + Sync {
    /// Append a reference to the end of the list. Fails with
    /// `DuplicateItem` if the item is already present.
    async fn add_reference(
        &self,
        user_id: &str,
        item_id: &str,
        list: ListKind,
        foreign_user_id: &str,
        foreign_item_id: &str,
    ) -> Result<()>;

    /// Remove the reference to `item_id`. Fails with `NotFound` if absent.
    async fn remove_reference(&self, user_id: &str, item_id: &str, list: ListKind) -> Result<()>;

    /// Remove and return the first reference. Fails with `EmptyList`.
    async fn pop_front(&self, user_id: &str, list: ListKind) -> Result<Reference>;

    /// Move the reference to `item_id` to the front, preserving the order
    /// of the rest. Fails with `NotFound` if absent.
    async fn bump_to_front(&self, user_id: &str, item_id: &str, list: ListKind) -> Result<()>;

    /// Find the reference to `item_id` and its zero-based position.
    async fn find_reference(
        &self,
        user_id: &str,
        item_id: &str,
        list: ListKind,
    ) -> Result<(Reference, usize)>;

    /// Search own, outgoing, then incoming and return the first match, or
    /// `None` if the item is in none of them.
    async fn locate(&self, user_id: &str, item_id: &str) -> Result<Option<Located>>;

    /// All references of a list in order; empty if the list was never
    /// written.
    async fn list_all(&self, user_id: &str, list: ListKind) -> Result<Vec<Reference>>;
}

// =============================================================================
// PREFERENCES
// =============================================================================

/// Per-user scalar preferences and reminder state.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// Epoch millis of the last daily reminder, 0 if never reminded.
    async fn last_reminder(&self, user_id: &str) -> Result<i64>;

    async fn save_last_reminder(&self, user_id: &str, at_millis: i64) -> Result<()>;

    /// Whether daily reminders are on. Absent or unreadable means on.
    async fn reminder_enabled(&self, user_id: &str) -> bool;

    async fn set_reminder_enabled(&self, user_id: &str, enabled: bool) -> Result<()>;

    /// Whether other users may send items to this user. Absent means on.
    async fn allow_incoming(&self, user_id: &str) -> Result<bool>;

    async fn set_allow_incoming(&self, user_id: &str, allowed: bool) -> Result<()>;
}

// =============================================================================
// USER DIRECTORY
// =============================================================================

/// Resolves user IDs to display names on the host platform.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn display_name(&self, user_id: &str) -> Result<String>;
}
