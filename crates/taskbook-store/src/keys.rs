//! Key layout of the key-value store.
//!
//! These formats are a stable on-disk contract shared with data written by
//! earlier deployments.

use taskbook_core::defaults::{
    ALLOW_INCOMING_KEY_PREFIX, ITEM_KEY_PREFIX, LIST_KEY_PREFIX, REMINDER_ENABLED_KEY_PREFIX,
    REMINDER_KEY_PREFIX,
};
use taskbook_core::ListKind;

/// `order_{user}{suffix}`
pub fn list_key(user_id: &str, list: ListKind) -> String {
    format!("{}_{}{}", LIST_KEY_PREFIX, user_id, list.key_suffix())
}

/// `item_{id}`
pub fn item_key(item_id: &str) -> String {
    format!("{}_{}", ITEM_KEY_PREFIX, item_id)
}

pub fn reminder_key(user_id: &str) -> String {
    format!("{}_{}", REMINDER_KEY_PREFIX, user_id)
}

pub fn reminder_enabled_key(user_id: &str) -> String {
    format!("{}_{}", REMINDER_ENABLED_KEY_PREFIX, user_id)
}

pub fn allow_incoming_key(user_id: &str) -> String {
    format!("{}_{}", ALLOW_INCOMING_KEY_PREFIX, user_id)
}
