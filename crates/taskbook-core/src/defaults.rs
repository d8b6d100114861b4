//! Centralized default constants for taskbook.
//!
//! **This module is the single source of truth** for shared default values
//! and for the key-value layout. The key prefixes are an on-disk contract:
//! existing data written by earlier deployments is read through them, so
//! they must never change.

// =============================================================================
// STORE
// =============================================================================

/// Number of read-modify-compare-and-set attempts before a list mutation
/// gives up with a conflict.
pub const STORE_RETRIES: u32 = 3;

/// Prefix of list blob keys. Still "order" for backwards compatibility.
pub const LIST_KEY_PREFIX: &str = "order";

/// Prefix of item blob keys. Still "item" for backwards compatibility.
pub const ITEM_KEY_PREFIX: &str = "item";

/// Prefix of the last-reminder timestamp key.
pub const REMINDER_KEY_PREFIX: &str = "reminder";

/// Prefix of the daily-reminder preference key.
pub const REMINDER_ENABLED_KEY_PREFIX: &str = "reminder_enabled";

/// Prefix of the allow-incoming-requests preference key.
pub const ALLOW_INCOMING_KEY_PREFIX: &str = "allow_incoming_task";

// =============================================================================
// USERS AND MESSAGING
// =============================================================================

/// Display name used when a user lookup fails.
pub const UNKNOWN_USER_NAME: &str = "Someone";

/// Username of the bot that posts direct messages.
pub const BOT_NAME: &str = "bookbot";

/// Event bus buffer capacity for production.
pub const EVENT_CAPACITY: usize = 256;

// =============================================================================
// REMINDERS
// =============================================================================

/// Minimum gap between two daily reminders, in milliseconds.
pub const REMINDER_MIN_GAP_MS: i64 = 60 * 60 * 1000;

/// Display format of an item's creation time in list summaries.
pub const SUMMARY_TIME_FORMAT: &str = "%B %-d, %Y at %H:%M";

// =============================================================================
// BACKENDS
// =============================================================================

/// Default Redis connection URL.
pub const REDIS_URL: &str = "redis://localhost:6379";
