//! # taskbook-lists
//!
//! Cross-user list operations for taskbook.
//!
//! [`ListManager`] coordinates the item repository and the reference lists
//! so that an item exchanged between two users stays consistent on both
//! sides. [`TaskService`] wraps it with the notifications, preferences and
//! daily reminders a chat front end needs.

pub mod config;
pub mod directory;
pub mod manager;
pub mod service;

pub use config::{Backend, ConfigError, TaskbookConfig};
pub use directory::{IdentityDirectory, StaticDirectory};
pub use manager::ListManager;
pub use service::{items_summary, AddOutcome, AddRequest, ReminderRequest, Settings, TaskService};
