//! # taskbook-core
//!
//! Core types, traits, and abstractions for the taskbook list exchange.
//!
//! This crate provides the item and reference data model, the error type,
//! and the collaborator traits that the store and list manager crates
//! implement and consume.

pub mod defaults;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use events::{EventBus, ItemCard, Notification};
pub use models::*;
pub use traits::*;
