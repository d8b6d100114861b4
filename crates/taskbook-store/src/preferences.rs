//! Per-user preference and reminder state.
//!
//! Values are stored as plain strings: booleans as `"true"`/`"false"`,
//! timestamps as decimal epoch milliseconds. A missing preference means
//! the feature is on.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error};

use taskbook_core::{Error, KeyValueStore, PreferenceStore, Result};

use crate::keys::{allow_incoming_key, reminder_enabled_key, reminder_key};

/// Key-value implementation of PreferenceStore.
pub struct KvPreferenceStore {
    kv: Arc<dyn KeyValueStore>,
}

impl KvPreferenceStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    async fn read_bool(&self, key: &str) -> Result<Option<bool>> {
        match self.kv.get(key).await? {
            None => Ok(None),
            Some(bytes) => {
                let text = String::from_utf8_lossy(&bytes);
                text.trim()
                    .parse::<bool>()
                    .map(Some)
                    .map_err(|e| Error::Serialization(format!("{}: {}", key, e)))
            }
        }
    }

    async fn write_bool(&self, key: &str, value: bool) -> Result<()> {
        self.kv.set(key, value.to_string().as_bytes()).await
    }
}

#[async_trait]
impl PreferenceStore for KvPreferenceStore {
    async fn last_reminder(&self, user_id: &str) -> Result<i64> {
        let key = reminder_key(user_id);
        match self.kv.get(&key).await? {
            None => Ok(0),
            Some(bytes) => String::from_utf8_lossy(&bytes)
                .trim()
                .parse::<i64>()
                .map_err(|e| Error::Serialization(format!("{}: {}", key, e))),
        }
    }

    async fn save_last_reminder(&self, user_id: &str, at_millis: i64) -> Result<()> {
        self.kv
            .set(&reminder_key(user_id), at_millis.to_string().as_bytes())
            .await
    }

    async fn reminder_enabled(&self, user_id: &str) -> bool {
        match self.read_bool(&reminder_enabled_key(user_id)).await {
            Ok(Some(enabled)) => enabled,
            Ok(None) => {
                debug!(
                    subsystem = "store",
                    component = "preferences",
                    user_id,
                    "Reminder preference is empty, defaulting to on"
                );
                true
            }
            Err(e) => {
                error!(
                    subsystem = "store",
                    component = "preferences",
                    user_id,
                    error = %e,
                    "Unable to read reminder preference, defaulting to on"
                );
                true
            }
        }
    }

    async fn set_reminder_enabled(&self, user_id: &str, enabled: bool) -> Result<()> {
        self.write_bool(&reminder_enabled_key(user_id), enabled).await
    }

    async fn allow_incoming(&self, user_id: &str) -> Result<bool> {
        Ok(self
            .read_bool(&allow_incoming_key(user_id))
            .await?
            .unwrap_or(true))
    }

    async fn set_allow_incoming(&self, user_id: &str, allowed: bool) -> Result<()> {
        self.write_bool(&allow_incoming_key(user_id), allowed).await
    }
}
