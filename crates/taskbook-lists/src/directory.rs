//! User directory implementations.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use taskbook_core::{Error, Result, UserDirectory};

/// Uses the user ID as the display name.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityDirectory;

#[async_trait]
impl UserDirectory for IdentityDirectory {
    async fn display_name(&self, user_id: &str) -> Result<String> {
        if user_id.is_empty() {
            return Err(Error::NotFound("user with empty ID".to_string()));
        }
        Ok(user_id.to_string())
    }
}

/// Fixed map of user IDs to display names. Unknown IDs fail the lookup.
#[derive(Debug, Default)]
pub struct StaticDirectory {
    names: RwLock<HashMap<String, String>>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, user_id: impl Into<String>, name: impl Into<String>) -> Self {
        self.insert(user_id, name);
        self
    }

    pub fn insert(&self, user_id: impl Into<String>, name: impl Into<String>) {
        let mut names = self.names.write().unwrap_or_else(|e| e.into_inner());
        names.insert(user_id.into(), name.into());
    }
}

#[async_trait]
impl UserDirectory for StaticDirectory {
    async fn display_name(&self, user_id: &str) -> Result<String> {
        let names = self.names.read().unwrap_or_else(|e| e.into_inner());
        names
            .get(user_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("user {}", user_id)))
    }
}
