//! Runtime configuration loaded from the environment.
//!
//! Environment variables:
//!   TASKBOOK_BACKEND         - "memory" or "redis" (default: "memory";
//!                              the taskbook binary requires "redis")
//!   REDIS_URL                - Redis connection URL (default: redis://localhost:6379)
//!   TASKBOOK_STORE_RETRIES   - list mutation attempt budget, >= 1 (default: 3)
//!   TASKBOOK_EVENT_CAPACITY  - notification buffer size, >= 1 (default: 256)
//!   TASKBOOK_BOT_NAME        - identity notifications are posted as (default: bookbot)

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use taskbook_core::{defaults, EventBus, UserDirectory};
use taskbook_store::{MemoryKvStore, RedisKvStore, Store};

use crate::manager::ListManager;
use crate::service::TaskService;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} is not a valid value: {value}")]
    Invalid { var: &'static str, value: String },

    #[error("{0}")]
    OutOfRange(String),

    #[error("TASKBOOK_BACKEND={0} does not keep lists between commands; set TASKBOOK_BACKEND=redis")]
    NotPersistent(Backend),
}

/// Storage backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    #[default]
    Memory,
    Redis,
}

impl FromStr for Backend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "redis" => Ok(Self::Redis),
            _ => Err(ConfigError::Invalid {
                var: "TASKBOOK_BACKEND",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::Redis => write!(f, "redis"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskbookConfig {
    pub backend: Backend,
    pub redis_url: String,
    pub store_retries: u32,
    pub event_capacity: usize,
    pub bot_name: String,
}

impl Default for TaskbookConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            redis_url: defaults::REDIS_URL.to_string(),
            store_retries: defaults::STORE_RETRIES,
            event_capacity: defaults::EVENT_CAPACITY,
            bot_name: defaults::BOT_NAME.to_string(),
        }
    }
}

impl TaskbookConfig {
    /// Load configuration from environment variables with fallback to
    /// defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(val) = lookup("TASKBOOK_BACKEND") {
            config.backend = val.parse()?;
        }
        if let Some(val) = lookup("REDIS_URL") {
            config.redis_url = val;
        }
        if let Some(val) = lookup("TASKBOOK_STORE_RETRIES") {
            config.store_retries = parse_var("TASKBOOK_STORE_RETRIES", &val)?;
        }
        if let Some(val) = lookup("TASKBOOK_EVENT_CAPACITY") {
            config.event_capacity = parse_var("TASKBOOK_EVENT_CAPACITY", &val)?;
        }
        if let Some(val) = lookup("TASKBOOK_BOT_NAME") {
            config.bot_name = val;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store_retries == 0 {
            return Err(ConfigError::OutOfRange(
                "TASKBOOK_STORE_RETRIES must be at least 1".to_string(),
            ));
        }
        if self.event_capacity == 0 {
            return Err(ConfigError::OutOfRange(
                "TASKBOOK_EVENT_CAPACITY must be at least 1".to_string(),
            ));
        }
        if self.bot_name.trim().is_empty() {
            return Err(ConfigError::OutOfRange(
                "TASKBOOK_BOT_NAME must not be empty".to_string(),
            ));
        }
        if self.backend == Backend::Redis && self.redis_url.is_empty() {
            return Err(ConfigError::OutOfRange(
                "REDIS_URL is required for the redis backend".to_string(),
            ));
        }
        Ok(())
    }

    /// Reject backends whose data is gone once the process exits. The
    /// command-line front end runs one command per process, so it needs
    /// a backend that outlives it.
    pub fn require_persistent_backend(&self) -> Result<(), ConfigError> {
        match self.backend {
            Backend::Memory => Err(ConfigError::NotPersistent(self.backend)),
            Backend::Redis => Ok(()),
        }
    }

    /// Open the configured backend.
    pub async fn connect_store(&self) -> taskbook_core::Result<Store> {
        let store = match self.backend {
            Backend::Memory => {
                Store::with_attempts(Arc::new(MemoryKvStore::new()), self.store_retries)
            }
            Backend::Redis => {
                let kv = RedisKvStore::connect(&self.redis_url).await?;
                Store::with_attempts(Arc::new(kv), self.store_retries)
            }
        };
        info!(
            subsystem = "lists",
            component = "config",
            backend = %self.backend,
            store_retries = self.store_retries,
            "Store ready"
        );
        Ok(store)
    }

    /// Open the configured backend and assemble the service over it.
    pub async fn build_service(
        &self,
        users: Arc<dyn UserDirectory>,
    ) -> taskbook_core::Result<TaskService> {
        let store = self.connect_store().await?;
        let manager = Arc::new(ListManager::from_store(&store, users));
        let events = EventBus::new(self.event_capacity, self.bot_name.clone());
        Ok(TaskService::new(manager, store.preferences.clone(), events))
    }
}

fn parse_var<T: FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        var,
        value: value.to_string(),
    })
}
