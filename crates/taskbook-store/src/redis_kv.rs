//! Redis key-value backend.
//!
//! Plain reads and writes map to `GET`/`SET`/`DEL`. Compare-and-set runs as
//! a Lua script so the comparison and the write are atomic on the server.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, RedisError, Script};
use tracing::info;

use taskbook_core::{Error, KeyValueStore, Result};

/// ARGV[1] is "1" when an expected value is given in ARGV[2]; otherwise the
/// key must be absent. ARGV[3] is the new value.
const COMPARE_AND_SET_SCRIPT: &str = r#"
local current = redis.call('GET', KEYS[1])
if ARGV[1] == '1' then
    if (not current) or current ~= ARGV[2] then
        return 0
    end
elseif current then
    return 0
end
redis.call('SET', KEYS[1], ARGV[3])
return 1
"#;

/// Key-value store backed by a Redis server.
#[derive(Clone)]
pub struct RedisKvStore {
    connection: ConnectionManager,
    compare_and_set: Script,
}

impl RedisKvStore {
    /// Connect to the Redis server at `url`.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).map_err(store_error)?;
        let connection = ConnectionManager::new(client).await.map_err(store_error)?;

        info!(
            subsystem = "store",
            component = "redis",
            url = %url.replace(|c: char| c.is_ascii_alphanumeric(), "*"),
            "Connected to Redis key-value backend"
        );

        Ok(Self {
            connection,
            compare_and_set: Script::new(COMPARE_AND_SET_SCRIPT),
        })
    }
}

fn store_error(e: RedisError) -> Error {
    Error::Store(e.to_string())
}

#[async_trait]
impl KeyValueStore for RedisKvStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.connection.clone();
        conn.get::<_, Option<Vec<u8>>>(key).await.map_err(store_error)
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        let mut conn = self.connection.clone();
        conn.set::<_, _, ()>(key, value).await.map_err(store_error)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.connection.clone();
        conn.del::<_, ()>(key).await.map_err(store_error)
    }

    async fn compare_and_set(
        &self,
        key: &str,
        expected: Option<&[u8]>,
        value: &[u8],
    ) -> Result<bool> {
        let mut conn = self.connection.clone();
        let (flag, expected) = match expected {
            Some(bytes) => ("1", bytes),
            None => ("0", &[][..]),
        };
        let written: i64 = self
            .compare_and_set
            .key(key)
            .arg(flag)
            .arg(expected)
            .arg(value)
            .invoke_async(&mut conn)
            .await
            .map_err(store_error)?;
        Ok(written == 1)
    }
}
