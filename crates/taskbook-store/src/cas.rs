//! Optimistic read-modify-compare-and-set with a bounded attempt budget.

use tracing::{debug, warn};

use taskbook_core::{Error, KeyValueStore, Result};

/// A value stored as a single blob that can be mutated optimistically.
pub trait CasValue: Sized {
    /// Decode the stored bytes; `None` means the key is absent.
    fn decode(raw: Option<&[u8]>) -> Result<Self>;

    fn encode(&self) -> Result<Vec<u8>>;
}

/// Read the value under `key`, apply `mutate`, and write it back only if
/// the stored bytes are still the ones that were read.
///
/// When another writer got in between, the whole cycle is repeated from the
/// read, up to `attempts` times; after that the call fails with
/// [`Error::Conflict`]. An error returned by `mutate` aborts immediately
/// without writing.
pub async fn read_modify_write<V, T, F>(
    kv: &dyn KeyValueStore,
    key: &str,
    attempts: u32,
    mut mutate: F,
) -> Result<T>
where
    V: CasValue + Send,
    T: Send,
    F: FnMut(&mut V) -> Result<T> + Send,
{
    for attempt in 1..=attempts {
        let raw = kv.get(key).await?;
        let mut value = V::decode(raw.as_deref())?;
        let output = mutate(&mut value)?;
        let encoded = value.encode()?;
        drop(value);

        if kv.compare_and_set(key, raw.as_deref(), &encoded).await? {
            return Ok(output);
        }

        debug!(
            subsystem = "store",
            component = "cas",
            key,
            attempt,
            "Value changed concurrently, retrying"
        );
    }

    warn!(
        subsystem = "store",
        component = "cas",
        key,
        attempts,
        "Compare-and-set budget exhausted"
    );
    Err(Error::Conflict(format!(
        "{} changed concurrently {} times in a row",
        key, attempts
    )))
}
