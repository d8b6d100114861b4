//! Test fixtures for store and list manager tests.
//!
//! [`FaultyKvStore`] wraps an in-memory backend and can be told to report
//! concurrent modifications on compare-and-set or to fail specific
//! operations on specific keys, so retry and rollback paths can be driven
//! deterministically.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use taskbook_store::test_fixtures::{FaultyKvStore, KvOp};
//!
//! let kv = FaultyKvStore::new().with_cas_conflicts(2);
//! kv.fail_on(KvOp::CompareAndSet, "order_bob_in");
//! ```

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use taskbook_core::{Error, KeyValueStore, Result};

use crate::memory::MemoryKvStore;

/// Key-value operation kinds that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KvOp {
    Get,
    Set,
    Delete,
    CompareAndSet,
}

/// In-memory key-value store with fault injection.
#[derive(Default)]
pub struct FaultyKvStore {
    inner: MemoryKvStore,
    forced_conflicts: AtomicU32,
    cas_calls: AtomicUsize,
    failures: Mutex<Vec<Failure>>,
}

struct Failure {
    op: KvOp,
    key: String,
    exact: bool,
}

impl Failure {
    fn matches(&self, op: KvOp, key: &str) -> bool {
        self.op == op
            && if self.exact {
                key == self.key
            } else {
                key.starts_with(self.key.as_str())
            }
    }
}

impl FaultyKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report the next `n` compare-and-set calls as concurrent
    /// modifications without writing.
    pub fn with_cas_conflicts(self, n: u32) -> Self {
        self.forced_conflicts.store(n, Ordering::SeqCst);
        self
    }

    /// Add `n` more forced compare-and-set conflicts.
    pub fn force_conflicts(&self, n: u32) {
        self.forced_conflicts.fetch_add(n, Ordering::SeqCst);
    }

    /// Fail every `op` on keys starting with `key_prefix` with a store
    /// error until [`clear_failures`](Self::clear_failures) is called.
    pub fn fail_on(&self, op: KvOp, key_prefix: &str) {
        self.push_failure(op, key_prefix, false);
    }

    /// Like [`fail_on`](Self::fail_on), but only for `key` itself, so
    /// `order_alice` can fail while `order_alice_out` keeps working.
    pub fn fail_on_key(&self, op: KvOp, key: &str) {
        self.push_failure(op, key, true);
    }

    fn push_failure(&self, op: KvOp, key: &str, exact: bool) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Failure {
                op,
                key: key.to_string(),
                exact,
            });
    }

    pub fn clear_failures(&self) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Total compare-and-set calls seen, including forced conflicts.
    pub fn cas_calls(&self) -> usize {
        self.cas_calls.load(Ordering::SeqCst)
    }

    /// The wrapped backend, for inspecting stored bytes directly.
    pub fn inner(&self) -> &MemoryKvStore {
        &self.inner
    }

    fn check(&self, op: KvOp, key: &str) -> Result<()> {
        let failures = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
        if failures.iter().any(|failure| failure.matches(op, key)) {
            return Err(Error::Store(format!("injected {:?} failure on {}", op, key)));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FaultyKvStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.check(KvOp::Get, key)?;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        self.check(KvOp::Set, key)?;
        self.inner.set(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.check(KvOp::Delete, key)?;
        self.inner.delete(key).await
    }

    async fn compare_and_set(
        &self,
        key: &str,
        expected: Option<&[u8]>,
        value: &[u8],
    ) -> Result<bool> {
        self.cas_calls.fetch_add(1, Ordering::SeqCst);
        self.check(KvOp::CompareAndSet, key)?;
        let forced = self
            .forced_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if forced {
            return Ok(false);
        }
        self.inner.compare_and_set(key, expected, value).await
    }
}
