//! List reference store implementation.
//!
//! Each (user, list kind) pair is one JSON blob holding the ordered
//! references. Blobs written by early deployments hold bare item-ID strings
//! instead; they are upconverted on read and rewritten in the current
//! format by the next mutation of that list.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, trace};

use taskbook_core::defaults::STORE_RETRIES;
use taskbook_core::{Error, KeyValueStore, ListKind, Located, Reference, ReferenceStore, Result};

use crate::cas::{read_modify_write, CasValue};
use crate::keys::list_key;

/// Stored shapes of a list blob.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredList {
    Current(Vec<Reference>),
    Legacy(Vec<String>),
}

/// Ordered references of one list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceList(pub Vec<Reference>);

impl ReferenceList {
    fn position(&self, item_id: &str) -> Option<usize> {
        self.0.iter().position(|r| r.item_id == item_id)
    }
}

impl CasValue for ReferenceList {
    fn decode(raw: Option<&[u8]>) -> Result<Self> {
        let Some(bytes) = raw else {
            return Ok(Self::default());
        };
        let refs = match serde_json::from_slice::<Option<StoredList>>(bytes)? {
            None => Vec::new(),
            Some(StoredList::Current(refs)) => refs,
            Some(StoredList::Legacy(ids)) => {
                debug!(
                    subsystem = "store",
                    component = "references",
                    count = ids.len(),
                    "Upconverting legacy list blob"
                );
                ids.into_iter().map(Reference::own).collect()
            }
        };
        Ok(Self(refs))
    }

    fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.0)?)
    }
}

/// Key-value implementation of ReferenceStore.
pub struct KvReferenceStore {
    kv: Arc<dyn KeyValueStore>,
    attempts: u32,
}

impl KvReferenceStore {
    /// Create a new KvReferenceStore with the default attempt budget.
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            attempts: STORE_RETRIES,
        }
    }

    /// Override the compare-and-set attempt budget (at least 1).
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    async fn read(&self, user_id: &str, list: ListKind) -> Result<Option<ReferenceList>> {
        match self.kv.get(&list_key(user_id, list)).await? {
            None => Ok(None),
            Some(bytes) => ReferenceList::decode(Some(&bytes)).map(Some),
        }
    }

    async fn mutate<T, F>(&self, user_id: &str, list: ListKind, mutate: F) -> Result<T>
    where
        T: Send,
        F: FnMut(&mut ReferenceList) -> Result<T> + Send,
    {
        read_modify_write(
            self.kv.as_ref(),
            &list_key(user_id, list),
            self.attempts,
            mutate,
        )
        .await
    }
}

fn missing(user_id: &str, item_id: &str, list: ListKind) -> Error {
    Error::NotFound(format!(
        "item {} in {} list of {}",
        item_id, list, user_id
    ))
}

#[async_trait]
impl ReferenceStore for KvReferenceStore {
    async fn add_reference(
        &self,
        user_id: &str,
        item_id: &str,
        list: ListKind,
        foreign_user_id: &str,
        foreign_item_id: &str,
    ) -> Result<()> {
        self.mutate(user_id, list, |refs| {
            if refs.position(item_id).is_some() {
                return Err(Error::DuplicateItem(format!(
                    "item {} already in {} list of {}",
                    item_id, list, user_id
                )));
            }
            refs.0
                .push(Reference::linked(item_id, foreign_user_id, foreign_item_id));
            Ok(())
        })
        .await
    }

    async fn remove_reference(&self, user_id: &str, item_id: &str, list: ListKind) -> Result<()> {
        self.mutate(user_id, list, |refs| {
            let pos = refs
                .position(item_id)
                .ok_or_else(|| missing(user_id, item_id, list))?;
            refs.0.remove(pos);
            Ok(())
        })
        .await
    }

    async fn pop_front(&self, user_id: &str, list: ListKind) -> Result<Reference> {
        self.mutate(user_id, list, |refs| {
            if refs.0.is_empty() {
                return Err(Error::EmptyList(format!("{} list of {}", list, user_id)));
            }
            Ok(refs.0.remove(0))
        })
        .await
    }

    async fn bump_to_front(&self, user_id: &str, item_id: &str, list: ListKind) -> Result<()> {
        self.mutate(user_id, list, |refs| {
            let pos = refs
                .position(item_id)
                .ok_or_else(|| missing(user_id, item_id, list))?;
            let reference = refs.0.remove(pos);
            refs.0.insert(0, reference);
            Ok(())
        })
        .await
    }

    async fn find_reference(
        &self,
        user_id: &str,
        item_id: &str,
        list: ListKind,
    ) -> Result<(Reference, usize)> {
        let refs = self
            .read(user_id, list)
            .await?
            .ok_or_else(|| missing(user_id, item_id, list))?;
        let pos = refs
            .position(item_id)
            .ok_or_else(|| missing(user_id, item_id, list))?;
        Ok((refs.0[pos].clone(), pos))
    }

    async fn locate(&self, user_id: &str, item_id: &str) -> Result<Option<Located>> {
        for list in ListKind::SEARCH_ORDER {
            match self.find_reference(user_id, item_id, list).await {
                Ok((reference, position)) => {
                    trace!(
                        subsystem = "store",
                        component = "references",
                        user_id,
                        item_id,
                        %list,
                        position,
                        "Located reference"
                    );
                    return Ok(Some(Located {
                        list,
                        reference,
                        position,
                    }));
                }
                Err(Error::NotFound(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(None)
    }

    async fn list_all(&self, user_id: &str, list: ListKind) -> Result<Vec<Reference>> {
        Ok(self.read(user_id, list).await?.unwrap_or_default().0)
    }
}
