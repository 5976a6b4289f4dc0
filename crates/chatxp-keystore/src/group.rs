//! Group key storage.
//!
//! All group keys on a device live in one collection under
//! `group_encryption_keys`, a JSON array of `{"groupId", "key"}` entries.
//! Keys are created lazily on the first send to a group, or installed from a
//! [`chatxp_crypto::GroupKeyGrant`] sent by another member.
//!
//! # Invariants
//!
//! - One key per group per device: `get_or_create` never produces two keys
//!   for the same group, even under concurrent first sends through separate
//!   store handles
//! - Every write is a [`KeyValueStore::update`] of the whole collection, so
//!   concurrent updates for different groups never lose each other
//! - Keys are replaced wholesale (`import`), never partially updated

use chatxp_crypto::{Entropy, GroupKey};
use serde::{Deserialize, Serialize};

use crate::{
    error::KeyStoreError,
    storage::{KeyValueStore, StorageError},
};

const GROUP_KEYS_STORAGE: &str = "group_encryption_keys";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredGroupKey {
    group_id: String,
    key: String,
}

/// Persists symmetric group keys in device-local storage.
///
/// Holds no state besides the storage handle. Atomicity comes from the
/// storage, so any number of stores over one device agree on each group key.
#[derive(Clone)]
pub struct GroupKeyStore<S: KeyValueStore> {
    storage: S,
}

impl<S: KeyValueStore> GroupKeyStore<S> {
    /// Create a store over `storage`.
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Cached key for `group_id`. `None` if this device never created or
    /// received one.
    ///
    /// An unreadable collection or entry reads as absent.
    pub fn get(&self, group_id: &str) -> Result<Option<GroupKey>, KeyStoreError> {
        let stored = self.storage.get(GROUP_KEYS_STORAGE)?;

        let entries = match parse_entries(stored.as_deref()) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!(error = %err, "group key collection unreadable");
                return Ok(None);
            },
        };

        Ok(find_key(&entries, group_id))
    }

    /// Cached key for `group_id`, generating and persisting a new one if
    /// absent.
    pub fn get_or_create(
        &self,
        group_id: &str,
        entropy: &impl Entropy,
    ) -> Result<GroupKey, KeyStoreError> {
        let (key, created) = self.storage.update(GROUP_KEYS_STORAGE, |stored| {
            let mut entries = parse_entries(stored)?;

            if let Some(key) = find_key(&entries, group_id) {
                return Ok((None, (key, false)));
            }

            let key = GroupKey::generate(entropy);
            put_entry(&mut entries, group_id, &key);
            Ok::<_, KeyStoreError>((Some(serialize_entries(&entries)?), (key, true)))
        })?;

        if created {
            tracing::info!(group_id, "created group key");
        }

        Ok(key)
    }

    /// Install `key` for `group_id`, replacing any cached key.
    pub fn import(&self, group_id: &str, key: &GroupKey) -> Result<(), KeyStoreError> {
        self.storage.update(GROUP_KEYS_STORAGE, |stored| {
            let mut entries = parse_entries(stored)?;
            put_entry(&mut entries, group_id, key);
            Ok::<_, KeyStoreError>((Some(serialize_entries(&entries)?), ()))
        })?;

        tracing::info!(group_id, "imported group key");
        Ok(())
    }

    /// Groups with a cached key, in insertion order.
    pub fn group_ids(&self) -> Result<Vec<String>, KeyStoreError> {
        let stored = self.storage.get(GROUP_KEYS_STORAGE)?;
        Ok(parse_entries(stored.as_deref())?.into_iter().map(|entry| entry.group_id).collect())
    }
}

/// Strict parse. Writers fail on a corrupt collection rather than replacing
/// it, which would silently discard every other group's key.
fn parse_entries(stored: Option<&str>) -> Result<Vec<StoredGroupKey>, KeyStoreError> {
    match stored {
        Some(stored) => serde_json::from_str(stored)
            .map_err(|e| KeyStoreError::Storage(StorageError::from(e))),
        None => Ok(Vec::new()),
    }
}

fn serialize_entries(entries: &[StoredGroupKey]) -> Result<String, KeyStoreError> {
    serde_json::to_string(entries).map_err(|e| KeyStoreError::Storage(e.into()))
}

/// A present entry whose key does not decode counts as absent.
fn find_key(entries: &[StoredGroupKey], group_id: &str) -> Option<GroupKey> {
    let entry = entries.iter().find(|entry| entry.group_id == group_id)?;

    match GroupKey::from_base64(&entry.key) {
        Ok(key) => Some(key),
        Err(err) => {
            tracing::warn!(group_id, error = %err, "stored group key unreadable");
            None
        },
    }
}

fn put_entry(entries: &mut Vec<StoredGroupKey>, group_id: &str, key: &GroupKey) {
    let encoded = key.to_base64();

    match entries.iter_mut().find(|entry| entry.group_id == group_id) {
        Some(entry) => entry.key = encoded,
        None => entries.push(StoredGroupKey { group_id: group_id.to_owned(), key: encoded }),
    }
}
