//! Redb-backed durable storage implementation.
//!
//! Uses Redb's ACID transactions with Copy-on-Write for crash safety. Keys
//! survive process restarts, which is what makes a device's identity stable.

use std::{path::Path, sync::Arc};

use redb::{Database, ReadableTable, TableDefinition};

use super::{KeyValueStore, StorageError};

/// Table: entries
/// Key: storage key (e.g. `privateKey_<identity>`)
/// Value: stored string
const ENTRIES: TableDefinition<&str, &str> = TableDefinition::new("entries");

/// Durable storage backed by Redb.
///
/// Thread-safe through Redb's internal locking. Clone is cheap (Arc).
#[derive(Clone)]
pub struct RedbStore {
    db: Arc<Database>,
}

impl RedbStore {
    /// Open or create a Redb database at the given path.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the database cannot be opened or created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let db = Database::create(path.as_ref()).map_err(|e| StorageError::Io(e.to_string()))?;

        let txn = db.begin_write().map_err(|e| StorageError::Io(e.to_string()))?;
        {
            let _ = txn.open_table(ENTRIES).map_err(|e| StorageError::Io(e.to_string()))?;
        }
        txn.commit().map_err(|e| StorageError::Io(e.to_string()))?;

        tracing::debug!(path = %path.as_ref().display(), "opened key store");

        Ok(Self { db: Arc::new(db) })
    }
}

impl KeyValueStore for RedbStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let txn = self.db.begin_read().map_err(|e| StorageError::Io(e.to_string()))?;

        let table = txn.open_table(ENTRIES).map_err(|e| StorageError::Io(e.to_string()))?;

        let value = table.get(key).map_err(|e| StorageError::Io(e.to_string()))?;
        Ok(value.map(|guard| guard.value().to_owned()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let txn = self.db.begin_write().map_err(|e| StorageError::Io(e.to_string()))?;

        {
            let mut table = txn.open_table(ENTRIES).map_err(|e| StorageError::Io(e.to_string()))?;
            table.insert(key, value).map_err(|e| StorageError::Io(e.to_string()))?;
        }

        txn.commit().map_err(|e| StorageError::Io(e.to_string()))?;

        Ok(())
    }

    /// Runs `apply` inside a single write transaction. Redb admits one
    /// writer at a time, so concurrent updates through clones serialize.
    fn update<T, E>(
        &self,
        key: &str,
        apply: impl FnOnce(Option<&str>) -> Result<(Option<String>, T), E>,
    ) -> Result<T, E>
    where
        E: From<StorageError>,
    {
        let txn = self.db.begin_write().map_err(|e| StorageError::Io(e.to_string()))?;

        let result = {
            let mut table = txn.open_table(ENTRIES).map_err(|e| StorageError::Io(e.to_string()))?;

            let current = table
                .get(key)
                .map_err(|e| StorageError::Io(e.to_string()))?
                .map(|guard| guard.value().to_owned());

            // On error the transaction is dropped uncommitted
            let (next, result) = apply(current.as_deref())?;
            if let Some(value) = next {
                table.insert(key, value.as_str()).map_err(|e| StorageError::Io(e.to_string()))?;
            }
            result
        };

        txn.commit().map_err(|e| StorageError::Io(e.to_string()))?;

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn values_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("keys.redb");

        {
            let store = RedbStore::open(&path).unwrap();
            store.set("privateKey_0xabc", "c2VjcmV0").unwrap();
        }

        let store = RedbStore::open(&path).unwrap();
        assert_eq!(store.get("privateKey_0xabc").unwrap().as_deref(), Some("c2VjcmV0"));
    }

    #[test]
    fn missing_key_is_none() {
        let dir = tempdir().unwrap();
        let store = RedbStore::open(dir.path().join("keys.redb")).unwrap();

        assert_eq!(store.get("nothing").unwrap(), None);
    }

    #[test]
    fn update_is_visible_after_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("keys.redb");

        {
            let store = RedbStore::open(&path).unwrap();
            let created = store
                .update("k", |current| {
                    Ok::<_, StorageError>((Some("v".to_string()), current.is_none()))
                })
                .unwrap();
            assert!(created);
        }

        let store = RedbStore::open(&path).unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn failed_update_is_rolled_back() {
        let dir = tempdir().unwrap();
        let store = RedbStore::open(dir.path().join("keys.redb")).unwrap();
        store.set("k", "before").unwrap();

        let result: Result<(), StorageError> =
            store.update("k", |_| Err(StorageError::Serialization("rejected".to_string())));

        assert!(result.is_err());
        assert_eq!(store.get("k").unwrap().as_deref(), Some("before"));
    }
}
