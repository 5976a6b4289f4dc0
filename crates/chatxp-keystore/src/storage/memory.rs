#![allow(clippy::disallowed_types, reason = "Synchronous in-memory operations only")]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use super::{KeyValueStore, StorageError};

/// In-memory storage for tests and ephemeral sessions
///
/// All state is wrapped in Arc<Mutex<>> so clones share one map. Uses
/// `lock().expect()`, which panics if the mutex is poisoned - acceptable for
/// test code.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    /// Create a new empty `MemoryStore`
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[allow(clippy::expect_used)]
    pub fn len(&self) -> usize {
        self.inner.lock().expect("Mutex poisoned").len()
    }

    /// True if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[allow(clippy::expect_used)]
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.inner.lock().expect("Mutex poisoned").get(key).cloned())
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[allow(clippy::expect_used)]
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.inner.lock().expect("Mutex poisoned").insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    /// Runs `apply` while holding the map's mutex.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[allow(clippy::expect_used)]
    fn update<T, E>(
        &self,
        key: &str,
        apply: impl FnOnce(Option<&str>) -> Result<(Option<String>, T), E>,
    ) -> Result<T, E>
    where
        E: From<StorageError>,
    {
        let mut entries = self.inner.lock().expect("Mutex poisoned");

        let (next, result) = apply(entries.get(key).map(String::as_str))?;
        if let Some(value) = next {
            entries.insert(key.to_owned(), value);
        }

        Ok(result)
    }
}
