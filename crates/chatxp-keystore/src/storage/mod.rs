//! Local key-value storage abstraction
//!
//! Key stores never touch a platform store directly. They are handed a
//! [`KeyValueStore`], a namespaced string map scoped to one device, so the
//! same logic runs over an in-memory map in tests and a durable database in
//! production. The trait is synchronous to match the synchronous crypto core.
//!
//! Get-or-create sequences go through [`KeyValueStore::update`], so they are
//! atomic per device however many handles share the storage.
//!
//! Nothing here encrypts values at rest. Protecting the store is the host's
//! responsibility.

mod error;
mod memory;
mod redb;

pub use error::StorageError;
pub use memory::MemoryStore;

pub use self::redb::RedbStore;

/// Device-local string key-value storage.
///
/// Must be Clone (shared by several key stores), Send + Sync, and
/// synchronous. Implementations typically share internal state via Arc, so
/// clones access the same underlying storage.
pub trait KeyValueStore: Clone + Send + Sync + 'static {
    /// Value stored under `key`. `None` if never set.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Invariants
    ///
    /// - Post: a subsequent `get(key)` returns `Some(value)`
    /// - Values are replaced wholesale, never partially updated
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Read, transform and write the value under `key` as one atomic step.
    ///
    /// `apply` receives the current value and returns the value to store
    /// (`None` leaves it untouched) together with the caller's result. If
    /// `apply` fails, nothing is written.
    ///
    /// # Invariants
    ///
    /// - No `set` or `update` on the same storage, through any clone,
    ///   interleaves between the read and the write
    /// - `apply` must not call back into the storage
    fn update<T, E>(
        &self,
        key: &str,
        apply: impl FnOnce(Option<&str>) -> Result<(Option<String>, T), E>,
    ) -> Result<T, E>
    where
        E: From<StorageError>;
}
