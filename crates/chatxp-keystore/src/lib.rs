//! Device-local key storage
//!
//! Long-term identity keys and symmetric group keys live on the device that
//! created or received them and are never sent anywhere in the clear. Both
//! stores sit on an injected [`KeyValueStore`], so the platform decides where
//! bytes actually go (memory in tests, [`RedbStore`] on disk).
//!
//! # Components
//!
//! - [`IdentityKeyStore`]: one box key pair per identity, `privateKey_<id>`
//! - [`GroupKeyStore`]: one secretbox key per group, `group_encryption_keys`
//! - [`storage`]: the key-value abstraction and its backends

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod error;
mod group;
mod identity;
pub mod storage;

pub use error::KeyStoreError;
pub use group::GroupKeyStore;
pub use identity::{IdentityKeyStore, IdentityStatus};
pub use storage::{KeyValueStore, MemoryStore, RedbStore, StorageError};
