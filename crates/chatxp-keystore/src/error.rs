//! Key store error types.

use chatxp_crypto::CryptoError;
use thiserror::Error;

use crate::storage::StorageError;

/// Errors from identity and group key stores
#[derive(Debug, Error)]
pub enum KeyStoreError {
    /// Underlying key-value storage failed
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// A stored value exists but is not a valid key
    #[error("corrupt key stored under {key}: {source}")]
    CorruptKey {
        /// Storage key holding the bad value
        key: String,
        /// Why the value was rejected
        #[source]
        source: CryptoError,
    },
}

impl KeyStoreError {
    /// Returns true if retrying the operation cannot succeed.
    ///
    /// A corrupt key needs intervention. Storage errors may be transient
    /// (e.g. a busy database).
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::CorruptKey { .. } => true,
            Self::Storage(_) => false,
        }
    }
}
