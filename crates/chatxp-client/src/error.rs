//! Messenger error types.

use chatxp_crypto::CryptoError;
use chatxp_keystore::KeyStoreError;
use thiserror::Error;

use crate::datastore::DatastoreError;

/// Errors from [`crate::Messenger`] operations.
///
/// Decryption problems on read are not errors; they resolve to
/// [`chatxp_crypto::MessageContent`] variants instead.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Local key storage failed
    #[error("key store error: {0}")]
    KeyStore(#[from] KeyStoreError),

    /// Key material could not be used (e.g. a malformed published key)
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Remote datastore failed
    #[error("datastore error: {0}")]
    Datastore(#[from] DatastoreError),

    /// Recipient never published a public key
    #[error("no public key published for {recipient}")]
    RecipientKeyMissing {
        /// Identity that has no published key
        recipient: String,
    },

    /// This device holds no key for the group
    #[error("no group key on this device for {group_id}")]
    GroupKeyMissing {
        /// Group without a local key
        group_id: String,
    },
}
