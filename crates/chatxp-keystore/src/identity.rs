//! Identity key storage.
//!
//! Each identity (e.g. a wallet address) has one long-term key pair per
//! device. The secret half is kept under `privateKey_<identity>`; the public
//! half is derived from it on load and is what gets published.
//!
//! There is no sync between devices: an identity that signs in on a new
//! device gets a new key pair there, and messages sealed to the old public
//! key stay unreadable on the new device.

use chatxp_crypto::{Entropy, IdentityKeyPair};

use crate::{error::KeyStoreError, storage::KeyValueStore};

const PRIVATE_KEY_PREFIX: &str = "privateKey_";

/// Whether [`IdentityKeyStore::load_or_create`] found an existing key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityStatus {
    /// Key pair was already stored on this device
    Loaded,
    /// Key pair was generated now; its public key must be published
    Created,
}

/// Persists identity key pairs in device-local storage.
///
/// Holds no state besides the storage handle; any number of stores over the
/// same storage agree on one key pair per identity.
#[derive(Clone)]
pub struct IdentityKeyStore<S: KeyValueStore> {
    storage: S,
}

impl<S: KeyValueStore> IdentityKeyStore<S> {
    /// Create a store over `storage`.
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Generate a new key pair. Does not persist it.
    pub fn generate(entropy: &impl Entropy) -> IdentityKeyPair {
        IdentityKeyPair::generate(entropy)
    }

    /// Load the key pair stored for `identity`. `None` if never stored on
    /// this device.
    ///
    /// # Errors
    ///
    /// - `CorruptKey` if the stored value is not a valid secret key
    pub fn load(&self, identity: &str) -> Result<Option<IdentityKeyPair>, KeyStoreError> {
        let key = storage_key(identity);

        let Some(encoded) = self.storage.get(&key)? else {
            return Ok(None);
        };

        IdentityKeyPair::from_secret_base64(&encoded)
            .map(Some)
            .map_err(|source| KeyStoreError::CorruptKey { key, source })
    }

    /// Persist `pair` for `identity`, replacing any previous key.
    pub fn store(&self, identity: &str, pair: &IdentityKeyPair) -> Result<(), KeyStoreError> {
        self.storage.set(&storage_key(identity), &pair.secret_key_base64())?;
        tracing::debug!(identity, "stored identity key");
        Ok(())
    }

    /// Load the key pair for `identity`, generating and persisting one if
    /// this device has none.
    ///
    /// Atomic in storage, so concurrent first sign-ins on one device agree on
    /// a single key pair and only one of them reports `Created`.
    pub fn load_or_create(
        &self,
        identity: &str,
        entropy: &impl Entropy,
    ) -> Result<(IdentityKeyPair, IdentityStatus), KeyStoreError> {
        let key = storage_key(identity);

        let (pair, status) = self.storage.update(&key, |current| match current {
            Some(encoded) => IdentityKeyPair::from_secret_base64(encoded)
                .map(|pair| (None, (pair, IdentityStatus::Loaded)))
                .map_err(|source| KeyStoreError::CorruptKey { key: key.clone(), source }),
            None => {
                let pair = Self::generate(entropy);
                Ok((Some(pair.secret_key_base64()), (pair, IdentityStatus::Created)))
            },
        })?;

        if status == IdentityStatus::Created {
            let public_key = pair.public_key_base64();
            tracing::info!(identity, public_key = %public_key, "created identity key");
        }

        Ok((pair, status))
    }
}

fn storage_key(identity: &str) -> String {
    format!("{PRIVATE_KEY_PREFIX}{identity}")
}
