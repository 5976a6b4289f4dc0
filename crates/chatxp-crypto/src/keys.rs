//! Identity key pairs and symmetric group keys
//!
//! Identity keys are Curve25519 box keys. The secret half never leaves the
//! device; the public half is published to the identity directory and is the
//! only key material ever transmitted in the clear.

use std::fmt;

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::{entropy::Entropy, error::CryptoError};

/// Size of every key in the crate (public, secret and group keys)
pub const KEY_SIZE: usize = 32;

/// Decode a base64 string into exactly `KEY_SIZE` bytes.
pub(crate) fn decode_key(encoded: &str) -> Result<[u8; KEY_SIZE], CryptoError> {
    let mut bytes = BASE64.decode(encoded).map_err(|_| CryptoError::InvalidKeyEncoding)?;

    let result = <[u8; KEY_SIZE]>::try_from(bytes.as_slice())
        .map_err(|_| CryptoError::InvalidKey { expected: KEY_SIZE, actual: bytes.len() });

    bytes.zeroize();
    result
}

/// A recipient's public box key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey([u8; KEY_SIZE]);

impl PublicKey {
    /// Parse a base64 public key as published in the identity directory.
    ///
    /// # Errors
    ///
    /// - `InvalidKeyEncoding` if the string is not base64
    /// - `InvalidKey` if it does not decode to 32 bytes
    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        decode_key(encoded).map(Self)
    }

    /// Wrap raw public key bytes.
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    /// Base64 form for publishing.
    pub fn to_base64(&self) -> String {
        BASE64.encode(self.0)
    }

    pub(crate) fn to_box_key(self) -> crypto_box::PublicKey {
        crypto_box::PublicKey::from(self.0)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PublicKey").field(&self.to_base64()).finish()
    }
}

/// A user's long-term identity key pair.
///
/// Generated once per identity and device. The secret key zeroizes on drop
/// and is redacted from `Debug` output.
#[derive(Clone)]
pub struct IdentityKeyPair {
    secret: crypto_box::SecretKey,
    public: PublicKey,
}

impl IdentityKeyPair {
    /// Generate a new key pair.
    pub fn generate(entropy: &impl Entropy) -> Self {
        let mut seed: [u8; KEY_SIZE] = entropy.random_array();
        let pair = Self::from_secret_bytes(seed);
        seed.zeroize();
        pair
    }

    /// Rebuild a key pair from its secret half. The public key is derived.
    pub fn from_secret_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        let secret = crypto_box::SecretKey::from(bytes);
        let public = PublicKey(*secret.public_key().as_bytes());
        Self { secret, public }
    }

    /// Rebuild a key pair from a base64 secret key, as kept in local storage.
    pub fn from_secret_base64(encoded: &str) -> Result<Self, CryptoError> {
        let mut bytes = decode_key(encoded)?;
        let pair = Self::from_secret_bytes(bytes);
        bytes.zeroize();
        Ok(pair)
    }

    /// Public half, safe to publish.
    pub fn public_key(&self) -> PublicKey {
        self.public
    }

    /// Base64 public key for the identity directory.
    pub fn public_key_base64(&self) -> String {
        self.public.to_base64()
    }

    /// Base64 secret key for local persistence only.
    pub fn secret_key_base64(&self) -> String {
        let mut bytes = self.secret.to_bytes();
        let encoded = BASE64.encode(bytes);
        bytes.zeroize();
        encoded
    }

    pub(crate) fn box_secret(&self) -> &crypto_box::SecretKey {
        &self.secret
    }
}

impl fmt::Debug for IdentityKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityKeyPair")
            .field("public", &self.public)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Shared symmetric key for one group's messages.
///
/// Long-lived: the same key seals every message in the group, so nonces are
/// always drawn from [`Entropy`].
#[derive(Clone)]
pub struct GroupKey([u8; KEY_SIZE]);

impl GroupKey {
    /// Generate a fresh random group key.
    pub fn generate(entropy: &impl Entropy) -> Self {
        Self(entropy.random_array())
    }

    /// Wrap raw key bytes.
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Parse a base64 group key.
    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        decode_key(encoded).map(Self)
    }

    /// Base64 form for local persistence and grants.
    pub fn to_base64(&self) -> String {
        BASE64.encode(self.0)
    }

    /// 32-byte secretbox key.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl PartialEq for GroupKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl Eq for GroupKey {}

impl Drop for GroupKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl fmt::Debug for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("GroupKey(<redacted>)")
    }
}
