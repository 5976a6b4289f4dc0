//! Group message encryption using secretbox (XSalsa20-Poly1305)
//!
//! The group key is long-lived and shared by every sender in the group, so
//! nonce reuse is the main hazard. Nonces are always drawn from [`Entropy`];
//! at 24 bytes random collisions are negligible.

use crypto_secretbox::{
    XSalsa20Poly1305,
    aead::{Aead, KeyInit, generic_array::GenericArray},
};

use crate::{
    content::MessageContent,
    entropy::Entropy,
    envelope::{GroupEnvelope, NONCE_SIZE},
    error::CryptoError,
    keys::GroupKey,
};

/// Seals and opens group messages under a shared [`GroupKey`].
#[derive(Debug, Clone, Default)]
pub struct GroupMessageCipher<E: Entropy> {
    entropy: E,
}

impl<E: Entropy> GroupMessageCipher<E> {
    /// Create a cipher drawing nonces from `entropy`.
    pub fn new(entropy: E) -> Self {
        Self { entropy }
    }

    /// Seal `plaintext` under `group_key` with a fresh random nonce.
    pub fn encrypt(&self, plaintext: &str, group_key: &GroupKey) -> GroupEnvelope {
        let nonce: [u8; NONCE_SIZE] = self.entropy.random_array();
        let cipher = XSalsa20Poly1305::new(group_key.as_bytes().into());

        let Ok(ciphertext) = cipher.encrypt(GenericArray::from_slice(&nonce), plaintext.as_bytes())
        else {
            unreachable!("XSalsa20-Poly1305 encryption cannot fail with valid inputs");
        };

        GroupEnvelope { ciphertext, nonce }
    }

    /// Open an envelope sealed under `group_key`.
    ///
    /// # Errors
    ///
    /// - `AuthenticationFailure` on wrong key, tampering, or non-UTF-8 output
    pub fn open(
        &self,
        envelope: &GroupEnvelope,
        group_key: &GroupKey,
    ) -> Result<String, CryptoError> {
        let cipher = XSalsa20Poly1305::new(group_key.as_bytes().into());

        let plaintext = cipher
            .decrypt(GenericArray::from_slice(&envelope.nonce), envelope.ciphertext.as_slice())
            .map_err(|_| CryptoError::AuthenticationFailure)?;

        String::from_utf8(plaintext).map_err(|_| CryptoError::AuthenticationFailure)
    }

    /// Open an envelope, converting any failure into [`MessageContent::AuthFailed`].
    pub fn decrypt(&self, envelope: &GroupEnvelope, group_key: &GroupKey) -> MessageContent {
        match self.open(envelope, group_key) {
            Ok(text) => MessageContent::Decrypted(text),
            Err(err) => {
                tracing::warn!(error = %err, "group message failed to open");
                MessageContent::AuthFailed
            },
        }
    }
}
