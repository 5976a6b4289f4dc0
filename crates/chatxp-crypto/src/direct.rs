//! One-to-one message encryption using box (X25519 + XSalsa20-Poly1305)
//!
//! Every message is sealed with a fresh ephemeral key pair and a fresh random
//! nonce. The sender's long-term key takes no part, so a sender cannot
//! re-open their own past messages from it. Compromise of one ephemeral key
//! exposes one message.

use crypto_box::{
    SalsaBox,
    aead::{Aead, generic_array::GenericArray},
};

use crate::{
    content::MessageContent,
    entropy::Entropy,
    envelope::{DirectEnvelope, NONCE_SIZE},
    error::CryptoError,
    keys::{IdentityKeyPair, PublicKey},
};

/// Seals and opens direct messages.
///
/// Holds only the entropy source; key material is passed per call.
#[derive(Debug, Clone, Default)]
pub struct DirectMessageCipher<E: Entropy> {
    entropy: E,
}

impl<E: Entropy> DirectMessageCipher<E> {
    /// Create a cipher drawing keys and nonces from `entropy`.
    pub fn new(entropy: E) -> Self {
        Self { entropy }
    }

    /// Seal `plaintext` to `recipient`.
    ///
    /// # Security
    ///
    /// - Ephemeral key pair is generated per call and never reused
    /// - Nonce is drawn from the entropy source per call
    /// - Box authenticates the ciphertext to (ephemeral, recipient)
    pub fn encrypt(&self, plaintext: &str, recipient: &PublicKey) -> DirectEnvelope {
        let ephemeral = IdentityKeyPair::generate(&self.entropy);
        let nonce: [u8; NONCE_SIZE] = self.entropy.random_array();

        let sealer = SalsaBox::new(&recipient.to_box_key(), ephemeral.box_secret());
        let Ok(ciphertext) = sealer.encrypt(GenericArray::from_slice(&nonce), plaintext.as_bytes())
        else {
            unreachable!("XSalsa20-Poly1305 encryption cannot fail with valid inputs");
        };

        DirectEnvelope {
            ciphertext,
            nonce,
            ephemeral_public_key: *ephemeral.public_key().as_bytes(),
        }
    }

    /// Seal `plaintext` to a base64 public key from the identity directory.
    ///
    /// # Errors
    ///
    /// - `InvalidKeyEncoding` / `InvalidKey` if the key is not 32 base64 bytes
    pub fn encrypt_to(
        &self,
        plaintext: &str,
        recipient_public_key: &str,
    ) -> Result<DirectEnvelope, CryptoError> {
        let recipient = PublicKey::from_base64(recipient_public_key)?;
        Ok(self.encrypt(plaintext, &recipient))
    }

    /// Open an envelope addressed to `identity`.
    ///
    /// # Errors
    ///
    /// - `AuthenticationFailure` on wrong key, tampering, or non-UTF-8 output
    pub fn open(
        &self,
        envelope: &DirectEnvelope,
        identity: &IdentityKeyPair,
    ) -> Result<String, CryptoError> {
        let ephemeral = crypto_box::PublicKey::from(envelope.ephemeral_public_key);
        let opener = SalsaBox::new(&ephemeral, identity.box_secret());

        let plaintext = opener
            .decrypt(GenericArray::from_slice(&envelope.nonce), envelope.ciphertext.as_slice())
            .map_err(|_| CryptoError::AuthenticationFailure)?;

        String::from_utf8(plaintext).map_err(|_| CryptoError::AuthenticationFailure)
    }

    /// Open an envelope, converting any failure into [`MessageContent::AuthFailed`].
    pub fn decrypt(&self, envelope: &DirectEnvelope, identity: &IdentityKeyPair) -> MessageContent {
        match self.open(envelope, identity) {
            Ok(text) => MessageContent::Decrypted(text),
            Err(err) => {
                tracing::warn!(error = %err, "direct message failed to open");
                MessageContent::AuthFailed
            },
        }
    }
}
