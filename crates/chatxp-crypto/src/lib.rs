//! ChatXP Cryptographic Core
//!
//! End-to-end encryption for direct and group messages. Pure functions over
//! caller-supplied key material; all randomness is drawn through
//! [`Entropy`] so tests can run deterministically.
//!
//! # Message Flow
//!
//! ```text
//! direct:  plaintext ──box(ephemeral sk, recipient pk, nonce)──► DirectEnvelope
//! group:   plaintext ──secretbox(group key, nonce)────────────► GroupEnvelope
//!                                                                   │
//!                                                          JSON (base64 fields)
//!                                                                   │
//!                                                                   ▼
//!                                                          datastore (opaque)
//! ```
//!
//! Reading back goes through [`resolve_direct`] / [`resolve_group`], which
//! classify the stored string and produce a [`MessageContent`]. Legacy
//! plaintext passes through unchanged; failures become sentinel variants
//! instead of errors.
//!
//! # Security
//!
//! Confidentiality:
//! - Direct messages use a fresh ephemeral X25519 key per message
//! - Every nonce is 24 random bytes from the entropy source
//! - Only public keys ever leave the device
//!
//! Authenticity:
//! - XSalsa20-Poly1305 rejects any modified ciphertext, nonce or key
//! - Failed authentication -> `[Decryption failed]`, never plaintext
//!
//! Not provided:
//! - Forward secrecy: identity and group keys are never rotated
//! - Sender authentication for direct messages: the ephemeral key is anonymous
//! - Multi-device sync of identity keys

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod content;
mod direct;
pub mod entropy;
pub mod envelope;
mod error;
mod grant;
mod group;
mod keys;

pub use content::{
    DECRYPTION_FAILED, KEY_NOT_AVAILABLE, MessageContent, NO_CONTENT, resolve_direct,
    resolve_group,
};
pub use direct::DirectMessageCipher;
#[cfg(any(test, feature = "test-utils"))]
pub use entropy::SeededEntropy;
pub use entropy::{Entropy, SystemEntropy};
pub use envelope::{DirectEnvelope, GroupEnvelope, NONCE_SIZE, StoredContent};
pub use error::CryptoError;
pub use grant::{GroupKeyGrant, open_grant, seal_grant};
pub use group::GroupMessageCipher;
pub use keys::{GroupKey, IdentityKeyPair, KEY_SIZE, PublicKey};
