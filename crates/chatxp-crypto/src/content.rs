//! Resolution of stored message content into displayable outcomes.
//!
//! Decryption never fails loudly: a single corrupt or legacy message must
//! not keep the rest of a conversation from rendering. Every outcome is a
//! [`MessageContent`] variant, turned into display text only through its
//! `Display` impl.

use std::fmt;

use crate::{
    direct::DirectMessageCipher,
    entropy::Entropy,
    envelope::{StoredContent, classify_direct, classify_group},
    group::GroupMessageCipher,
    keys::{GroupKey, IdentityKeyPair},
};

/// Shown when a sealed message fails authentication
pub const DECRYPTION_FAILED: &str = "[Decryption failed]";

/// Shown when a sealed direct message arrives but no private key is present
pub const KEY_NOT_AVAILABLE: &str = "[Decryption key not available]";

/// Shown for empty content, or group content with no local group key
pub const NO_CONTENT: &str = "[No content]";

/// Outcome of resolving one stored message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageContent {
    /// Sealed content opened successfully
    Decrypted(String),
    /// Content was not an envelope and is passed through unchanged
    Plaintext(String),
    /// Sealed content failed authentication or could not be decoded
    AuthFailed,
    /// Sealed direct content, but no private key on this device
    KeyMissing,
    /// Empty content, or sealed group content with no group key
    NoContent,
}

impl MessageContent {
    /// True if the content arrived sealed and was opened.
    pub fn was_encrypted(&self) -> bool {
        matches!(self, Self::Decrypted(_))
    }
}

impl fmt::Display for MessageContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decrypted(text) | Self::Plaintext(text) => f.write_str(text),
            Self::AuthFailed => f.write_str(DECRYPTION_FAILED),
            Self::KeyMissing => f.write_str(KEY_NOT_AVAILABLE),
            Self::NoContent => f.write_str(NO_CONTENT),
        }
    }
}

/// Resolve direct-message content with this device's identity key.
pub fn resolve_direct<E: Entropy>(
    content: &str,
    identity: Option<&IdentityKeyPair>,
    cipher: &DirectMessageCipher<E>,
) -> MessageContent {
    match classify_direct(content) {
        StoredContent::Empty => MessageContent::NoContent,
        StoredContent::Plaintext => MessageContent::Plaintext(content.to_owned()),
        StoredContent::Sealed(wire) => {
            let Some(identity) = identity else {
                return MessageContent::KeyMissing;
            };

            match wire.decode() {
                Ok(envelope) => cipher.decrypt(&envelope, identity),
                Err(err) => {
                    tracing::warn!(error = %err, "undecodable direct envelope");
                    MessageContent::AuthFailed
                },
            }
        },
    }
}

/// Resolve group-message content with the group's key, if this device has it.
pub fn resolve_group<E: Entropy>(
    content: &str,
    group_key: Option<&GroupKey>,
    cipher: &GroupMessageCipher<E>,
) -> MessageContent {
    match classify_group(content) {
        StoredContent::Empty => MessageContent::NoContent,
        StoredContent::Plaintext => MessageContent::Plaintext(content.to_owned()),
        StoredContent::Sealed(wire) => {
            let Some(group_key) = group_key else {
                return MessageContent::NoContent;
            };

            match wire.decode() {
                Ok(envelope) => cipher.decrypt(&envelope, group_key),
                Err(err) => {
                    tracing::warn!(error = %err, "undecodable group envelope");
                    MessageContent::AuthFailed
                },
            }
        },
    }
}
