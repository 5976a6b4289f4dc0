//! Message envelopes and their wire encoding
//!
//! Both envelope shapes travel as a JSON object with base64 fields, stored by
//! the datastore as an opaque string:
//!
//! ```text
//! direct: {"encrypted": "<b64>", "nonce": "<b64>", "ephemeralPublicKey": "<b64>"}
//! group:  {"encrypted": "<b64>", "nonce": "<b64>"}
//! ```
//!
//! Stored content is not guaranteed to be an envelope. Older clients wrote
//! plaintext, and senders may opt out of encryption. [`classify_direct`] and
//! [`classify_group`] sort content into empty, plaintext or sealed without
//! ever failing.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{error::CryptoError, keys::KEY_SIZE};

/// XSalsa20 nonce size (24 bytes), shared by box and secretbox
pub const NONCE_SIZE: usize = 24;

/// Poly1305 tag size (16 bytes)
pub const TAG_SIZE: usize = 16;

const FIELD_CIPHERTEXT: &str = "encrypted";
const FIELD_NONCE: &str = "nonce";
const FIELD_EPHEMERAL: &str = "ephemeralPublicKey";

/// A sealed one-to-one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectEnvelope {
    /// Box ciphertext including the 16-byte Poly1305 tag
    pub ciphertext: Vec<u8>,
    /// Random 24-byte nonce, fresh per message
    pub nonce: [u8; NONCE_SIZE],
    /// Public half of the single-use sender key
    pub ephemeral_public_key: [u8; KEY_SIZE],
}

/// A sealed group message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupEnvelope {
    /// Secretbox ciphertext including the 16-byte Poly1305 tag
    pub ciphertext: Vec<u8>,
    /// Random 24-byte nonce, fresh per message
    pub nonce: [u8; NONCE_SIZE],
}

/// Wire form of a [`DirectEnvelope`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectWire {
    /// Base64 ciphertext
    pub encrypted: String,
    /// Base64 nonce
    pub nonce: String,
    /// Base64 ephemeral public key
    pub ephemeral_public_key: String,
}

/// Wire form of a [`GroupEnvelope`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupWire {
    /// Base64 ciphertext
    pub encrypted: String,
    /// Base64 nonce
    pub nonce: String,
}

/// Classification of content read back from the datastore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredContent<W> {
    /// Empty content column
    Empty,
    /// Anything that is not an envelope of the expected shape
    Plaintext,
    /// An envelope of the expected shape; its fields may still fail to decode
    Sealed(W),
}

impl DirectEnvelope {
    /// Base64 nonce, also stored in the datastore's `nonce` column.
    pub fn nonce_base64(&self) -> String {
        BASE64.encode(self.nonce)
    }

    /// Wire form with base64 fields.
    pub fn to_wire(&self) -> DirectWire {
        DirectWire {
            encrypted: BASE64.encode(&self.ciphertext),
            nonce: self.nonce_base64(),
            ephemeral_public_key: BASE64.encode(self.ephemeral_public_key),
        }
    }

    /// Serialize to the JSON content string.
    pub fn encode(&self) -> String {
        encode_json(&self.to_wire())
    }

    /// Parse content that must be a direct envelope.
    ///
    /// # Errors
    ///
    /// `MalformedEnvelope` if the content is not a sealed direct envelope or
    /// its fields do not decode.
    pub fn decode(content: &str) -> Result<Self, CryptoError> {
        match classify_direct(content) {
            StoredContent::Sealed(wire) => wire.decode(),
            StoredContent::Empty | StoredContent::Plaintext => {
                Err(malformed("content is not a direct envelope"))
            },
        }
    }
}

impl DirectWire {
    /// Decode the base64 fields and check their lengths.
    pub fn decode(&self) -> Result<DirectEnvelope, CryptoError> {
        Ok(DirectEnvelope {
            ciphertext: decode_field(FIELD_CIPHERTEXT, &self.encrypted)?,
            nonce: decode_fixed(FIELD_NONCE, &self.nonce)?,
            ephemeral_public_key: decode_fixed(FIELD_EPHEMERAL, &self.ephemeral_public_key)?,
        })
    }
}

impl GroupEnvelope {
    /// Base64 nonce, also stored in the datastore's `nonce` column.
    pub fn nonce_base64(&self) -> String {
        BASE64.encode(self.nonce)
    }

    /// Wire form with base64 fields.
    pub fn to_wire(&self) -> GroupWire {
        GroupWire { encrypted: BASE64.encode(&self.ciphertext), nonce: self.nonce_base64() }
    }

    /// Serialize to the JSON content string.
    pub fn encode(&self) -> String {
        encode_json(&self.to_wire())
    }

    /// Parse content that must be a group envelope.
    pub fn decode(content: &str) -> Result<Self, CryptoError> {
        match classify_group(content) {
            StoredContent::Sealed(wire) => wire.decode(),
            StoredContent::Empty | StoredContent::Plaintext => {
                Err(malformed("content is not a group envelope"))
            },
        }
    }
}

impl GroupWire {
    /// Decode the base64 fields and check their lengths.
    pub fn decode(&self) -> Result<GroupEnvelope, CryptoError> {
        Ok(GroupEnvelope {
            ciphertext: decode_field(FIELD_CIPHERTEXT, &self.encrypted)?,
            nonce: decode_fixed(FIELD_NONCE, &self.nonce)?,
        })
    }
}

/// Classify stored content as a direct message.
///
/// Sealed only when the content is a JSON object whose `encrypted`, `nonce`
/// and `ephemeralPublicKey` fields are all truthy.
pub fn classify_direct(content: &str) -> StoredContent<DirectWire> {
    classify(content, &[FIELD_CIPHERTEXT, FIELD_NONCE, FIELD_EPHEMERAL], |object| DirectWire {
        encrypted: field_text(object, FIELD_CIPHERTEXT),
        nonce: field_text(object, FIELD_NONCE),
        ephemeral_public_key: field_text(object, FIELD_EPHEMERAL),
    })
}

/// Classify stored content as a group message.
///
/// Sealed only when the content is a JSON object whose `encrypted` and
/// `nonce` fields are truthy. Extra fields are ignored.
pub fn classify_group(content: &str) -> StoredContent<GroupWire> {
    classify(content, &[FIELD_CIPHERTEXT, FIELD_NONCE], |object| GroupWire {
        encrypted: field_text(object, FIELD_CIPHERTEXT),
        nonce: field_text(object, FIELD_NONCE),
    })
}

fn classify<W>(
    content: &str,
    required: &[&str],
    build: impl FnOnce(&serde_json::Map<String, Value>) -> W,
) -> StoredContent<W> {
    if content.is_empty() {
        return StoredContent::Empty;
    }

    let Ok(Value::Object(object)) = serde_json::from_str::<Value>(content) else {
        return StoredContent::Plaintext;
    };

    if required.iter().all(|field| object.get(*field).is_some_and(is_truthy)) {
        StoredContent::Sealed(build(&object))
    } else {
        StoredContent::Plaintext
    }
}

/// JavaScript truthiness, as web clients test envelope fields.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Non-string truthy fields become an empty string, which fails to decode
/// as a fixed-size field and is reported as a failed decryption.
fn field_text(object: &serde_json::Map<String, Value>, field: &str) -> String {
    object.get(field).and_then(Value::as_str).unwrap_or_default().to_owned()
}

fn decode_field(field: &str, encoded: &str) -> Result<Vec<u8>, CryptoError> {
    BASE64.decode(encoded).map_err(|e| malformed(&format!("{field}: {e}")))
}

fn decode_fixed<const N: usize>(field: &str, encoded: &str) -> Result<[u8; N], CryptoError> {
    let bytes = decode_field(field, encoded)?;
    <[u8; N]>::try_from(bytes.as_slice())
        .map_err(|_| malformed(&format!("{field}: expected {N} bytes, got {}", bytes.len())))
}

fn malformed(reason: &str) -> CryptoError {
    CryptoError::MalformedEnvelope { reason: reason.to_owned() }
}

fn encode_json<T: Serialize>(wire: &T) -> String {
    let Ok(json) = serde_json::to_string(wire) else {
        unreachable!("envelope wire types contain only strings");
    };
    json
}
