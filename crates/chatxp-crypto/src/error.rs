//! Error types for cryptographic operations

use thiserror::Error;

/// Errors from the messaging crypto core.
///
/// None of these cross the display boundary: decrypt paths convert them to a
/// [`crate::MessageContent`] before anything reaches a UI.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Key material does not decode to the expected length
    #[error("invalid key: expected {expected} bytes, got {actual}")]
    InvalidKey {
        /// Expected key length in bytes
        expected: usize,
        /// Length actually decoded
        actual: usize,
    },

    /// Key string is not valid base64
    #[error("invalid key encoding")]
    InvalidKeyEncoding,

    /// Ciphertext failed its integrity check (wrong key, corruption, tampering)
    #[error("authentication failed")]
    AuthenticationFailure,

    /// Envelope fields are present but cannot be decoded
    #[error("malformed envelope: {reason}")]
    MalformedEnvelope {
        /// What was wrong with the envelope
        reason: String,
    },
}

impl CryptoError {
    /// Returns true if the error means the ciphertext could not be opened.
    ///
    /// These are the outcomes shown to users as a failed decryption rather
    /// than surfaced to the caller.
    pub fn is_decryption_failure(&self) -> bool {
        match self {
            Self::AuthenticationFailure | Self::MalformedEnvelope { .. } => true,
            Self::InvalidKey { .. } | Self::InvalidKeyEncoding => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authentication_failure_is_decryption_failure() {
        assert!(CryptoError::AuthenticationFailure.is_decryption_failure());
        assert!(
            CryptoError::MalformedEnvelope { reason: "bad nonce".to_string() }
                .is_decryption_failure()
        );
    }

    #[test]
    fn invalid_key_is_not_decryption_failure() {
        let err = CryptoError::InvalidKey { expected: 32, actual: 31 };
        assert!(!err.is_decryption_failure());
        assert!(!CryptoError::InvalidKeyEncoding.is_decryption_failure());
    }

    #[test]
    fn error_display() {
        let err = CryptoError::InvalidKey { expected: 32, actual: 16 };
        assert_eq!(err.to_string(), "invalid key: expected 32 bytes, got 16");
    }
}
