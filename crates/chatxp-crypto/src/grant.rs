//! Distribution of group keys to members.
//!
//! A group key is useless to a member who never received it. The member who
//! holds the key seals it to each other member's public identity key with the
//! direct cipher and stores the result as a [`GroupKeyGrant`]. The recipient
//! opens the grant with their private key and installs the group key locally.
//!
//! Grant fields mirror the group membership record:
//! `encrypted_group_key`, `key_nonce` and `key_ephemeral_public`.

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::{
    direct::DirectMessageCipher,
    entropy::Entropy,
    envelope::DirectWire,
    error::CryptoError,
    keys::{GroupKey, IdentityKeyPair, PublicKey},
};

/// A group key sealed to one member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupKeyGrant {
    /// Group the key belongs to
    pub group_id: String,
    /// Member the key is sealed to
    pub member_id: String,
    /// Base64 box ciphertext of the base64 group key
    pub encrypted_group_key: String,
    /// Base64 nonce
    pub key_nonce: String,
    /// Base64 ephemeral public key
    pub key_ephemeral_public: String,
}

/// Seal `group_key` to a member's public key.
pub fn seal_grant<E: Entropy>(
    cipher: &DirectMessageCipher<E>,
    group_id: &str,
    member_id: &str,
    group_key: &GroupKey,
    member_public_key: &PublicKey,
) -> GroupKeyGrant {
    let encoded = Zeroizing::new(group_key.to_base64());
    let wire = cipher.encrypt(&encoded, member_public_key).to_wire();

    GroupKeyGrant {
        group_id: group_id.to_owned(),
        member_id: member_id.to_owned(),
        encrypted_group_key: wire.encrypted,
        key_nonce: wire.nonce,
        key_ephemeral_public: wire.ephemeral_public_key,
    }
}

/// Open a grant with the member's identity key.
///
/// # Errors
///
/// - `MalformedEnvelope` if the grant fields do not decode
/// - `AuthenticationFailure` if the grant was sealed to another key or altered
/// - `InvalidKey` / `InvalidKeyEncoding` if the payload is not a group key
pub fn open_grant<E: Entropy>(
    cipher: &DirectMessageCipher<E>,
    grant: &GroupKeyGrant,
    identity: &IdentityKeyPair,
) -> Result<GroupKey, CryptoError> {
    let envelope = DirectWire {
        encrypted: grant.encrypted_group_key.clone(),
        nonce: grant.key_nonce.clone(),
        ephemeral_public_key: grant.key_ephemeral_public.clone(),
    }
    .decode()?;

    let encoded = Zeroizing::new(cipher.open(&envelope, identity)?);
    GroupKey::from_base64(&encoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entropy::SeededEntropy;

    #[test]
    fn member_opens_grant() {
        let cipher = DirectMessageCipher::new(SeededEntropy::new(1));
        let bob = IdentityKeyPair::generate(&SeededEntropy::new(2));
        let key = GroupKey::generate(&SeededEntropy::new(3));

        let grant = seal_grant(&cipher, "group-1", "bob", &key, &bob.public_key());

        assert_eq!(grant.group_id, "group-1");
        assert_eq!(grant.member_id, "bob");
        assert_eq!(open_grant(&cipher, &grant, &bob).unwrap(), key);
    }

    #[test]
    fn grant_payload_is_base64_key_text() {
        let cipher = DirectMessageCipher::new(SeededEntropy::new(1));
        let bob = IdentityKeyPair::generate(&SeededEntropy::new(2));
        let key = GroupKey::generate(&SeededEntropy::new(3));

        let grant = seal_grant(&cipher, "group-1", "bob", &key, &bob.public_key());
        let envelope = DirectWire {
            encrypted: grant.encrypted_group_key,
            nonce: grant.key_nonce,
            ephemeral_public_key: grant.key_ephemeral_public,
        }
        .decode()
        .unwrap();

        assert_eq!(cipher.open(&envelope, &bob).unwrap(), key.to_base64());
    }

    #[test]
    fn other_member_cannot_open_grant() {
        let cipher = DirectMessageCipher::new(SeededEntropy::new(1));
        let bob = IdentityKeyPair::generate(&SeededEntropy::new(2));
        let eve = IdentityKeyPair::generate(&SeededEntropy::new(4));
        let key = GroupKey::generate(&SeededEntropy::new(3));

        let grant = seal_grant(&cipher, "group-1", "bob", &key, &bob.public_key());

        assert_eq!(open_grant(&cipher, &grant, &eve), Err(CryptoError::AuthenticationFailure));
    }

    #[test]
    fn grant_carrying_non_key_is_rejected() {
        let cipher = DirectMessageCipher::new(SeededEntropy::new(1));
        let bob = IdentityKeyPair::generate(&SeededEntropy::new(2));

        let wire = cipher.encrypt("not a key", &bob.public_key()).to_wire();
        let grant = GroupKeyGrant {
            group_id: "group-1".to_string(),
            member_id: "bob".to_string(),
            encrypted_group_key: wire.encrypted,
            key_nonce: wire.nonce,
            key_ephemeral_public: wire.ephemeral_public_key,
        };

        assert!(open_grant(&cipher, &grant, &bob).is_err());
    }

    #[test]
    fn grant_serializes_with_member_record_fields() {
        let cipher = DirectMessageCipher::new(SeededEntropy::new(1));
        let bob = IdentityKeyPair::generate(&SeededEntropy::new(2));
        let key = GroupKey::generate(&SeededEntropy::new(3));

        let grant = seal_grant(&cipher, "group-1", "bob", &key, &bob.public_key());
        let json = serde_json::to_string(&grant).unwrap();

        assert!(json.contains("\"encrypted_group_key\""));
        assert!(json.contains("\"key_nonce\""));
        assert!(json.contains("\"key_ephemeral_public\""));
        assert_eq!(serde_json::from_str::<GroupKeyGrant>(&json).unwrap(), grant);
    }
}
