//! Property-based tests for the message ciphers
//!
//! These tests verify the fundamental invariants of the crypto core:
//!
//! 1. **Round-trip**: decrypt(encrypt(m)) == m for direct and group messages
//! 2. **Freshness**: the same plaintext never seals to the same nonce or ciphertext
//! 3. **Isolation**: the wrong key yields `[Decryption failed]`, never the plaintext
//! 4. **Pass-through**: content that is not an envelope resolves unchanged

use chatxp_crypto::{
    DirectEnvelope, DirectMessageCipher, GroupEnvelope, GroupKey, GroupMessageCipher,
    IdentityKeyPair, MessageContent, SystemEntropy, resolve_direct, resolve_group,
};
use proptest::prelude::*;

fn group_key_from(bytes: [u8; 32]) -> GroupKey {
    GroupKey::from_bytes(bytes)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_direct_roundtrip(plaintext in any::<String>()) {
        let cipher = DirectMessageCipher::new(SystemEntropy::new());
        let bob = IdentityKeyPair::generate(&SystemEntropy::new());

        let envelope = cipher.encrypt(&plaintext, &bob.public_key());

        prop_assert_eq!(cipher.decrypt(&envelope, &bob), MessageContent::Decrypted(plaintext));
    }

    #[test]
    fn prop_group_roundtrip(plaintext in any::<String>(), key in any::<[u8; 32]>()) {
        let cipher = GroupMessageCipher::new(SystemEntropy::new());
        let key = group_key_from(key);

        let envelope = cipher.encrypt(&plaintext, &key);

        prop_assert_eq!(cipher.decrypt(&envelope, &key), MessageContent::Decrypted(plaintext));
    }

    #[test]
    fn prop_resolved_roundtrip_through_wire(plaintext in any::<String>()) {
        let direct = DirectMessageCipher::new(SystemEntropy::new());
        let group = GroupMessageCipher::new(SystemEntropy::new());
        let bob = IdentityKeyPair::generate(&SystemEntropy::new());
        let key = GroupKey::generate(&SystemEntropy::new());

        let direct_content = direct.encrypt(&plaintext, &bob.public_key()).encode();
        let group_content = group.encrypt(&plaintext, &key).encode();

        prop_assert_eq!(
            resolve_direct(&direct_content, Some(&bob), &direct),
            MessageContent::Decrypted(plaintext.clone())
        );
        prop_assert_eq!(
            resolve_group(&group_content, Some(&key), &group),
            MessageContent::Decrypted(plaintext)
        );
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn prop_same_plaintext_seals_freshly(plaintext in any::<String>()) {
        let direct = DirectMessageCipher::new(SystemEntropy::new());
        let group = GroupMessageCipher::new(SystemEntropy::new());
        let bob = IdentityKeyPair::generate(&SystemEntropy::new());
        let key = GroupKey::generate(&SystemEntropy::new());

        let d1 = direct.encrypt(&plaintext, &bob.public_key());
        let d2 = direct.encrypt(&plaintext, &bob.public_key());
        prop_assert_ne!(d1.nonce, d2.nonce);
        prop_assert_ne!(d1.ciphertext, d2.ciphertext);

        let g1 = group.encrypt(&plaintext, &key);
        let g2 = group.encrypt(&plaintext, &key);
        prop_assert_ne!(g1.nonce, g2.nonce);
        prop_assert_ne!(g1.ciphertext, g2.ciphertext);
    }

    #[test]
    fn prop_wrong_identity_never_reveals(plaintext in any::<String>()) {
        let cipher = DirectMessageCipher::new(SystemEntropy::new());
        let bob = IdentityKeyPair::generate(&SystemEntropy::new());
        let eve = IdentityKeyPair::generate(&SystemEntropy::new());

        let envelope = cipher.encrypt(&plaintext, &bob.public_key());

        prop_assert_eq!(cipher.decrypt(&envelope, &eve), MessageContent::AuthFailed);
    }

    #[test]
    fn prop_wrong_group_key_never_reveals(
        plaintext in any::<String>(),
        key in any::<[u8; 32]>(),
        other in any::<[u8; 32]>(),
    ) {
        prop_assume!(key != other);
        let cipher = GroupMessageCipher::new(SystemEntropy::new());

        let envelope = cipher.encrypt(&plaintext, &group_key_from(key));

        prop_assert_eq!(
            cipher.decrypt(&envelope, &group_key_from(other)),
            MessageContent::AuthFailed
        );
    }

    #[test]
    fn prop_bit_flip_is_detected(
        plaintext in ".{1,200}",
        position in any::<prop::sample::Index>(),
        mask in 1u8..=255,
    ) {
        let cipher = GroupMessageCipher::new(SystemEntropy::new());
        let key = GroupKey::generate(&SystemEntropy::new());

        let mut envelope = cipher.encrypt(&plaintext, &key);
        let index = position.index(envelope.ciphertext.len());
        envelope.ciphertext[index] ^= mask;

        prop_assert_eq!(cipher.decrypt(&envelope, &key), MessageContent::AuthFailed);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_non_json_passes_through(raw in "[^{\\[\"0-9tfn \\t\\r\\n-][^\\x00]*") {
        let bob = IdentityKeyPair::generate(&SystemEntropy::new());
        let direct = DirectMessageCipher::new(SystemEntropy::new());
        let group = GroupMessageCipher::new(SystemEntropy::new());

        prop_assert_eq!(
            resolve_direct(&raw, Some(&bob), &direct),
            MessageContent::Plaintext(raw.clone())
        );
        prop_assert_eq!(resolve_group(&raw, None, &group), MessageContent::Plaintext(raw));
    }

    #[test]
    fn prop_object_without_envelope_fields_passes_through(
        text in any::<String>(),
        count in any::<u32>(),
    ) {
        let raw = serde_json::json!({ "text": text, "count": count }).to_string();
        let bob = IdentityKeyPair::generate(&SystemEntropy::new());
        let direct = DirectMessageCipher::new(SystemEntropy::new());
        let group = GroupMessageCipher::new(SystemEntropy::new());

        prop_assert_eq!(
            resolve_direct(&raw, Some(&bob), &direct),
            MessageContent::Plaintext(raw.clone())
        );
        prop_assert_eq!(resolve_group(&raw, None, &group), MessageContent::Plaintext(raw));
    }

    #[test]
    fn prop_decode_never_panics(raw in any::<String>()) {
        let _ = DirectEnvelope::decode(&raw);
        let _ = GroupEnvelope::decode(&raw);
    }
}

/// Alice sends "hello" to Bob. Bob reads it; Eve, holding only Bob's public
/// key and the envelope, cannot.
#[test]
fn alice_bob_eve_scenario() {
    let alice_device = DirectMessageCipher::new(SystemEntropy::new());
    let bob = IdentityKeyPair::generate(&SystemEntropy::new());
    let eve = IdentityKeyPair::generate(&SystemEntropy::new());

    let content = alice_device.encrypt_to("hello", &bob.public_key_base64()).unwrap().encode();

    let bob_device = DirectMessageCipher::new(SystemEntropy::new());
    assert_eq!(resolve_direct(&content, Some(&bob), &bob_device).to_string(), "hello");

    let eve_view = resolve_direct(&content, Some(&eve), &bob_device);
    assert_eq!(eve_view, MessageContent::AuthFailed);
    assert_eq!(eve_view.to_string(), "[Decryption failed]");
    assert!(!content.contains("hello"));
}
