//! Fuzz target for envelope integrity
//!
//! Seals arbitrary plaintext, applies arbitrary mutations to the envelope,
//! and opens the result.
//!
//! # Invariants
//!
//! - Unmodified envelopes always open to the original plaintext
//! - Any modified ciphertext, nonce, or ephemeral key fails authentication
//! - Opening never panics

#![no_main]

use arbitrary::Arbitrary;
use chatxp_crypto::{
    DirectEnvelope, DirectMessageCipher, GroupEnvelope, GroupKey, GroupMessageCipher,
    IdentityKeyPair, MessageContent, SystemEntropy,
};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum Mutation {
    FlipCiphertext { index: usize, mask: u8 },
    FlipNonce { index: usize, mask: u8 },
    FlipEphemeral { index: usize, mask: u8 },
    Truncate { len: usize },
}

#[derive(Debug, Arbitrary)]
struct Scenario {
    plaintext: String,
    recipient_secret: [u8; 32],
    group_key: [u8; 32],
    mutation: Option<Mutation>,
}

fn flip(bytes: &mut [u8], index: usize, mask: u8) -> bool {
    if bytes.is_empty() || mask == 0 {
        return false;
    }
    let len = bytes.len();
    bytes[index % len] ^= mask;
    true
}

fn mutate_direct(envelope: &mut DirectEnvelope, mutation: &Mutation) -> bool {
    match *mutation {
        Mutation::FlipCiphertext { index, mask } => flip(&mut envelope.ciphertext, index, mask),
        Mutation::FlipNonce { index, mask } => flip(&mut envelope.nonce, index, mask),
        Mutation::FlipEphemeral { index, mask } => {
            flip(&mut envelope.ephemeral_public_key, index, mask)
        },
        Mutation::Truncate { len } => {
            let before = envelope.ciphertext.len();
            envelope.ciphertext.truncate(len);
            envelope.ciphertext.len() != before
        },
    }
}

fn mutate_group(envelope: &mut GroupEnvelope, mutation: &Mutation) -> bool {
    match *mutation {
        Mutation::FlipCiphertext { index, mask } => flip(&mut envelope.ciphertext, index, mask),
        Mutation::FlipNonce { index, mask } => flip(&mut envelope.nonce, index, mask),
        Mutation::FlipEphemeral { .. } => false,
        Mutation::Truncate { len } => {
            let before = envelope.ciphertext.len();
            envelope.ciphertext.truncate(len);
            envelope.ciphertext.len() != before
        },
    }
}

fuzz_target!(|scenario: Scenario| {
    let recipient = IdentityKeyPair::from_secret_bytes(scenario.recipient_secret);
    let group_key = GroupKey::from_bytes(scenario.group_key);
    let direct = DirectMessageCipher::new(SystemEntropy);
    let group = GroupMessageCipher::new(SystemEntropy);
    let expected = MessageContent::Decrypted(scenario.plaintext.clone());

    let mut sealed = direct.encrypt(&scenario.plaintext, &recipient.public_key());
    let tampered = scenario.mutation.as_ref().is_some_and(|m| mutate_direct(&mut sealed, m));
    let opened = direct.decrypt(&sealed, &recipient);
    if tampered {
        // A flipped ephemeral key can in principle land on an equivalent
        // point, so only ciphertext and nonce changes are asserted strictly
        if !matches!(scenario.mutation, Some(Mutation::FlipEphemeral { .. })) {
            assert_eq!(opened, MessageContent::AuthFailed);
        }
    } else {
        assert_eq!(opened, expected);
    }

    let mut sealed = group.encrypt(&scenario.plaintext, &group_key);
    let tampered = scenario.mutation.as_ref().is_some_and(|m| mutate_group(&mut sealed, m));
    let opened = group.decrypt(&sealed, &group_key);
    if tampered {
        assert_eq!(opened, MessageContent::AuthFailed);
    } else {
        assert_eq!(opened, expected);
    }
});
