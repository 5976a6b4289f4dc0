//! Fuzz target for stored message content resolution
//!
//! Feeds arbitrary strings through envelope classification and both
//! resolvers, as a client does for every row it reads.
//!
//! # Invariants
//!
//! - Never panics, whatever the content
//! - Content that is not sealed comes back unchanged
//! - Sealed content never resolves to its own JSON text

#![no_main]

use chatxp_crypto::{
    DirectMessageCipher, GroupKey, GroupMessageCipher, IdentityKeyPair, MessageContent,
    StoredContent, SystemEntropy, envelope::{classify_direct, classify_group},
    resolve_direct, resolve_group,
};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|content: &str| {
    let identity = IdentityKeyPair::from_secret_bytes([7u8; 32]);
    let group_key = GroupKey::from_bytes([9u8; 32]);
    let direct = DirectMessageCipher::new(SystemEntropy);
    let group = GroupMessageCipher::new(SystemEntropy);

    let resolved = resolve_direct(content, Some(&identity), &direct);
    match classify_direct(content) {
        StoredContent::Plaintext => {
            assert_eq!(resolved, MessageContent::Plaintext(content.to_owned()));
        },
        StoredContent::Empty => assert_eq!(resolved, MessageContent::NoContent),
        StoredContent::Sealed(_) => {
            // Fuzzer inputs are never sealed to this key
            assert_eq!(resolved, MessageContent::AuthFailed);
        },
    }

    let resolved = resolve_group(content, Some(&group_key), &group);
    if matches!(classify_group(content), StoredContent::Plaintext) {
        assert_eq!(resolved, MessageContent::Plaintext(content.to_owned()));
    }

    let _ = resolve_direct(content, None, &direct);
    let _ = resolve_group(content, None, &group);
});
