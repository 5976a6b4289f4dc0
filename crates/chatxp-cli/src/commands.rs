//! Subcommands and their execution.

use std::io::{self, Write};

use chatxp_crypto::{
    CryptoError, DirectMessageCipher, Entropy, GroupKeyGrant, GroupMessageCipher, PublicKey,
    open_grant, resolve_direct, resolve_group, seal_grant,
};
use chatxp_keystore::{
    GroupKeyStore, IdentityKeyStore, IdentityStatus, KeyStoreError, KeyValueStore,
};
use clap::Subcommand;
use thiserror::Error;

/// Errors surfaced to the user. Each exits non-zero.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    KeyStore(#[from] KeyStoreError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("invalid grant: {0}")]
    Grant(#[from] serde_json::Error),

    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),

    #[error("no key pair stored for {identity}; run `keygen --identity {identity}` first")]
    IdentityMissing { identity: String },

    #[error("no key stored for group {group_id}")]
    GroupKeyMissing { group_id: String },
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load or create the key pair for an identity and print its public key
    Keygen {
        #[arg(long)]
        identity: String,
    },

    /// Print the public key for an identity
    PublicKey {
        #[arg(long)]
        identity: String,
    },

    /// Seal a direct message to a base64 public key
    Encrypt {
        /// Recipient's published public key (base64)
        #[arg(long)]
        to: String,
        text: String,
    },

    /// Resolve stored direct-message content with an identity's key
    Decrypt {
        #[arg(long)]
        identity: String,
        content: String,
    },

    /// Seal a group message, creating the group key if needed
    GroupEncrypt {
        #[arg(long)]
        group: String,
        text: String,
    },

    /// Resolve stored group-message content with the local group key
    GroupDecrypt {
        #[arg(long)]
        group: String,
        content: String,
    },

    /// Seal the local group key to a member and print the grant JSON
    Grant {
        #[arg(long)]
        group: String,
        #[arg(long)]
        member: String,
        /// Member's published public key (base64)
        #[arg(long)]
        to: String,
    },

    /// Open a grant addressed to an identity and import its group key
    Accept {
        #[arg(long)]
        identity: String,
        grant: String,
    },
}

/// Execute `command` against `storage`, writing results to `out`.
pub fn run<S, E, W>(command: Command, storage: S, entropy: &E, out: &mut W) -> Result<(), CliError>
where
    S: KeyValueStore,
    E: Entropy,
    W: Write,
{
    let identities = IdentityKeyStore::new(storage.clone());
    let groups = GroupKeyStore::new(storage);
    let direct = DirectMessageCipher::new(entropy);
    let group = GroupMessageCipher::new(entropy);

    match command {
        Command::Keygen { identity } => {
            let (pair, status) = identities.load_or_create(&identity, entropy)?;
            if status == IdentityStatus::Created {
                tracing::info!(identity = %identity, "generated key pair; publish the public key");
            }
            writeln!(out, "{}", pair.public_key_base64())?;
        },
        Command::PublicKey { identity } => {
            let pair = identities.load(&identity)?.ok_or(CliError::IdentityMissing { identity })?;
            writeln!(out, "{}", pair.public_key_base64())?;
        },
        Command::Encrypt { to, text } => {
            let envelope = direct.encrypt_to(&text, &to)?;
            writeln!(out, "{}", envelope.encode())?;
        },
        Command::Decrypt { identity, content } => {
            let pair = identities.load(&identity)?;
            let content = resolve_direct(&content, pair.as_ref(), &direct);
            tracing::debug!(identity = %identity, opened = content.was_encrypted(), "resolved");
            writeln!(out, "{content}")?;
        },
        Command::GroupEncrypt { group: group_id, text } => {
            let key = groups.get_or_create(&group_id, entropy)?;
            writeln!(out, "{}", group.encrypt(&text, &key).encode())?;
        },
        Command::GroupDecrypt { group: group_id, content } => {
            let key = groups.get(&group_id)?;
            let content = resolve_group(&content, key.as_ref(), &group);
            tracing::debug!(group_id = %group_id, opened = content.was_encrypted(), "resolved");
            writeln!(out, "{content}")?;
        },
        Command::Grant { group: group_id, member, to } => {
            let key = groups.get(&group_id)?.ok_or_else(|| CliError::GroupKeyMissing {
                group_id: group_id.clone(),
            })?;
            let member_key = PublicKey::from_base64(&to)?;
            let grant = seal_grant(&direct, &group_id, &member, &key, &member_key);
            writeln!(out, "{}", serde_json::to_string(&grant)?)?;
        },
        Command::Accept { identity, grant } => {
            let grant: GroupKeyGrant = serde_json::from_str(&grant)?;
            let pair = identities.load(&identity)?.ok_or(CliError::IdentityMissing { identity })?;
            let key = open_grant(&direct, &grant, &pair)?;
            groups.import(&grant.group_id, &key)?;
            writeln!(out, "imported key for group {}", grant.group_id)?;
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use chatxp_crypto::{DECRYPTION_FAILED, KEY_NOT_AVAILABLE, NO_CONTENT, SeededEntropy};
    use chatxp_keystore::{MemoryStore, RedbStore};

    use super::*;

    fn exec<S: KeyValueStore>(storage: &S, entropy: &SeededEntropy, command: Command) -> String {
        let mut out = Vec::new();
        run(command, storage.clone(), entropy, &mut out).unwrap();
        String::from_utf8(out).unwrap().trim_end().to_string()
    }

    fn keygen<S: KeyValueStore>(storage: &S, entropy: &SeededEntropy, identity: &str) -> String {
        exec(storage, entropy, Command::Keygen { identity: identity.to_string() })
    }

    #[test]
    fn keygen_is_stable() {
        let storage = MemoryStore::new();
        let entropy = SeededEntropy::new(1);

        let first = keygen(&storage, &entropy, "alice");
        let second = keygen(&storage, &entropy, "alice");
        let shown = exec(&storage, &entropy, Command::PublicKey { identity: "alice".to_string() });

        assert_eq!(first, second);
        assert_eq!(first, shown);
    }

    #[test]
    fn public_key_without_identity_fails() {
        let result = run(
            Command::PublicKey { identity: "nobody".to_string() },
            MemoryStore::new(),
            &SeededEntropy::new(1),
            &mut Vec::new(),
        );

        assert!(matches!(result, Err(CliError::IdentityMissing { .. })));
    }

    #[test]
    fn encrypt_then_decrypt() {
        let storage = MemoryStore::new();
        let entropy = SeededEntropy::new(2);
        let bob = keygen(&storage, &entropy, "bob");
        keygen(&storage, &entropy, "eve");

        let envelope =
            exec(&storage, &entropy, Command::Encrypt { to: bob, text: "hi bob".to_string() });

        let as_bob = exec(&storage, &entropy, Command::Decrypt {
            identity: "bob".to_string(),
            content: envelope.clone(),
        });
        let as_eve = exec(&storage, &entropy, Command::Decrypt {
            identity: "eve".to_string(),
            content: envelope.clone(),
        });
        let as_stranger = exec(&storage, &entropy, Command::Decrypt {
            identity: "stranger".to_string(),
            content: envelope,
        });

        assert_eq!(as_bob, "hi bob");
        assert_eq!(as_eve, DECRYPTION_FAILED);
        assert_eq!(as_stranger, KEY_NOT_AVAILABLE);
    }

    #[test]
    fn encrypt_rejects_bad_key() {
        let result = run(
            Command::Encrypt { to: "not-a-key".to_string(), text: "hi".to_string() },
            MemoryStore::new(),
            &SeededEntropy::new(3),
            &mut Vec::new(),
        );

        assert!(matches!(result, Err(CliError::Crypto(_))));
    }

    #[test]
    fn group_key_moves_between_devices_by_grant() {
        let laptop = MemoryStore::new();
        let phone = MemoryStore::new();
        let entropy = SeededEntropy::new(4);

        let sealed = exec(&laptop, &entropy, Command::GroupEncrypt {
            group: "g1".to_string(),
            text: "hi team".to_string(),
        });

        let before = exec(&phone, &entropy, Command::GroupDecrypt {
            group: "g1".to_string(),
            content: sealed.clone(),
        });
        assert_eq!(before, NO_CONTENT);

        let bob = keygen(&phone, &entropy, "bob");
        let grant = exec(&laptop, &entropy, Command::Grant {
            group: "g1".to_string(),
            member: "bob".to_string(),
            to: bob,
        });
        exec(&phone, &entropy, Command::Accept { identity: "bob".to_string(), grant });

        let after = exec(&phone, &entropy, Command::GroupDecrypt {
            group: "g1".to_string(),
            content: sealed,
        });
        assert_eq!(after, "hi team");
    }

    #[test]
    fn grant_without_group_key_fails() {
        let storage = MemoryStore::new();
        let entropy = SeededEntropy::new(5);
        let bob = keygen(&storage, &entropy, "bob");

        let result = run(
            Command::Grant { group: "g1".to_string(), member: "bob".to_string(), to: bob },
            storage,
            &entropy,
            &mut Vec::new(),
        );

        assert!(matches!(result, Err(CliError::GroupKeyMissing { .. })));
    }

    #[test]
    fn accept_rejects_malformed_grant() {
        let storage = MemoryStore::new();
        let entropy = SeededEntropy::new(6);
        keygen(&storage, &entropy, "bob");

        let result = run(
            Command::Accept { identity: "bob".to_string(), grant: "{}".to_string() },
            storage,
            &entropy,
            &mut Vec::new(),
        );

        assert!(matches!(result, Err(CliError::Grant(_))));
    }

    #[test]
    fn corrupt_identity_key_is_fatal() {
        let storage = MemoryStore::new();
        storage.set("privateKey_alice", "AAAA").unwrap();

        let result = run(
            Command::Keygen { identity: "alice".to_string() },
            storage.clone(),
            &SeededEntropy::new(8),
            &mut Vec::new(),
        );

        assert!(matches!(result, Err(CliError::KeyStore(ref err)) if err.is_fatal()));
        assert_eq!(storage.get("privateKey_alice").unwrap().as_deref(), Some("AAAA"));
    }

    #[test]
    fn keys_persist_in_redb_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.redb");
        let entropy = SeededEntropy::new(7);

        let created = keygen(&RedbStore::open(&path).unwrap(), &entropy, "alice");
        let reloaded = exec(&RedbStore::open(&path).unwrap(), &entropy, Command::PublicKey {
            identity: "alice".to_string(),
        });

        assert_eq!(created, reloaded);
    }
}
