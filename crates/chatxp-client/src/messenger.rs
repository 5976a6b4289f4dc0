//! Messenger: one local identity sending and reading through a datastore.
//!
//! Ties the crypto core to its collaborators. Keys come from device-local
//! storage, envelopes and grants go to the datastore, and reads resolve
//! every stored row into a [`MessageContent`] so one bad message never
//! breaks a conversation.

use std::sync::Arc;

use chatxp_crypto::{
    DirectMessageCipher, Entropy, GroupKey, GroupKeyGrant, GroupMessageCipher, IdentityKeyPair,
    MessageContent, PublicKey, open_grant, resolve_direct, resolve_group, seal_grant,
};
use chatxp_keystore::{GroupKeyStore, IdentityKeyStore, IdentityStatus, KeyValueStore};

use crate::{
    datastore::{
        GrantStore, IdentityDirectory, MessageStore, MessageTarget, NewMessage, StoredMessage,
    },
    error::ClientError,
};

/// How a direct message is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encryption {
    /// Sealed to the recipient's published key
    #[default]
    Sealed,
    /// Stored as plaintext with an empty nonce
    Plain,
}

/// A stored message resolved for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMessage {
    /// Datastore-assigned id
    pub id: u64,
    /// Author identity
    pub sender_id: String,
    /// Resolved content
    pub content: MessageContent,
}

impl ReceivedMessage {
    fn resolved(message: StoredMessage, content: MessageContent) -> Self {
        Self { id: message.id, sender_id: message.sender_id, content }
    }
}

/// Messaging for one identity on one device.
///
/// # Invariants
///
/// - The identity key pair is loaded or created before any other operation
/// - A newly created public key is published before `open` returns
/// - Direct sends use a fresh ephemeral key and nonce per message
pub struct Messenger<S: KeyValueStore, D, E: Entropy> {
    identity: String,
    key_pair: IdentityKeyPair,
    group_keys: GroupKeyStore<S>,
    datastore: D,
    entropy: Arc<E>,
    direct: DirectMessageCipher<Arc<E>>,
    group: GroupMessageCipher<Arc<E>>,
}

impl<S, D, E> Messenger<S, D, E>
where
    S: KeyValueStore,
    D: MessageStore + IdentityDirectory + GrantStore,
    E: Entropy,
{
    /// Sign `identity` in on this device.
    ///
    /// Loads the identity key pair from `storage`, or generates one and
    /// publishes its public key to the directory.
    pub fn open(
        identity: impl Into<String>,
        storage: S,
        datastore: D,
        entropy: E,
    ) -> Result<Self, ClientError> {
        let identity = identity.into();
        let entropy = Arc::new(entropy);

        let identities = IdentityKeyStore::new(storage.clone());
        let (key_pair, status) = identities.load_or_create(&identity, &entropy)?;

        if status == IdentityStatus::Created {
            datastore.publish_public_key(&identity, &key_pair.public_key_base64())?;
            tracing::info!(identity = %identity, "published public key");
        } else {
            tracing::debug!(identity = %identity, "loaded identity key");
        }

        Ok(Self {
            identity,
            key_pair,
            group_keys: GroupKeyStore::new(storage),
            datastore,
            direct: DirectMessageCipher::new(Arc::clone(&entropy)),
            group: GroupMessageCipher::new(Arc::clone(&entropy)),
            entropy,
        })
    }

    /// Local public key.
    pub fn public_key(&self) -> PublicKey {
        self.key_pair.public_key()
    }

    /// Send `text` to `recipient`.
    ///
    /// # Errors
    ///
    /// - `RecipientKeyMissing` if a sealed send targets an identity with no
    ///   published key
    /// - `Crypto` if the published key is malformed
    pub fn send_direct(
        &self,
        recipient: &str,
        text: &str,
        encryption: Encryption,
    ) -> Result<StoredMessage, ClientError> {
        let (content, nonce) = match encryption {
            Encryption::Sealed => {
                let recipient_key = self.datastore.public_key(recipient)?.ok_or_else(|| {
                    ClientError::RecipientKeyMissing { recipient: recipient.to_owned() }
                })?;
                let envelope = self.direct.encrypt_to(text, &recipient_key)?;
                (envelope.encode(), envelope.nonce_base64())
            },
            Encryption::Plain => {
                tracing::debug!(recipient, "sending unencrypted direct message");
                (text.to_owned(), String::new())
            },
        };

        let stored = self.datastore.insert(NewMessage {
            sender_id: self.identity.clone(),
            target: MessageTarget::Direct(recipient.to_owned()),
            content,
            nonce,
        })?;
        tracing::debug!(recipient, id = stored.id, "sent direct message");

        Ok(stored)
    }

    /// Conversation with `peer`, in arrival order.
    ///
    /// Sealed messages this identity sent resolve to
    /// [`MessageContent::AuthFailed`]: they were sealed to the peer's key
    /// and the sender keeps no copy.
    pub fn read_direct(&self, peer: &str) -> Result<Vec<ReceivedMessage>, ClientError> {
        let rows = self.datastore.direct_conversation(&self.identity, peer)?;
        tracing::debug!(peer, count = rows.len(), "reading direct conversation");

        Ok(rows
            .into_iter()
            .map(|row| {
                let content = resolve_direct(&row.content, Some(&self.key_pair), &self.direct);
                ReceivedMessage::resolved(row, content)
            })
            .collect())
    }

    /// Send `text` to `group_id`.
    ///
    /// Uses the cached group key, then this member's grant, and only
    /// generates a new key when neither exists.
    pub fn send_group(&self, group_id: &str, text: &str) -> Result<StoredMessage, ClientError> {
        let key = match self.group_keys.get(group_id)? {
            Some(key) => key,
            None => match self.accept_group_key(group_id)? {
                Some(key) => key,
                None => self.group_keys.get_or_create(group_id, &self.entropy)?,
            },
        };
        let envelope = self.group.encrypt(text, &key);

        let stored = self.datastore.insert(NewMessage {
            sender_id: self.identity.clone(),
            target: MessageTarget::Group(group_id.to_owned()),
            content: envelope.encode(),
            nonce: envelope.nonce_base64(),
        })?;
        tracing::debug!(group_id, id = stored.id, "sent group message");

        Ok(stored)
    }

    /// Messages in `group_id`, in arrival order.
    ///
    /// Uses the cached group key, or this member's grant if no key is
    /// cached yet.
    pub fn read_group(&self, group_id: &str) -> Result<Vec<ReceivedMessage>, ClientError> {
        let key = match self.group_keys.get(group_id)? {
            Some(key) => Some(key),
            None => self.accept_group_key(group_id)?,
        };
        if key.is_none() {
            tracing::warn!(group_id, "no group key available");
        }

        let rows = self.datastore.group_messages(group_id)?;
        tracing::debug!(group_id, count = rows.len(), "reading group messages");

        Ok(rows
            .into_iter()
            .map(|row| {
                let content = resolve_group(&row.content, key.as_ref(), &self.group);
                ReceivedMessage::resolved(row, content)
            })
            .collect())
    }

    /// Seal the local key for `group_id` to `member` and store the grant.
    ///
    /// # Errors
    ///
    /// - `GroupKeyMissing` if this device has no key for the group
    /// - `RecipientKeyMissing` if `member` never published a key
    /// - `Crypto` if the published key is malformed
    pub fn share_group_key(
        &self,
        group_id: &str,
        member: &str,
    ) -> Result<GroupKeyGrant, ClientError> {
        let key = self
            .group_keys
            .get(group_id)?
            .ok_or_else(|| ClientError::GroupKeyMissing { group_id: group_id.to_owned() })?;

        let member_key = self
            .datastore
            .public_key(member)?
            .ok_or_else(|| ClientError::RecipientKeyMissing { recipient: member.to_owned() })?;
        let member_key = PublicKey::from_base64(&member_key)?;

        let grant = seal_grant(&self.direct, group_id, member, &key, &member_key);
        self.datastore.put_grant(grant.clone())?;
        tracing::info!(group_id, member, "shared group key");

        Ok(grant)
    }

    /// Install the group key from this member's grant, if one exists.
    ///
    /// A grant that does not open (sealed to an older key on another
    /// device, or altered) is logged and treated as absent. An opened key
    /// is returned even if caching it fails, so reads still decrypt.
    pub fn accept_group_key(&self, group_id: &str) -> Result<Option<GroupKey>, ClientError> {
        let Some(grant) = self.datastore.grant(group_id, &self.identity)? else {
            return Ok(None);
        };

        let key = match open_grant(&self.direct, &grant, &self.key_pair) {
            Ok(key) => key,
            Err(err) if err.is_decryption_failure() => {
                tracing::warn!(group_id, error = %err, "group key grant did not open");
                return Ok(None);
            },
            Err(err) => {
                tracing::warn!(group_id, error = %err, "group key grant carried an invalid key");
                return Ok(None);
            },
        };

        if let Err(err) = self.group_keys.import(group_id, &key) {
            tracing::warn!(group_id, error = %err, "failed to cache group key from grant");
        }

        Ok(Some(key))
    }
}
