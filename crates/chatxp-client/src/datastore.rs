//! Remote datastore interfaces.
//!
//! The messenger never talks to a backend directly. Messages, published
//! public keys, and group key grants go through these traits; the backend
//! sees only opaque strings and never holds a secret in the clear.
//!
//! [`MemoryDatastore`] implements all three for tests and local demos.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use chatxp_crypto::GroupKeyGrant;
use thiserror::Error;

/// Backend failure reported by a datastore implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct DatastoreError {
    /// Backend-specific description
    pub reason: String,
}

impl DatastoreError {
    /// Create an error with the given reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

/// Where a message is addressed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MessageTarget {
    /// One-to-one message to a recipient identity
    Direct(String),
    /// Message to every member of a group
    Group(String),
}

/// A message about to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    /// Author identity
    pub sender_id: String,
    /// Recipient or group
    pub target: MessageTarget,
    /// Envelope JSON, or plaintext for unencrypted sends
    pub content: String,
    /// Base64 nonce, empty for unencrypted sends
    pub nonce: String,
}

/// A message as returned by the datastore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    /// Datastore-assigned id, opaque to the messenger
    pub id: u64,
    /// Author identity
    pub sender_id: String,
    /// Recipient or group
    pub target: MessageTarget,
    /// Content exactly as stored
    pub content: String,
    /// Nonce exactly as stored
    pub nonce: String,
}

/// Message persistence.
pub trait MessageStore: Send + Sync {
    /// Store a message and return it with its assigned id.
    fn insert(&self, message: NewMessage) -> Result<StoredMessage, DatastoreError>;

    /// Direct messages between `a` and `b` in both directions, in arrival
    /// order.
    fn direct_conversation(&self, a: &str, b: &str) -> Result<Vec<StoredMessage>, DatastoreError>;

    /// Messages sent to `group_id`, in arrival order.
    fn group_messages(&self, group_id: &str) -> Result<Vec<StoredMessage>, DatastoreError>;
}

/// Published public keys.
///
/// Trust on first publish: nothing checks that a published key belongs to
/// a private key its owner actually holds.
pub trait IdentityDirectory: Send + Sync {
    /// Publish `public_key` (base64) for `identity`, replacing any previous
    /// key.
    fn publish_public_key(&self, identity: &str, public_key: &str) -> Result<(), DatastoreError>;

    /// Published base64 key for `identity`.
    fn public_key(&self, identity: &str) -> Result<Option<String>, DatastoreError>;
}

/// Sealed group key grants.
pub trait GrantStore: Send + Sync {
    /// Store a grant, replacing any previous grant for the same group and
    /// member.
    fn put_grant(&self, grant: GroupKeyGrant) -> Result<(), DatastoreError>;

    /// Grant sealed to `member_id` for `group_id`.
    fn grant(
        &self,
        group_id: &str,
        member_id: &str,
    ) -> Result<Option<GroupKeyGrant>, DatastoreError>;
}

#[derive(Default)]
struct Inner {
    messages: Vec<StoredMessage>,
    next_id: u64,
    public_keys: HashMap<String, String>,
    grants: HashMap<(String, String), GroupKeyGrant>,
}

/// In-memory datastore.
///
/// Clones share state, so several messengers can talk through one instance.
#[derive(Clone, Default)]
pub struct MemoryDatastore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryDatastore {
    /// Create an empty datastore.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored messages.
    pub fn message_count(&self) -> usize {
        self.with(|inner| inner.messages.len())
    }

    #[allow(clippy::expect_used)]
    fn with<T>(&self, f: impl FnOnce(&mut Inner) -> T) -> T {
        let mut inner = self.inner.lock().expect("Mutex poisoned");
        f(&mut inner)
    }
}

impl MessageStore for MemoryDatastore {
    fn insert(&self, message: NewMessage) -> Result<StoredMessage, DatastoreError> {
        Ok(self.with(|inner| {
            inner.next_id += 1;
            let stored = StoredMessage {
                id: inner.next_id,
                sender_id: message.sender_id,
                target: message.target,
                content: message.content,
                nonce: message.nonce,
            };
            inner.messages.push(stored.clone());
            stored
        }))
    }

    fn direct_conversation(&self, a: &str, b: &str) -> Result<Vec<StoredMessage>, DatastoreError> {
        Ok(self.with(|inner| {
            inner
                .messages
                .iter()
                .filter(|message| match &message.target {
                    MessageTarget::Direct(recipient) => {
                        (message.sender_id == a && recipient == b)
                            || (message.sender_id == b && recipient == a)
                    },
                    MessageTarget::Group(_) => false,
                })
                .cloned()
                .collect()
        }))
    }

    fn group_messages(&self, group_id: &str) -> Result<Vec<StoredMessage>, DatastoreError> {
        Ok(self.with(|inner| {
            inner
                .messages
                .iter()
                .filter(|message| {
                    matches!(&message.target, MessageTarget::Group(g) if g == group_id)
                })
                .cloned()
                .collect()
        }))
    }
}

impl IdentityDirectory for MemoryDatastore {
    fn publish_public_key(&self, identity: &str, public_key: &str) -> Result<(), DatastoreError> {
        self.with(|inner| inner.public_keys.insert(identity.to_owned(), public_key.to_owned()));
        Ok(())
    }

    fn public_key(&self, identity: &str) -> Result<Option<String>, DatastoreError> {
        Ok(self.with(|inner| inner.public_keys.get(identity).cloned()))
    }
}

impl GrantStore for MemoryDatastore {
    fn put_grant(&self, grant: GroupKeyGrant) -> Result<(), DatastoreError> {
        self.with(|inner| {
            inner.grants.insert((grant.group_id.clone(), grant.member_id.clone()), grant);
        });
        Ok(())
    }

    fn grant(
        &self,
        group_id: &str,
        member_id: &str,
    ) -> Result<Option<GroupKeyGrant>, DatastoreError> {
        Ok(self.with(|inner| {
            inner.grants.get(&(group_id.to_owned(), member_id.to_owned())).cloned()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn direct(sender: &str, recipient: &str, content: &str) -> NewMessage {
        NewMessage {
            sender_id: sender.to_string(),
            target: MessageTarget::Direct(recipient.to_string()),
            content: content.to_string(),
            nonce: String::new(),
        }
    }

    #[test]
    fn insert_assigns_increasing_ids() {
        let store = MemoryDatastore::new();

        let first = store.insert(direct("alice", "bob", "one")).unwrap();
        let second = store.insert(direct("bob", "alice", "two")).unwrap();

        assert!(second.id > first.id);
        assert_eq!(store.message_count(), 2);
    }

    #[test]
    fn direct_conversation_includes_both_directions_in_order() {
        let store = MemoryDatastore::new();
        store.insert(direct("alice", "bob", "one")).unwrap();
        store.insert(direct("alice", "carol", "elsewhere")).unwrap();
        store.insert(direct("bob", "alice", "two")).unwrap();

        let conversation = store.direct_conversation("bob", "alice").unwrap();
        let contents: Vec<_> = conversation.iter().map(|m| m.content.as_str()).collect();

        assert_eq!(contents, vec!["one", "two"]);
    }

    #[test]
    fn group_messages_are_scoped_to_group() {
        let store = MemoryDatastore::new();
        for (group, content) in [("g1", "a"), ("g2", "b"), ("g1", "c")] {
            store
                .insert(NewMessage {
                    sender_id: "alice".to_string(),
                    target: MessageTarget::Group(group.to_string()),
                    content: content.to_string(),
                    nonce: String::new(),
                })
                .unwrap();
        }

        let contents: Vec<_> =
            store.group_messages("g1").unwrap().into_iter().map(|m| m.content).collect();
        assert_eq!(contents, vec!["a", "c"]);
    }

    #[test]
    fn publish_replaces_key() {
        let store = MemoryDatastore::new();
        assert!(store.public_key("alice").unwrap().is_none());

        store.publish_public_key("alice", "first").unwrap();
        store.publish_public_key("alice", "second").unwrap();

        assert_eq!(store.public_key("alice").unwrap().as_deref(), Some("second"));
    }

    #[test]
    fn grants_are_keyed_by_group_and_member() {
        let store = MemoryDatastore::new();
        let grant = GroupKeyGrant {
            group_id: "g1".to_string(),
            member_id: "bob".to_string(),
            encrypted_group_key: "ct".to_string(),
            key_nonce: "n".to_string(),
            key_ephemeral_public: "epk".to_string(),
        };
        store.put_grant(grant.clone()).unwrap();

        assert_eq!(store.grant("g1", "bob").unwrap(), Some(grant));
        assert!(store.grant("g1", "carol").unwrap().is_none());
        assert!(store.grant("g2", "bob").unwrap().is_none());
    }

    #[test]
    fn clones_share_state() {
        let store = MemoryDatastore::new();
        let clone = store.clone();

        store.insert(direct("alice", "bob", "hi")).unwrap();
        assert_eq!(clone.message_count(), 1);
    }
}
