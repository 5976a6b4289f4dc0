//! Client
//!
//! End-to-end encrypted messaging for one identity on one device. Direct
//! messages are sealed to the recipient's published key; group messages are
//! sealed with a shared group key that members hand to each other as grants
//! sealed to each member's public key.
//!
//! # Architecture
//!
//! The [`Messenger`] is synchronous and owns no I/O of its own. It is handed
//! a [`KeyValueStore`] for device-local keys and a datastore implementing
//! [`MessageStore`], [`IdentityDirectory`], and [`GrantStore`] for
//! everything that leaves the device. Only envelopes, public keys, and
//! sealed grants are ever given to the datastore.
//!
//! # Components
//!
//! - [`Messenger`]: send and read direct and group messages
//! - [`MemoryDatastore`]: in-memory datastore for tests and demos
//! - [`ReceivedMessage`]: a stored row resolved for display

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod datastore;
mod error;
mod messenger;

pub use chatxp_crypto::{Entropy, MessageContent, SystemEntropy};
pub use chatxp_keystore::KeyValueStore;
pub use datastore::{
    DatastoreError, GrantStore, IdentityDirectory, MemoryDatastore, MessageStore, MessageTarget,
    NewMessage, StoredMessage,
};
pub use error::ClientError;
pub use messenger::{Encryption, Messenger, ReceivedMessage};
