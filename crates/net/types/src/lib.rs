//! Identifier types shared by the tracker, peer and chunk layers.

mod identity;
mod message;

pub use identity::{IDENTITY_LEN, InfoHash, InvalidIdentity, PeerIdentity};
pub use message::MessageId;

/// Name distinguishing redundant links to the same peer identity.
pub type ChannelName = String;
