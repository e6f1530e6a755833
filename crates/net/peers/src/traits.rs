//! Capabilities required from the peer transport.

use std::fmt::Debug;

use bytes::Bytes;
use rendezvous_net_types::PeerIdentity;
use thiserror::Error;

use crate::events::ChannelEventSender;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    #[error("channel closed")]
    Closed,
    #[error("send failed: {0}")]
    Send(String),
    #[error("transport error: {0}")]
    Transport(String),
}

/// One negotiated data link to a remote peer.
///
/// Handles are cheap to clone and all clones refer to the same link. The
/// transport reports `connect`, `data`, `error` and `close` for the link on the
/// sender handed to [`PeerChannel::attach`], in causal order.
pub trait PeerChannel: Clone + Debug + Send + Sync + 'static {
    /// Identity of the remote peer.
    fn id(&self) -> PeerIdentity;

    /// Distinguishes this link from other links to the same identity.
    fn channel_name(&self) -> &str;

    fn send(&self, data: Bytes) -> Result<(), ChannelError>;

    /// Whether both handles refer to the same underlying link.
    fn same_link(&self, other: &Self) -> bool;

    /// Register the sink for this link's notifications.
    fn attach(&self, events: ChannelEventSender<Self>);

    /// Tear down the link. Must be safe to call more than once.
    fn destroy(&self);
}
