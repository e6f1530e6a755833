//! Transport notifications for individual channels.

use bytes::Bytes;
use rendezvous_net_types::PeerIdentity;
use tokio::sync::mpsc;

use crate::traits::{ChannelError, PeerChannel};

/// Notification about one channel, delivered in causal order per channel.
///
/// Every variant carries the handle that raised it, so a link that has since
/// been replaced under the same name can still be told apart.
#[derive(Debug, Clone)]
pub enum ChannelEvent<C: PeerChannel> {
    /// Negotiation finished; the channel can carry data.
    Connect(C),
    Data { channel: C, data: Bytes },
    Error { channel: C, error: ChannelError },
    Close(C),
}

impl<C: PeerChannel> ChannelEvent<C> {
    pub fn data(channel: &C, data: Bytes) -> Self {
        Self::Data {
            channel: channel.clone(),
            data,
        }
    }

    pub fn error(channel: &C, error: ChannelError) -> Self {
        Self::Error {
            channel: channel.clone(),
            error,
        }
    }

    pub fn close(channel: &C) -> Self {
        Self::Close(channel.clone())
    }

    pub fn channel(&self) -> &C {
        match self {
            Self::Connect(channel)
            | Self::Data { channel, .. }
            | Self::Error { channel, .. }
            | Self::Close(channel) => channel,
        }
    }

    pub fn peer_id(&self) -> PeerIdentity {
        self.channel().id()
    }

    pub fn is_teardown(&self) -> bool {
        matches!(self, Self::Error { .. } | Self::Close(_))
    }
}

/// Sender half handed to transports. Unbounded so transport callbacks never block.
pub type ChannelEventSender<C> = mpsc::UnboundedSender<ChannelEvent<C>>;

pub type ChannelEventReceiver<C> = mpsc::UnboundedReceiver<ChannelEvent<C>>;

pub fn channel_events<C: PeerChannel>() -> (ChannelEventSender<C>, ChannelEventReceiver<C>) {
    mpsc::unbounded_channel()
}
