//! Signals emitted by tracker clients.

use rendezvous_net_peers::PeerChannel;
use tokio::sync::mpsc;

use crate::announce::AnnounceResponse;

#[derive(Debug, Clone)]
pub enum TrackerEvent<C: PeerChannel> {
    /// The tracker brokered a candidate channel. It is not connected yet.
    Peer { tracker: String, channel: C },
    /// Announce response / status update.
    Update {
        tracker: String,
        response: AnnounceResponse,
    },
    /// Non-fatal tracker problem (socket error, failure reason, ...).
    Warning { tracker: String, error: String },
}

impl<C: PeerChannel> TrackerEvent<C> {
    pub fn tracker(&self) -> &str {
        match self {
            Self::Peer { tracker, .. }
            | Self::Update { tracker, .. }
            | Self::Warning { tracker, .. } => tracker,
        }
    }
}

pub type TrackerEventSender<C> = mpsc::UnboundedSender<TrackerEvent<C>>;

pub type TrackerEventReceiver<C> = mpsc::UnboundedReceiver<TrackerEvent<C>>;

pub fn tracker_events<C: PeerChannel>() -> (TrackerEventSender<C>, TrackerEventReceiver<C>) {
    mpsc::unbounded_channel()
}
