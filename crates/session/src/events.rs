//! Session events and non-blocking broadcast emitter.

use bytes::Bytes;
use rendezvous_net_peers::PeerChannel;
use rendezvous_net_trackers::TrackerStats;
use rendezvous_net_types::{MessageId, PeerIdentity};
use tokio::sync::broadcast;
use tracing::trace;

/// Public event surface of a discovery session.
#[derive(Debug, Clone)]
pub enum SessionEvent<C: PeerChannel> {
    /// First channel to a new peer identity opened.
    PeerConnect { peer: C },
    /// Last channel to a peer identity went away.
    PeerClose { peer: C },
    /// A tracker answered an announce.
    TrackerConnect { tracker: String, stats: TrackerStats },
    TrackerWarning {
        tracker: String,
        error: String,
        stats: TrackerStats,
    },
    /// A complete inbound message that is not a reply to one of our sends.
    Message {
        peer: C,
        id: MessageId,
        payload: Bytes,
    },
}

impl<C: PeerChannel> SessionEvent<C> {
    /// Identity of the peer this event is about, if any.
    pub fn peer_id(&self) -> Option<PeerIdentity> {
        match self {
            Self::PeerConnect { peer } | Self::PeerClose { peer } | Self::Message { peer, .. } => {
                Some(peer.id())
            }
            Self::TrackerConnect { .. } | Self::TrackerWarning { .. } => None,
        }
    }

    pub fn is_peer_event(&self) -> bool {
        matches!(self, Self::PeerConnect { .. } | Self::PeerClose { .. })
    }

    pub fn is_tracker_event(&self) -> bool {
        matches!(
            self,
            Self::TrackerConnect { .. } | Self::TrackerWarning { .. }
        )
    }
}

pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

/// Fans [`SessionEvent`]s out to every subscriber.
///
/// Publishing never waits on subscribers. One that falls more than the
/// channel capacity behind sees `RecvError::Lagged` and skips ahead; the
/// others are unaffected.
pub struct EventEmitter<C: PeerChannel> {
    tx: broadcast::Sender<SessionEvent<C>>,
}

impl<C: PeerChannel> EventEmitter<C> {
    /// Zero is raised to one.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Returns how many subscribers the event reached.
    pub fn publish(&self, event: SessionEvent<C>) -> usize {
        match self.tx.send(event) {
            Ok(reached) => reached,
            Err(broadcast::error::SendError(event)) => {
                trace!(?event, "no subscribers, event dropped");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent<C>> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub(crate) fn peer_connected(&self, peer: C) {
        self.publish(SessionEvent::PeerConnect { peer });
    }

    pub(crate) fn peer_closed(&self, peer: C) {
        self.publish(SessionEvent::PeerClose { peer });
    }

    pub(crate) fn tracker_connected(&self, tracker: String, stats: TrackerStats) {
        self.publish(SessionEvent::TrackerConnect { tracker, stats });
    }

    pub(crate) fn tracker_warning(&self, tracker: String, error: String, stats: TrackerStats) {
        self.publish(SessionEvent::TrackerWarning {
            tracker,
            error,
            stats,
        });
    }

    pub(crate) fn message(&self, peer: C, id: MessageId, payload: Bytes) {
        self.publish(SessionEvent::Message { peer, id, payload });
    }
}

impl<C: PeerChannel> std::fmt::Debug for EventEmitter<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
