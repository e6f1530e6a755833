//! Inbox consumer for a [`DiscoverySession`].

use std::sync::Arc;

use rendezvous_net_peers::{ChannelEventReceiver, PeerChannel};
use rendezvous_net_trackers::{TrackerConnector, TrackerEventReceiver};
use tracing::{debug, trace};

use crate::session::DiscoverySession;

/// Receiving side of everything that feeds a session: tracker signals and
/// channel notifications.
#[derive(Debug)]
pub struct SessionInbox<C: PeerChannel> {
    trackers: TrackerEventReceiver<C>,
    channels: ChannelEventReceiver<C>,
}

impl<C: PeerChannel> SessionInbox<C> {
    pub(crate) fn new(
        trackers: TrackerEventReceiver<C>,
        channels: ChannelEventReceiver<C>,
    ) -> Self {
        Self { trackers, channels }
    }

    /// Apply every queued input without waiting. Inputs queued while draining
    /// are applied too. Returns how many were handled.
    pub fn drain<T>(&mut self, session: &DiscoverySession<T>) -> usize
    where
        T: TrackerConnector<Channel = C>,
    {
        let mut handled = 0;
        loop {
            let before = handled;
            while let Ok(event) = self.trackers.try_recv() {
                session.handle_tracker_event(event);
                handled += 1;
            }
            while let Ok(event) = self.channels.try_recv() {
                session.handle_channel_event(event);
                handled += 1;
            }
            if handled == before {
                break;
            }
        }
        if handled > 0 {
            trace!(handled, "inbox drained");
        }
        handled
    }
}

/// Consume the inbox until the session is destroyed.
///
/// Inputs are handled one at a time, tracker signals ahead of channel
/// notifications when both are ready.
pub async fn run_session<T>(
    session: Arc<DiscoverySession<T>>,
    mut inbox: SessionInbox<T::Channel>,
) where
    T: TrackerConnector,
{
    debug!(local_id = %session.local_peer_id(), "session loop started");

    let mut shutdown = session.shutdown_signal();
    let mut handled = 0u64;

    loop {
        if *shutdown.borrow_and_update() {
            break;
        }

        tokio::select! {
            biased;

            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }

            Some(event) = inbox.trackers.recv() => {
                session.handle_tracker_event(event);
                handled += 1;
            }

            Some(event) = inbox.channels.recv() => {
                session.handle_channel_event(event);
                handled += 1;
            }

            else => break,
        }
    }

    debug!(handled, "session loop stopped");
}
