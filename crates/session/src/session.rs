//! The discovery session.
//!
//! Tracker and channel notifications arrive on the [`SessionInbox`] and are
//! applied here one at a time. Table and registry calls return what changed;
//! this module turns those results into [`SessionEvent`]s.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use parking_lot::Mutex;
use rendezvous_net_chunk::{ChunkReassembler, ChunkSplitter, Fragment};
use rendezvous_net_peers::{
    ChannelEvent, ChannelEventSender, CloseResult, OpenResult, PeerChannel, PeerSessionTable,
    PeerSnapshot, channel_events,
};
use rendezvous_net_trackers::{
    AnnounceContext, TrackerConnector, TrackerError, TrackerEvent, TrackerRegistry, TrackerStats,
    tracker_events,
};
use rendezvous_net_types::{InfoHash, MessageId, PeerIdentity};
use tokio::sync::{broadcast, oneshot, watch};
use tracing::{debug, info, trace, warn};

use crate::config::SessionConfig;
use crate::driver::SessionInbox;
use crate::error::SessionError;
use crate::events::{EventEmitter, SessionEvent};

type ReplyKey = (PeerIdentity, MessageId);

pub struct DiscoverySession<T: TrackerConnector> {
    config: SessionConfig,
    local_id: PeerIdentity,
    info_hash: InfoHash,
    trackers: TrackerRegistry<T>,
    peers: PeerSessionTable<T::Channel>,
    /// One reassembly buffer set per remote identity, dropped with the peer.
    reassemblers: Mutex<HashMap<PeerIdentity, ChunkReassembler>>,
    pending_replies: Mutex<HashMap<ReplyKey, oneshot::Sender<Bytes>>>,
    splitter: ChunkSplitter,
    channel_events: ChannelEventSender<T::Channel>,
    events: EventEmitter<T::Channel>,
    started: AtomicBool,
    destroyed: AtomicBool,
    shutdown: watch::Sender<bool>,
}

impl<T: TrackerConnector> DiscoverySession<T> {
    /// Build a session with a fresh random local identity. Nothing connects
    /// until [`start`](Self::start).
    pub fn new(config: SessionConfig, connector: T) -> (Self, SessionInbox<T::Channel>) {
        let local_id = PeerIdentity::random();
        let info_hash = InfoHash::from_identifier(&config.identifier);
        let (tracker_tx, tracker_rx) = tracker_events();
        let (channel_tx, channel_rx) = channel_events();

        let context = AnnounceContext {
            info_hash,
            peer_id: local_id,
        };
        let trackers = TrackerRegistry::new(connector, context, tracker_tx)
            .with_default_options(config.announce);
        let (shutdown, _) = watch::channel(false);

        debug!(%local_id, %info_hash, identifier = %config.identifier, "session created");

        let session = Self {
            local_id,
            info_hash,
            trackers,
            peers: PeerSessionTable::new(),
            reassemblers: Mutex::new(HashMap::new()),
            pending_replies: Mutex::new(HashMap::new()),
            splitter: ChunkSplitter::new(config.max_fragment_len),
            channel_events: channel_tx,
            events: EventEmitter::with_capacity(config.event_channel_capacity),
            started: AtomicBool::new(false),
            destroyed: AtomicBool::new(false),
            shutdown,
            config,
        };
        (session, SessionInbox::new(tracker_rx, channel_rx))
    }

    /// Re-derive the info hash. Only allowed before [`start`](Self::start).
    pub fn set_identifier(&mut self, identifier: impl Into<String>) -> Result<(), SessionError> {
        if self.started.load(Ordering::Acquire) {
            return Err(SessionError::AlreadyStarted);
        }
        self.config.identifier = identifier.into();
        self.info_hash = InfoHash::from_identifier(&self.config.identifier);
        self.trackers.set_context(AnnounceContext {
            info_hash: self.info_hash,
            peer_id: self.local_id,
        });
        debug!(info_hash = %self.info_hash, "identifier changed");
        Ok(())
    }

    /// Add and announce on every configured tracker.
    ///
    /// A tracker that cannot be reached is reported as a `TrackerWarning`
    /// and does not stop the others.
    pub async fn start(&self) -> Result<(), SessionError> {
        self.ensure_live()?;
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(SessionError::AlreadyStarted);
        }

        for url in &self.config.trackers {
            match self.trackers.add_tracker(url).await {
                Ok(()) => {}
                Err(TrackerError::TrackerAlreadyExists(_)) => {
                    warn!(%url, "tracker listed twice, skipping");
                }
                Err(e) => {
                    warn!(%url, error = %e, "failed to start tracker");
                    self.events
                        .tracker_warning(url.clone(), e.to_string(), self.trackers.stats());
                }
            }
        }

        info!(
            trackers = self.trackers.len(),
            info_hash = %self.info_hash,
            "session started"
        );
        Ok(())
    }

    pub async fn add_tracker(&self, url: &str) -> Result<(), SessionError> {
        self.ensure_live()?;
        Ok(self.trackers.add_tracker(url).await?)
    }

    /// Channels brokered by the tracker stay open.
    pub fn remove_tracker(&self, url: &str) -> Result<(), SessionError> {
        Ok(self.trackers.remove_tracker(url)?)
    }

    /// Re-announce on every tracker with the default options. Returns how many
    /// announces were dispatched.
    pub async fn request_more_peers(&self) -> usize {
        if self.is_destroyed() {
            return 0;
        }
        self.trackers.request_more_peers().await
    }

    /// Send `payload` to `peer` under a fresh message id. The returned
    /// receiver resolves with the peer's reply to that id; it errors if the
    /// peer goes away first.
    pub fn send(
        &self,
        peer: &PeerIdentity,
        payload: impl Into<Bytes>,
    ) -> Result<oneshot::Receiver<Bytes>, SessionError> {
        self.ensure_live()?;
        let channel = self
            .peers
            .channel(peer)
            .ok_or(SessionError::PeerNotFound(*peer))?;

        let id = MessageId::random();
        let (tx, rx) = oneshot::channel();
        let key = (*peer, id.clone());
        {
            let mut pending = self.pending_replies.lock();
            pending.retain(|_, waiter| !waiter.is_closed());
            pending.insert(key.clone(), tx);
        }

        if let Err(e) = self.transmit(&channel, &id, &payload.into()) {
            self.pending_replies.lock().remove(&key);
            return Err(e);
        }
        Ok(rx)
    }

    /// Answer message `id` from `peer`. No reply is awaited.
    pub fn respond(
        &self,
        peer: &PeerIdentity,
        id: MessageId,
        payload: impl Into<Bytes>,
    ) -> Result<(), SessionError> {
        self.ensure_live()?;
        let channel = self
            .peers
            .channel(peer)
            .ok_or(SessionError::PeerNotFound(*peer))?;
        self.transmit(&channel, &id, &payload.into())
    }

    fn transmit(
        &self,
        channel: &T::Channel,
        id: &MessageId,
        payload: &Bytes,
    ) -> Result<(), SessionError> {
        let fragments = self.splitter.split(id, payload);
        let count = fragments.len();
        for fragment in fragments {
            channel.send(fragment.encode()?)?;
        }
        trace!(
            peer = %channel.id(),
            channel = channel.channel_name(),
            %id,
            fragments = count,
            "message sent"
        );
        Ok(())
    }

    /// Apply one tracker notification.
    pub fn handle_tracker_event(&self, event: TrackerEvent<T::Channel>) {
        match event {
            TrackerEvent::Peer { tracker, channel } => {
                if self.is_destroyed() {
                    channel.destroy();
                    return;
                }
                if channel.id() == self.local_id {
                    trace!(%tracker, "tracker offered our own identity, ignoring");
                    channel.destroy();
                    return;
                }
                trace!(
                    %tracker,
                    peer = %channel.id(),
                    channel = channel.channel_name(),
                    "candidate channel from tracker"
                );
                channel.attach(self.channel_events.clone());
            }
            TrackerEvent::Update { tracker, response } => {
                if !self.trackers.contains(&tracker) {
                    trace!(%tracker, "update from unregistered tracker, ignoring");
                    return;
                }
                debug!(
                    %tracker,
                    complete = ?response.complete,
                    incomplete = ?response.incomplete,
                    "tracker update"
                );
                self.events.tracker_connected(tracker, self.trackers.stats());
            }
            TrackerEvent::Warning { tracker, error } => {
                if !self.trackers.contains(&tracker) {
                    trace!(%tracker, %error, "warning from unregistered tracker, ignoring");
                    return;
                }
                warn!(%tracker, %error, "tracker warning");
                self.events.tracker_warning(tracker, error, self.trackers.stats());
            }
        }
    }

    /// Apply one channel notification.
    pub fn handle_channel_event(&self, event: ChannelEvent<T::Channel>) {
        match event {
            ChannelEvent::Connect(channel) => {
                if self.is_destroyed() {
                    channel.destroy();
                    return;
                }
                match self.peers.on_channel_open(channel.clone()) {
                    OpenResult::NewPeer => self.events.peer_connected(channel),
                    OpenResult::Added | OpenResult::Replaced { .. } => {}
                }
            }
            ChannelEvent::Data { channel, data } => self.on_data(channel, &data),
            ChannelEvent::Error { channel, error } => {
                debug!(
                    peer = %channel.id(),
                    channel = channel.channel_name(),
                    %error,
                    "channel error"
                );
                channel.destroy();
                self.on_channel_gone(&channel);
            }
            ChannelEvent::Close(channel) => self.on_channel_gone(&channel),
        }
    }

    fn on_data(&self, channel: T::Channel, data: &[u8]) {
        let id = channel.id();
        let channel_name = channel.channel_name();
        if !self.peers.contains(&id) {
            trace!(peer = %id, channel = channel_name, "data from unknown peer, dropping");
            return;
        }
        let fragment = match Fragment::decode(data) {
            Ok(fragment) => fragment,
            Err(e) => {
                debug!(
                    peer = %id,
                    channel = channel_name,
                    error = %e,
                    "undecodable data, dropping"
                );
                return;
            }
        };

        let completed = self
            .reassemblers
            .lock()
            .entry(id)
            .or_default()
            .ingest_fragment(fragment);
        let Some((message_id, payload)) = completed else {
            return;
        };

        let waiter = self.pending_replies.lock().remove(&(id, message_id.clone()));
        match waiter {
            Some(tx) => {
                trace!(peer = %id, %message_id, "reply received");
                let _ = tx.send(payload);
            }
            None => self.events.message(channel, message_id, payload),
        }
    }

    /// Remove `channel` unless its name has since been taken by another link.
    fn on_channel_gone(&self, channel: &T::Channel) {
        let id = channel.id();
        match self.peers.on_channel_close(channel) {
            CloseResult::PeerClosed { channel } => {
                self.reassemblers.lock().remove(&id);
                self.pending_replies.lock().retain(|(peer, _), _| *peer != id);
                self.events.peer_closed(channel);
            }
            CloseResult::Removed { .. } | CloseResult::Stale | CloseResult::Unknown => {}
        }
    }

    /// Destroy every channel, then every tracker. Later calls do nothing.
    pub fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.shutdown.send_replace(true);

        let channels = self.peers.drain();
        for channel in &channels {
            channel.destroy();
        }
        let trackers = self.trackers.destroy_all();
        self.reassemblers.lock().clear();
        self.pending_replies.lock().clear();

        info!(channels = channels.len(), trackers, "session destroyed");
    }

    fn ensure_live(&self) -> Result<(), SessionError> {
        if self.is_destroyed() {
            Err(SessionError::Destroyed)
        } else {
            Ok(())
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Peers with at least one open channel, sorted by identity.
    pub fn peers(&self) -> Vec<PeerSnapshot> {
        self.peers.snapshot()
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    /// Any live channel to `peer`.
    pub fn peer(&self, peer: &PeerIdentity) -> Option<T::Channel> {
        self.peers.channel(peer)
    }

    pub fn tracker_stats(&self) -> TrackerStats {
        self.trackers.stats()
    }

    pub fn tracker_urls(&self) -> Vec<String> {
        self.trackers.urls()
    }

    /// Reassembly buffers still waiting for fragments from `peer`.
    pub fn pending_messages(&self, peer: &PeerIdentity) -> usize {
        self.reassemblers
            .lock()
            .get(peer)
            .map(ChunkReassembler::pending)
            .unwrap_or_default()
    }

    /// Sends still waiting for a reply whose receiver is alive or not yet pruned.
    pub fn pending_replies(&self) -> usize {
        self.pending_replies.lock().len()
    }

    pub fn local_peer_id(&self) -> PeerIdentity {
        self.local_id
    }

    pub fn info_hash(&self) -> InfoHash {
        self.info_hash
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent<T::Channel>> {
        self.events.subscribe()
    }

    /// Flips to `true` when the session is destroyed.
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }
}

impl<T: TrackerConnector> std::fmt::Debug for DiscoverySession<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscoverySession")
            .field("local_id", &self.local_id)
            .field("info_hash", &self.info_hash)
            .field("trackers", &self.trackers)
            .field("peers", &self.peers.len())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}
