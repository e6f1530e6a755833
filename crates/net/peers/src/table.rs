//! Identity → channel-set table.
//!
//! A peer is present exactly while it has at least one open channel. The
//! first channel for an identity reports [`OpenResult::NewPeer`]; removing the
//! last one reports [`CloseResult::PeerClosed`]. Callers publish the
//! corresponding `peerconnect` / `peerclose` events from these results.

use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;
use rendezvous_net_types::{ChannelName, PeerIdentity};
use tracing::{debug, trace};

use crate::traits::PeerChannel;

/// Result of recording an opened channel.
#[derive(Debug, Clone)]
pub enum OpenResult<C> {
    /// First channel for this identity.
    NewPeer,
    /// Another channel for an identity that was already present.
    Added,
    /// A channel with the same name was already stored; the new one wins.
    Replaced { previous: C },
}

impl<C> OpenResult<C> {
    pub fn is_new_peer(&self) -> bool {
        matches!(self, Self::NewPeer)
    }
}

/// Result of removing a channel after an error or close.
#[derive(Debug, Clone)]
pub enum CloseResult<C> {
    /// Other channels to the peer remain.
    Removed { channel: C, remaining: usize },
    /// That was the peer's last channel; the peer entry is gone.
    PeerClosed { channel: C },
    /// The name is now held by a different link; nothing was removed.
    Stale,
    /// No such (identity, channel name) pair.
    Unknown,
}

impl<C> CloseResult<C> {
    pub fn is_peer_closed(&self) -> bool {
        matches!(self, Self::PeerClosed { .. })
    }
}

/// Read-only view of one peer entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerSnapshot {
    pub id: PeerIdentity,
    pub channels: Vec<ChannelName>,
}

type ChannelMap<C> = BTreeMap<ChannelName, C>;

#[derive(Debug)]
pub struct PeerSessionTable<C: PeerChannel> {
    peers: RwLock<HashMap<PeerIdentity, ChannelMap<C>>>,
}

impl<C: PeerChannel> Default for PeerSessionTable<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: PeerChannel> PeerSessionTable<C> {
    pub fn new() -> Self {
        Self {
            peers: RwLock::new(HashMap::new()),
        }
    }

    /// Store an opened channel under (identity, name). Latest write wins.
    pub fn on_channel_open(&self, channel: C) -> OpenResult<C> {
        let id = channel.id();
        let name = channel.channel_name().to_owned();
        let mut peers = self.peers.write();

        let result = match peers.get_mut(&id) {
            None => {
                let mut channels = ChannelMap::new();
                channels.insert(name.clone(), channel);
                peers.insert(id, channels);
                OpenResult::NewPeer
            }
            Some(channels) => match channels.insert(name.clone(), channel) {
                Some(previous) => OpenResult::Replaced { previous },
                None => OpenResult::Added,
            },
        };

        match &result {
            OpenResult::NewPeer => debug!(%id, channel = %name, "new peer"),
            OpenResult::Added => debug!(%id, channel = %name, "additional channel to known peer"),
            OpenResult::Replaced { .. } => trace!(%id, channel = %name, "channel replaced"),
        }
        result
    }

    /// Remove `channel` if it is still the link stored under its name. Drops
    /// the peer entry with its last channel.
    pub fn on_channel_close(&self, channel: &C) -> CloseResult<C> {
        let id = channel.id();
        let name = channel.channel_name();
        let mut peers = self.peers.write();

        let Some(channels) = peers.get_mut(&id) else {
            trace!(%id, channel = name, "close for unknown peer");
            return CloseResult::Unknown;
        };
        match channels.get(name) {
            None => {
                trace!(%id, channel = name, "close for unknown channel");
                return CloseResult::Unknown;
            }
            Some(current) if !current.same_link(channel) => {
                trace!(%id, channel = name, "close for replaced channel");
                return CloseResult::Stale;
            }
            Some(_) => {}
        }
        let Some(removed) = channels.remove(name) else {
            return CloseResult::Unknown;
        };

        if channels.is_empty() {
            peers.remove(&id);
            debug!(%id, channel = name, "last channel closed, peer removed");
            CloseResult::PeerClosed { channel: removed }
        } else {
            let remaining = channels.len();
            debug!(%id, channel = name, remaining, "channel closed");
            CloseResult::Removed {
                channel: removed,
                remaining,
            }
        }
    }

    /// Whether `channel` is the link currently stored under its name.
    pub fn is_current(&self, channel: &C) -> bool {
        self.peers
            .read()
            .get(&channel.id())
            .and_then(|channels| channels.get(channel.channel_name()))
            .is_some_and(|current| current.same_link(channel))
    }

    /// A live channel to `id`, preferring the lowest channel name.
    pub fn channel(&self, id: &PeerIdentity) -> Option<C> {
        self.peers
            .read()
            .get(id)
            .and_then(|channels| channels.values().next().cloned())
    }

    pub fn channel_by_name(&self, id: &PeerIdentity, name: &str) -> Option<C> {
        self.peers
            .read()
            .get(id)
            .and_then(|channels| channels.get(name).cloned())
    }

    pub fn channels(&self, id: &PeerIdentity) -> Vec<C> {
        self.peers
            .read()
            .get(id)
            .map(|channels| channels.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn contains(&self, id: &PeerIdentity) -> bool {
        self.peers.read().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.peers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn channel_count(&self) -> usize {
        self.peers.read().values().map(BTreeMap::len).sum()
    }

    pub fn peer_ids(&self) -> Vec<PeerIdentity> {
        self.peers.read().keys().copied().collect()
    }

    /// Sorted by identity.
    pub fn snapshot(&self) -> Vec<PeerSnapshot> {
        let mut snapshot: Vec<PeerSnapshot> = self
            .peers
            .read()
            .iter()
            .map(|(id, channels)| PeerSnapshot {
                id: *id,
                channels: channels.keys().cloned().collect(),
            })
            .collect();
        snapshot.sort_by(|a, b| a.id.cmp(&b.id));
        snapshot
    }

    /// Empty the table, handing back every channel it held.
    pub fn drain(&self) -> Vec<C> {
        self.peers
            .write()
            .drain()
            .flat_map(|(_, channels)| channels.into_values())
            .collect()
    }
}
