//! Announce parameters and responses.

use std::time::Duration;

use rendezvous_net_types::{InfoHash, PeerIdentity};
use serde::{Deserialize, Serialize};

/// Peer candidates requested per announce.
pub const DEFAULT_NUMWANT: u32 = 50;

pub const DEFAULT_UPLOADED: u64 = 0;

pub const DEFAULT_DOWNLOADED: u64 = 0;

/// Per-announce options. Defaults: `numwant = 50, uploaded = 0, downloaded = 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnounceOptions {
    pub numwant: u32,
    pub uploaded: u64,
    pub downloaded: u64,
}

impl Default for AnnounceOptions {
    fn default() -> Self {
        Self {
            numwant: DEFAULT_NUMWANT,
            uploaded: DEFAULT_UPLOADED,
            downloaded: DEFAULT_DOWNLOADED,
        }
    }
}

impl AnnounceOptions {
    pub fn with_numwant(mut self, numwant: u32) -> Self {
        self.numwant = numwant;
        self
    }

    pub fn with_uploaded(mut self, uploaded: u64) -> Self {
        self.uploaded = uploaded;
        self
    }

    pub fn with_downloaded(mut self, downloaded: u64) -> Self {
        self.downloaded = downloaded;
        self
    }
}

/// What every tracker connection announces under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnnounceContext {
    pub info_hash: InfoHash,
    pub peer_id: PeerIdentity,
}

/// Tracker status carried by an `update` signal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnounceResponse {
    /// Re-announce interval requested by the tracker.
    pub interval: Option<Duration>,
    /// Seeders, in BitTorrent terms.
    pub complete: Option<u32>,
    /// Leechers, in BitTorrent terms.
    pub incomplete: Option<u32>,
}
