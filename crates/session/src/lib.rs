//! Discovery session over BitTorrent trackers.
//!
//! [`DiscoverySession`] is the composition root: it owns the tracker registry,
//! the peer session table and per-peer fragment reassembly, and republishes
//! what happens as [`SessionEvent`]s. All inputs flow through one
//! [`SessionInbox`] and are handled one at a time, either by [`run_session`]
//! or by [`SessionInbox::drain`].

pub mod config;
pub mod driver;
pub mod error;
pub mod events;
pub mod logging;
pub mod session;

pub use config::SessionConfig;
pub use driver::{SessionInbox, run_session};
pub use error::SessionError;
pub use events::{EventEmitter, SessionEvent};
pub use logging::{LogArgs, init_logging};
pub use session::DiscoverySession;

pub use rendezvous_net_chunk::{ChunkReassembler, ChunkSplitter, Fragment};
pub use rendezvous_net_peers::{ChannelError, ChannelEvent, PeerChannel, PeerSnapshot};
pub use rendezvous_net_trackers::{
    AnnounceOptions, AnnounceResponse, TrackerClient, TrackerConnector, TrackerError,
    TrackerEvent, TrackerStats,
};
pub use rendezvous_net_types::{InfoHash, MessageId, PeerIdentity};
