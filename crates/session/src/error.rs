use rendezvous_net_chunk::FragmentError;
use rendezvous_net_peers::ChannelError;
use rendezvous_net_trackers::TrackerError;
use rendezvous_net_types::PeerIdentity;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Tracker(#[from] TrackerError),
    #[error(transparent)]
    Channel(#[from] ChannelError),
    #[error(transparent)]
    Fragment(#[from] FragmentError),
    #[error("peer not found: {0}")]
    PeerNotFound(PeerIdentity),
    #[error("session already started")]
    AlreadyStarted,
    #[error("session destroyed")]
    Destroyed,
    #[error("invalid config: {0}")]
    Config(String),
}
