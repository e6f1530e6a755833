//! Test utilities and mocks for rendezvous crates.
//!
//! - [`MockChannel`]: a peer channel whose transport notifications are driven
//!   by the test (`connect`, `receive`, `fail`, `close`).
//! - [`MockConnector`] / [`MockTrackerClient`]: trackers that record announces
//!   and let the test inject `peer`, `update` and `warning` signals.

mod channel;
mod tracker;

pub use channel::MockChannel;
pub use tracker::{MockConnector, MockTrackerClient};

use rendezvous_net_types::PeerIdentity;

/// Deterministic identity filled with `n`.
pub fn peer_identity(n: u8) -> PeerIdentity {
    PeerIdentity::new([n; 20])
}
