//! Multiplexes announces and responses across independent tracker endpoints.
//!
//! The tracker wire protocol lives behind [`TrackerConnector`] and
//! [`TrackerClient`]; this crate only decides which trackers exist, when they
//! announce, and how connectivity is summarised.

pub mod announce;
pub mod error;
pub mod events;
pub mod registry;
pub mod traits;

pub use announce::{
    AnnounceContext, AnnounceOptions, AnnounceResponse, DEFAULT_DOWNLOADED, DEFAULT_NUMWANT,
    DEFAULT_UPLOADED,
};
pub use error::TrackerError;
pub use events::{TrackerEvent, TrackerEventReceiver, TrackerEventSender, tracker_events};
pub use registry::{TrackerEntry, TrackerRegistry, TrackerStats};
pub use traits::{TrackerClient, TrackerConnector};
