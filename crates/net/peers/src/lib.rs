//! Deduplicates a logical peer across the redundant channels opened to it.

pub mod events;
pub mod table;
pub mod traits;

pub use events::{ChannelEvent, ChannelEventReceiver, ChannelEventSender, channel_events};
pub use table::{CloseResult, OpenResult, PeerSessionTable, PeerSnapshot};
pub use traits::{ChannelError, PeerChannel};
