//! Capabilities required from the tracker wire-protocol client.

use async_trait::async_trait;
use auto_impl::auto_impl;
use rendezvous_net_peers::PeerChannel;

use crate::announce::{AnnounceContext, AnnounceOptions};
use crate::error::TrackerError;
use crate::events::TrackerEventSender;

/// A connection to one tracker endpoint.
#[async_trait]
pub trait TrackerClient: Send + Sync + 'static {
    fn url(&self) -> &str;

    /// Whether the underlying socket is currently open.
    fn is_open(&self) -> bool;

    /// Dispatch an announce. Returns once the request is sent; responses and
    /// brokered peers arrive later as [`TrackerEvent`](crate::TrackerEvent)s.
    async fn announce(&self, opts: AnnounceOptions) -> Result<(), TrackerError>;

    /// Close the connection and stop future announces. Channels already
    /// handed out are not affected.
    fn destroy(&self);
}

/// Opens [`TrackerClient`]s.
#[auto_impl(Box, Arc)]
pub trait TrackerConnector: Send + Sync + 'static {
    type Channel: PeerChannel;
    type Client: TrackerClient;

    /// Open a connection to `url`. The client reports `peer`, `update` and
    /// `warning` signals on `events`.
    fn connect(
        &self,
        url: &str,
        context: &AnnounceContext,
        events: TrackerEventSender<Self::Channel>,
    ) -> Result<Self::Client, TrackerError>;
}
