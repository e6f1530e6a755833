use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use parking_lot::Mutex;
use rendezvous_net_peers::{ChannelError, ChannelEvent, ChannelEventSender, PeerChannel};
use rendezvous_net_types::PeerIdentity;

struct Inner {
    id: PeerIdentity,
    name: String,
    sent: Mutex<Vec<Bytes>>,
    events: Mutex<Option<ChannelEventSender<MockChannel>>>,
    destroyed: AtomicBool,
    fail_sends: AtomicBool,
}

/// Peer channel driven by the test. Clones share one link.
#[derive(Clone)]
pub struct MockChannel {
    inner: Arc<Inner>,
}

impl MockChannel {
    pub fn new(id: PeerIdentity, name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Inner {
                id,
                name: name.into(),
                sent: Mutex::new(Vec::new()),
                events: Mutex::new(None),
                destroyed: AtomicBool::new(false),
                fail_sends: AtomicBool::new(false),
            }),
        }
    }

    fn notify(&self, event: ChannelEvent<MockChannel>) -> bool {
        match self.inner.events.lock().as_ref() {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }

    /// Report negotiation success. Returns false if nothing is attached.
    pub fn connect(&self) -> bool {
        self.notify(ChannelEvent::Connect(self.clone()))
    }

    /// Deliver inbound bytes as if the remote had sent them.
    pub fn receive(&self, data: impl Into<Bytes>) -> bool {
        self.notify(ChannelEvent::data(self, data.into()))
    }

    pub fn fail(&self, reason: &str) -> bool {
        self.notify(ChannelEvent::error(
            self,
            ChannelError::Transport(reason.to_owned()),
        ))
    }

    pub fn close(&self) -> bool {
        self.notify(ChannelEvent::close(self))
    }

    pub fn fail_sends(&self, fail: bool) {
        self.inner.fail_sends.store(fail, Ordering::Relaxed);
    }

    /// Everything passed to `send` so far.
    pub fn sent(&self) -> Vec<Bytes> {
        self.inner.sent.lock().clone()
    }

    pub fn is_attached(&self) -> bool {
        self.inner.events.lock().is_some()
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for MockChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockChannel")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

impl PeerChannel for MockChannel {
    fn id(&self) -> PeerIdentity {
        self.inner.id
    }

    fn channel_name(&self) -> &str {
        &self.inner.name
    }

    fn send(&self, data: Bytes) -> Result<(), ChannelError> {
        if self.is_destroyed() {
            return Err(ChannelError::Closed);
        }
        if self.inner.fail_sends.load(Ordering::Relaxed) {
            return Err(ChannelError::Send("mock send failure".to_owned()));
        }
        self.inner.sent.lock().push(data);
        Ok(())
    }

    fn same_link(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn attach(&self, events: ChannelEventSender<Self>) {
        *self.inner.events.lock() = Some(events);
    }

    fn destroy(&self) {
        self.inner.destroyed.store(true, Ordering::Relaxed);
    }
}
