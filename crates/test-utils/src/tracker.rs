use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use rendezvous_net_trackers::{
    AnnounceContext, AnnounceOptions, AnnounceResponse, TrackerClient, TrackerConnector,
    TrackerError, TrackerEvent, TrackerEventSender,
};

use crate::channel::MockChannel;

struct ClientInner {
    url: String,
    context: AnnounceContext,
    events: TrackerEventSender<MockChannel>,
    open: AtomicBool,
    destroyed: AtomicBool,
    fail_announces: AtomicBool,
    announces: Mutex<Vec<AnnounceOptions>>,
}

/// Tracker connection that records announces. Clones share state.
#[derive(Clone)]
pub struct MockTrackerClient {
    inner: Arc<ClientInner>,
}

impl MockTrackerClient {
    fn new(url: &str, context: AnnounceContext, events: TrackerEventSender<MockChannel>) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                url: url.to_owned(),
                context,
                events,
                open: AtomicBool::new(true),
                destroyed: AtomicBool::new(false),
                fail_announces: AtomicBool::new(false),
                announces: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn context(&self) -> AnnounceContext {
        self.inner.context
    }

    pub fn announces(&self) -> Vec<AnnounceOptions> {
        self.inner.announces.lock().clone()
    }

    pub fn set_open(&self, open: bool) {
        self.inner.open.store(open, Ordering::Relaxed);
    }

    pub fn fail_announces(&self, fail: bool) {
        self.inner.fail_announces.store(fail, Ordering::Relaxed);
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.load(Ordering::Relaxed)
    }

    /// Broker a candidate channel, as an answered offer would.
    pub fn emit_peer(&self, channel: MockChannel) -> bool {
        self.inner
            .events
            .send(TrackerEvent::Peer {
                tracker: self.inner.url.clone(),
                channel,
            })
            .is_ok()
    }

    pub fn emit_update(&self, response: AnnounceResponse) -> bool {
        self.inner
            .events
            .send(TrackerEvent::Update {
                tracker: self.inner.url.clone(),
                response,
            })
            .is_ok()
    }

    pub fn emit_warning(&self, error: &str) -> bool {
        self.inner
            .events
            .send(TrackerEvent::Warning {
                tracker: self.inner.url.clone(),
                error: error.to_owned(),
            })
            .is_ok()
    }
}

#[async_trait]
impl TrackerClient for MockTrackerClient {
    fn url(&self) -> &str {
        &self.inner.url
    }

    fn is_open(&self) -> bool {
        !self.is_destroyed() && self.inner.open.load(Ordering::Relaxed)
    }

    async fn announce(&self, opts: AnnounceOptions) -> Result<(), TrackerError> {
        if self.is_destroyed() {
            return Err(TrackerError::Announce {
                url: self.inner.url.clone(),
                reason: "tracker destroyed".to_owned(),
            });
        }
        if self.inner.fail_announces.load(Ordering::Relaxed) {
            return Err(TrackerError::Announce {
                url: self.inner.url.clone(),
                reason: "mock announce failure".to_owned(),
            });
        }
        self.inner.announces.lock().push(opts);
        Ok(())
    }

    fn destroy(&self) {
        self.inner.destroyed.store(true, Ordering::Relaxed);
        self.inner.open.store(false, Ordering::Relaxed);
    }
}

#[derive(Default)]
struct ConnectorState {
    clients: HashMap<String, MockTrackerClient>,
    refused: HashSet<String>,
    connects: usize,
}

/// Hands out [`MockTrackerClient`]s and keeps them reachable by URL.
#[derive(Clone, Default)]
pub struct MockConnector {
    state: Arc<Mutex<ConnectorState>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make future connects to `url` fail.
    pub fn refuse(&self, url: &str) {
        self.state.lock().refused.insert(url.to_owned());
    }

    /// Most recent client opened for `url`.
    pub fn client(&self, url: &str) -> Option<MockTrackerClient> {
        self.state.lock().clients.get(url).cloned()
    }

    pub fn connect_count(&self) -> usize {
        self.state.lock().connects
    }
}

impl TrackerConnector for MockConnector {
    type Channel = MockChannel;
    type Client = MockTrackerClient;

    fn connect(
        &self,
        url: &str,
        context: &AnnounceContext,
        events: TrackerEventSender<MockChannel>,
    ) -> Result<MockTrackerClient, TrackerError> {
        let mut state = self.state.lock();
        if state.refused.contains(url) {
            return Err(TrackerError::Connect {
                url: url.to_owned(),
                reason: "connection refused".to_owned(),
            });
        }
        state.connects += 1;
        let client = MockTrackerClient::new(url, *context, events);
        state.clients.insert(url.to_owned(), client.clone());
        Ok(client)
    }
}
