//! URL-keyed tracker registry.
//!
//! Owns one [`TrackerClient`] per announce URL. Removing a tracker destroys its
//! client only; channels it brokered live on in the peer table.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::announce::{AnnounceContext, AnnounceOptions};
use crate::error::TrackerError;
use crate::events::{TrackerEvent, TrackerEventSender};
use crate::traits::{TrackerClient, TrackerConnector};

/// Tracker connectivity summary. `connected <= total` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackerStats {
    pub connected: usize,
    pub total: usize,
}

/// One registered tracker.
#[derive(Debug)]
pub struct TrackerEntry<Cl> {
    url: String,
    client: Arc<Cl>,
}

impl<Cl: TrackerClient> TrackerEntry<Cl> {
    fn new(url: String, client: Cl) -> Self {
        Self {
            url,
            client: Arc::new(client),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn client(&self) -> &Arc<Cl> {
        &self.client
    }

    pub fn is_connected(&self) -> bool {
        self.client.is_open()
    }
}

type EntryMap<Cl> = HashMap<String, TrackerEntry<Cl>>;

pub struct TrackerRegistry<T: TrackerConnector> {
    connector: T,
    context: AnnounceContext,
    default_options: AnnounceOptions,
    events: TrackerEventSender<T::Channel>,
    trackers: RwLock<EntryMap<T::Client>>,
}

impl<T: TrackerConnector> TrackerRegistry<T> {
    pub fn new(
        connector: T,
        context: AnnounceContext,
        events: TrackerEventSender<T::Channel>,
    ) -> Self {
        Self {
            connector,
            context,
            default_options: AnnounceOptions::default(),
            events,
            trackers: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_default_options(mut self, options: AnnounceOptions) -> Self {
        self.default_options = options;
        self
    }

    pub fn context(&self) -> &AnnounceContext {
        &self.context
    }

    /// Takes effect for trackers added afterwards.
    pub fn set_context(&mut self, context: AnnounceContext) {
        self.context = context;
    }

    pub fn default_options(&self) -> AnnounceOptions {
        self.default_options
    }

    /// Register `url`, connect to it and announce with the default options.
    pub async fn add_tracker(&self, url: &str) -> Result<(), TrackerError> {
        let client = {
            let mut trackers = self.trackers.write();
            if trackers.contains_key(url) {
                return Err(TrackerError::TrackerAlreadyExists(url.to_owned()));
            }
            let client = self
                .connector
                .connect(url, &self.context, self.events.clone())?;
            let entry = TrackerEntry::new(url.to_owned(), client);
            let client = Arc::clone(entry.client());
            trackers.insert(url.to_owned(), entry);
            client
        };

        info!(%url, "tracker added");
        self.announce(&client, self.default_options).await;
        Ok(())
    }

    /// Drop `url` and destroy its connection. Channels it brokered stay open.
    pub fn remove_tracker(&self, url: &str) -> Result<(), TrackerError> {
        let entry = self
            .trackers
            .write()
            .remove(url)
            .ok_or_else(|| TrackerError::TrackerNotFound(url.to_owned()))?;

        entry.client.destroy();
        info!(%url, "tracker removed");
        Ok(())
    }

    /// Announce on every tracker with the default options.
    pub async fn request_more_peers(&self) -> usize {
        self.announce_with(self.default_options).await
    }

    /// Announce on every tracker. Resolves once every announce has been
    /// dispatched; returns how many were.
    pub async fn announce_with(&self, options: AnnounceOptions) -> usize {
        let clients: Vec<Arc<T::Client>> = self
            .trackers
            .read()
            .values()
            .map(|entry| Arc::clone(&entry.client))
            .collect();

        let count = clients.len();
        join_all(clients.iter().map(|client| self.announce(client, options))).await;
        debug!(count, numwant = options.numwant, "announced to trackers");
        count
    }

    /// Failures are forwarded as tracker warnings, never returned.
    async fn announce(&self, client: &T::Client, options: AnnounceOptions) {
        if let Err(e) = client.announce(options).await {
            warn!(url = client.url(), error = %e, "announce failed");
            let _ = self.events.send(TrackerEvent::Warning {
                tracker: client.url().to_owned(),
                error: e.to_string(),
            });
        }
    }

    pub fn stats(&self) -> TrackerStats {
        let trackers = self.trackers.read();
        TrackerStats {
            connected: trackers.values().filter(|e| e.is_connected()).count(),
            total: trackers.len(),
        }
    }

    pub fn contains(&self, url: &str) -> bool {
        self.trackers.read().contains_key(url)
    }

    pub fn len(&self) -> usize {
        self.trackers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered URLs, sorted.
    pub fn urls(&self) -> Vec<String> {
        let mut urls: Vec<String> = self.trackers.read().keys().cloned().collect();
        urls.sort();
        urls
    }

    pub fn client(&self, url: &str) -> Option<Arc<T::Client>> {
        self.trackers
            .read()
            .get(url)
            .map(|entry| Arc::clone(&entry.client))
    }

    /// Destroy and forget every tracker. Returns how many there were.
    pub fn destroy_all(&self) -> usize {
        let entries: Vec<TrackerEntry<T::Client>> =
            self.trackers.write().drain().map(|(_, e)| e).collect();
        for entry in &entries {
            entry.client.destroy();
        }
        if !entries.is_empty() {
            debug!(count = entries.len(), "destroyed all trackers");
        }
        entries.len()
    }
}

impl<T: TrackerConnector> std::fmt::Debug for TrackerRegistry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackerRegistry")
            .field("context", &self.context)
            .field("default_options", &self.default_options)
            .field("trackers", &self.urls())
            .finish()
    }
}
