//! Sync controller: reconciles the live remote query with the local cache.
//!
//! While connected (and a message store is available) the controller holds
//! exactly one live subscription and mirrors every snapshot into the cache.
//! While disconnected it releases the subscription and serves the last cached
//! list instead. The presentation layer observes the list through a watch
//! channel and sends through an [`Outbox`].

use std::future::Future;

use thiserror::Error;
use tokio::sync::watch;

use crate::cache::{self, LocalCache};
use crate::models::{Message, RemoteDocument, RemoteRecord};
use crate::state::SyncMode;
use crate::store::{
    MessageQuery, MessageStore, SnapshotEvent, StoreError, Subscription, DEFAULT_COLLECTION,
};


#[derive(Debug, Error)]
pub enum SendError {
    #[error("store not ready")]
    StoreNotReady,
    #[error("cannot send while offline")]
    Offline,
    #[error("failed to write message: {0}")]
    Write(#[source] StoreError),
}

pub struct SyncController<S: MessageStore, C: LocalCache> {
    store: Option<S>,
    cache: C,
    collection: String,
    entered: Option<SyncMode>,
    applied_connectivity: Option<bool>,
    subscription: Option<Subscription>,
    messages: watch::Sender<Vec<Message>>,
    connectivity: watch::Sender<bool>,
}

impl<S: MessageStore, C: LocalCache> SyncController<S, C> {
    /// `store` is `None` when no message store could be initialised; the
    /// controller then stays offline.
    pub fn new(store: Option<S>, cache: C) -> Self {
        let (messages, _) = watch::channel(Vec::new());
        let (connectivity, _) = watch::channel(false);
        Self {
            store,
            cache,
            collection: DEFAULT_COLLECTION.to_string(),
            entered: None,
            applied_connectivity: None,
            subscription: None,
            messages,
            connectivity,
        }
    }

    #[must_use]
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    /// Current mode. Offline until the first connectivity value is applied.
    pub fn mode(&self) -> SyncMode {
        self.entered.unwrap_or(SyncMode::Offline)
    }

    pub const fn has_subscription(&self) -> bool {
        self.subscription.is_some()
    }

    /// Observe the message list, newest first.
    pub fn messages(&self) -> watch::Receiver<Vec<Message>> {
        self.messages.subscribe()
    }

    pub fn current_messages(&self) -> Vec<Message> {
        self.messages.borrow().clone()
    }

    pub fn outbox(&self) -> Outbox<S> {
        Outbox {
            store: self.store.clone(),
            collection: self.collection.clone(),
            connectivity: self.connectivity.subscribe(),
        }
    }

    /// Send through the controller's own outbox.
    pub async fn send(&self, message: Message) -> Result<String, SendError> {
        self.outbox().send(message).await
    }

    /// React to a connectivity signal. Repeating the current value is a no-op.
    pub async fn apply_connectivity(&mut self, connected: bool) {
        let changed = self.applied_connectivity != Some(connected);
        self.applied_connectivity = Some(connected);
        self.connectivity.send_replace(connected);

        if changed {
            if let Some(store) = &self.store {
                if let Err(error) = store.set_network_enabled(connected).await {
                    tracing::warn!("Failed to set store network enabled={}: {}", connected, error);
                }
            }
        }

        let target = SyncMode::resolve(connected, self.store.is_some());
        if self.entered == Some(target) {
            return;
        }

        self.release_subscription();
        tracing::info!("Entering {} mode", target);
        self.entered = Some(target);

        match target {
            SyncMode::Online => self.enter_online().await,
            SyncMode::Offline => self.enter_offline().await,
        }
    }

    /// Replace the list with a fresh remote snapshot and mirror it to the cache.
    pub async fn apply_snapshot(&self, documents: Vec<RemoteDocument>) {
        let received = documents.len();
        let messages: Vec<Message> = documents
            .into_iter()
            .filter_map(RemoteDocument::into_message)
            .collect();
        tracing::debug!(
            "Snapshot with {} documents ({} kept)",
            received,
            messages.len()
        );

        // Observers see the snapshot before the cache write starts
        self.messages.send_replace(messages.clone());
        if let Err(error) = cache::store_messages(&self.cache, &messages).await {
            tracing::warn!("Failed to write message cache: {}", error);
        }
    }

    /// Drive the controller until `shutdown` resolves or the connectivity
    /// channel closes, then tear down.
    pub async fn run<F>(&mut self, mut connectivity: watch::Receiver<bool>, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let initial = *connectivity.borrow_and_update();
        self.apply_connectivity(initial).await;

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                () = &mut shutdown => break,
                changed = connectivity.changed() => {
                    if changed.is_err() {
                        tracing::debug!("Connectivity channel closed");
                        break;
                    }
                    let connected = *connectivity.borrow_and_update();
                    self.apply_connectivity(connected).await;
                }
                event = next_event(&mut self.subscription) => {
                    match event {
                        Some(Ok(documents)) => self.apply_snapshot(documents).await,
                        Some(Err(error)) => {
                            tracing::error!("Live query failed: {}", error);
                            self.release_subscription();
                        }
                        None => {
                            tracing::warn!("Live query ended");
                            self.subscription = None;
                        }
                    }
                }
            }
        }

        self.teardown();
    }

    /// Release the live query. Later snapshots are never observed.
    pub fn teardown(&mut self) {
        self.release_subscription();
    }

    async fn enter_online(&mut self) {
        let Some(store) = &self.store else {
            return;
        };
        let query = MessageQuery::newest_first(self.collection.clone());
        match store.subscribe(&query).await {
            Ok(subscription) => self.subscription = Some(subscription),
            Err(error) => tracing::error!("Failed to subscribe to {}: {}", query.collection, error),
        }
    }

    async fn enter_offline(&self) {
        match cache::load_messages(&self.cache).await {
            Ok(Some(messages)) => {
                tracing::debug!("Loaded {} cached messages", messages.len());
                self.messages.send_replace(messages);
            }
            Ok(None) => {}
            Err(error) => tracing::warn!("Failed to read message cache: {}", error),
        }
    }

    fn release_subscription(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.release();
        }
    }
}

async fn next_event(subscription: &mut Option<Subscription>) -> Option<SnapshotEvent> {
    match subscription {
        Some(subscription) => subscription.next().await,
        None => std::future::pending().await,
    }
}

/// Send path handed to the presentation layer.
///
/// Sending never touches the message list; the message shows up once the
/// store echoes it back through the live query.
#[derive(Clone)]
pub struct Outbox<S: MessageStore> {
    store: Option<S>,
    collection: String,
    connectivity: watch::Receiver<bool>,
}

impl<S: MessageStore> Outbox<S> {
    pub fn is_connected(&self) -> bool {
        *self.connectivity.borrow()
    }

    /// Append `message` to the remote collection and return the store id.
    pub async fn send(&self, message: Message) -> Result<String, SendError> {
        let Some(store) = &self.store else {
            tracing::error!("Dropping message {}: store not ready", message.id);
            return Err(SendError::StoreNotReady);
        };
        if !self.is_connected() {
            tracing::error!("Dropping message {}: offline", message.id);
            return Err(SendError::Offline);
        }

        let record = RemoteRecord::from(&message);
        match store.append(&self.collection, record).await {
            Ok(id) => {
                tracing::debug!("Message {} stored as {}", message.id, id);
                Ok(id)
            }
            Err(error) => {
                tracing::error!("Failed to send message {}: {}", message.id, error);
                Err(SendError::Write(error))
            }
        }
    }
}
