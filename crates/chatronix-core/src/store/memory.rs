//! In-process message store used by tests and single-process demos.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use uuid::Uuid;

use super::{MessageQuery, MessageStore, SnapshotSender, StoreError, StoreResult, Subscription};
use crate::models::{RemoteDocument, RemoteRecord};

struct Watcher {
    collection: String,
    sender: SnapshotSender,
}

struct State {
    collections: HashMap<String, Vec<RemoteDocument>>,
    watchers: Vec<Watcher>,
    network_enabled: bool,
    network_calls: Vec<bool>,
    appended: Vec<(String, RemoteRecord)>,
    subscribe_calls: usize,
    fail_appends: bool,
    fail_subscriptions: bool,
}

impl Default for State {
    fn default() -> Self {
        Self {
            collections: HashMap::new(),
            watchers: Vec::new(),
            network_enabled: true,
            network_calls: Vec::new(),
            appended: Vec::new(),
            subscribe_calls: 0,
            fail_appends: false,
            fail_subscriptions: false,
        }
    }
}

impl State {
    fn snapshot(&self, collection: &str) -> Vec<RemoteDocument> {
        let mut documents = self
            .collections
            .get(collection)
            .cloned()
            .unwrap_or_default();
        documents.sort_by_key(|document| Reverse(document.record.created_at));
        documents
    }

    fn broadcast(&mut self, collection: &str) {
        self.watchers.retain(|watcher| !watcher.sender.is_released());
        if !self.network_enabled {
            return;
        }
        let snapshot = self.snapshot(collection);
        for watcher in self.watchers.iter().filter(|w| w.collection == collection) {
            watcher.sender.publish(snapshot.clone());
        }
    }
}

/// Shared in-memory document collections with live queries. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryMessageStore {
    state: Arc<Mutex<State>>,
}

impl MemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> StoreResult<MutexGuard<'_, State>> {
        self.state.lock().map_err(|error| {
            StoreError::Backend(crate::Error::Unavailable(format!(
                "message store lock poisoned: {error}"
            )))
        })
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Insert a document as if another client had written it.
    pub fn insert_document(&self, collection: &str, document: RemoteDocument) {
        let mut state = self.lock();
        state
            .collections
            .entry(collection.to_string())
            .or_default()
            .push(document);
        state.broadcast(collection);
    }

    /// End every live query on `collection` with an error.
    pub fn break_subscriptions(&self, collection: &str, reason: &str) {
        let mut state = self.lock();
        for watcher in state.watchers.iter().filter(|w| w.collection == collection) {
            watcher
                .sender
                .fail(StoreError::Subscription(reason.to_string()));
        }
        state.watchers.retain(|watcher| watcher.collection != collection);
    }

    /// Live queries whose subscription has not been released.
    pub fn active_subscriptions(&self) -> usize {
        self.lock()
            .watchers
            .iter()
            .filter(|watcher| !watcher.sender.is_released())
            .count()
    }

    /// Total number of `subscribe` calls.
    pub fn subscribe_calls(&self) -> usize {
        self.lock().subscribe_calls
    }

    /// Every record passed to `append`, with its collection.
    pub fn appended(&self) -> Vec<(String, RemoteRecord)> {
        self.lock().appended.clone()
    }

    pub fn network_enabled(&self) -> bool {
        self.lock().network_enabled
    }

    /// Every value passed to `set_network_enabled`, in order.
    pub fn network_calls(&self) -> Vec<bool> {
        self.lock().network_calls.clone()
    }

    pub fn fail_appends(&self, fail: bool) {
        self.lock().fail_appends = fail;
    }

    pub fn fail_subscriptions(&self, fail: bool) {
        self.lock().fail_subscriptions = fail;
    }
}

impl MessageStore for MemoryMessageStore {
    async fn subscribe(&self, query: &MessageQuery) -> StoreResult<Subscription> {
        let collection = query.validate()?.to_string();
        let mut state = self.state()?;
        state.subscribe_calls += 1;
        if state.fail_subscriptions {
            return Err(StoreError::Subscription(
                "listener registration rejected".to_string(),
            ));
        }

        let (sender, subscription) = Subscription::channel();
        if state.network_enabled {
            sender.publish(state.snapshot(&collection));
        }
        state.watchers.push(Watcher { collection, sender });
        Ok(subscription)
    }

    async fn append(&self, collection: &str, record: RemoteRecord) -> StoreResult<String> {
        let mut state = self.state()?;
        if !state.network_enabled {
            return Err(StoreError::NetworkDisabled);
        }
        if state.fail_appends {
            return Err(StoreError::Write("append rejected".to_string()));
        }

        let id = Uuid::now_v7().to_string();
        state.appended.push((collection.to_string(), record.clone()));
        state
            .collections
            .entry(collection.to_string())
            .or_default()
            .push(RemoteDocument::new(id.clone(), record));
        state.broadcast(collection);
        Ok(id)
    }

    async fn set_network_enabled(&self, enabled: bool) -> StoreResult<()> {
        let mut state = self.state()?;
        state.network_calls.push(enabled);
        let resumed = enabled && !state.network_enabled;
        state.network_enabled = enabled;

        if resumed {
            let collections: Vec<String> = state
                .watchers
                .iter()
                .map(|watcher| watcher.collection.clone())
                .collect();
            for collection in collections {
                state.broadcast(&collection);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RemoteTimestamp, RemoteUser};

    fn record(seconds: i64, text: &str) -> RemoteRecord {
        RemoteRecord {
            text: text.to_string(),
            created_at: RemoteTimestamp {
                seconds,
                nanoseconds: 0,
            },
            user: RemoteUser {
                id: "u1".to_string(),
                name: "Ada".to_string(),
                avatar: None,
            },
            location: None,
            image: None,
            client_id: None,
        }
    }

    #[tokio::test]
    async fn subscribe_emits_initial_snapshot_newest_first() {
        let store = MemoryMessageStore::new();
        store.insert_document("messages", RemoteDocument::new("a", record(1, "old")));
        store.insert_document("messages", RemoteDocument::new("b", record(2, "new")));

        let mut subscription = store
            .subscribe(&MessageQuery::newest_first("messages"))
            .await
            .unwrap();
        let snapshot = subscription.next().await.unwrap().unwrap();
        let ids: Vec<&str> = snapshot.iter().map(|doc| doc.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn append_pushes_snapshot_to_watchers() {
        let store = MemoryMessageStore::new();
        let mut subscription = store
            .subscribe(&MessageQuery::newest_first("messages"))
            .await
            .unwrap();
        assert!(subscription.next().await.unwrap().unwrap().is_empty());

        let id = store.append("messages", record(5, "hi")).await.unwrap();
        let snapshot = subscription.next().await.unwrap().unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, id);
    }

    #[tokio::test]
    async fn released_subscription_is_not_counted() {
        let store = MemoryMessageStore::new();
        let subscription = store
            .subscribe(&MessageQuery::newest_first("messages"))
            .await
            .unwrap();
        assert_eq!(store.active_subscriptions(), 1);

        subscription.release();
        assert_eq!(store.active_subscriptions(), 0);
    }

    #[tokio::test]
    async fn append_fails_while_network_disabled() {
        let store = MemoryMessageStore::new();
        store.set_network_enabled(false).await.unwrap();

        let error = store.append("messages", record(1, "x")).await.unwrap_err();
        assert!(matches!(error, StoreError::NetworkDisabled));
        assert!(store.appended().is_empty());
    }
}
