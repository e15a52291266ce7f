//! Remote message store abstraction and live query subscriptions.

mod database;
mod memory;

pub use database::LibSqlMessageStore;
pub use memory::MemoryMessageStore;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::models::{RemoteDocument, RemoteRecord};

/// Collection holding chat messages unless configured otherwise.
pub const DEFAULT_COLLECTION: &str = "messages";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Message store network is disabled")]
    NetworkDisabled,
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
    #[error("Subscription failed: {0}")]
    Subscription(String),
    #[error("Write failed: {0}")]
    Write(String),
    #[error(transparent)]
    Backend(#[from] crate::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// One push from a live query: the full current result set, or the error
/// that ended the stream.
pub type SnapshotEvent = StoreResult<Vec<RemoteDocument>>;

/// Live query over one collection ordered by `createdAt`, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageQuery {
    pub collection: String,
}

impl MessageQuery {
    pub fn newest_first(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
        }
    }

    fn validate(&self) -> StoreResult<&str> {
        let collection = self.collection.trim();
        if collection.is_empty() {
            return Err(StoreError::InvalidQuery(
                "collection must not be empty".to_string(),
            ));
        }
        Ok(collection)
    }
}

/// Remote document database with live queries (async)
#[allow(async_fn_in_trait)]
pub trait MessageStore: Clone {
    /// Open a live query. Snapshots arrive until the subscription is released.
    async fn subscribe(&self, query: &MessageQuery) -> StoreResult<Subscription>;

    /// Append a new document and return the id the store assigned to it.
    async fn append(&self, collection: &str, record: RemoteRecord) -> StoreResult<String>;

    /// Allow or forbid the client from using the network.
    async fn set_network_enabled(&self, enabled: bool) -> StoreResult<()>;
}

/// Receiving end of a live query.
///
/// Dropping or releasing it closes the channel; producers observe that and
/// stop delivering.
#[derive(Debug)]
pub struct Subscription {
    snapshots: mpsc::UnboundedReceiver<SnapshotEvent>,
}

impl Subscription {
    /// Create a connected producer/subscription pair.
    pub fn channel() -> (SnapshotSender, Self) {
        let (tx, snapshots) = mpsc::unbounded_channel();
        (SnapshotSender { tx }, Self { snapshots })
    }

    /// Wait for the next snapshot. `None` once the producer is gone.
    pub async fn next(&mut self) -> Option<SnapshotEvent> {
        self.snapshots.recv().await
    }

    /// Stop the live query. Nothing buffered is delivered afterwards.
    pub fn release(mut self) {
        self.snapshots.close();
    }
}

/// Producing end of a live query, held by store implementations.
#[derive(Debug, Clone)]
pub struct SnapshotSender {
    tx: mpsc::UnboundedSender<SnapshotEvent>,
}

impl SnapshotSender {
    /// Push a snapshot. Returns `false` once the subscription was released.
    pub fn publish(&self, documents: Vec<RemoteDocument>) -> bool {
        self.tx.send(Ok(documents)).is_ok()
    }

    /// Terminate the stream with an error.
    pub fn fail(&self, error: StoreError) {
        self.tx.send(Err(error)).ok();
    }

    pub fn is_released(&self) -> bool {
        self.tx.is_closed()
    }

    /// Resolves once the subscription is released.
    pub async fn released(&self) {
        self.tx.closed().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn release_closes_producer() {
        let (sender, subscription) = Subscription::channel();
        assert!(sender.publish(Vec::new()));
        subscription.release();

        assert!(sender.is_released());
        assert!(!sender.publish(Vec::new()));
    }

    #[tokio::test]
    async fn next_returns_none_after_producer_drop() {
        let (sender, mut subscription) = Subscription::channel();
        sender.publish(Vec::new());
        drop(sender);

        assert!(matches!(subscription.next().await, Some(Ok(docs)) if docs.is_empty()));
        assert!(subscription.next().await.is_none());
    }

    #[test]
    fn query_rejects_blank_collection() {
        assert!(MessageQuery::newest_first("  ").validate().is_err());
        assert_eq!(
            MessageQuery::newest_first(" messages ").validate().unwrap(),
            "messages"
        );
    }
}
