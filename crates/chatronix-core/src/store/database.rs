//! libSQL message store: an embedded replica of a shared Turso database,
//! with live queries served by polling the replica.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use uuid::Uuid;

use super::{MessageQuery, MessageStore, SnapshotSender, StoreError, StoreResult, Subscription};
use crate::db::{Database, Schema, SyncConfig};
use crate::models::{RemoteDocument, RemoteLocation, RemoteRecord, RemoteTimestamp, RemoteUser};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

const SELECT_COLUMNS: &str = "id, text, created_at_seconds, created_at_nanos, author_id, \
     author_name, author_avatar, latitude, longitude, image_url, client_id";

/// Message collections stored in libSQL.
#[derive(Clone)]
pub struct LibSqlMessageStore {
    db: Arc<Mutex<Database>>,
    network_enabled: Arc<AtomicBool>,
    poll_interval: Duration,
}

impl LibSqlMessageStore {
    /// Open an embedded replica of the remote message database.
    pub async fn open(local_path: impl AsRef<Path>, sync_config: SyncConfig) -> StoreResult<Self> {
        let local_path = local_path.as_ref();
        if let Some(parent) = local_path.parent() {
            std::fs::create_dir_all(parent).map_err(crate::Error::from)?;
        }
        tracing::info!("Message store replica of {}", sync_config.url);
        let db = Database::open_replica(local_path, &sync_config).await?;
        Ok(Self::from_database(db))
    }

    /// Open a message store without a remote (single-device use and tests).
    pub async fn open_in_memory() -> StoreResult<Self> {
        let db = Database::open_in_memory(Schema::Messages).await?;
        Ok(Self::from_database(db))
    }

    fn from_database(db: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            network_enabled: Arc::new(AtomicBool::new(true)),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Override how often live queries re-read the replica.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    fn is_network_enabled(&self) -> bool {
        self.network_enabled.load(Ordering::SeqCst)
    }

    /// Pull remote changes into the replica.
    async fn pull(&self) -> StoreResult<()> {
        let db = self.db.lock().await;
        db.sync().await?;
        Ok(())
    }

    /// Current result set for `collection`, newest first.
    async fn fetch(&self, collection: &str) -> StoreResult<Vec<RemoteDocument>> {
        let db = self.db.lock().await;
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM messages WHERE collection = ? \
             ORDER BY created_at_seconds DESC, created_at_nanos DESC, id DESC"
        );
        let mut rows = db
            .connection()
            .query(&sql, [collection])
            .await
            .map_err(crate::Error::from)?;

        let mut documents = Vec::new();
        while let Some(row) = rows.next().await.map_err(crate::Error::from)? {
            documents.push(parse_document(&row).map_err(crate::Error::from)?);
        }
        Ok(documents)
    }

    async fn poll(self, collection: String, sender: SnapshotSender) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        let mut last: Option<Vec<RemoteDocument>> = None;

        loop {
            tokio::select! {
                () = sender.released() => break,
                _ = ticker.tick() => {}
            }
            if !self.is_network_enabled() {
                continue;
            }
            if let Err(error) = self.pull().await {
                tracing::warn!("Message replica sync failed: {}", error);
            }

            match self.fetch(&collection).await {
                Ok(documents) => {
                    if last.as_ref() == Some(&documents) {
                        continue;
                    }
                    if !sender.publish(documents.clone()) {
                        break;
                    }
                    last = Some(documents);
                }
                Err(error) => {
                    sender.fail(StoreError::Subscription(error.to_string()));
                    break;
                }
            }
        }
        tracing::debug!("Live query on '{}' stopped", collection);
    }
}

impl MessageStore for LibSqlMessageStore {
    async fn subscribe(&self, query: &MessageQuery) -> StoreResult<Subscription> {
        let collection = query.validate()?.to_string();
        let (sender, subscription) = Subscription::channel();
        tokio::spawn(self.clone().poll(collection, sender));
        Ok(subscription)
    }

    async fn append(&self, collection: &str, record: RemoteRecord) -> StoreResult<String> {
        if !self.is_network_enabled() {
            return Err(StoreError::NetworkDisabled);
        }

        let id = Uuid::now_v7().to_string();
        let (latitude, longitude) = record
            .location
            .map_or((None, None), |location| {
                (Some(location.latitude), Some(location.longitude))
            });

        let db = self.db.lock().await;
        db.connection()
            .execute(
                "INSERT INTO messages (id, collection, text, created_at_seconds, created_at_nanos, \
                 author_id, author_name, author_avatar, latitude, longitude, image_url, client_id) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                libsql::params![
                    id.as_str(),
                    collection,
                    record.text,
                    record.created_at.seconds,
                    i64::from(record.created_at.nanoseconds),
                    record.user.id,
                    record.user.name,
                    record.user.avatar,
                    latitude,
                    longitude,
                    record.image,
                    record.client_id,
                ],
            )
            .await
            .map_err(|error| StoreError::Write(error.to_string()))?;

        Ok(id)
    }

    async fn set_network_enabled(&self, enabled: bool) -> StoreResult<()> {
        let previous = self.network_enabled.swap(enabled, Ordering::SeqCst);
        if previous != enabled {
            tracing::debug!(
                "Message store network {}",
                if enabled { "enabled" } else { "disabled" }
            );
        }
        Ok(())
    }
}

fn parse_document(row: &libsql::Row) -> libsql::Result<RemoteDocument> {
    let nanos: i64 = row.get(3)?;
    let latitude: Option<f64> = row.get(7)?;
    let longitude: Option<f64> = row.get(8)?;

    let location = match (latitude, longitude) {
        (Some(latitude), Some(longitude)) => Some(RemoteLocation {
            latitude,
            longitude,
        }),
        _ => None,
    };

    Ok(RemoteDocument {
        id: row.get(0)?,
        record: RemoteRecord {
            text: row.get(1)?,
            created_at: RemoteTimestamp {
                seconds: row.get(2)?,
                nanoseconds: u32::try_from(nanos).unwrap_or_default(),
            },
            user: RemoteUser {
                id: row.get(4)?,
                name: row.get(5)?,
                avatar: row.get(6)?,
            },
            location,
            image: row.get(9)?,
            client_id: row.get(10)?,
        },
    })
}
