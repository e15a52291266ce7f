//! libSQL connection handling for the cache and the message replica

use crate::error::Result;
use libsql::{Builder, Connection, Database as LibSqlDatabase};
use std::path::Path;
use std::time::Duration;

use super::migrations;

const DEFAULT_REPLICA_SYNC_INTERVAL: Duration = Duration::from_secs(5);

/// Which set of tables a database file carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schema {
    /// On-device key/value cache
    Cache,
    /// Message collections served to subscribers
    Messages,
}

/// Remote Turso database the message replica follows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Remote database URL (e.g., `libsql://chat.turso.io`)
    pub url: String,
    pub auth_token: String,
    /// Background replica sync period
    pub sync_interval: Duration,
    /// Contact the remote while opening. When false the replica opens from
    /// its local file and only syncs once the store is asked to.
    pub connect_on_open: bool,
}

impl SyncConfig {
    pub fn new(url: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            auth_token: auth_token.into(),
            sync_interval: DEFAULT_REPLICA_SYNC_INTERVAL,
            connect_on_open: true,
        }
    }

    /// Open without touching the network (the app started offline).
    #[must_use]
    pub const fn deferred(mut self) -> Self {
        self.connect_on_open = false;
        self
    }
}

/// A libSQL database plus the single connection chatronix uses on it
pub struct Database {
    db: LibSqlDatabase,
    conn: Connection,
    replica: bool,
}

impl Database {
    /// Open (or create) a local database file and bring its schema up to date.
    pub async fn open(path: impl AsRef<Path>, schema: Schema) -> Result<Self> {
        let path = path.as_ref().to_string_lossy().to_string();
        let db = Builder::new_local(&path).build().await?;
        Self::prepare(db, false, schema).await
    }

    pub async fn open_in_memory(schema: Schema) -> Result<Self> {
        let db = Builder::new_local(":memory:").build().await?;
        Self::prepare(db, false, schema).await
    }

    /// Open the message database as an embedded replica. Reads are served
    /// from the local file and writes are forwarded to the remote.
    pub async fn open_replica(local_path: impl AsRef<Path>, config: &SyncConfig) -> Result<Self> {
        let path = local_path.as_ref().to_string_lossy().to_string();

        let mut builder =
            Builder::new_remote_replica(&path, config.url.clone(), config.auth_token.clone());
        if config.connect_on_open {
            builder = builder.sync_interval(config.sync_interval);
        }
        let db = builder.build().await?;
        let conn = db.connect()?;
        let database = Self {
            db,
            conn,
            replica: true,
        };

        // Pull the remote schema first so existing collections survive migration
        if config.connect_on_open {
            if let Err(error) = database.sync().await {
                tracing::warn!("Initial replica sync failed, serving local file: {}", error);
            }
        } else {
            tracing::info!("Opening replica without initial sync");
        }

        database.configure().await;
        migrations::run(&database.conn, Schema::Messages).await?;
        Ok(database)
    }

    async fn prepare(db: LibSqlDatabase, replica: bool, schema: Schema) -> Result<Self> {
        let conn = db.connect()?;
        let database = Self { db, conn, replica };
        database.configure().await;
        migrations::run(&database.conn, schema).await?;
        Ok(database)
    }

    async fn configure(&self) {
        // Replicas may reject pragmas
        for pragma in ["PRAGMA journal_mode = WAL;", "PRAGMA synchronous = NORMAL;"] {
            if let Err(error) = self.conn.execute(pragma, ()).await {
                tracing::debug!("Skipping {}: {}", pragma, error);
            }
        }
    }

    /// Pull remote changes into the replica. A no-op for local databases.
    pub async fn sync(&self) -> Result<()> {
        if self.replica {
            self.db.sync().await?;
            tracing::debug!("Replica synced with remote");
        }
        Ok(())
    }

    pub const fn connection(&self) -> &Connection {
        &self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::env;
    use tempfile::tempdir;

    async fn table_count(db: &Database, name: &str) -> i64 {
        let mut rows = db
            .connection()
            .query(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                [name],
            )
            .await
            .unwrap();
        let row = rows.next().await.unwrap().unwrap();
        row.get::<i64>(0).unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn in_memory_sync_is_a_no_op() {
        let db = Database::open_in_memory(Schema::Messages).await.unwrap();
        db.sync().await.unwrap();
        assert_eq!(table_count(&db, "messages").await, 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn local_file_gets_cache_schema() {
        let tmp = tempdir().unwrap();
        let db = Database::open(tmp.path().join("cache.db"), Schema::Cache)
            .await
            .unwrap();

        assert_eq!(table_count(&db, "cache_entries").await, 1);
        assert_eq!(table_count(&db, "messages").await, 0);
    }

    #[test]
    fn sync_config_connects_on_open_unless_deferred() {
        let config = SyncConfig::new("libsql://chat.turso.io", "token");
        assert!(config.connect_on_open);
        assert_eq!(config.sync_interval, DEFAULT_REPLICA_SYNC_INTERVAL);

        let deferred = config.deferred();
        assert!(!deferred.connect_on_open);
        assert_eq!(deferred.url, "libsql://chat.turso.io");
    }

    /// Run with: CHATRONIX_MESSAGE_STORE_URL=... CHATRONIX_MESSAGE_STORE_TOKEN=... cargo test replica_syncs_with_turso -- --ignored
    #[tokio::test(flavor = "multi_thread")]
    #[ignore = "Requires CHATRONIX_MESSAGE_STORE_URL and CHATRONIX_MESSAGE_STORE_TOKEN"]
    async fn replica_syncs_with_turso() {
        let _ = dotenvy::dotenv();
        let url = env::var("CHATRONIX_MESSAGE_STORE_URL")
            .expect("CHATRONIX_MESSAGE_STORE_URL must be set");
        let token = env::var("CHATRONIX_MESSAGE_STORE_TOKEN")
            .expect("CHATRONIX_MESSAGE_STORE_TOKEN must be set");

        let tmp = tempdir().unwrap();
        let db = Database::open_replica(tmp.path().join("messages.db"), &SyncConfig::new(url, token))
            .await
            .unwrap();
        db.sync().await.expect("Sync should succeed");
    }
}
