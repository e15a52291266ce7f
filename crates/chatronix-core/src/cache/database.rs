//! libSQL-backed cache persisted in a local database file.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::Mutex;

use super::LocalCache;
use crate::db::{Database, Schema};
use crate::error::Result;

/// Key/value cache stored in the `cache_entries` table.
#[derive(Clone)]
pub struct LibSqlCache {
    db: Arc<Mutex<Database>>,
}

impl LibSqlCache {
    /// Open (or create) the cache database at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::open(path, Schema::Cache).await?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
        })
    }

    /// Open an in-memory cache database (primarily for tests).
    pub async fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory(Schema::Cache).await?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
        })
    }
}

impl LocalCache for LibSqlCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let db = self.db.lock().await;
        let mut rows = db
            .connection()
            .query("SELECT value FROM cache_entries WHERE key = ?", [key])
            .await?;

        if let Some(row) = rows.next().await? {
            let value: String = row.get(0)?;
            Ok(Some(value))
        } else {
            Ok(None)
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let db = self.db.lock().await;
        db.connection()
            .execute(
                "INSERT OR REPLACE INTO cache_entries (key, value, updated_at) VALUES (?, ?, ?)",
                libsql::params![key, value, chrono::Utc::now().timestamp_millis()],
            )
            .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let db = self.db.lock().await;
        db.connection()
            .execute("DELETE FROM cache_entries WHERE key = ?", [key])
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{load_messages, store_messages};
    use crate::models::{Author, Message};
    use tempfile::tempdir;

    #[tokio::test(flavor = "multi_thread")]
    async fn set_get_remove() {
        let cache = LibSqlCache::open_in_memory().await.unwrap();

        assert_eq!(cache.get("k").await.unwrap(), None);
        cache.set("k", "one").await.unwrap();
        cache.set("k", "two").await.unwrap();
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("two"));

        cache.remove("k").await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn messages_survive_reopen() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("nested").join("cache.db");
        let messages = vec![Message::text(Author::new("u1", "Ada"), "persisted")];

        {
            let cache = LibSqlCache::open(&path).await.unwrap();
            store_messages(&cache, &messages).await.unwrap();
        }

        let reopened = LibSqlCache::open(&path).await.unwrap();
        assert_eq!(load_messages(&reopened).await.unwrap(), Some(messages));
    }
}
