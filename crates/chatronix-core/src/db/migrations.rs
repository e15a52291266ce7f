//! Database migrations

use crate::error::Result;
use libsql::Connection;

use super::connection::Schema;

/// Run all pending migrations for `schema`
pub async fn run(conn: &Connection, schema: Schema) -> Result<()> {
    let version = get_version(conn).await?;

    match schema {
        Schema::Cache => {
            if version < 1 {
                migrate_cache_v1(conn).await?;
            }
        }
        Schema::Messages => {
            if version < 1 {
                migrate_messages_v1(conn).await?;
            }
        }
    }

    Ok(())
}

async fn get_version(conn: &Connection) -> Result<i32> {
    let mut rows = conn
        .query(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
            (),
        )
        .await?;

    let exists: bool = if let Some(row) = rows.next().await? {
        row.get::<i32>(0)? != 0
    } else {
        false
    };

    if !exists {
        return Ok(0);
    }

    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM schema_version", ())
        .await?;

    let version: i32 = if let Some(row) = rows.next().await? {
        row.get(0)?
    } else {
        0
    };

    Ok(version)
}

async fn apply(conn: &Connection, version: i32, statements: &[&str]) -> Result<()> {
    // libsql has no execute_batch; run statements one by one inside a transaction
    conn.execute("BEGIN TRANSACTION", ()).await?;

    for statement in statements {
        if let Err(error) = conn.execute(statement, ()).await {
            conn.execute("ROLLBACK", ()).await.ok();
            return Err(error.into());
        }
    }

    if let Err(error) = conn
        .execute(
            "INSERT OR REPLACE INTO schema_version (version) VALUES (?)",
            [version],
        )
        .await
    {
        conn.execute("ROLLBACK", ()).await.ok();
        return Err(error.into());
    }

    conn.execute("COMMIT", ()).await?;
    tracing::debug!("Applied schema version {}", version);
    Ok(())
}

/// Cache version 1: single key/value table
async fn migrate_cache_v1(conn: &Connection) -> Result<()> {
    apply(
        conn,
        1,
        &[
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            )",
            "CREATE TABLE IF NOT EXISTS cache_entries (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )",
        ],
    )
    .await
}

/// Messages version 1: append-only documents grouped by collection
async fn migrate_messages_v1(conn: &Connection) -> Result<()> {
    apply(
        conn,
        1,
        &[
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            )",
            "CREATE TABLE IF NOT EXISTS messages (
                id TEXT PRIMARY KEY,
                collection TEXT NOT NULL,
                text TEXT NOT NULL DEFAULT '',
                created_at_seconds INTEGER NOT NULL,
                created_at_nanos INTEGER NOT NULL DEFAULT 0,
                author_id TEXT NOT NULL,
                author_name TEXT NOT NULL,
                author_avatar TEXT,
                latitude REAL,
                longitude REAL,
                image_url TEXT,
                client_id TEXT
            )",
            "CREATE INDEX IF NOT EXISTS idx_messages_collection_created
                ON messages(collection, created_at_seconds DESC, created_at_nanos DESC)",
        ],
    )
    .await
}
