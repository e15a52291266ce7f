//! On-device cache of the last observed message list.

mod database;
mod memory;

pub use database::LibSqlCache;
pub use memory::MemoryCache;

use crate::error::Result;
use crate::models::Message;

/// Cache slot holding the JSON array of the last observed messages.
pub const CACHED_MESSAGES_KEY: &str = "cachedMessages";

/// Persistent key/value store for serialized values (async)
#[allow(async_fn_in_trait)]
pub trait LocalCache {
    /// Read the serialized value stored under `key`
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Overwrite the value stored under `key`
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key` if present
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Load the cached message list, in the order it was written. Entries
/// without an id are dropped.
pub async fn load_messages<C: LocalCache>(cache: &C) -> Result<Option<Vec<Message>>> {
    let Some(raw) = cache.get(CACHED_MESSAGES_KEY).await? else {
        return Ok(None);
    };
    let mut messages: Vec<Message> = serde_json::from_str(&raw)?;
    let cached = messages.len();
    messages.retain(|message| !message.id.as_str().trim().is_empty());
    if messages.len() < cached {
        tracing::warn!(
            "Dropped {} cached messages without an id",
            cached - messages.len()
        );
    }
    Ok(Some(messages))
}

/// Overwrite the cached message list.
pub async fn store_messages<C: LocalCache>(cache: &C, messages: &[Message]) -> Result<()> {
    let raw = serde_json::to_string(messages)?;
    cache.set(CACHED_MESSAGES_KEY, &raw).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Attachment, Author};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn load_messages_returns_none_when_absent() {
        let cache = MemoryCache::new();
        assert!(load_messages(&cache).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn stored_messages_reload_in_written_order() {
        let cache = MemoryCache::new();
        let author = Author::new("u1", "Ada");
        let mut older = Message::text(author.clone(), "first");
        older.created_at -= chrono::Duration::seconds(30);
        let newer = Message::with_attachment(
            author,
            Attachment::Image {
                url: "https://x/y.png".to_string(),
            },
        );

        // Written oldest-first on purpose: the cache never re-sorts
        let messages = vec![older, newer];
        store_messages(&cache, &messages).await.unwrap();

        assert_eq!(load_messages(&cache).await.unwrap(), Some(messages));
    }

    #[tokio::test]
    async fn cached_entries_without_id_are_dropped() {
        let cache = MemoryCache::new();
        let author = Author::new("u1", "Ada");
        let kept = Message::text(author.clone(), "kept");
        let mut raw = serde_json::to_value(vec![
            Message::text(author.clone(), "blank id"),
            kept.clone(),
            Message::text(author, "spaces id"),
        ])
        .unwrap();
        raw[0]["id"] = serde_json::json!("");
        raw[2]["id"] = serde_json::json!("  ");
        cache
            .set(CACHED_MESSAGES_KEY, &raw.to_string())
            .await
            .unwrap();

        assert_eq!(load_messages(&cache).await.unwrap(), Some(vec![kept]));
    }

    #[tokio::test]
    async fn corrupted_cache_is_an_error() {
        let cache = MemoryCache::new();
        cache.set(CACHED_MESSAGES_KEY, "not json").await.unwrap();
        assert!(load_messages(&cache).await.is_err());
    }
}
