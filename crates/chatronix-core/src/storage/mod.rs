//! Object storage for message attachments.

mod memory;
mod r2;

pub use memory::MemoryObjectStore;
pub use r2::{R2Config, R2ObjectStore};

use crate::error::Result;

/// Handle to an uploaded object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    /// Normalized object key inside the bucket
    pub key: String,
}

/// Binary blob storage with externally addressable URLs (async)
#[allow(async_fn_in_trait)]
pub trait ObjectStore {
    /// Upload `bytes` under `path`.
    async fn upload(&self, path: &str, bytes: &[u8], content_type: Option<&str>)
        -> Result<ObjectRef>;

    /// URL other clients can fetch the object from.
    fn download_url(&self, object: &ObjectRef) -> Result<String>;
}

/// Object path for an image attachment: `{unix_millis}-{user_id}[.ext]`.
pub fn attachment_object_path(user_id: &str, unix_millis: i64, extension: Option<&str>) -> String {
    let user = crate::util::sanitize_token(user_id);
    let user = if user.is_empty() {
        "anonymous".to_string()
    } else {
        user
    };
    let extension = extension
        .map(crate::util::sanitize_token)
        .filter(|value| !value.is_empty());

    match extension {
        Some(extension) => format!("{unix_millis}-{user}.{extension}"),
        None => format!("{unix_millis}-{user}"),
    }
}

pub(crate) fn normalize_object_key(object_key: &str) -> Result<String> {
    let object_key = object_key.trim().trim_matches('/').to_string();
    if object_key.is_empty() {
        return Err(crate::Error::InvalidInput(
            "Attachment object_key cannot be empty".to_string(),
        ));
    }
    Ok(object_key)
}
