//! In-process object store used by tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{normalize_object_key, ObjectRef, ObjectStore};
use crate::error::{Error, Result};

#[derive(Debug, Default)]
struct State {
    objects: HashMap<String, (Vec<u8>, Option<String>)>,
    uploads: usize,
    fail_uploads: bool,
}

/// Map-backed object store serving URLs under a fixed base. Clones share state.
#[derive(Debug, Clone)]
pub struct MemoryObjectStore {
    base_url: String,
    state: Arc<Mutex<State>>,
}

impl MemoryObjectStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            state: Arc::default(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn fail_uploads(&self, fail: bool) {
        self.lock().fail_uploads = fail;
    }

    /// Number of successful uploads.
    pub fn upload_count(&self) -> usize {
        self.lock().uploads
    }

    /// Stored bytes and content type for `key`.
    pub fn object(&self, key: &str) -> Option<(Vec<u8>, Option<String>)> {
        self.lock().objects.get(key).cloned()
    }
}

impl ObjectStore for MemoryObjectStore {
    async fn upload(
        &self,
        path: &str,
        bytes: &[u8],
        content_type: Option<&str>,
    ) -> Result<ObjectRef> {
        let key = normalize_object_key(path)?;
        let mut state = self.lock();
        if state.fail_uploads {
            return Err(Error::Storage(format!("upload rejected for {key}")));
        }
        state
            .objects
            .insert(key.clone(), (bytes.to_vec(), content_type.map(ToOwned::to_owned)));
        state.uploads += 1;
        Ok(ObjectRef { key })
    }

    fn download_url(&self, object: &ObjectRef) -> Result<String> {
        Ok(format!("{}/{}", self.base_url, object.key))
    }
}
