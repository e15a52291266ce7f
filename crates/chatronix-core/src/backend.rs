//! Process-wide backend handles: identity, message store, object storage and
//! the local cache.

use std::path::Path;
use std::sync::OnceLock;

use thiserror::Error;

use crate::auth::{AuthError, KeyringSessionStore, SupabaseAuthClient};
use crate::db::SyncConfig;
use crate::cache::LibSqlCache;
use crate::config::{BackendConfig, ConfigError};
use crate::storage::{R2Config, R2ObjectStore};
use crate::store::{LibSqlMessageStore, StoreError};

const REPLICA_FILE_NAME: &str = "messages.db";

static BACKEND: OnceLock<Backend> = OnceLock::new();

#[derive(Debug, Error)]
pub enum BackendError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Core(#[from] crate::Error),
    #[error("Backend already initialised for this process")]
    AlreadyInstalled,
}

/// Concrete collaborators built from a [`BackendConfig`]. Each remote
/// collaborator is `None` when it is not configured or could not start.
pub struct Backend {
    pub identity: Option<SupabaseAuthClient<KeyringSessionStore>>,
    pub messages: Option<LibSqlMessageStore>,
    pub objects: Option<R2ObjectStore>,
    pub cache: LibSqlCache,
    pub collection: String,
}

impl Backend {
    /// Build every collaborator. Files live under `data_dir` unless the
    /// config overrides them. With `offline`, the message replica opens from
    /// its local file without contacting the remote.
    pub async fn connect(
        config: &BackendConfig,
        data_dir: &Path,
        offline: bool,
    ) -> Result<Self, BackendError> {
        config.validate()?;

        let cache = LibSqlCache::open(config.cache_path(data_dir)).await?;

        let identity = match config.supabase()? {
            Some((url, anon_key)) => {
                let store = KeyringSessionStore::new(&url);
                Some(SupabaseAuthClient::new(url, anon_key, store)?)
            }
            None => {
                tracing::info!("Supabase auth not configured");
                None
            }
        };

        let messages = match replica_config(config, offline)? {
            Some(sync_config) => {
                match LibSqlMessageStore::open(data_dir.join(REPLICA_FILE_NAME), sync_config).await
                {
                    Ok(store) => Some(store.with_poll_interval(config.poll_interval())),
                    Err(error) => {
                        tracing::error!("Message store unavailable: {}", error);
                        None
                    }
                }
            }
            None => {
                tracing::info!("Message store not configured");
                None
            }
        };

        let objects = R2Config::from_env()?.map(R2ObjectStore::new);
        if objects.is_none() {
            tracing::info!("R2 object storage not configured");
        }

        Ok(Self {
            identity,
            messages,
            objects,
            cache,
            collection: config.collection().to_string(),
        })
    }

    /// Make `backend` the process-wide instance.
    pub fn install(backend: Self) -> Result<&'static Self, BackendError> {
        BACKEND
            .set(backend)
            .map_err(|_| BackendError::AlreadyInstalled)?;
        BACKEND.get().ok_or(BackendError::AlreadyInstalled)
    }
}

fn replica_config(
    config: &BackendConfig,
    offline: bool,
) -> Result<Option<SyncConfig>, BackendError> {
    let sync_config = config.message_sync_config()?;
    Ok(if offline {
        sync_config.map(SyncConfig::deferred)
    } else {
        sync_config
    })
}
