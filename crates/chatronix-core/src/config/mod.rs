//! Backend configuration shared by every Chatronix interface.
//!
//! Values come from a JSON file and are overlaid by `CHATRONIX_*` environment
//! variables. Endpoints and keys stored here are public client values; the R2
//! credentials are read from `R2_*` variables only and never persisted.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::SyncConfig;
use crate::store::DEFAULT_COLLECTION;
use crate::util::{is_http_url, normalize_text_option};

pub const ENV_SUPABASE_URL: &str = "CHATRONIX_SUPABASE_URL";
pub const ENV_SUPABASE_ANON_KEY: &str = "CHATRONIX_SUPABASE_ANON_KEY";
pub const ENV_MESSAGE_STORE_URL: &str = "CHATRONIX_MESSAGE_STORE_URL";
pub const ENV_MESSAGE_STORE_TOKEN: &str = "CHATRONIX_MESSAGE_STORE_TOKEN";
pub const ENV_COLLECTION: &str = "CHATRONIX_COLLECTION";
pub const ENV_CACHE_PATH: &str = "CHATRONIX_CACHE_PATH";
pub const ENV_CONNECTIVITY_URL: &str = "CHATRONIX_CONNECTIVITY_URL";
pub const ENV_POLL_INTERVAL_MS: &str = "CHATRONIX_POLL_INTERVAL_MS";

const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;
const CACHE_FILE_NAME: &str = "cache.db";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Incomplete {section} configuration: missing {missing}")]
    Incomplete {
        section: &'static str,
        missing: &'static str,
    },
    #[error("Invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supabase_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supabase_anon_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_store_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_store_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connectivity_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval_ms: Option<u64>,
}

impl BackendConfig {
    /// Read the config file. A missing file yields the empty config.
    pub fn load_from_path(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let write_error = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_error)?;
        }
        let raw = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, raw).map_err(write_error)
    }

    /// Overlay values from `CHATRONIX_*` environment variables.
    #[must_use]
    pub fn with_env(self) -> Self {
        self.with_lookup(|key| std::env::var(key).ok())
    }

    /// Overlay values from an arbitrary variable source. Blank values are
    /// ignored.
    #[must_use]
    pub fn with_lookup(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key| normalize_text_option(lookup(key));

        if let Some(value) = read(ENV_SUPABASE_URL) {
            self.supabase_url = Some(value);
        }
        if let Some(value) = read(ENV_SUPABASE_ANON_KEY) {
            self.supabase_anon_key = Some(value);
        }
        if let Some(value) = read(ENV_MESSAGE_STORE_URL) {
            self.message_store_url = Some(value);
        }
        if let Some(value) = read(ENV_MESSAGE_STORE_TOKEN) {
            self.message_store_token = Some(value);
        }
        if let Some(value) = read(ENV_COLLECTION) {
            self.collection = Some(value);
        }
        if let Some(value) = read(ENV_CACHE_PATH) {
            self.cache_path = Some(PathBuf::from(value));
        }
        if let Some(value) = read(ENV_CONNECTIVITY_URL) {
            self.connectivity_url = Some(value);
        }
        if let Some(value) = read(ENV_POLL_INTERVAL_MS) {
            match value.parse::<u64>() {
                Ok(ms) => self.poll_interval_ms = Some(ms),
                Err(error) => {
                    tracing::warn!("Ignoring {}={}: {}", ENV_POLL_INTERVAL_MS, value, error);
                }
            }
        }
        self
    }

    /// Reject half-configured collaborators and malformed endpoints.
    pub fn validate(&self) -> ConfigResult<()> {
        self.supabase()?;
        self.message_sync_config()?;
        if let Some(url) = normalize_text_option(self.connectivity_url.clone()) {
            if !is_http_url(&url) {
                return Err(ConfigError::Invalid {
                    field: "connectivity_url",
                    reason: "must include http:// or https://".to_string(),
                });
            }
        }
        if self.poll_interval_ms == Some(0) {
            return Err(ConfigError::Invalid {
                field: "poll_interval_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Supabase URL and anon key, or `None` when auth is not configured.
    pub fn supabase(&self) -> ConfigResult<Option<(String, String)>> {
        let url = normalize_text_option(self.supabase_url.clone());
        let anon_key = normalize_text_option(self.supabase_anon_key.clone());
        match (url, anon_key) {
            (None, None) => Ok(None),
            (Some(url), Some(anon_key)) => {
                if !is_http_url(&url) {
                    return Err(ConfigError::Invalid {
                        field: "supabase_url",
                        reason: "must include http:// or https://".to_string(),
                    });
                }
                Ok(Some((url, anon_key)))
            }
            (Some(_), None) => Err(ConfigError::Incomplete {
                section: "Supabase",
                missing: "supabase_anon_key",
            }),
            (None, Some(_)) => Err(ConfigError::Incomplete {
                section: "Supabase",
                missing: "supabase_url",
            }),
        }
    }

    /// Sync settings for the remote message database, or `None` when no
    /// message store is configured.
    pub fn message_sync_config(&self) -> ConfigResult<Option<SyncConfig>> {
        let url = normalize_text_option(self.message_store_url.clone());
        let token = normalize_text_option(self.message_store_token.clone());
        match (url, token) {
            (None, None) => Ok(None),
            (Some(url), Some(token)) => {
                if !(url.starts_with("libsql://") || is_http_url(&url)) {
                    return Err(ConfigError::Invalid {
                        field: "message_store_url",
                        reason: "must start with libsql://, http:// or https://".to_string(),
                    });
                }
                Ok(Some(SyncConfig::new(url, token)))
            }
            (Some(_), None) => Err(ConfigError::Incomplete {
                section: "message store",
                missing: "message_store_token",
            }),
            (None, Some(_)) => Err(ConfigError::Incomplete {
                section: "message store",
                missing: "message_store_url",
            }),
        }
    }

    pub fn collection(&self) -> &str {
        self.collection
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_COLLECTION)
    }

    /// Cache database path, defaulting to `cache.db` inside `data_dir`.
    pub fn cache_path(&self, data_dir: &Path) -> PathBuf {
        self.cache_path
            .clone()
            .unwrap_or_else(|| data_dir.join(CACHE_FILE_NAME))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS))
    }

    pub fn connectivity_url(&self) -> Option<String> {
        normalize_text_option(self.connectivity_url.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn env_overrides_file_values() {
        let file = BackendConfig {
            collection: Some("from-file".to_string()),
            connectivity_url: Some("https://file.example".to_string()),
            ..BackendConfig::default()
        };
        let config = file.with_lookup(lookup(&[
            (ENV_COLLECTION, "from-env"),
            (ENV_POLL_INTERVAL_MS, "250"),
            (ENV_CONNECTIVITY_URL, "   "),
        ]));

        assert_eq!(config.collection(), "from-env");
        assert_eq!(config.poll_interval(), Duration::from_millis(250));
        assert_eq!(
            config.connectivity_url().as_deref(),
            Some("https://file.example")
        );
    }

    #[test]
    fn empty_config_disables_every_collaborator() {
        let config = BackendConfig::default();
        config.validate().unwrap();
        assert!(config.supabase().unwrap().is_none());
        assert!(config.message_sync_config().unwrap().is_none());
        assert_eq!(config.collection(), DEFAULT_COLLECTION);
    }

    #[test]
    fn partial_supabase_config_is_rejected() {
        let config = BackendConfig {
            supabase_url: Some("https://demo.supabase.co".to_string()),
            ..BackendConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Incomplete {
                missing: "supabase_anon_key",
                ..
            })
        ));
    }

    #[test]
    fn message_store_requires_supported_scheme() {
        let config = BackendConfig {
            message_store_url: Some("ftp://db.example".to_string()),
            message_store_token: Some("token".to_string()),
            ..BackendConfig::default()
        };
        assert!(config.validate().is_err());

        let config = BackendConfig {
            message_store_url: Some("libsql://chat.turso.io".to_string()),
            ..config
        };
        let sync = config.message_sync_config().unwrap().unwrap();
        assert_eq!(sync.url, "libsql://chat.turso.io");
    }

    #[test]
    fn save_then_load_from_path() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("chatronix").join("config.json");
        let config = BackendConfig {
            supabase_url: Some("https://demo.supabase.co".to_string()),
            supabase_anon_key: Some("anon".to_string()),
            poll_interval_ms: Some(500),
            ..BackendConfig::default()
        };

        config.save(&path).unwrap();
        assert_eq!(BackendConfig::load_from_path(&path).unwrap(), config);
    }

    #[test]
    fn missing_file_loads_default_and_unknown_fields_fail() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("config.json");
        assert_eq!(
            BackendConfig::load_from_path(&path).unwrap(),
            BackendConfig::default()
        );

        std::fs::write(&path, r#"{"unknown": true}"#).unwrap();
        assert!(matches!(
            BackendConfig::load_from_path(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn cache_path_defaults_inside_data_dir() {
        let config = BackendConfig::default();
        assert_eq!(
            config.cache_path(Path::new("/data")),
            PathBuf::from("/data/cache.db")
        );
    }
}
