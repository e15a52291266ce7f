pub mod chat;
pub mod config;
pub mod history;
pub mod start;

use std::path::PathBuf;

use chatronix_core::backend::Backend;
use chatronix_core::config::BackendConfig;

use crate::error::CliError;
use crate::paths::{resolve_config_path, resolve_data_dir};

/// Paths and global flags shared by every command.
pub struct AppContext {
    pub config_path: PathBuf,
    pub data_dir: PathBuf,
    pub offline: bool,
}

impl AppContext {
    pub fn resolve(
        config_path: Option<PathBuf>,
        data_dir: Option<PathBuf>,
        offline: bool,
    ) -> Result<Self, CliError> {
        Ok(Self {
            config_path: resolve_config_path(config_path)?,
            data_dir: resolve_data_dir(data_dir)?,
            offline,
        })
    }

    /// File config overlaid by `CHATRONIX_*` environment variables.
    pub fn load_config(&self) -> Result<BackendConfig, CliError> {
        Ok(BackendConfig::load_from_path(&self.config_path)?.with_env())
    }

    /// Connect every configured collaborator and install the process-wide
    /// backend.
    pub async fn backend(&self) -> Result<(&'static Backend, BackendConfig), CliError> {
        let config = self.load_config()?;
        let backend = Backend::connect(&config, &self.data_dir, self.offline).await?;
        Ok((Backend::install(backend)?, config))
    }
}
