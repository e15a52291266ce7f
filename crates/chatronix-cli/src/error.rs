use std::io;

use chatronix_core::backend::BackendError;
use chatronix_core::config::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] chatronix_core::Error),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error(
        "Supabase auth is not configured. Run `chatronix config init --supabase-url <URL> --supabase-anon-key <KEY>` or set CHATRONIX_SUPABASE_URL and CHATRONIX_SUPABASE_ANON_KEY."
    )]
    AuthNotConfigured,
    #[error("Sign-in failed")]
    SignInFailed,
    #[error("Failed to resolve the {0} directory")]
    MissingDirectory(&'static str),
}
