//! Crate-wide error type

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// A local backend (cache, store lock) could not serve the request
    #[error("Unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Cached or remote JSON did not match the expected shape
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Attachment upload or URL resolution failed
    #[error("Object storage error: {0}")]
    Storage(String),
}
