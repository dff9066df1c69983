//! Error types for thingy-core

use thiserror::Error;

use crate::remote::RemoteError;

/// Result type alias using thingy-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in thingy-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Local storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// `SQLite` error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Record not found in a document
    #[error("Not found: {0}")]
    NotFound(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Remote content could not be decoded into a document
    #[error("Malformed remote content: {0}")]
    MalformedContent(String),

    /// Remote blob store error
    #[error(transparent)]
    Remote(#[from] RemoteError),
}
