use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] thingy_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("No text provided")]
    EmptyContent,
    #[error("No access token provided")]
    EmptyToken,
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Not logged in. Run `thingy auth login` first.")]
    NotAuthenticated,
    #[error("Sync failed for {0}")]
    SyncFailed(String),
}
