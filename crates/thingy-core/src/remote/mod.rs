//! Remote blob store client.
//!
//! A gist-like service keeps one document per resource, addressed by id and
//! stamped with a server-assigned `updated_at`. [`RemoteStore`] is the seam the
//! sync engine talks through; [`GistClient`] speaks HTTP and
//! [`MemoryRemoteStore`] keeps everything in process.

mod gist;
mod memory;

use std::fmt;
use std::future::Future;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::error::{Error, Result};

pub use gist::GistClient;
pub use memory::{MemoryRemoteStore, RemoteOp};

/// Opaque bearer token
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let token = token.into().trim().to_string();
        if token.is_empty() {
            return Err(Error::InvalidInput("token must not be empty".to_string()));
        }
        Ok(Self(token))
    }

    /// Raw token, only for building the `Authorization` header or storage
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_tuple("Credential")
            .field(&"[REDACTED]")
            .finish()
    }
}

/// A resource found by label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRecord {
    pub id: String,
    pub label: String,
    pub updated_at: DateTime<Utc>,
}

/// Identity and version returned by create/update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteStamp {
    pub id: String,
    pub updated_at: DateTime<Utc>,
}

/// A fetched document. `content` is `None` when the resource has no file
/// with the dataset's name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteContent {
    pub content: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorKind {
    Network,
    Auth,
    RateLimited,
    NotFound,
    Api,
    InvalidPayload,
    Configuration,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Authentication failed: {message} ({status})")]
    Auth { status: u16, message: String },
    #[error("Rate limited by remote store")]
    RateLimited { retry_after: Option<u64> },
    #[error("Remote resource not found")]
    NotFound,
    #[error("Remote API error: {message} ({status})")]
    Api { status: u16, message: String },
    #[error("Remote listing still had results after {pages} pages")]
    ListingTruncated { pages: usize },
    #[error("Invalid remote payload: {0}")]
    InvalidPayload(String),
    #[error("Invalid remote configuration: {0}")]
    InvalidConfiguration(String),
}

impl RemoteError {
    pub const fn kind(&self) -> RemoteErrorKind {
        match self {
            Self::Network(_) => RemoteErrorKind::Network,
            Self::Auth { .. } => RemoteErrorKind::Auth,
            Self::RateLimited { .. } => RemoteErrorKind::RateLimited,
            Self::NotFound => RemoteErrorKind::NotFound,
            Self::Api { .. } | Self::ListingTruncated { .. } => RemoteErrorKind::Api,
            Self::InvalidPayload(_) => RemoteErrorKind::InvalidPayload,
            Self::InvalidConfiguration(_) => RemoteErrorKind::Configuration,
        }
    }
}

pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// Operations the sync engine needs from a remote blob store.
///
/// Every call is a single round-trip and none retry; retrying is left to the
/// next scheduled sync cycle.
pub trait RemoteStore: Send + Sync + 'static {
    /// First resource owned by the credential whose label matches exactly
    fn find_by_label(
        &self,
        credential: &Credential,
        label: &str,
    ) -> impl Future<Output = RemoteResult<Option<RemoteRecord>>> + Send;

    /// Create a private resource holding `content` under `file_name`
    fn create(
        &self,
        credential: &Credential,
        label: &str,
        file_name: &str,
        content: &str,
    ) -> impl Future<Output = RemoteResult<RemoteStamp>> + Send;

    fn fetch(
        &self,
        credential: &Credential,
        id: &str,
        file_name: &str,
    ) -> impl Future<Output = RemoteResult<RemoteContent>> + Send;

    /// Replace the content of `file_name` in an existing resource
    fn update(
        &self,
        credential: &Credential,
        id: &str,
        file_name: &str,
        content: &str,
    ) -> impl Future<Output = RemoteResult<RemoteStamp>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_debug_redacts_token() {
        let credential = Credential::new(" ghp_secret ").unwrap();
        assert_eq!(credential.expose(), "ghp_secret");
        let rendered = format!("{credential:?}");
        assert!(!rendered.contains("ghp_secret"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn credential_rejects_blank_tokens() {
        assert!(Credential::new("  ").is_err());
    }

    #[test]
    fn error_kinds() {
        assert_eq!(
            RemoteError::Network("offline".to_string()).kind(),
            RemoteErrorKind::Network
        );
        assert_eq!(RemoteError::NotFound.kind(), RemoteErrorKind::NotFound);
        assert_eq!(
            RemoteError::RateLimited { retry_after: None }.kind(),
            RemoteErrorKind::RateLimited
        );
    }
}
