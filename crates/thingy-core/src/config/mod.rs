//! Sync configuration shared by every client.
//!
//! [`SyncSettings`] describes where the remote blob store lives and how often
//! the scheduler runs; [`Dataset`] names one replicated document inside it.

use std::time::Duration;

use crate::error::{Error, Result};
use crate::util::{is_http_url, normalize_text_option};

/// Public GitHub API, the default gist-like store.
pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";
/// Collection path segment for resources (`/gists`).
pub const DEFAULT_COLLECTION: &str = "gists";
/// Periodic sync interval used while a credential is present.
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(10);
/// Shortest period the scheduler will run at.
pub const MIN_SYNC_INTERVAL: Duration = Duration::from_secs(1);

const DEFAULT_USER_AGENT: &str = concat!("thingy/", env!("CARGO_PKG_VERSION"));

/// Connection and scheduling settings for the sync engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    /// Base URL of the remote API, without trailing slash
    pub api_base_url: String,
    /// Path segment that lists/creates resources
    pub collection: String,
    /// Period between scheduled sync cycles
    pub sync_interval: Duration,
    /// Optional per-request timeout; `None` leaves the transport default
    pub request_timeout: Option<Duration>,
    /// `User-Agent` header sent on every request
    pub user_agent: String,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
            sync_interval: DEFAULT_SYNC_INTERVAL,
            request_timeout: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl SyncSettings {
    /// Point the client at another gist-like API.
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Result<Self> {
        self.api_base_url = normalize_api_base_url(url.into())?;
        Ok(self)
    }

    /// Use a different collection path (e.g. `resources`).
    pub fn with_collection(mut self, collection: impl Into<String>) -> Result<Self> {
        let collection = normalize_text_option(Some(collection.into()))
            .map(|value| value.trim_matches('/').to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| Error::InvalidInput("collection must not be empty".to_string()))?;
        self.collection = collection;
        Ok(self)
    }

    /// Set the automatic sync interval
    #[must_use]
    pub fn with_sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval = interval.max(MIN_SYNC_INTERVAL);
        self
    }

    /// Bound every HTTP request by `timeout`
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// URL of the resource collection, e.g. `https://api.github.com/gists`.
    pub fn collection_url(&self) -> String {
        format!("{}/{}", self.api_base_url, self.collection)
    }

    /// URL of a single resource.
    pub fn resource_url(&self, id: &str) -> String {
        format!("{}/{}", self.collection_url(), id)
    }
}

/// Validate and normalize an API base URL.
pub fn normalize_api_base_url(raw: String) -> Result<String> {
    let url = normalize_text_option(Some(raw))
        .ok_or_else(|| Error::InvalidInput("API base URL must not be empty".to_string()))?;
    if is_http_url(&url) {
        Ok(url.trim_end_matches('/').to_string())
    } else {
        Err(Error::InvalidInput(
            "API base URL must include http:// or https://".to_string(),
        ))
    }
}

/// One replicated document.
///
/// `label` is the remote description used to find the resource again,
/// `file_name` the file key inside it, and `namespace` separates the local
/// persistence keys of different apps sharing one database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    pub label: String,
    pub file_name: String,
    pub namespace: String,
}

impl Dataset {
    pub fn new(
        label: impl Into<String>,
        file_name: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Result<Self> {
        let label = normalize_text_option(Some(label.into()))
            .ok_or_else(|| Error::InvalidInput("dataset label must not be empty".to_string()))?;
        let file_name = normalize_text_option(Some(file_name.into())).ok_or_else(|| {
            Error::InvalidInput("dataset file name must not be empty".to_string())
        })?;
        let namespace = normalize_text_option(Some(namespace.into())).ok_or_else(|| {
            Error::InvalidInput("dataset namespace must not be empty".to_string())
        })?;
        Ok(Self {
            label,
            file_name,
            namespace,
        })
    }
}
