//! Local persistence for documents and sync metadata

mod memory;
mod migrations;
mod sqlite;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::remote::Credential;
use crate::state::SyncState;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

const DOCUMENT_KEY: &str = "document";
const CREDENTIAL_KEY: &str = "credential";
const RESOURCE_ID_KEY: &str = "resource_id";
const LAST_SYNC_KEY: &str = "last_sync";
const PENDING_KEY: &str = "pending";

/// Durable namespaced key/value storage
pub trait KeyValueStore: Send + Sync + 'static {
    fn get(&self, namespace: &str, key: &str) -> Result<Option<String>>;
    fn set(&self, namespace: &str, key: &str, value: &str) -> Result<()>;
    fn remove(&self, namespace: &str, key: &str) -> Result<()>;
}

/// Typed view of one app's namespace in a [`KeyValueStore`].
#[derive(Clone)]
pub struct LocalPersistence {
    store: Arc<dyn KeyValueStore>,
    namespace: String,
}

impl LocalPersistence {
    pub fn new(store: Arc<dyn KeyValueStore>, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Load the stored document, or the default document if none was saved
    pub fn load_document<D: DeserializeOwned + Default>(&self) -> Result<D> {
        match self.get(DOCUMENT_KEY)? {
            Some(raw) => serde_json::from_str(&raw).map_err(|error| {
                Error::Storage(format!(
                    "stored {} document is corrupted: {error}",
                    self.namespace
                ))
            }),
            None => Ok(D::default()),
        }
    }

    pub fn save_document<D: Serialize>(&self, document: &D) -> Result<()> {
        let raw = serde_json::to_string(document)?;
        self.set(DOCUMENT_KEY, &raw)
    }

    pub fn credential(&self) -> Result<Option<Credential>> {
        Ok(self
            .get(CREDENTIAL_KEY)?
            .and_then(|raw| Credential::new(raw).ok()))
    }

    pub fn save_credential(&self, credential: &Credential) -> Result<()> {
        self.set(CREDENTIAL_KEY, credential.expose())
    }

    pub fn resource_id(&self) -> Result<Option<String>> {
        self.get(RESOURCE_ID_KEY)
    }

    /// Cache the remote resource id; `None` forgets it
    pub fn save_resource_id(&self, resource_id: Option<&str>) -> Result<()> {
        match resource_id {
            Some(id) => self.set(RESOURCE_ID_KEY, id),
            None => self.remove(RESOURCE_ID_KEY),
        }
    }

    pub fn last_sync(&self) -> Result<Option<DateTime<Utc>>> {
        let Some(raw) = self.get(LAST_SYNC_KEY)? else {
            return Ok(None);
        };
        match DateTime::parse_from_rfc3339(raw.trim()) {
            Ok(timestamp) => Ok(Some(timestamp.with_timezone(&Utc))),
            Err(error) => {
                tracing::warn!(
                    "Ignoring unparseable last sync timestamp for {}: {}",
                    self.namespace,
                    error
                );
                Ok(None)
            }
        }
    }

    pub fn save_last_sync(&self, timestamp: DateTime<Utc>) -> Result<()> {
        self.set(LAST_SYNC_KEY, &timestamp.to_rfc3339())
    }

    pub fn pending(&self) -> Result<bool> {
        Ok(self
            .get(PENDING_KEY)?
            .is_some_and(|raw| matches!(raw.trim(), "1" | "true")))
    }

    pub fn save_pending(&self, pending: bool) -> Result<()> {
        if pending {
            self.set(PENDING_KEY, "true")
        } else {
            self.remove(PENDING_KEY)
        }
    }

    pub fn load_sync_state(&self) -> Result<SyncState> {
        Ok(SyncState {
            resource_id: self.resource_id()?,
            last_sync: self.last_sync()?,
            pending: self.pending()?,
        })
    }

    /// Forget which remote resource this namespace is bound to.
    pub fn forget_remote(&self) -> Result<()> {
        self.remove(RESOURCE_ID_KEY)?;
        self.remove(LAST_SYNC_KEY)
    }

    /// Forget the credential and all sync metadata (logout).
    ///
    /// The document itself is kept.
    pub fn clear_sync_state(&self) -> Result<()> {
        for key in [CREDENTIAL_KEY, RESOURCE_ID_KEY, LAST_SYNC_KEY, PENDING_KEY] {
            self.remove(key)?;
        }
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        self.store.get(&self.namespace, key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.store.set(&self.namespace, key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.store.remove(&self.namespace, key)
    }
}
