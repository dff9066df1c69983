//! In-process remote store.
//!
//! Behaves like the gist API for one or more credentials: resources are
//! private to the token that created them, every write gets a strictly later
//! `updated_at`, and failures can be injected per operation.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};

use super::{
    Credential, RemoteContent, RemoteError, RemoteRecord, RemoteResult, RemoteStamp, RemoteStore,
};

/// Remote operations, for failure injection and call counting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteOp {
    List,
    Create,
    Fetch,
    Update,
}

#[derive(Debug, Clone)]
struct StoredResource {
    id: String,
    owner: String,
    label: String,
    files: BTreeMap<String, String>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct MemoryState {
    resources: Vec<StoredResource>,
    next_id: u64,
    clock: Option<DateTime<Utc>>,
    failures: HashMap<RemoteOp, RemoteError>,
    revoked: HashSet<String>,
    calls: HashMap<RemoteOp, usize>,
}

impl MemoryState {
    fn tick(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let next = match self.clock {
            Some(previous) if previous >= now => previous + Duration::seconds(1),
            _ => now,
        };
        self.clock = Some(next);
        next
    }

    fn begin(&mut self, op: RemoteOp, credential: &Credential) -> RemoteResult<()> {
        *self.calls.entry(op).or_default() += 1;
        if let Some(error) = self.failures.get(&op) {
            return Err(error.clone());
        }
        if self.revoked.contains(credential.expose()) {
            return Err(RemoteError::Auth {
                status: 401,
                message: "Bad credentials".to_string(),
            });
        }
        Ok(())
    }

    fn owned_mut(&mut self, credential: &Credential, id: &str) -> RemoteResult<&mut StoredResource> {
        self.resources
            .iter_mut()
            .find(|resource| resource.id == id && resource.owner == credential.expose())
            .ok_or(RemoteError::NotFound)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryRemoteStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Make `op` fail with `error` until cleared with `None`
    pub fn set_failure(&self, op: RemoteOp, error: Option<RemoteError>) {
        let mut state = self.lock();
        match error {
            Some(error) => {
                state.failures.insert(op, error);
            }
            None => {
                state.failures.remove(&op);
            }
        }
    }

    /// Make every operation fail (or succeed again with `None`)
    pub fn set_failure_all(&self, error: Option<RemoteError>) {
        for op in [RemoteOp::List, RemoteOp::Create, RemoteOp::Fetch, RemoteOp::Update] {
            self.set_failure(op, error.clone());
        }
    }

    /// Reject a token from now on with an auth error
    pub fn revoke(&self, credential: &Credential) {
        self.lock().revoked.insert(credential.expose().to_string());
    }

    pub fn calls(&self, op: RemoteOp) -> usize {
        self.lock().calls.get(&op).copied().unwrap_or(0)
    }

    /// Seed a resource as if another client had created it
    pub fn insert(
        &self,
        credential: &Credential,
        label: &str,
        file_name: &str,
        content: &str,
    ) -> RemoteStamp {
        let mut state = self.lock();
        state.next_id += 1;
        let id = format!("mem-{}", state.next_id);
        let updated_at = state.tick();
        state.resources.push(StoredResource {
            id: id.clone(),
            owner: credential.expose().to_string(),
            label: label.to_string(),
            files: BTreeMap::from([(file_name.to_string(), content.to_string())]),
            updated_at,
        });
        RemoteStamp { id, updated_at }
    }

    /// Overwrite a file as if another client had pushed, returning the new stamp
    pub fn overwrite(&self, id: &str, file_name: &str, content: &str) -> Option<RemoteStamp> {
        let mut state = self.lock();
        let updated_at = state.tick();
        let resource = state.resources.iter_mut().find(|resource| resource.id == id)?;
        resource
            .files
            .insert(file_name.to_string(), content.to_string());
        resource.updated_at = updated_at;
        Some(RemoteStamp {
            id: id.to_string(),
            updated_at,
        })
    }

    /// Delete a resource out-of-band
    pub fn delete(&self, id: &str) -> bool {
        let mut state = self.lock();
        let before = state.resources.len();
        state.resources.retain(|resource| resource.id != id);
        state.resources.len() != before
    }

    pub fn content(&self, id: &str, file_name: &str) -> Option<String> {
        self.lock()
            .resources
            .iter()
            .find(|resource| resource.id == id)
            .and_then(|resource| resource.files.get(file_name).cloned())
    }

    pub fn updated_at(&self, id: &str) -> Option<DateTime<Utc>> {
        self.lock()
            .resources
            .iter()
            .find(|resource| resource.id == id)
            .map(|resource| resource.updated_at)
    }

    /// Ids of every resource carrying `label`, oldest first
    pub fn ids_with_label(&self, label: &str) -> Vec<String> {
        self.lock()
            .resources
            .iter()
            .filter(|resource| resource.label == label)
            .map(|resource| resource.id.clone())
            .collect()
    }
}

impl RemoteStore for MemoryRemoteStore {
    async fn find_by_label(
        &self,
        credential: &Credential,
        label: &str,
    ) -> RemoteResult<Option<RemoteRecord>> {
        let mut state = self.lock();
        state.begin(RemoteOp::List, credential)?;
        Ok(state
            .resources
            .iter()
            .find(|resource| resource.owner == credential.expose() && resource.label == label)
            .map(|resource| RemoteRecord {
                id: resource.id.clone(),
                label: resource.label.clone(),
                updated_at: resource.updated_at,
            }))
    }

    async fn create(
        &self,
        credential: &Credential,
        label: &str,
        file_name: &str,
        content: &str,
    ) -> RemoteResult<RemoteStamp> {
        self.lock().begin(RemoteOp::Create, credential)?;
        Ok(self.insert(credential, label, file_name, content))
    }

    async fn fetch(
        &self,
        credential: &Credential,
        id: &str,
        file_name: &str,
    ) -> RemoteResult<RemoteContent> {
        let mut state = self.lock();
        state.begin(RemoteOp::Fetch, credential)?;
        let resource = state.owned_mut(credential, id)?;
        Ok(RemoteContent {
            content: resource.files.get(file_name).cloned(),
            updated_at: resource.updated_at,
        })
    }

    async fn update(
        &self,
        credential: &Credential,
        id: &str,
        file_name: &str,
        content: &str,
    ) -> RemoteResult<RemoteStamp> {
        let mut state = self.lock();
        state.begin(RemoteOp::Update, credential)?;
        let updated_at = state.tick();
        let resource = state.owned_mut(credential, id)?;
        resource
            .files
            .insert(file_name.to_string(), content.to_string());
        resource.updated_at = updated_at;
        Ok(RemoteStamp {
            id: id.to_string(),
            updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(raw: &str) -> Credential {
        Credential::new(raw).unwrap()
    }

    #[tokio::test]
    async fn resources_are_private_to_their_owner() {
        let remote = MemoryRemoteStore::new();
        let alice = token("alice");
        let bob = token("bob");
        let stamp = remote.insert(&alice, "THINGY Todo Data", "todos.json", "{}");

        assert!(remote
            .find_by_label(&bob, "THINGY Todo Data")
            .await
            .unwrap()
            .is_none());
        assert_eq!(
            remote.fetch(&bob, &stamp.id, "todos.json").await,
            Err(RemoteError::NotFound)
        );
        let found = remote
            .find_by_label(&alice, "THINGY Todo Data")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, stamp.id);
    }

    #[tokio::test]
    async fn writes_get_strictly_later_timestamps() {
        let remote = MemoryRemoteStore::new();
        let alice = token("alice");
        let first = remote.insert(&alice, "label", "file", "1");
        let second = remote
            .update(&alice, &first.id, "file", "2")
            .await
            .unwrap();
        assert!(second.updated_at > first.updated_at);
        assert_eq!(remote.content(&first.id, "file").as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn injected_failures_and_revocation() {
        let remote = MemoryRemoteStore::new();
        let alice = token("alice");
        remote.set_failure(
            RemoteOp::List,
            Some(RemoteError::Network("offline".to_string())),
        );
        assert!(matches!(
            remote.find_by_label(&alice, "label").await,
            Err(RemoteError::Network(_))
        ));
        assert_eq!(remote.calls(RemoteOp::List), 1);

        remote.set_failure_all(None);
        remote.revoke(&alice);
        assert!(matches!(
            remote.create(&alice, "label", "file", "{}").await,
            Err(RemoteError::Auth { status: 401, .. })
        ));
        assert!(remote.ids_with_label("label").is_empty());
    }
}
