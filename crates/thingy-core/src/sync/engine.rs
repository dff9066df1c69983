//! Document-level last-write-wins sync engine.
//!
//! One engine replicates one [`Dataset`]. A cycle resolves the remote
//! resource, pulls it when the remote version is newer than the last one seen,
//! then pushes the local document if it has unconfirmed mutations. Nothing is
//! merged: the newer version wins wholesale.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::broadcast;

use super::ChangeTracker;
use crate::config::Dataset;
use crate::error::{Error, Result};
use crate::remote::{Credential, RemoteContent, RemoteError, RemoteErrorKind, RemoteStore};
use crate::state::{SyncState, SyncStatus};
use crate::storage::{KeyValueStore, LocalPersistence};

const EVENT_CAPACITY: usize = 32;

/// A replicated document. Only the serde codec is needed.
pub trait Document: Serialize + DeserializeOwned + Clone + Default + Send + 'static {}

impl<T> Document for T where T: Serialize + DeserializeOwned + Clone + Default + Send + 'static {}

/// Notifications for front ends
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// A newer remote version replaced the local document
    DocumentReplaced,
    StatusChanged(SyncStatus),
}

/// Why a cycle did not run (or stopped without touching state)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoCredential,
    AlreadySyncing,
    AuthRequired,
    /// Logout or a credential change happened mid-cycle
    SessionEnded,
}

/// Failure that ended a cycle
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SyncFailure {
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error("{0}")]
    Local(String),
}

impl From<Error> for SyncFailure {
    fn from(error: Error) -> Self {
        match error {
            Error::Remote(remote) => Self::Remote(remote),
            other => Self::Local(other.to_string()),
        }
    }
}

/// What one call to [`SyncEngine::sync`] did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub skipped: Option<SkipReason>,
    /// The local document was replaced by the remote version
    pub pulled: bool,
    /// The local document was written to the remote
    pub pushed: bool,
    /// The push created a new remote resource
    pub created: bool,
    /// Remote content that could not be decoded; the pull was abandoned
    pub malformed_remote: Option<String>,
    pub failure: Option<SyncFailure>,
}

impl SyncReport {
    fn skipped(reason: SkipReason) -> Self {
        Self {
            skipped: Some(reason),
            ..Self::default()
        }
    }

    /// The cycle ran and nothing failed
    pub fn is_success(&self) -> bool {
        self.skipped.is_none() && self.failure.is_none() && self.malformed_remote.is_none()
    }
}

enum Abort {
    Failed(SyncFailure),
    SessionEnded,
}

impl From<RemoteError> for Abort {
    fn from(error: RemoteError) -> Self {
        Self::Failed(error.into())
    }
}

impl From<Error> for Abort {
    fn from(error: Error) -> Self {
        Self::Failed(error.into())
    }
}

#[derive(Debug, Default)]
struct RemoteBinding {
    resource_id: Option<String>,
    last_sync: Option<DateTime<Utc>>,
}

/// Sync engine for one dataset.
///
/// All state lives behind short-lived locks that are never held across an
/// `.await`, so local mutations can interleave with a running cycle.
pub struct SyncEngine<D, R> {
    dataset: Dataset,
    persistence: LocalPersistence,
    remote: Arc<R>,
    document: Mutex<D>,
    tracker: ChangeTracker,
    credential: Mutex<Option<Credential>>,
    binding: Mutex<RemoteBinding>,
    status: Mutex<SyncStatus>,
    syncing: AtomicBool,
    epoch: AtomicU64,
    events: broadcast::Sender<SyncEvent>,
}

impl<D: Document, R: RemoteStore> SyncEngine<D, R> {
    /// Restore an engine from local storage.
    pub fn open(dataset: Dataset, store: Arc<dyn KeyValueStore>, remote: Arc<R>) -> Result<Self> {
        let persistence = LocalPersistence::new(store, dataset.namespace.clone());
        let document: D = persistence.load_document()?;
        let state = persistence.load_sync_state()?;
        let credential = persistence.credential()?;

        let status = match (&credential, state.last_sync) {
            (None, _) => SyncStatus::Dormant,
            (Some(_), None) => SyncStatus::NeverSynced,
            (Some(_), Some(at)) => SyncStatus::Synced { at },
        };
        if state.pending {
            tracing::debug!("{}: restored unpushed local changes", dataset.namespace);
        }

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            tracker: ChangeTracker::new(state.pending),
            binding: Mutex::new(RemoteBinding {
                resource_id: state.resource_id,
                last_sync: state.last_sync,
            }),
            dataset,
            persistence,
            remote,
            document: Mutex::new(document),
            credential: Mutex::new(credential),
            status: Mutex::new(status),
            syncing: AtomicBool::new(false),
            epoch: AtomicU64::new(0),
            events,
        })
    }

    pub const fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Snapshot of the current document
    pub fn document(&self) -> D {
        lock(&self.document).clone()
    }

    pub fn status(&self) -> SyncStatus {
        lock(&self.status).clone()
    }

    pub fn sync_state(&self) -> SyncState {
        let binding = lock(&self.binding);
        SyncState {
            resource_id: binding.resource_id.clone(),
            last_sync: binding.last_sync,
            pending: self.tracker.is_pending(),
        }
    }

    pub fn has_credential(&self) -> bool {
        lock(&self.credential).is_some()
    }

    pub fn is_syncing(&self) -> bool {
        self.syncing.load(Ordering::SeqCst)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// Apply a local mutation, persist it and mark it for push.
    ///
    /// The closure works on a copy; if it fails the document is unchanged.
    pub fn update<T>(&self, mutate: impl FnOnce(&mut D) -> Result<T>) -> Result<T> {
        let mut document = lock(&self.document);
        let mut draft = document.clone();
        let value = mutate(&mut draft)?;

        self.persistence.save_document(&draft)?;
        self.persistence.save_pending(true)?;
        *document = draft;
        self.tracker.set_pending();
        Ok(value)
    }

    /// Supply a credential, waking the engine up.
    ///
    /// A different token may belong to another account, so the cached
    /// resource id and sync timestamp are dropped.
    pub fn set_credential(&self, credential: Credential) -> Result<()> {
        let mut current = lock(&self.credential);
        let changed = current.as_ref().is_some_and(|existing| *existing != credential);

        self.persistence.save_credential(&credential)?;
        if changed {
            tracing::info!("{}: credential changed; forgetting remote binding", self.namespace());
            self.epoch.fetch_add(1, Ordering::SeqCst);
            self.persistence.forget_remote()?;
            *lock(&self.binding) = RemoteBinding::default();
        }
        *current = Some(credential);
        drop(current);

        let status = match lock(&self.binding).last_sync {
            Some(at) => SyncStatus::Synced { at },
            None => SyncStatus::NeverSynced,
        };
        self.set_status(status);
        Ok(())
    }

    /// Drop the credential and all sync metadata. The document stays.
    pub fn logout(&self) -> Result<()> {
        {
            let mut credential = lock(&self.credential);
            self.epoch.fetch_add(1, Ordering::SeqCst);
            *credential = None;
        }
        *lock(&self.binding) = RemoteBinding::default();
        self.tracker.clear_pending();
        self.persistence.clear_sync_state()?;
        self.set_status(SyncStatus::Dormant);
        tracing::info!("{}: logged out", self.namespace());
        Ok(())
    }

    /// Run one sync cycle. Never fails; the outcome is in the report and
    /// in [`status`](Self::status).
    pub async fn sync(&self) -> SyncReport {
        let Some((credential, epoch)) = self.session() else {
            return SyncReport::skipped(SkipReason::NoCredential);
        };
        if self.status().is_persistent_failure() {
            tracing::debug!("{}: waiting for a new credential", self.namespace());
            return SyncReport::skipped(SkipReason::AuthRequired);
        }
        if self
            .syncing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("{}: sync already in flight", self.namespace());
            return SyncReport::skipped(SkipReason::AlreadySyncing);
        }
        let _flight = InFlight(&self.syncing);
        if !self.same_session(epoch) {
            return SyncReport::skipped(SkipReason::SessionEnded);
        }

        self.set_status(SyncStatus::Syncing);

        let mut report = SyncReport::default();
        match self.run_cycle(&credential, epoch, &mut report).await {
            Ok(()) => {}
            Err(Abort::SessionEnded) => {
                tracing::debug!("{}: session ended mid-cycle; results discarded", self.namespace());
                return SyncReport::skipped(SkipReason::SessionEnded);
            }
            Err(Abort::Failed(failure)) => {
                tracing::warn!("{}: sync failed: {}", self.namespace(), failure);
                report.failure = Some(failure);
            }
        }

        if self.same_session(epoch) {
            self.set_status(status_for(&report));
        }
        report
    }

    async fn run_cycle(
        &self,
        credential: &Credential,
        epoch: u64,
        report: &mut SyncReport,
    ) -> std::result::Result<(), Abort> {
        if self.resource_id().is_none() {
            let found = self
                .remote
                .find_by_label(credential, &self.dataset.label)
                .await?;
            self.ensure_session(epoch)?;
            match found {
                Some(record) => {
                    tracing::debug!("{}: resolved remote resource {}", self.namespace(), record.id);
                    self.bind_resource(Some(&record.id))?;
                }
                None => tracing::debug!("{}: no remote resource yet", self.namespace()),
            }
        }

        if let Some(id) = self.resource_id() {
            let fetched = self
                .remote
                .fetch(credential, &id, &self.dataset.file_name)
                .await;
            self.ensure_session(epoch)?;
            match fetched {
                Ok(remote) => self.pull(remote, report)?,
                Err(RemoteError::NotFound) => {
                    tracing::warn!(
                        "{}: remote resource {} is gone; a new one will be created",
                        self.namespace(),
                        id
                    );
                    self.bind_resource(None)?;
                }
                Err(error) => return Err(error.into()),
            }
        }

        self.push(credential, epoch, report).await
    }

    fn pull(&self, remote: RemoteContent, report: &mut SyncReport) -> Result<()> {
        if self
            .last_sync()
            .is_some_and(|seen| remote.updated_at <= seen)
        {
            tracing::debug!("{}: remote unchanged", self.namespace());
            return Ok(());
        }
        let Some(content) = remote.content else {
            tracing::debug!(
                "{}: remote resource has no {}",
                self.namespace(),
                self.dataset.file_name
            );
            return Ok(());
        };
        let document: D = match serde_json::from_str(&content) {
            Ok(document) => document,
            Err(error) => {
                let message = Error::MalformedContent(error.to_string()).to_string();
                tracing::warn!("{}: {}; keeping local document", self.namespace(), message);
                report.malformed_remote = Some(message);
                return Ok(());
            }
        };

        {
            let mut current = lock(&self.document);
            self.persistence.save_document(&document)?;
            *current = document;
        }
        self.advance_last_sync(remote.updated_at)?;
        report.pulled = true;
        tracing::info!(
            "{}: adopted remote version from {}",
            self.namespace(),
            remote.updated_at
        );
        let _ = self.events.send(SyncEvent::DocumentReplaced);
        Ok(())
    }

    async fn push(
        &self,
        credential: &Credential,
        epoch: u64,
        report: &mut SyncReport,
    ) -> std::result::Result<(), Abort> {
        if !self.tracker.is_pending() {
            return Ok(());
        }
        let (content, generation) = {
            let document = lock(&self.document);
            let content = serde_json::to_string_pretty(&*document).map_err(Error::from)?;
            (content, self.tracker.generation())
        };

        let resource_id = self.resource_id();
        let written = match resource_id.as_deref() {
            Some(id) => {
                self.remote
                    .update(credential, id, &self.dataset.file_name, &content)
                    .await
            }
            None => {
                self.remote
                    .create(
                        credential,
                        &self.dataset.label,
                        &self.dataset.file_name,
                        &content,
                    )
                    .await
            }
        };
        self.ensure_session(epoch)?;

        let stamp = match written {
            Ok(stamp) => stamp,
            Err(RemoteError::NotFound) if resource_id.is_some() => {
                self.bind_resource(None)?;
                return Err(RemoteError::NotFound.into());
            }
            Err(error) => return Err(error.into()),
        };

        if resource_id.is_none() {
            tracing::info!("{}: created remote resource {}", self.namespace(), stamp.id);
            report.created = true;
        }
        self.bind_resource(Some(&stamp.id))?;
        self.advance_last_sync(stamp.updated_at)?;
        report.pushed = true;

        if self.tracker.clear_if_unchanged(generation) {
            self.persistence.save_pending(false)?;
            // A mutation between the clear and the write above re-flags it
            if self.tracker.is_pending() {
                self.persistence.save_pending(true)?;
            }
        } else {
            tracing::debug!("{}: document changed during push; still pending", self.namespace());
        }
        Ok(())
    }

    fn namespace(&self) -> &str {
        &self.dataset.namespace
    }

    fn resource_id(&self) -> Option<String> {
        lock(&self.binding).resource_id.clone()
    }

    fn last_sync(&self) -> Option<DateTime<Utc>> {
        lock(&self.binding).last_sync
    }

    fn bind_resource(&self, resource_id: Option<&str>) -> Result<()> {
        self.persistence.save_resource_id(resource_id)?;
        lock(&self.binding).resource_id = resource_id.map(str::to_string);
        Ok(())
    }

    fn advance_last_sync(&self, timestamp: DateTime<Utc>) -> Result<()> {
        let mut binding = lock(&self.binding);
        if binding.last_sync.is_some_and(|seen| seen >= timestamp) {
            return Ok(());
        }
        self.persistence.save_last_sync(timestamp)?;
        binding.last_sync = Some(timestamp);
        Ok(())
    }

    /// The current token and the epoch it belongs to. Both are read under
    /// the credential lock, which every epoch bump also holds.
    fn session(&self) -> Option<(Credential, u64)> {
        let credential = lock(&self.credential);
        let epoch = self.epoch.load(Ordering::SeqCst);
        credential.clone().map(|credential| (credential, epoch))
    }

    fn same_session(&self, epoch: u64) -> bool {
        self.epoch.load(Ordering::SeqCst) == epoch
    }

    fn ensure_session(&self, epoch: u64) -> std::result::Result<(), Abort> {
        if self.same_session(epoch) {
            Ok(())
        } else {
            Err(Abort::SessionEnded)
        }
    }

    fn set_status(&self, status: SyncStatus) {
        {
            let mut current = lock(&self.status);
            if *current == status {
                return;
            }
            *current = status.clone();
        }
        let _ = self.events.send(SyncEvent::StatusChanged(status));
    }
}

fn status_for(report: &SyncReport) -> SyncStatus {
    match &report.failure {
        Some(SyncFailure::Remote(error)) if error.kind() == RemoteErrorKind::Auth => {
            SyncStatus::AuthRequired {
                message: error.to_string(),
            }
        }
        Some(failure) => SyncStatus::Failed {
            message: failure.to_string(),
        },
        None => match &report.malformed_remote {
            Some(message) if !report.pushed => SyncStatus::Failed {
                message: message.clone(),
            },
            _ => SyncStatus::Synced { at: Utc::now() },
        },
    }
}

struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
