//! Sync service wrapper used across clients.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::broadcast;

use crate::config::Dataset;
use crate::remote::{Credential, RemoteStore};
use crate::state::{SyncState, SyncStatus};
use crate::storage::KeyValueStore;
use crate::sync::{Document, Scheduler, SyncEngine, SyncEvent, SyncReport};
use crate::Result;

/// One dataset's engine plus its scheduler.
///
/// Front ends hold this instead of talking to the engine directly: local
/// mutations go through [`update`](Self::update), which also nudges the
/// scheduler when it is running.
pub struct SyncService<D, R> {
    engine: Arc<SyncEngine<D, R>>,
    scheduler: Mutex<Option<Scheduler>>,
    interval: Duration,
    online: AtomicBool,
    wanted: AtomicBool,
}

impl<D: Document, R: RemoteStore> SyncService<D, R> {
    pub fn open(
        dataset: Dataset,
        store: Arc<dyn KeyValueStore>,
        remote: Arc<R>,
        interval: Duration,
    ) -> Result<Self> {
        let engine = SyncEngine::open(dataset, store, remote)?;
        Ok(Self {
            engine: Arc::new(engine),
            scheduler: Mutex::new(None),
            interval,
            online: AtomicBool::new(true),
            wanted: AtomicBool::new(false),
        })
    }

    pub fn engine(&self) -> &Arc<SyncEngine<D, R>> {
        &self.engine
    }

    /// Run the scheduler (first cycle fires right away). Without a
    /// credential the service stays dormant until [`login`](Self::login)
    /// supplies one. Must be called from within a tokio runtime.
    pub fn start(&self) {
        self.wanted.store(true, Ordering::SeqCst);
        if !self.engine.has_credential() {
            tracing::debug!(
                "{}: no credential; scheduler waits for login",
                self.engine.dataset().namespace
            );
            return;
        }
        let scheduler = Scheduler::start(Arc::clone(&self.engine), self.interval);
        scheduler.set_online(self.online.load(Ordering::SeqCst));
        if let Some(previous) = self.scheduler().replace(scheduler) {
            previous.stop();
        }
    }

    pub fn has_credential(&self) -> bool {
        self.engine.has_credential()
    }

    pub fn is_running(&self) -> bool {
        self.scheduler()
            .as_ref()
            .is_some_and(Scheduler::is_running)
    }

    /// Store a credential. If [`start`](Self::start) was called, the
    /// scheduler (re)starts so a cycle fires immediately under the new
    /// session.
    pub fn login(&self, credential: Credential) -> Result<()> {
        self.engine.set_credential(credential)?;
        if self.wanted.load(Ordering::SeqCst) {
            self.start();
        }
        Ok(())
    }

    /// Stop scheduling and forget the credential and sync metadata.
    pub fn logout(&self) -> Result<()> {
        self.stop();
        self.engine.logout()
    }

    /// Apply a local mutation and request a push.
    pub fn update<T>(&self, mutate: impl FnOnce(&mut D) -> Result<T>) -> Result<T> {
        let value = self.engine.update(mutate)?;
        if let Some(scheduler) = self.scheduler().as_ref() {
            scheduler.notify_mutation();
        }
        Ok(value)
    }

    pub async fn sync_now(&self) -> SyncReport {
        self.engine.sync().await
    }

    pub fn document(&self) -> D {
        self.engine.document()
    }

    pub fn status(&self) -> SyncStatus {
        self.engine.status()
    }

    pub fn sync_state(&self) -> SyncState {
        self.engine.sync_state()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.engine.subscribe()
    }

    /// Whether the network is presumed reachable; gates mutation triggers.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
        if let Some(scheduler) = self.scheduler().as_ref() {
            scheduler.set_online(online);
        }
    }

    /// Stop the scheduler, keeping the credential.
    pub fn shutdown(&self) {
        self.wanted.store(false, Ordering::SeqCst);
        self.stop();
    }

    fn stop(&self) {
        if let Some(scheduler) = self.scheduler().take() {
            scheduler.stop();
        }
    }

    fn scheduler(&self) -> MutexGuard<'_, Option<Scheduler>> {
        self.scheduler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
