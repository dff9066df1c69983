//! Triggers sync cycles for one engine.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::{Document, SyncEngine};
use crate::config::MIN_SYNC_INTERVAL;
use crate::remote::RemoteStore;

// One queued trigger is enough; further ones coalesce into it.
const TRIGGER_CAPACITY: usize = 1;

/// Background task that runs `sync()` immediately on start, on every period
/// and after local mutations while the network is presumed reachable.
///
/// Each cycle runs as its own task, so triggers never wait on each other; the
/// engine drops cycles that overlap a running one.
pub struct Scheduler {
    trigger: mpsc::Sender<()>,
    online: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl Scheduler {
    /// Start the loop. Must be called from within a tokio runtime.
    pub fn start<D: Document, R: RemoteStore>(
        engine: Arc<SyncEngine<D, R>>,
        interval: Duration,
    ) -> Self {
        let interval = interval.max(MIN_SYNC_INTERVAL);
        let (trigger, mut triggers) = mpsc::channel(TRIGGER_CAPACITY);
        let namespace = engine.dataset().namespace.clone();
        tracing::debug!("{}: scheduler started, every {:?}", namespace, interval);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    received = triggers.recv() => {
                        if received.is_none() {
                            break;
                        }
                    }
                }
                let engine = Arc::clone(&engine);
                tokio::spawn(async move {
                    engine.sync().await;
                });
            }
            tracing::debug!("{}: scheduler stopped", namespace);
        });

        Self {
            trigger,
            online: Arc::new(AtomicBool::new(true)),
            task,
        }
    }

    /// A local mutation happened
    pub fn notify_mutation(&self) {
        if self.is_online() {
            self.request_sync();
        }
    }

    /// Queue a cycle regardless of connectivity
    pub fn request_sync(&self) {
        // A full queue already holds a pending trigger
        let _ = self.trigger.try_send(());
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Cancel the timer. A cycle already in flight finishes on its own.
    pub fn stop(&self) {
        self.task.abort();
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AppKind, TodoDocument};
    use crate::remote::{Credential, MemoryRemoteStore, RemoteOp};
    use crate::storage::MemoryStore;

    const PERIOD: Duration = Duration::from_secs(10);

    // Without a remote resource and nothing pending, every cycle is exactly
    // one lookup, so lookups count cycles.
    fn engine(remote: &MemoryRemoteStore) -> Arc<SyncEngine<TodoDocument, MemoryRemoteStore>> {
        let engine = SyncEngine::open(
            AppKind::Todo.dataset(),
            Arc::new(MemoryStore::default()),
            Arc::new(remote.clone()),
        )
        .unwrap();
        engine
            .set_credential(Credential::new("token").unwrap())
            .unwrap();
        Arc::new(engine)
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn fires_immediately_then_periodically() {
        let remote = MemoryRemoteStore::new();
        let scheduler = Scheduler::start(engine(&remote), PERIOD);

        settle().await;
        assert_eq!(remote.calls(RemoteOp::List), 1);

        tokio::time::sleep(PERIOD).await;
        assert_eq!(remote.calls(RemoteOp::List), 2);

        tokio::time::sleep(PERIOD).await;
        assert_eq!(remote.calls(RemoteOp::List), 3);
        assert!(scheduler.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn mutations_trigger_only_while_online() {
        let remote = MemoryRemoteStore::new();
        let scheduler = Scheduler::start(engine(&remote), PERIOD);
        settle().await;

        scheduler.notify_mutation();
        settle().await;
        assert_eq!(remote.calls(RemoteOp::List), 2);

        scheduler.set_online(false);
        scheduler.notify_mutation();
        settle().await;
        assert_eq!(remote.calls(RemoteOp::List), 2);

        scheduler.request_sync();
        settle().await;
        assert_eq!(remote.calls(RemoteOp::List), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_period_runs_at_the_minimum() {
        let remote = MemoryRemoteStore::new();
        let scheduler = Scheduler::start(engine(&remote), Duration::ZERO);

        settle().await;
        assert_eq!(remote.calls(RemoteOp::List), 1);

        tokio::time::sleep(MIN_SYNC_INTERVAL).await;
        assert_eq!(remote.calls(RemoteOp::List), 2);
        assert!(scheduler.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_halts_ticks() {
        let remote = MemoryRemoteStore::new();
        let scheduler = Scheduler::start(engine(&remote), PERIOD);
        settle().await;

        scheduler.stop();
        settle().await;
        tokio::time::sleep(PERIOD * 5).await;

        assert_eq!(remote.calls(RemoteOp::List), 1);
        assert!(!scheduler.is_running());
    }
}
