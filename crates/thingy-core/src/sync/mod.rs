//! Replication of local documents through a remote blob store.

mod engine;
mod scheduler;
mod tracker;

pub use engine::{Document, SkipReason, SyncEngine, SyncEvent, SyncFailure, SyncReport};
pub use scheduler::Scheduler;
pub use tracker::ChangeTracker;
