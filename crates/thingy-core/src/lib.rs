//! thingy-core - Core library for Thingy
//!
//! This crate contains the document models, local persistence, remote store
//! client and sync engine shared by all Thingy front ends.

pub mod config;
pub mod error;
pub mod models;
pub mod remote;
pub mod services;
pub mod state;
pub mod storage;
pub mod sync;
pub mod util;

pub use config::{Dataset, SyncSettings};
pub use error::{Error, Result};
pub use models::AppKind;
pub use remote::{Credential, RemoteError};
pub use services::SyncService;
pub use state::{SyncState, SyncStatus};
pub use sync::{SyncEngine, SyncEvent, SyncReport};
