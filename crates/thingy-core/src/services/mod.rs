//! Services that front ends hold on to.

mod sync_service;

pub use sync_service::SyncService;
