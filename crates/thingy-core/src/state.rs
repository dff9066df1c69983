//! Shared sync state types used by every front end.

use std::fmt;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

/// Persisted sync metadata for one dataset.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncState {
    /// Cached id of the remote resource, if resolved
    pub resource_id: Option<String>,
    /// `updated_at` of the last remote version adopted or written
    pub last_sync: Option<DateTime<Utc>>,
    /// Local mutations not yet confirmed on the remote
    pub pending: bool,
}

/// User-visible outcome of the most recent sync activity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncStatus {
    /// No credential; the engine makes no network calls
    Dormant,
    /// Credential present, no cycle has completed yet
    NeverSynced,
    Syncing,
    Synced { at: DateTime<Utc> },
    /// Transient failure; the next cycle retries
    Failed { message: String },
    /// The credential was rejected; syncing stays off until a new one is set
    AuthRequired { message: String },
}

impl SyncStatus {
    /// Failures that need user action rather than another cycle
    pub const fn is_persistent_failure(&self) -> bool {
        matches!(self, Self::AuthRequired { .. })
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dormant => f.write_str("Not connected"),
            Self::NeverSynced => f.write_str("Never synced"),
            Self::Syncing => f.write_str("Syncing..."),
            Self::Synced { at } => write!(
                f,
                "Synced {}",
                at.with_timezone(&Local).format("%H:%M:%S")
            ),
            Self::Failed { message } => write!(f, "Sync failed: {message}"),
            Self::AuthRequired { .. } => f.write_str("Re-authentication required"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_labels() {
        assert_eq!(SyncStatus::NeverSynced.to_string(), "Never synced");
        assert!(SyncStatus::Synced { at: Utc::now() }
            .to_string()
            .starts_with("Synced "));
        assert_eq!(
            SyncStatus::Failed {
                message: "offline".to_string()
            }
            .to_string(),
            "Sync failed: offline"
        );
        assert!(SyncStatus::AuthRequired {
            message: "401".to_string()
        }
        .is_persistent_failure());
    }
}
