use std::env;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thingy_core::models::{ChatDocument, HabitDocument, SolvesDocument, TodoDocument};
use thingy_core::remote::GistClient;
use thingy_core::storage::{KeyValueStore, SqliteStore};
use thingy_core::sync::{Document, SkipReason, SyncEvent};
use thingy_core::util::normalize_text;
use thingy_core::{
    AppKind, Credential, SyncReport, SyncService, SyncSettings, SyncState, SyncStatus,
};
use tokio::sync::broadcast;

use crate::cli_config::CliConfig;
use crate::error::CliError;

/// Shared handles for one CLI invocation
pub struct AppContext {
    store: Arc<dyn KeyValueStore>,
    remote: Arc<GistClient>,
    settings: SyncSettings,
}

impl AppContext {
    pub fn open(db_path: &Path) -> Result<Self, CliError> {
        let config = CliConfig::load().map_err(CliError::Config)?;
        let settings = config
            .sync_settings(env::var("THINGY_API_BASE_URL").ok())
            .map_err(CliError::Config)?;
        let store = SqliteStore::open(db_path)?;
        Self::new(Arc::new(store), settings)
    }

    pub fn new(store: Arc<dyn KeyValueStore>, settings: SyncSettings) -> Result<Self, CliError> {
        let remote = GistClient::new(settings.clone()).map_err(thingy_core::Error::from)?;
        Ok(Self {
            store,
            remote: Arc::new(remote),
            settings,
        })
    }

    pub const fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    pub fn service<D: Document>(&self, app: AppKind) -> Result<SyncService<D, GistClient>, CliError> {
        Ok(SyncService::open(
            app.dataset(),
            Arc::clone(&self.store),
            Arc::clone(&self.remote),
            self.settings.sync_interval,
        )?)
    }

    pub fn app_service(&self, app: AppKind) -> Result<AppService, CliError> {
        Ok(match app {
            AppKind::Chat => AppService::Chat(self.service(app)?),
            AppKind::Todo => AppService::Todo(self.service(app)?),
            AppKind::CubeTimer => AppService::CubeTimer(self.service(app)?),
            AppKind::Habits => AppService::Habits(self.service(app)?),
        })
    }
}

/// A service for any app, for commands that don't look inside documents
pub enum AppService {
    Chat(SyncService<ChatDocument, GistClient>),
    Todo(SyncService<TodoDocument, GistClient>),
    CubeTimer(SyncService<SolvesDocument, GistClient>),
    Habits(SyncService<HabitDocument, GistClient>),
}

macro_rules! each_service {
    ($service:expr, $inner:ident => $body:expr) => {
        match $service {
            AppService::Chat($inner) => $body,
            AppService::Todo($inner) => $body,
            AppService::CubeTimer($inner) => $body,
            AppService::Habits($inner) => $body,
        }
    };
}

impl AppService {
    pub const fn app(&self) -> AppKind {
        match self {
            Self::Chat(_) => AppKind::Chat,
            Self::Todo(_) => AppKind::Todo,
            Self::CubeTimer(_) => AppKind::CubeTimer,
            Self::Habits(_) => AppKind::Habits,
        }
    }

    pub fn has_credential(&self) -> bool {
        each_service!(self, service => service.has_credential())
    }

    pub fn login(&self, credential: Credential) -> Result<(), CliError> {
        Ok(each_service!(self, service => service.login(credential))?)
    }

    pub fn logout(&self) -> Result<(), CliError> {
        Ok(each_service!(self, service => service.logout())?)
    }

    pub async fn sync_now(&self) -> SyncReport {
        each_service!(self, service => service.sync_now().await)
    }

    pub fn status(&self) -> SyncStatus {
        each_service!(self, service => service.status())
    }

    pub fn sync_state(&self) -> SyncState {
        each_service!(self, service => service.sync_state())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        each_service!(self, service => service.subscribe())
    }

    pub fn start(&self) {
        each_service!(self, service => service.start());
    }

    pub fn shutdown(&self) {
        each_service!(self, service => service.shutdown());
    }
}

#[derive(Debug, Serialize)]
pub struct StatusItem {
    pub app: String,
    pub label: String,
    pub status: String,
    pub logged_in: bool,
    pub resource_id: Option<String>,
    pub last_sync: Option<String>,
    pub pending: bool,
}

pub fn status_item(
    app: AppKind,
    logged_in: bool,
    status: &SyncStatus,
    state: &SyncState,
) -> StatusItem {
    StatusItem {
        app: app.to_string(),
        label: app.label().to_string(),
        status: status.to_string(),
        logged_in,
        resource_id: state.resource_id.clone(),
        last_sync: state.last_sync.map(|timestamp| timestamp.to_rfc3339()),
        pending: state.pending,
    }
}

pub fn format_status_line(item: &StatusItem, now: DateTime<Utc>) -> String {
    let resource = item.resource_id.as_deref().unwrap_or("-");
    let last_sync = item
        .last_sync
        .as_deref()
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map_or_else(
            || "never".to_string(),
            |timestamp| {
                format_relative_time(
                    timestamp.timestamp_millis(),
                    now.timestamp_millis(),
                )
            },
        );
    let pending = if item.pending { "  (unpushed changes)" } else { "" };
    format!(
        "{:<11} {}  gist={}  remote version {}{}",
        item.app, item.status, resource, last_sync, pending
    )
}

/// One line describing a finished (or skipped) cycle
pub fn format_report_line(app: AppKind, report: &SyncReport, status: &SyncStatus) -> String {
    if let Some(reason) = report.skipped {
        let why = match reason {
            SkipReason::NoCredential => "not logged in",
            SkipReason::AlreadySyncing => "sync already running",
            SkipReason::AuthRequired => "re-authentication required",
            SkipReason::SessionEnded => "session ended",
        };
        return format!("{app}: skipped ({why})");
    }

    let mut notes = Vec::new();
    if report.pulled {
        notes.push("pulled remote changes");
    }
    if report.created {
        notes.push("created gist");
    } else if report.pushed {
        notes.push("pushed local changes");
    }
    if report.malformed_remote.is_some() {
        notes.push("remote content unreadable");
    }

    if notes.is_empty() {
        format!("{app}: {status}")
    } else {
        format!("{app}: {status} ({})", notes.join(", "))
    }
}

/// Push right after a local mutation when a token is stored.
///
/// Failures are reported as warnings; the change is already saved locally
/// and stays pending for the next sync.
pub async fn sync_after_mutation<D: Document>(service: &SyncService<D, GistClient>) {
    if !service.has_credential() {
        return;
    }
    let report = service.sync_now().await;
    if let Some(failure) = &report.failure {
        eprintln!("Warning: saved locally, but sync failed: {failure}");
    } else if let Some(message) = &report.malformed_remote {
        eprintln!("Warning: {message}");
    } else if report.skipped == Some(SkipReason::AuthRequired) {
        eprintln!("Warning: saved locally; run `thingy auth login` to resume syncing");
    }
}

pub fn selected_apps(app: Option<AppKind>) -> Vec<AppKind> {
    app.map_or_else(|| AppKind::ALL.to_vec(), |app| vec![app])
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else {
        format!("{}w ago", diff / week)
    }
}

/// Join word arguments into one trimmed text
pub fn resolve_text(parts: &[String]) -> Result<String, CliError> {
    normalize_text(&parts.join(" ")).ok_or(CliError::EmptyContent)
}


/// Token from the flag, then `THINGY_TOKEN`, then a prompt on stdin
pub fn resolve_token(explicit: Option<String>) -> Result<String, CliError> {
    if let Some(token) = explicit.as_deref().and_then(normalize_text) {
        return Ok(token);
    }
    if let Some(token) = env::var("THINGY_TOKEN")
        .ok()
        .as_deref()
        .and_then(normalize_text)
    {
        return Ok(token);
    }

    let stdin = io::stdin();
    if stdin.is_terminal() {
        eprint!("Access token: ");
        io::stderr().flush()?;
    }
    let mut line = String::new();
    stdin.lock().read_line(&mut line)?;
    normalize_text(&line).ok_or(CliError::EmptyToken)
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> PathBuf {
    cli_db_path
        .or_else(|| env::var_os("THINGY_DB_PATH").map(PathBuf::from))
        .unwrap_or_else(default_db_path)
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("thingy")
        .join("thingy.db")
}
