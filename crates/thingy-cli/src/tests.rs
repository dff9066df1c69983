use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use pretty_assertions::assert_eq;
use thingy_core::models::TodoDocument;
use thingy_core::remote::RemoteError;
use thingy_core::storage::SqliteStore;
use thingy_core::sync::{SkipReason, SyncFailure};
use thingy_core::{AppKind, SyncReport, SyncSettings, SyncState, SyncStatus};

use crate::cli::CompletionShell;
use crate::commands::common::{
    format_relative_time, format_report_line, format_status_line, resolve_db_path, resolve_text,
    selected_apps, status_item, sync_after_mutation, AppContext,
};
use crate::commands::completions::run_completions;
use crate::error::CliError;

fn context_in(dir: &tempfile::TempDir) -> AppContext {
    let store = SqliteStore::open(dir.path().join("thingy.db")).unwrap();
    AppContext::new(Arc::new(store), SyncSettings::default()).unwrap()
}

#[test]
fn resolve_text_joins_words() {
    let words = vec!["buy".to_string(), "oat".to_string(), "milk ".to_string()];
    assert_eq!(resolve_text(&words).unwrap(), "buy oat milk");
    assert!(matches!(resolve_text(&[]), Err(CliError::EmptyContent)));
}

#[test]
fn explicit_db_path_wins() {
    let explicit = PathBuf::from("/tmp/elsewhere.db");
    assert_eq!(resolve_db_path(Some(explicit.clone())), explicit);
}

#[test]
fn selected_apps_defaults_to_all() {
    assert_eq!(selected_apps(None), AppKind::ALL.to_vec());
    assert_eq!(selected_apps(Some(AppKind::Habits)), vec![AppKind::Habits]);
}

#[test]
fn format_relative_time_buckets() {
    let now = 10 * 7 * 24 * 60 * 60 * 1000;
    assert_eq!(format_relative_time(now - 5_000, now), "just now");
    assert_eq!(format_relative_time(now - 5 * 60_000, now), "5m ago");
    assert_eq!(format_relative_time(now - 3 * 3_600_000, now), "3h ago");
    assert_eq!(format_relative_time(now - 2 * 86_400_000, now), "2d ago");
    assert_eq!(format_relative_time(now - 15 * 86_400_000, now), "2w ago");
    assert_eq!(format_relative_time(now + 60_000, now), "just now");
}

#[test]
fn report_line_describes_skips() {
    let report = SyncReport {
        skipped: Some(SkipReason::NoCredential),
        ..SyncReport::default()
    };
    assert_eq!(
        format_report_line(AppKind::Todo, &report, &SyncStatus::Dormant),
        "todo: skipped (not logged in)"
    );
}

#[test]
fn report_line_lists_what_happened() {
    let report = SyncReport {
        pulled: true,
        pushed: true,
        created: true,
        ..SyncReport::default()
    };
    let line = format_report_line(AppKind::Chat, &report, &SyncStatus::NeverSynced);
    assert_eq!(line, "chat: Never synced (pulled remote changes, created gist)");

    let failed = SyncReport {
        failure: Some(SyncFailure::Remote(RemoteError::Network(
            "connection refused".to_string(),
        ))),
        ..SyncReport::default()
    };
    let status = SyncStatus::Failed {
        message: "connection refused".to_string(),
    };
    assert_eq!(
        format_report_line(AppKind::Habits, &failed, &status),
        "habits: Sync failed: connection refused"
    );
}

#[test]
fn status_line_shows_remote_and_pending() {
    let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
    let state = SyncState {
        resource_id: Some("abc123".to_string()),
        last_sync: Some(now - Duration::hours(2)),
        pending: true,
    };
    let item = status_item(AppKind::Todo, true, &SyncStatus::NeverSynced, &state);
    assert_eq!(
        format_status_line(&item, now),
        "todo        Never synced  gist=abc123  remote version 2h ago  (unpushed changes)"
    );

    let empty = status_item(
        AppKind::Chat,
        false,
        &SyncStatus::Dormant,
        &SyncState::default(),
    );
    assert_eq!(
        format_status_line(&empty, now),
        "chat        Not connected  gist=-  remote version never"
    );
}

#[test]
fn completions_are_written_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("thingy.bash");

    run_completions(CompletionShell::Bash, Some(&path)).unwrap();

    let script = std::fs::read_to_string(&path).unwrap();
    assert!(script.contains("thingy"));
    assert!(script.contains("habit"));
}

#[test]
fn powershell_completions_are_supported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("thingy.ps1");

    run_completions(CompletionShell::PowerShell, Some(&path)).unwrap();

    assert!(std::fs::read_to_string(&path).unwrap().contains("thingy"));
}

#[test]
fn fresh_database_reports_dormant_apps() {
    let dir = tempfile::tempdir().unwrap();
    let context = context_in(&dir);

    for app in AppKind::ALL {
        let service = context.app_service(app).unwrap();
        assert_eq!(service.app(), app);
        assert!(!service.has_credential());
        assert_eq!(service.status(), SyncStatus::Dormant);
    }
}

#[tokio::test]
async fn mutation_without_token_stays_local() {
    let dir = tempfile::tempdir().unwrap();
    let context = context_in(&dir);
    let service = context.service::<TodoDocument>(AppKind::Todo).unwrap();

    let id = service.update(|document| document.add("water plants")).unwrap();
    sync_after_mutation(&service).await;

    assert!(service.sync_state().pending);
    assert_eq!(service.sync_state().resource_id, None);

    let reopened = context_in(&dir)
        .service::<TodoDocument>(AppKind::Todo)
        .unwrap();
    assert_eq!(
        reopened.document().get(id).map(|todo| todo.text.as_str()),
        Some("water plants")
    );
    assert!(reopened.sync_state().pending);
}
