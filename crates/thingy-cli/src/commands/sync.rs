use thingy_core::AppKind;

use crate::commands::common::{format_report_line, selected_apps, AppContext};
use crate::error::CliError;

pub async fn run_sync(app: Option<AppKind>, context: &AppContext) -> Result<(), CliError> {
    let mut attempted = 0usize;
    let mut failed = Vec::new();

    for app in selected_apps(app) {
        let service = context.app_service(app)?;
        if !service.has_credential() {
            continue;
        }
        attempted += 1;

        let report = service.sync_now().await;
        println!("{}", format_report_line(app, &report, &service.status()));
        if report.failure.is_some() {
            failed.push(app.to_string());
        }
    }

    if attempted == 0 {
        return Err(CliError::NotAuthenticated);
    }
    if !failed.is_empty() {
        return Err(CliError::SyncFailed(failed.join(", ")));
    }
    Ok(())
}
