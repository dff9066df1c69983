use chrono::Utc;
use thingy_core::AppKind;

use crate::commands::common::{format_status_line, status_item, AppContext, StatusItem};
use crate::error::CliError;

pub fn run_status(as_json: bool, context: &AppContext) -> Result<(), CliError> {
    let items = AppKind::ALL
        .into_iter()
        .map(|app| {
            let service = context.app_service(app)?;
            Ok(status_item(
                app,
                service.has_credential(),
                &service.status(),
                &service.sync_state(),
            ))
        })
        .collect::<Result<Vec<StatusItem>, CliError>>()?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    let now = Utc::now();
    for item in &items {
        println!("{}", format_status_line(item, now));
    }
    Ok(())
}
