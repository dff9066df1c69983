use thingy_core::sync::SyncEvent;
use thingy_core::{AppKind, SyncStatus};
use tokio::sync::broadcast::error::RecvError;

use crate::commands::common::{selected_apps, AppContext};
use crate::error::CliError;

pub async fn run_watch(app: Option<AppKind>, context: &AppContext) -> Result<(), CliError> {
    let mut services = Vec::new();
    for app in selected_apps(app) {
        let service = context.app_service(app)?;
        if service.has_credential() {
            services.push(service);
        }
    }
    if services.is_empty() {
        return Err(CliError::NotAuthenticated);
    }

    let printers = services
        .iter()
        .map(|service| {
            let app = service.app();
            let mut events = service.subscribe();
            tokio::spawn(async move {
                loop {
                    match events.recv().await {
                        Ok(event) => report_event(app, &event),
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!("{}: missed {} sync events", app, skipped);
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
            })
        })
        .collect::<Vec<_>>();

    for service in &services {
        service.start();
    }
    println!(
        "Watching {} app(s) every {:?}; press Ctrl-C to stop",
        services.len(),
        context.settings().sync_interval
    );

    tokio::signal::ctrl_c().await?;

    for service in &services {
        service.shutdown();
    }
    for printer in printers {
        printer.abort();
    }
    println!("Stopped");
    Ok(())
}

fn report_event(app: AppKind, event: &SyncEvent) {
    match event {
        SyncEvent::DocumentReplaced => println!("{app}: pulled newer remote version"),
        SyncEvent::StatusChanged(SyncStatus::Syncing) => {}
        SyncEvent::StatusChanged(status @ SyncStatus::Synced { .. }) => {
            tracing::info!("{}: {}", app, status);
        }
        SyncEvent::StatusChanged(status) => println!("{app}: {status}"),
    }
}
