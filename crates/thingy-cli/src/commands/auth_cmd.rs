use thingy_core::{AppKind, Credential};

use crate::cli::AuthCommands;
use crate::commands::common::{format_report_line, resolve_token, AppContext};
use crate::error::CliError;

pub async fn run_auth(command: AuthCommands, context: &AppContext) -> Result<(), CliError> {
    match command {
        AuthCommands::Login { token } => {
            let credential = Credential::new(resolve_token(token)?)?;
            let services = AppKind::ALL
                .into_iter()
                .map(|app| context.app_service(app))
                .collect::<Result<Vec<_>, _>>()?;
            for service in &services {
                service.login(credential.clone())?;
            }
            println!("Token saved for {} apps", services.len());

            for service in &services {
                let report = service.sync_now().await;
                println!(
                    "{}",
                    format_report_line(service.app(), &report, &service.status())
                );
            }
            Ok(())
        }
        AuthCommands::Logout => {
            for app in AppKind::ALL {
                context.app_service(app)?.logout()?;
            }
            println!("Signed out; local data was kept");
            Ok(())
        }
        AuthCommands::Status => {
            for app in AppKind::ALL {
                let service = context.app_service(app)?;
                if service.has_credential() {
                    println!("{app}: token stored ({})", service.status());
                } else {
                    println!("{app}: not logged in");
                }
            }
            Ok(())
        }
    }
}
