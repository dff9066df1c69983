use std::env;

use crate::cli::ConfigCommands;
use crate::cli_config::CliConfig;
use crate::error::CliError;

pub fn run_config(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Show => {
            let config = CliConfig::load().map_err(CliError::Config)?;
            let settings = config
                .sync_settings(env::var("THINGY_API_BASE_URL").ok())
                .map_err(CliError::Config)?;
            println!("api_base_url: {}", settings.api_base_url);
            println!("sync_interval: {}s", settings.sync_interval.as_secs());
            match settings.request_timeout {
                Some(timeout) => println!("request_timeout: {}s", timeout.as_secs()),
                None => println!("request_timeout: none"),
            }
        }
        ConfigCommands::Set {
            api_base_url,
            sync_interval,
            request_timeout,
        } => {
            if api_base_url.is_none() && sync_interval.is_none() && request_timeout.is_none() {
                return Err(CliError::Config(
                    "Nothing to set; pass --api-base-url, --sync-interval or --request-timeout"
                        .to_string(),
                ));
            }
            let mut config = CliConfig::load().map_err(CliError::Config)?;
            if api_base_url.is_some() {
                config.api_base_url = api_base_url;
            }
            if sync_interval.is_some() {
                config.sync_interval_secs = sync_interval;
            }
            if request_timeout.is_some() {
                config.request_timeout_secs = request_timeout;
            }
            config.sync_settings(None).map_err(CliError::Config)?;
            let path = config.save().map_err(CliError::Config)?;
            println!("Saved {}", path.display());
        }
    }
    Ok(())
}
