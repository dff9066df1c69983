//! Thingy CLI - the Thingy apps from a terminal
//!
//! Every data command edits the local copy first and then pushes it through
//! the gist sync engine when a token is stored.

mod cli;
mod cli_config;
mod commands;
mod error;

#[cfg(test)]
mod tests;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::auth_cmd::run_auth;
use crate::commands::chat::run_chat;
use crate::commands::common::{resolve_db_path, AppContext};
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::habit::run_habit;
use crate::commands::solve::run_solve;
use crate::commands::status::run_status;
use crate::commands::sync::run_sync;
use crate::commands::todo::run_todo;
use crate::commands::watch::run_watch;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Completions { shell, output } => run_completions(shell, output.as_deref()),
        Commands::Config { command } => run_config(command),
        command => {
            let context = AppContext::open(&resolve_db_path(cli.db_path))?;
            dispatch(command, &context).await
        }
    }
}

async fn dispatch(command: Commands, context: &AppContext) -> Result<(), CliError> {
    match command {
        Commands::Auth { command } => run_auth(command, context).await,
        Commands::Sync { app } => run_sync(app, context).await,
        Commands::Status { json } => run_status(json, context),
        Commands::Watch { app } => run_watch(app, context).await,
        Commands::Todo { command } => run_todo(command, context).await,
        Commands::Habit { command } => run_habit(command, context).await,
        Commands::Solve { command } => run_solve(command, context).await,
        Commands::Chat { command } => run_chat(command, context).await,
        Commands::Completions { shell, output } => run_completions(shell, output.as_deref()),
        Commands::Config { command } => run_config(command),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("thingy_core=debug,thingy=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
