use std::fs::File;
use std::io;
use std::path::Path;

use clap::CommandFactory;
use clap_complete::{generate, Shell};

use crate::cli::{Cli, CompletionShell};
use crate::error::CliError;

impl From<CompletionShell> for Shell {
    fn from(shell: CompletionShell) -> Self {
        match shell {
            CompletionShell::Bash => Self::Bash,
            CompletionShell::Zsh => Self::Zsh,
            CompletionShell::Fish => Self::Fish,
            CompletionShell::PowerShell => Self::PowerShell,
        }
    }
}

/// Write a completion script for `thingy` to `output_path`, or stdout.
pub fn run_completions(shell: CompletionShell, output_path: Option<&Path>) -> Result<(), CliError> {
    let mut command = Cli::command();
    let bin_name = command.get_name().to_string();

    match output_path {
        Some(path) => {
            let mut file = File::create(path)?;
            generate(Shell::from(shell), &mut command, bin_name, &mut file);
            println!("{}", path.display());
        }
        None => generate(Shell::from(shell), &mut command, bin_name, &mut io::stdout()),
    }
    Ok(())
}
