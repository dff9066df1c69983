use thingy_core::models::{format_solve_time, SolvesDocument};
use thingy_core::AppKind;

use crate::cli::SolveCommands;
use crate::commands::common::{sync_after_mutation, AppContext};
use crate::error::CliError;

pub async fn run_solve(command: SolveCommands, context: &AppContext) -> Result<(), CliError> {
    let service = context.service::<SolvesDocument>(AppKind::CubeTimer)?;

    match command {
        SolveCommands::Add {
            seconds,
            scramble,
            penalty,
        } => {
            let scramble = scramble.unwrap_or_default();
            let time = service.update(|document| {
                document
                    .add(seconds, &scramble, penalty)
                    .map(|solve| solve.time)
            })?;
            let count = service.document().solves.len();
            println!("#{count} {}", format_solve_time(time));
        }
        SolveCommands::List { json } => {
            let document = service.document();
            if json {
                println!("{}", serde_json::to_string_pretty(&document.solves)?);
                return Ok(());
            }
            if document.solves.is_empty() {
                println!("No solves");
                return Ok(());
            }
            for (index, solve) in document.solves.iter().enumerate() {
                let penalty = if solve.penalty > 0.0 { " (+2)" } else { "" };
                println!(
                    "#{:<4} {:>9}{}  {}",
                    index + 1,
                    format_solve_time(solve.time),
                    penalty,
                    solve.scramble
                );
            }
            if let Some(best) = document.best() {
                println!("best {}", format_solve_time(best.time));
            }
            return Ok(());
        }
        SolveCommands::Remove { number } => {
            let index = number
                .checked_sub(1)
                .ok_or_else(|| thingy_core::Error::NotFound("solve #0".to_string()))?;
            let removed = service.update(|document| document.remove(index))?;
            println!("Removed {}", format_solve_time(removed.time));
        }
    }

    sync_after_mutation(&service).await;
    Ok(())
}
