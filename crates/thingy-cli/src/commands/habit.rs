use chrono::Local;
use serde::Serialize;
use thingy_core::models::HabitDocument;
use thingy_core::AppKind;

use crate::cli::HabitCommands;
use crate::commands::common::{resolve_text, sync_after_mutation, AppContext};
use crate::error::CliError;

#[derive(Serialize)]
struct HabitListItem<'a> {
    id: &'a str,
    name: &'a str,
    color: &'a str,
    done_today: bool,
}

pub async fn run_habit(command: HabitCommands, context: &AppContext) -> Result<(), CliError> {
    let service = context.service::<HabitDocument>(AppKind::Habits)?;

    match command {
        HabitCommands::Add { name } => {
            let name = resolve_text(&name)?;
            let id = service.update(|document| document.add(&name))?;
            println!("{id}");
        }
        HabitCommands::List { json } => {
            let document = service.document();
            let today = Local::now().date_naive();
            let items = document
                .habits
                .iter()
                .map(|habit| HabitListItem {
                    id: &habit.id,
                    name: &habit.name,
                    color: &habit.color,
                    done_today: document.is_completed(&habit.id, today),
                })
                .collect::<Vec<_>>();

            if json {
                println!("{}", serde_json::to_string_pretty(&items)?);
            } else if items.is_empty() {
                println!("No habits");
            } else {
                for item in &items {
                    let mark = if item.done_today { "x" } else { " " };
                    println!("[{mark}] {}  {}", item.id, item.name);
                }
            }
            return Ok(());
        }
        HabitCommands::Check { id, date } => {
            let date = date.unwrap_or_else(|| Local::now().date_naive());
            let checked = service.update(|document| document.toggle(&id, date))?;
            let state = if checked { "checked" } else { "unchecked" };
            println!("{id} {state} for {date}");
        }
        HabitCommands::Rename { id, name } => {
            let name = resolve_text(&name)?;
            service.update(|document| document.rename(&id, &name))?;
            println!("{id}");
        }
        HabitCommands::Remove { id } => {
            let removed = service.update(|document| document.remove(&id))?;
            println!("Removed {}", removed.name);
        }
    }

    sync_after_mutation(&service).await;
    Ok(())
}
