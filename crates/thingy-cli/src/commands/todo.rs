use thingy_core::models::TodoDocument;
use thingy_core::AppKind;

use crate::cli::TodoCommands;
use crate::commands::common::{resolve_text, sync_after_mutation, AppContext};
use crate::error::CliError;

pub async fn run_todo(command: TodoCommands, context: &AppContext) -> Result<(), CliError> {
    let service = context.service::<TodoDocument>(AppKind::Todo)?;

    match command {
        TodoCommands::Add { text } => {
            let text = resolve_text(&text)?;
            let id = service.update(|document| document.add(&text))?;
            println!("{id}");
        }
        TodoCommands::List { json } => {
            let document = service.document();
            if json {
                println!("{}", serde_json::to_string_pretty(&document.todos)?);
            } else if document.todos.is_empty() {
                println!("No todos");
            } else {
                for todo in &document.todos {
                    let mark = if todo.done { "x" } else { " " };
                    println!("[{mark}] {}  {}", todo.id, todo.text);
                }
                println!("{} open", document.open_count());
            }
            return Ok(());
        }
        TodoCommands::Toggle { id } => {
            let done = service.update(|document| document.toggle(id))?;
            println!("{id} {}", if done { "done" } else { "open" });
        }
        TodoCommands::Edit { id, text } => {
            let text = resolve_text(&text)?;
            service.update(|document| document.edit(id, &text))?;
            println!("{id}");
        }
        TodoCommands::Remove { id } => {
            let removed = service.update(|document| document.remove(id))?;
            println!("Removed {}", removed.text);
        }
    }

    sync_after_mutation(&service).await;
    Ok(())
}
