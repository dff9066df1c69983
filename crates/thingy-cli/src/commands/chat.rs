use serde::Serialize;
use thingy_core::models::{ChatDocument, ChatRole};
use thingy_core::AppKind;

use crate::cli::ChatCommands;
use crate::commands::common::{resolve_text, sync_after_mutation, AppContext};
use crate::error::CliError;

#[derive(Serialize)]
struct ConversationSummary<'a> {
    id: &'a str,
    title: &'a str,
    messages: usize,
    updated_at: String,
}

pub async fn run_chat(command: ChatCommands, context: &AppContext) -> Result<(), CliError> {
    let service = context.service::<ChatDocument>(AppKind::Chat)?;

    match command {
        ChatCommands::List { json } => {
            let document = service.document();
            let summaries = document
                .conversations
                .iter()
                .map(|conversation| ConversationSummary {
                    id: &conversation.id,
                    title: &conversation.title,
                    messages: conversation.messages.len(),
                    updated_at: conversation.updated_at.to_rfc3339(),
                })
                .collect::<Vec<_>>();

            if json {
                println!("{}", serde_json::to_string_pretty(&summaries)?);
            } else if summaries.is_empty() {
                println!("No conversations");
            } else {
                for summary in &summaries {
                    println!(
                        "{}  {} ({} messages)",
                        summary.id, summary.title, summary.messages
                    );
                }
            }
            return Ok(());
        }
        ChatCommands::Show { conversation } => {
            let document = service.document();
            let found = document
                .get(&conversation)
                .ok_or_else(|| thingy_core::Error::NotFound(format!("conversation {conversation}")))?;
            println!("{}", found.title);
            for message in &found.messages {
                let role = match message.role {
                    ChatRole::User => "user",
                    ChatRole::Assistant => "assistant",
                    ChatRole::System => "system",
                };
                println!(
                    "[{}] {role}: {}",
                    message.timestamp.format("%Y-%m-%d %H:%M"),
                    message.content
                );
            }
            return Ok(());
        }
        ChatCommands::New => {
            let id = service.update(|document| Ok(document.new_conversation()))?;
            println!("{id}");
        }
        ChatCommands::Say { conversation, text } => {
            let text = resolve_text(&text)?;
            service.update(|document| document.add_message(&conversation, ChatRole::User, &text))?;
            println!("{conversation}");
        }
        ChatCommands::Delete { conversation } => {
            let removed = service.update(|document| document.delete_conversation(&conversation))?;
            println!("Deleted {}", removed.title);
        }
    }

    sync_after_mutation(&service).await;
    Ok(())
}
