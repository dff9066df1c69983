//! Chat log model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::next_millis_id;
use crate::error::{Error, Result};
use crate::util::unix_millis_now;

const TITLE_MAX_CHARS: usize = 30;
const DEFAULT_TITLE: &str = "New Chat";

/// Who authored a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: ChatRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Title from the first user message, truncated to 30 characters
    fn refresh_title(&mut self) {
        let Some(first) = self
            .messages
            .iter()
            .find(|message| message.role == ChatRole::User)
        else {
            return;
        };
        let mut title: String = first.content.chars().take(TITLE_MAX_CHARS).collect();
        if first.content.chars().count() > TITLE_MAX_CHARS {
            title.push_str("...");
        }
        self.title = title;
    }
}

/// The replicated chat document, stored remotely as a bare JSON array
/// (newest conversation first).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatDocument {
    pub conversations: Vec<Conversation>,
}

impl ChatDocument {
    /// Start an empty conversation at the top of the list
    pub fn new_conversation(&mut self) -> String {
        let id = self.next_id();
        let now = Utc::now();
        self.conversations.insert(
            0,
            Conversation {
                id: id.clone(),
                title: DEFAULT_TITLE.to_string(),
                messages: Vec::new(),
                created_at: now,
                updated_at: now,
            },
        );
        id
    }

    pub fn get(&self, id: &str) -> Option<&Conversation> {
        self.conversations
            .iter()
            .find(|conversation| conversation.id == id)
    }

    /// Append a message and return its id
    pub fn add_message(
        &mut self,
        conversation_id: &str,
        role: ChatRole,
        content: &str,
    ) -> Result<String> {
        if content.trim().is_empty() {
            return Err(Error::InvalidInput(
                "message content must not be empty".to_string(),
            ));
        }
        let message_id = self.next_id();
        let conversation = self
            .conversations
            .iter_mut()
            .find(|conversation| conversation.id == conversation_id)
            .ok_or_else(|| Error::NotFound(format!("conversation {conversation_id}")))?;

        let now = Utc::now();
        conversation.messages.push(ChatMessage {
            id: message_id.clone(),
            role,
            content: content.to_string(),
            timestamp: now,
        });
        conversation.updated_at = now;
        conversation.refresh_title();
        Ok(message_id)
    }

    pub fn delete_conversation(&mut self, id: &str) -> Result<Conversation> {
        let index = self
            .conversations
            .iter()
            .position(|conversation| conversation.id == id)
            .ok_or_else(|| Error::NotFound(format!("conversation {id}")))?;
        Ok(self.conversations.remove(index))
    }

    fn next_id(&self) -> String {
        let taken = self.conversations.iter().flat_map(|conversation| {
            std::iter::once(conversation.id.as_str())
                .chain(conversation.messages.iter().map(|message| message.id.as_str()))
        });
        next_millis_id(
            unix_millis_now(),
            taken.filter_map(|id| id.parse::<u64>().ok()),
        )
        .to_string()
    }
}
