//! Todo list model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::next_millis_id;
use crate::error::{Error, Result};
use crate::util::unix_millis_now;

/// A single todo item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    /// Millisecond timestamp id
    pub id: u64,
    pub text: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// The replicated todo document: `{ "todos": [...] }`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoDocument {
    #[serde(default)]
    pub todos: Vec<Todo>,
}

impl TodoDocument {
    /// Append a new open todo and return its id
    pub fn add(&mut self, text: &str) -> Result<u64> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::InvalidInput("todo text must not be empty".to_string()));
        }
        let id = next_millis_id(unix_millis_now(), self.todos.iter().map(|todo| todo.id));
        self.todos.push(Todo {
            id,
            text: text.to_string(),
            done: false,
            created_at: Some(Utc::now()),
        });
        Ok(id)
    }

    pub fn get(&self, id: u64) -> Option<&Todo> {
        self.todos.iter().find(|todo| todo.id == id)
    }

    /// Flip the done flag, returning the new value
    pub fn toggle(&mut self, id: u64) -> Result<bool> {
        let todo = self.get_mut(id)?;
        todo.done = !todo.done;
        Ok(todo.done)
    }

    pub fn edit(&mut self, id: u64, text: &str) -> Result<()> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::InvalidInput("todo text must not be empty".to_string()));
        }
        self.get_mut(id)?.text = text.to_string();
        Ok(())
    }

    pub fn remove(&mut self, id: u64) -> Result<Todo> {
        let index = self
            .todos
            .iter()
            .position(|todo| todo.id == id)
            .ok_or_else(|| Error::NotFound(format!("todo {id}")))?;
        Ok(self.todos.remove(index))
    }

    /// Number of todos still open
    pub fn open_count(&self) -> usize {
        self.todos.iter().filter(|todo| !todo.done).count()
    }

    fn get_mut(&mut self, id: u64) -> Result<&mut Todo> {
        self.todos
            .iter_mut()
            .find(|todo| todo.id == id)
            .ok_or_else(|| Error::NotFound(format!("todo {id}")))
    }
}
