//! Document models for the Thingy apps
//!
//! Each app replicates exactly one document. The sync engine treats them as
//! opaque serde values; the helpers here are what the front ends mutate.

mod chat;
mod habit;
mod solve;
mod todo;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::Dataset;
use crate::error::{Error, Result};

pub use chat::{ChatDocument, ChatMessage, ChatRole, Conversation};
pub use habit::{Habit, HabitDocument, HabitSettings};
pub use solve::{format_solve_time, Solve, SolvesDocument};
pub use todo::{Todo, TodoDocument};

/// The apps bundled with Thingy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AppKind {
    Chat,
    Todo,
    CubeTimer,
    Habits,
}

impl AppKind {
    pub const ALL: [Self; 4] = [Self::Chat, Self::Todo, Self::CubeTimer, Self::Habits];

    /// Stable name used on the command line and as local namespace.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Todo => "todo",
            Self::CubeTimer => "cube-timer",
            Self::Habits => "habits",
        }
    }

    /// Remote description that identifies this app's resource.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Chat => "THINGY AI Chat Data",
            Self::Todo => "THINGY Todo Data",
            Self::CubeTimer => "THINGY Cube Timer solves",
            Self::Habits => "THINGY Habit Tracker Data",
        }
    }

    /// File key inside the remote resource.
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Chat => "conversations.json",
            Self::Todo => "todos.json",
            Self::CubeTimer => "cube-timer-solves.json",
            Self::Habits => "habits.json",
        }
    }

    pub fn dataset(self) -> Dataset {
        Dataset {
            label: self.label().to_string(),
            file_name: self.file_name().to_string(),
            namespace: self.as_str().to_string(),
        }
    }
}

impl fmt::Display for AppKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chat" => Ok(Self::Chat),
            "todo" | "todos" => Ok(Self::Todo),
            "cube-timer" | "cube" | "solves" => Ok(Self::CubeTimer),
            "habits" | "habit" => Ok(Self::Habits),
            other => Err(Error::InvalidInput(format!("unknown app '{other}'"))),
        }
    }
}

/// Millisecond id in the style of `Date.now()`, bumped past `taken` ids.
pub(crate) fn next_millis_id(now_ms: u64, taken: impl IntoIterator<Item = u64>) -> u64 {
    let max_taken = taken.into_iter().max().unwrap_or(0);
    now_ms.max(max_taken.saturating_add(1))
}
