use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use thingy_core::AppKind;

#[derive(Parser)]
#[command(name = "thingy")]
#[command(about = "Chat log, todos, cube timer and habits that sync through a gist")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Log sync activity to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage the gist access token
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
    /// Run one sync cycle now
    Sync {
        /// Only sync this app
        #[arg(long, value_name = "APP")]
        app: Option<AppKind>,
    },
    /// Show sync metadata for every app
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Keep syncing in the background until interrupted
    Watch {
        /// Only watch this app
        #[arg(long, value_name = "APP")]
        app: Option<AppKind>,
    },
    /// Todo list
    #[command(alias = "todos")]
    Todo {
        #[command(subcommand)]
        command: TodoCommands,
    },
    /// Habit tracker
    #[command(alias = "habits")]
    Habit {
        #[command(subcommand)]
        command: HabitCommands,
    },
    /// Cube timer solves
    #[command(alias = "solves")]
    Solve {
        #[command(subcommand)]
        command: SolveCommands,
    },
    /// Chat log
    Chat {
        #[command(subcommand)]
        command: ChatCommands,
    },
    /// Show or change CLI configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
    #[value(name = "powershell")]
    PowerShell,
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Store a token for every app and sync once
    Login {
        /// Access token (falls back to THINGY_TOKEN, then a prompt)
        #[arg(long, value_name = "TOKEN")]
        token: Option<String>,
    },
    /// Forget the token and all sync metadata; local data is kept
    Logout,
    /// Show whether each app has a token
    Status,
}

#[derive(Subcommand)]
pub enum TodoCommands {
    /// Add a todo
    Add {
        /// Todo text
        text: Vec<String>,
    },
    /// List todos
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Mark a todo done or open again
    Toggle { id: u64 },
    /// Replace the text of a todo
    Edit {
        id: u64,
        /// New text
        text: Vec<String>,
    },
    /// Delete a todo
    Remove { id: u64 },
}

#[derive(Subcommand)]
pub enum HabitCommands {
    /// Track a new habit
    Add {
        /// Habit name
        name: Vec<String>,
    },
    /// List habits with today's completion
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check a habit off (or un-check it) for a day
    Check {
        id: String,
        /// Day as YYYY-MM-DD (defaults to today)
        #[arg(long, value_name = "DATE")]
        date: Option<NaiveDate>,
    },
    /// Rename a habit
    Rename {
        id: String,
        /// New name
        name: Vec<String>,
    },
    /// Delete a habit and its history
    Remove { id: String },
}

#[derive(Subcommand)]
pub enum SolveCommands {
    /// Record a solve time in seconds
    Add {
        seconds: f64,
        /// Scramble used for the solve
        #[arg(long, value_name = "SCRAMBLE")]
        scramble: Option<String>,
        /// Add the two-second inspection penalty
        #[arg(long)]
        penalty: bool,
    },
    /// List solves
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a solve by its list number
    Remove { number: usize },
}

#[derive(Subcommand)]
pub enum ChatCommands {
    /// List conversations
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Start a new conversation
    New,
    /// Add a message to a conversation
    Say {
        conversation: String,
        /// Message text
        text: Vec<String>,
    },
    /// Print the messages of a conversation
    Show { conversation: String },
    /// Delete a conversation
    Delete { conversation: String },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,
    /// Update the configuration file
    Set {
        /// Base URL of the gist-like API
        #[arg(long, value_name = "URL")]
        api_base_url: Option<String>,
        /// Seconds between background sync cycles in `watch`
        #[arg(long, value_name = "SECONDS")]
        sync_interval: Option<u64>,
        /// Seconds before an HTTP request to the API is abandoned
        #[arg(long, value_name = "SECONDS")]
        request_timeout: Option<u64>,
    },
}
