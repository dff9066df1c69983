pub mod auth_cmd;
pub mod chat;
pub mod common;
pub mod completions;
pub mod config;
pub mod habit;
pub mod solve;
pub mod status;
pub mod sync;
pub mod todo;
pub mod watch;
