//! Command-line interface for reelsync.

mod commands;

pub use commands::{Cli, Commands, run_command};
