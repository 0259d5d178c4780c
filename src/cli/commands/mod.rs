//! CLI command definitions and dispatch.
//!
//! Each subcommand is implemented in its own submodule:
//! - `sync`: fetch posts, match songs, add them to the library
//! - `check`: show which credentials and settings are configured

mod check;
mod sync;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tokio::runtime::Runtime;

use crate::config::{Config, LoadStatus};

pub use check::cmd_check;
pub use sync::{SyncArgs, cmd_sync};

/// Add songs from an Instagram account's posts to your Apple Music library
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Log level: error, warn, info, debug or trace
    #[arg(long, global = true, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Config file (default: config.toml in the OS config directory)
    #[arg(long, global = true, env = "REELSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Also write logs to a timestamped file in this directory
    #[arg(long, global = true, env = "LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Scan posts and add the songs found to the library
    Sync(SyncArgs),
    /// Check credentials and settings without calling any service
    Check {
        /// Instagram account to check for
        #[arg(short, long, env = "TARGET_INSTAGRAM_USER")]
        user: Option<String>,

        #[command(flatten)]
        credentials: CredentialArgs,
    },
}

/// Credentials, usually supplied through the environment or `.env`
#[derive(Args, Debug, Clone, Default)]
pub struct CredentialArgs {
    /// Instagram `sessionid` cookie (enables reading past the first page)
    #[arg(long, env = "INSTAGRAM_SESSION_ID", hide_env_values = true)]
    pub session_id: Option<String>,

    /// Pre-generated Apple Music developer token
    #[arg(long, env = "APPLE_DEVELOPER_TOKEN", hide_env_values = true)]
    pub developer_token: Option<String>,

    /// Apple Developer Team ID (to generate a developer token)
    #[arg(long, env = "APPLE_TEAM_ID")]
    pub team_id: Option<String>,

    /// MusicKit Key ID (to generate a developer token)
    #[arg(long, env = "APPLE_KEY_ID")]
    pub key_id: Option<String>,

    /// Path to the MusicKit .p8 private key (to generate a developer token)
    #[arg(long, env = "APPLE_PRIVATE_KEY_PATH")]
    pub private_key_path: Option<PathBuf>,

    /// Music-User-Token authorizing library changes
    #[arg(long, env = "APPLE_MUSIC_USER_TOKEN", hide_env_values = true)]
    pub user_token: Option<String>,
}

/// Run the specified CLI command.
pub fn run_command(cli: &Cli, config: Config, status: &LoadStatus) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Sync(args) => {
            let rt = Runtime::new()?;
            cmd_sync(&rt, args, config)
        }
        Commands::Check { user, credentials } => {
            cmd_check(user.as_deref(), credentials, &config, status)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_sync_flags() {
        let cli = Cli::try_parse_from([
            "reelsync",
            "sync",
            "--user",
            "someone",
            "--posts",
            "25",
            "--dry-run",
            "--output",
            "out.csv",
            "--log-level",
            "debug",
        ])
        .unwrap();

        assert_eq!(cli.log_level, "debug");
        let Commands::Sync(args) = cli.command else {
            panic!("expected sync");
        };
        assert_eq!(args.user.as_deref(), Some("someone"));
        assert_eq!(args.posts, Some(25));
        assert!(args.dry_run);
        assert_eq!(args.output, Some(PathBuf::from("out.csv")));
    }

    #[test]
    fn test_parse_check() {
        let cli = Cli::try_parse_from(["reelsync", "check", "--team-id", "TEAM"]).unwrap();
        let Commands::Check { credentials, .. } = cli.command else {
            panic!("expected check");
        };
        assert_eq!(credentials.team_id.as_deref(), Some("TEAM"));
    }
}
