//! reelsync - add the songs an Instagram account posts to an Apple Music library.
//!
//! Reads recent posts of one account, works out which song each post uses
//! (from the attached audio or the caption), finds that song in the Apple
//! Music catalog and adds it to the user's library. Every post ends up as one
//! row in a report that can be exported as CSV.

pub mod apple_music;
pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod instagram;
pub mod matching;
pub mod model;
pub mod pipeline;
pub mod rate_limit;
pub mod retry;
#[cfg(test)]
pub mod test_utils;
pub mod traits;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> anyhow::Result<()> {
    // Before parsing, so `.env` values reach the env-backed flags
    let dotenv_path = dotenvy::dotenv().ok();

    let args = cli::Cli::parse();
    let (config, config_status) = config::load(args.config.as_deref());

    let log_dir = args.log_dir.clone().or_else(|| config.run.log_dir.clone());
    let log_file = init_logging(&args.log_level, log_dir.as_deref())?;

    if let Some(path) = dotenv_path {
        tracing::debug!("Loaded environment from {:?}", path);
    }
    if let Some(path) = log_file {
        tracing::info!("Logging to {}", path.display());
    }
    config_status.log();

    cli::run_command(&args, config, &config_status)
}

/// Initialize logging: console, plus a timestamped file when `log_dir` is set.
///
/// Returns the log file path.
fn init_logging(level: &str, log_dir: Option<&Path>) -> anyhow::Result<Option<PathBuf>> {
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("reelsync={}", level.to_lowercase()).parse()?);

    let (file_layer, path) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let path = dir.join(format!(
                "reelsync_{}.log",
                chrono::Local::now().format("%Y%m%d_%H%M%S")
            ));
            let file = std::fs::File::create(&path)?;
            let layer = fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .with_writer(Arc::new(file));
            (Some(layer), Some(path))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(file_layer)
        .with(filter)
        .init();

    Ok(path)
}
