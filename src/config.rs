//! Configuration system using TOML files.
//!
//! Config is stored in the OS-standard config directory:
//! - Windows: %APPDATA%\reelsync\config.toml
//! - macOS: ~/Library/Application Support/reelsync/config.toml
//! - Linux: ~/.config/reelsync/config.toml
//!
//! Settings are layered: the file provides defaults, environment variables
//! (including a `.env` file) and command-line flags override it. The CLI
//! collects the overrides into [`Overrides`], and [`RunConfig::resolve`]
//! merges and validates everything once before a run starts.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::apple_music::DEFAULT_STOREFRONT;
use crate::matching::MatchPolicy;
use crate::retry::RetryPolicy;

/// File configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub instagram: InstagramConfig,
    pub apple_music: AppleMusicConfig,
    pub run: RunSettings,
    pub matching: MatchPolicy,
}

/// Instagram settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstagramConfig {
    /// `sessionid` cookie of a logged-in browser session
    pub session_id: Option<String>,
    /// Posts requested per feed page
    pub page_size: u32,
}

impl Default for InstagramConfig {
    fn default() -> Self {
        Self {
            session_id: None,
            page_size: 12,
        }
    }
}

/// Apple Music credentials and catalog settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppleMusicConfig {
    /// Pre-generated developer token (alternative to team/key/private key)
    pub developer_token: Option<String>,
    pub team_id: Option<String>,
    pub key_id: Option<String>,
    /// Path to the MusicKit `.p8` private key
    pub private_key_path: Option<PathBuf>,
    /// Music-User-Token, required to modify the library
    pub user_token: Option<String>,
    pub storefront: String,
    pub search_limit: u32,
}

impl Default for AppleMusicConfig {
    fn default() -> Self {
        Self {
            developer_token: None,
            team_id: None,
            key_id: None,
            private_key_path: None,
            user_token: None,
            storefront: DEFAULT_STOREFRONT.to_string(),
            search_limit: 5,
        }
    }
}

/// Run behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    pub max_posts: usize,
    /// Pause between catalog calls
    pub request_delay_ms: u64,
    /// Token-bucket pacing instead of the fixed pause (bursts up to one second's worth)
    pub requests_per_second: Option<f64>,
    /// Attempts per request, including the first
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
    /// Directory for log files (no log file when unset)
    pub log_dir: Option<PathBuf>,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            max_posts: 100,
            request_delay_ms: 500,
            requests_per_second: None,
            retry_attempts: 3,
            retry_delay_ms: 2000,
            log_dir: None,
        }
    }
}

// ============================================================================
// Config File Operations
// ============================================================================

/// Get the config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("reelsync"))
}

/// Get the full path to the default config file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// How loading the config file went
#[derive(Debug, Clone, PartialEq)]
pub enum LoadStatus {
    Loaded(PathBuf),
    Missing(PathBuf),
    Invalid(PathBuf, String),
    NoConfigDir,
}

impl LoadStatus {
    /// Report the status through tracing. Called once logging is set up.
    pub fn log(&self) {
        match self {
            LoadStatus::Loaded(path) => tracing::info!("Loaded config from {:?}", path),
            LoadStatus::Missing(path) => {
                tracing::debug!("No config file found at {:?}, using defaults", path)
            }
            LoadStatus::Invalid(path, reason) => {
                tracing::error!("Failed to load config file {:?}: {}", path, reason);
                tracing::warn!("Using default configuration");
            }
            LoadStatus::NoConfigDir => {
                tracing::warn!("Could not determine config directory, using defaults")
            }
        }
    }
}

/// Load configuration from `path`, or from the default location.
///
/// Returns default config if the file doesn't exist or can't be parsed; the
/// status says which. This runs before logging is initialized, so nothing is
/// logged here.
pub fn load(path: Option<&Path>) -> (Config, LoadStatus) {
    let Some(path) = path.map(Path::to_path_buf).or_else(config_path) else {
        return (Config::default(), LoadStatus::NoConfigDir);
    };

    if !path.exists() {
        return (Config::default(), LoadStatus::Missing(path));
    }

    match std::fs::read_to_string(&path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => (config, LoadStatus::Loaded(path)),
            Err(e) => {
                let reason = e.to_string();
                (Config::default(), LoadStatus::Invalid(path, reason))
            }
        },
        Err(e) => {
            let reason = e.to_string();
            (Config::default(), LoadStatus::Invalid(path, reason))
        }
    }
}

// ============================================================================
// Resolved run configuration
// ============================================================================

/// Values from the environment and command line; `None` keeps the file value
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub account: Option<String>,
    pub max_posts: Option<usize>,
    pub dry_run: bool,
    pub output: Option<PathBuf>,
    pub session_id: Option<String>,
    pub developer_token: Option<String>,
    pub team_id: Option<String>,
    pub key_id: Option<String>,
    pub private_key_path: Option<PathBuf>,
    pub user_token: Option<String>,
    pub storefront: Option<String>,
    pub request_delay_ms: Option<u64>,
}

/// How the developer token is obtained
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogCredentials {
    /// Use this token as is
    Token(String),
    /// Sign a token with a MusicKit key
    Key {
        team_id: String,
        key_id: String,
        private_key_path: PathBuf,
    },
}

/// Fully resolved, validated settings for one run
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub account: String,
    pub max_posts: usize,
    pub dry_run: bool,
    /// CSV report path
    pub output: Option<PathBuf>,
    pub session_id: Option<String>,
    pub page_size: u32,
    pub credentials: CatalogCredentials,
    pub user_token: Option<String>,
    pub storefront: String,
    pub search_limit: u32,
    pub request_delay: Duration,
    pub requests_per_second: Option<f64>,
    pub retry: RetryPolicy,
    pub matching: MatchPolicy,
}

impl RunConfig {
    /// Merge file settings with overrides and validate the result.
    pub fn resolve(config: Config, overrides: Overrides) -> Result<Self, ConfigError> {
        let account = overrides
            .account
            .as_deref()
            .map(|a| a.trim().trim_start_matches('@').to_string())
            .filter(|a| !a.is_empty())
            .ok_or(ConfigError::MissingAccount)?;

        let max_posts = overrides.max_posts.unwrap_or(config.run.max_posts);
        if max_posts == 0 {
            return Err(ConfigError::Invalid(
                "max posts must be at least 1".to_string(),
            ));
        }

        let apple = config.apple_music;
        let credentials = resolve_credentials(
            non_blank(overrides.developer_token.or(apple.developer_token)),
            non_blank(overrides.team_id.or(apple.team_id)),
            non_blank(overrides.key_id.or(apple.key_id)),
            overrides.private_key_path.or(apple.private_key_path),
        )?;

        let user_token = non_blank(overrides.user_token.or(apple.user_token));
        if user_token.is_none() && !overrides.dry_run {
            return Err(ConfigError::MissingUserToken);
        }

        validate_policy(&config.matching)?;

        let requests_per_second = config.run.requests_per_second;
        validate_rate(requests_per_second)?;

        let storefront = overrides.storefront.unwrap_or(apple.storefront);
        validate_storefront(&storefront)?;

        Ok(Self {
            account,
            max_posts,
            dry_run: overrides.dry_run,
            output: overrides.output,
            session_id: non_blank(overrides.session_id.or(config.instagram.session_id)),
            page_size: config.instagram.page_size,
            credentials,
            user_token,
            storefront: storefront.to_lowercase(),
            search_limit: apple.search_limit,
            request_delay: Duration::from_millis(
                overrides
                    .request_delay_ms
                    .unwrap_or(config.run.request_delay_ms),
            ),
            requests_per_second,
            retry: match config.run.retry_attempts {
                0 | 1 => RetryPolicy::none(),
                attempts => RetryPolicy {
                    max_attempts: attempts,
                    delay: Duration::from_millis(config.run.retry_delay_ms),
                },
            },
            matching: config.matching,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn resolve_credentials(
    developer_token: Option<String>,
    team_id: Option<String>,
    key_id: Option<String>,
    private_key_path: Option<PathBuf>,
) -> Result<CatalogCredentials, ConfigError> {
    if let Some(token) = developer_token {
        return Ok(CatalogCredentials::Token(token));
    }
    match (team_id, key_id, private_key_path) {
        (Some(team_id), Some(key_id), Some(private_key_path)) => Ok(CatalogCredentials::Key {
            team_id,
            key_id,
            private_key_path,
        }),
        _ => Err(ConfigError::MissingCatalogCredentials),
    }
}

impl Config {
    /// Check the file settings that `RunConfig::resolve` would reject.
    ///
    /// Credentials and the account are not checked here, they usually come
    /// from the environment.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.run.max_posts == 0 {
            return Err(ConfigError::Invalid(
                "max posts must be at least 1".to_string(),
            ));
        }
        validate_policy(&self.matching)?;
        validate_rate(self.run.requests_per_second)?;
        validate_storefront(&self.apple_music.storefront)
    }
}

fn validate_rate(requests_per_second: Option<f64>) -> Result<(), ConfigError> {
    if requests_per_second.is_some_and(|r| !(r > 0.0 && r.is_finite())) {
        return Err(ConfigError::Invalid(
            "run.requests_per_second must be a positive number".to_string(),
        ));
    }
    Ok(())
}

fn validate_storefront(storefront: &str) -> Result<(), ConfigError> {
    if storefront.len() != 2 || !storefront.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ConfigError::Invalid(format!(
            "storefront must be a two-letter country code, got '{}'",
            storefront
        )));
    }
    Ok(())
}

fn validate_policy(policy: &MatchPolicy) -> Result<(), ConfigError> {
    let in_range = |v: f32| (0.0..=1.0).contains(&v);
    if !in_range(policy.accept_threshold) || !in_range(policy.min_score) || !in_range(policy.min_margin) {
        return Err(ConfigError::Invalid(
            "matching thresholds must be between 0.0 and 1.0".to_string(),
        ));
    }
    if policy.min_score > policy.accept_threshold {
        return Err(ConfigError::Invalid(
            "matching.min_score must not exceed matching.accept_threshold".to_string(),
        ));
    }
    Ok(())
}

// ============================================================================
// Error Types
// ============================================================================

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("No Instagram account given. Use --user or set TARGET_INSTAGRAM_USER")]
    MissingAccount,

    #[error(
        "Apple Music credentials missing. Set APPLE_DEVELOPER_TOKEN, or APPLE_TEAM_ID, \
         APPLE_KEY_ID and APPLE_PRIVATE_KEY_PATH"
    )]
    MissingCatalogCredentials,

    #[error(
        "No Music-User-Token. Set APPLE_MUSIC_USER_TOKEN, or use --dry-run to only \
         search and report"
    )]
    MissingUserToken,

    #[error("Invalid setting: {0}")]
    Invalid(String),
}

// ============================================================================
// Tests
// ============================================================================
