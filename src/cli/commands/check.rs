//! Setup check: which credentials and settings are configured.
//!
//! Secrets are never printed, only whether they are set.

use crate::apple_music::DeveloperToken;
use crate::config::{Config, LoadStatus};

use super::CredentialArgs;

/// Print the configuration status; fails when a sync could not start
pub fn cmd_check(
    user: Option<&str>,
    credentials: &CredentialArgs,
    config: &Config,
    status: &LoadStatus,
) -> anyhow::Result<()> {
    let mut problems = Vec::new();

    println!("reelsync setup");
    println!("==============");

    match status {
        LoadStatus::Loaded(path) => println!("Config file:      {} (loaded)", path.display()),
        LoadStatus::Missing(path) => println!("Config file:      {} (not present)", path.display()),
        LoadStatus::Invalid(path, reason) => {
            println!("Config file:      {} (INVALID: {})", path.display(), reason);
            problems.push("fix or remove the config file".to_string());
        }
        LoadStatus::NoConfigDir => println!("Config file:      no config directory on this system"),
    }
    println!();

    match user.map(|u| u.trim_start_matches('@')).filter(|u| !u.is_empty()) {
        Some(user) => println!("✓ Instagram account:  @{}", user),
        None => {
            println!("✗ Instagram account:  not set (--user or TARGET_INSTAGRAM_USER)");
            problems.push("set the Instagram account".to_string());
        }
    }

    let session = set(&credentials.session_id) || set(&config.instagram.session_id);
    if session {
        println!("✓ Instagram session:  set");
    } else {
        println!("- Instagram session:  not set (anonymous; pagination may be refused)");
    }

    let apple = &config.apple_music;
    let developer_token = set(&credentials.developer_token) || set(&apple.developer_token);
    let team_id = credentials.team_id.as_ref().or(apple.team_id.as_ref());
    let key_id = credentials.key_id.as_ref().or(apple.key_id.as_ref());
    let key_path = credentials
        .private_key_path
        .as_ref()
        .or(apple.private_key_path.as_ref());

    if developer_token {
        println!("✓ Developer token:    set");
    } else {
        match (team_id, key_id, key_path) {
            (Some(team_id), Some(key_id), Some(key_path)) => {
                match DeveloperToken::from_key_file(team_id, key_id, key_path) {
                    Ok(_) => println!(
                        "✓ Developer token:    generated from key {} ({})",
                        key_id,
                        key_path.display()
                    ),
                    Err(e) => {
                        println!("✗ Developer token:    {}", e);
                        problems.push("fix the MusicKit private key".to_string());
                    }
                }
            }
            _ => {
                println!(
                    "✗ Developer token:    not set (APPLE_DEVELOPER_TOKEN, or APPLE_TEAM_ID + \
                     APPLE_KEY_ID + APPLE_PRIVATE_KEY_PATH)"
                );
                problems.push("configure Apple Music developer credentials".to_string());
            }
        }
    }

    if set(&credentials.user_token) || set(&apple.user_token) {
        println!("✓ Music-User-Token:   set");
    } else {
        println!("- Music-User-Token:   not set (only --dry-run is possible)");
    }

    match config.validate() {
        Ok(()) => println!("✓ Settings:           valid"),
        Err(e) => {
            println!("✗ Settings:           {}", e);
            problems.push("fix the invalid setting".to_string());
        }
    }

    println!("  Storefront:         {}", apple.storefront);
    println!("  Max posts:          {}", config.run.max_posts);
    match config.run.requests_per_second {
        Some(rate) => println!("  Request pacing:     {} per second", rate),
        None => println!("  Request pacing:     {} ms between calls", config.run.request_delay_ms),
    }
    println!(
        "  Matching:           accept ≥ {:.2}, reject < {:.2}, margin {:.2}",
        config.matching.accept_threshold, config.matching.min_score, config.matching.min_margin
    );

    println!();
    if problems.is_empty() {
        println!("Ready to sync.");
        Ok(())
    } else {
        anyhow::bail!("Setup incomplete: {}", problems.join("; "))
    }
}

fn set(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}
