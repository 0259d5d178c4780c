//! The sync command: posts → songs → library.

use clap::Args;
use std::path::PathBuf;
use tokio::runtime::Runtime;

use crate::apple_music::{AppleMusicClient, DeveloperToken, TokenError};
use crate::config::{CatalogCredentials, Config, Overrides, RunConfig};
use crate::error::{Error, ResultExt};
use crate::extract::{Extractor, ExtractorConfig};
use crate::instagram::InstagramClient;
use crate::matching::Matcher;
use crate::pipeline::{Pipeline, RunOptions, RunReport, write_csv};
use crate::rate_limit::{FixedDelay, RateLimiter, TokenBucket, Unlimited};

use super::CredentialArgs;

/// Options of the sync command
#[derive(Args, Debug, Clone)]
pub struct SyncArgs {
    /// Instagram account to scan (without @)
    #[arg(short, long, env = "TARGET_INSTAGRAM_USER")]
    pub user: Option<String>,

    /// Number of recent posts to scan
    #[arg(short, long, env = "MAX_POSTS")]
    pub posts: Option<usize>,

    /// Search and report without adding anything to the library
    #[arg(
        long,
        env = "DRY_RUN",
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    pub dry_run: bool,

    /// Write the results to this CSV file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Apple Music storefront (two-letter country code)
    #[arg(long)]
    pub storefront: Option<String>,

    /// Pause between Apple Music requests, in milliseconds
    #[arg(long)]
    pub delay_ms: Option<u64>,

    #[command(flatten)]
    pub credentials: CredentialArgs,
}

impl SyncArgs {
    /// Settings from flags and environment, layered over the config file
    pub fn overrides(&self) -> Overrides {
        let c = self.credentials.clone();
        Overrides {
            account: self.user.clone(),
            max_posts: self.posts,
            dry_run: self.dry_run,
            output: self.output.clone(),
            session_id: c.session_id,
            developer_token: c.developer_token,
            team_id: c.team_id,
            key_id: c.key_id,
            private_key_path: c.private_key_path,
            user_token: c.user_token,
            storefront: self.storefront.clone(),
            request_delay_ms: self.delay_ms,
        }
    }
}

/// Run a sync
pub fn cmd_sync(rt: &Runtime, args: &SyncArgs, config: Config) -> anyhow::Result<()> {
    let run = RunConfig::resolve(config, args.overrides()).map_err(Error::from)?;

    if run.dry_run {
        tracing::info!("DRY RUN MODE - no songs will be added to the library");
    }

    let token = developer_token(&run.credentials)
        .with_context("Preparing the Apple Music developer token")?;

    let instagram = InstagramClient::new(run.session_id.clone(), run.page_size, run.retry);
    if !instagram.is_authenticated() {
        tracing::warn!(
            "No Instagram session configured; only the most recent posts may be visible"
        );
    }

    let catalog = AppleMusicClient::new(token, run.user_token.clone())
        .with_storefront(&run.storefront)
        .with_search_limit(run.search_limit)
        .with_retry(run.retry);

    let limiter: Box<dyn RateLimiter> = match run.requests_per_second {
        Some(rate) => Box::new(TokenBucket::new(rate.ceil() as u32, rate)),
        None if run.request_delay.is_zero() => Box::new(Unlimited),
        None => Box::new(FixedDelay::new(run.request_delay)),
    };

    let pipeline = Pipeline::new(
        &instagram,
        &catalog,
        limiter.as_ref(),
        Extractor::new(ExtractorConfig::default()),
        Matcher::new(run.matching),
        RunOptions {
            account: run.account.clone(),
            max_posts: run.max_posts,
            dry_run: run.dry_run,
        },
    );

    let report = rt.block_on(pipeline.run())?;

    if let Some(ref path) = run.output {
        write_csv(path, &report.rows).with_context(format!("Writing {}", path.display()))?;
    }

    stop_reason(report).map_err(Into::into)
}

/// The error that ended a run early, if it should fail the command
fn stop_reason(report: RunReport) -> Result<(), Error> {
    if let Some(e) = report.catalog_error {
        return Err(Error::from(e).context("Apple Music requests stopped early"));
    }
    match report.fetch_error {
        Some(e) if e.is_fatal() => Err(Error::from(e).context("Fetching posts stopped early")),
        _ => Ok(()),
    }
}

fn developer_token(credentials: &CatalogCredentials) -> Result<DeveloperToken, TokenError> {
    match credentials {
        CatalogCredentials::Token(token) => DeveloperToken::from_string(token.clone()),
        CatalogCredentials::Key {
            team_id,
            key_id,
            private_key_path,
        } => DeveloperToken::from_key_file(team_id, key_id, private_key_path),
    }
}
