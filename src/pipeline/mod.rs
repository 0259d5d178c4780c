//! Sync pipeline - drives one run from posts to library.
//!
//! Each post goes through `fetched → extracted (or skipped) → searched →
//! resolved`, strictly one after another. The rate limiter is awaited before
//! every catalog call.
//!
//! Failures for a single post become an `Error` row. Errors that make further
//! progress impossible (bad credentials, rate limits) stop the run, but the
//! rows collected so far are kept. Only an unreadable account fails outright.

mod report;

use std::collections::HashMap;

use futures::StreamExt;

use crate::apple_music::CatalogError;
use crate::error::Result;
use crate::extract::Extractor;
use crate::instagram::{FetchError, fetch_posts};
use crate::matching::{Matcher, normalize};
use crate::model::{AddStatus, MatchResult, Outcome, PostRecord, SongCandidate};
use crate::rate_limit::RateLimiter;
use crate::traits::{CatalogApi, PostSource};

pub use report::{ReportError, ReportRow, write_csv};

/// How often a progress line is logged
const PROGRESS_EVERY: usize = 10;

/// What to sync
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Instagram handle, without the `@`
    pub account: String,
    pub max_posts: usize,
    /// Search and match, but never modify the library
    pub dry_run: bool,
}

/// Counts and notable songs of a finished run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub posts_checked: usize,
    pub skipped: usize,
    pub added: usize,
    pub already_in_library: usize,
    pub not_found: usize,
    pub ambiguous: usize,
    pub errors: usize,
    pub not_found_songs: Vec<String>,
    pub ambiguous_songs: Vec<String>,
    pub failures: Vec<String>,
}

impl RunSummary {
    fn record(&mut self, result: &MatchResult) {
        let song = result.candidate.to_string();
        match result.outcome {
            Outcome::Added => self.added += 1,
            Outcome::AlreadyInLibrary => self.already_in_library += 1,
            Outcome::NotFound => {
                self.not_found += 1;
                self.not_found_songs.push(song);
            }
            Outcome::Ambiguous => {
                self.ambiguous += 1;
                self.ambiguous_songs.push(song);
            }
            Outcome::Error => {
                self.errors += 1;
                let detail = result.detail.as_deref().unwrap_or("unknown error");
                self.failures.push(format!("{}: {}", song, detail));
            }
        }
    }

    /// Songs with a catalog match
    pub fn matched(&self) -> usize {
        self.added + self.already_in_library
    }

    /// Log the end-of-run summary
    pub fn log(&self, dry_run: bool) {
        tracing::info!("{}", "=".repeat(60));
        tracing::info!("SUMMARY{}", if dry_run { " (dry run)" } else { "" });
        tracing::info!("{}", "=".repeat(60));
        tracing::info!("Posts checked:        {}", self.posts_checked);
        tracing::info!("Posts without a song: {}", self.skipped);
        tracing::info!(
            "{} {}:{} {}",
            Outcome::Added.symbol(),
            if dry_run { "Would add" } else { "Added" },
            " ".repeat(if dry_run { 10 } else { 14 }),
            self.added
        );
        tracing::info!(
            "{} Already in library:   {}",
            Outcome::AlreadyInLibrary.symbol(),
            self.already_in_library
        );
        tracing::info!("{} Not found:            {}", Outcome::NotFound.symbol(), self.not_found);
        tracing::info!("{} Ambiguous:            {}", Outcome::Ambiguous.symbol(), self.ambiguous);
        tracing::info!("{} Errors:               {}", Outcome::Error.symbol(), self.errors);

        if !self.not_found_songs.is_empty() {
            tracing::info!("Songs not found in the catalog:");
            for song in &self.not_found_songs {
                tracing::info!("  - {}", song);
            }
        }
        if !self.ambiguous_songs.is_empty() {
            tracing::info!("Songs needing manual review:");
            for song in &self.ambiguous_songs {
                tracing::info!("  - {}", song);
            }
        }
        if !self.failures.is_empty() {
            tracing::warn!("Failures:");
            for failure in &self.failures {
                tracing::warn!("  - {}", failure);
            }
        }
    }
}

/// Everything a run produced
#[derive(Debug, Default)]
pub struct RunReport {
    /// One row per checked post, in post order
    pub rows: Vec<ReportRow>,
    pub summary: RunSummary,
    /// Set when fetching stopped early; the rows cover the posts read before
    pub fetch_error: Option<FetchError>,
    /// Set when the catalog refused further requests; the failing post is the last row
    pub catalog_error: Option<CatalogError>,
}

/// One sync run over the injected services
pub struct Pipeline<'a> {
    source: &'a dyn PostSource,
    catalog: &'a dyn CatalogApi,
    limiter: &'a dyn RateLimiter,
    extractor: Extractor,
    matcher: Matcher,
    options: RunOptions,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        source: &'a dyn PostSource,
        catalog: &'a dyn CatalogApi,
        limiter: &'a dyn RateLimiter,
        extractor: Extractor,
        matcher: Matcher,
        options: RunOptions,
    ) -> Self {
        Self {
            source,
            catalog,
            limiter,
            extractor,
            matcher,
            options,
        }
    }

    /// Run the pipeline to completion.
    ///
    /// Returns an error only when the very first fetch fails fatally. Later
    /// failures end the run early and are recorded in the report.
    pub async fn run(&self) -> Result<RunReport> {
        tracing::info!(
            account = %self.options.account,
            max_posts = self.options.max_posts,
            dry_run = self.options.dry_run,
            "Starting sync"
        );

        let mut report = RunReport::default();
        // Results of earlier candidates, keyed by normalized title and artist
        let mut resolved: HashMap<String, MatchResult> = HashMap::new();

        let mut posts = std::pin::pin!(fetch_posts(
            self.source,
            &self.options.account,
            self.options.max_posts
        ));

        while let Some(next) = posts.next().await {
            let post = match next {
                Ok(post) => post,
                Err(e) if report.summary.posts_checked == 0 && e.is_fatal() => {
                    return Err(e.into());
                }
                Err(e) => {
                    tracing::warn!(
                        "Fetching stopped after {} posts: {}",
                        report.summary.posts_checked,
                        e
                    );
                    report.fetch_error = Some(e);
                    break;
                }
            };

            report.summary.posts_checked += 1;
            if let Err(e) = self.process(&post, &mut resolved, &mut report).await {
                tracing::error!(
                    "Stopping after {} posts, Apple Music refused requests: {}",
                    report.summary.posts_checked,
                    e
                );
                report.catalog_error = Some(e);
                break;
            }

            if report.summary.posts_checked % PROGRESS_EVERY == 0 {
                tracing::info!(
                    "Processed {} posts, {} songs matched",
                    report.summary.posts_checked,
                    report.summary.matched()
                );
            }
        }

        report.summary.log(self.options.dry_run);
        Ok(report)
    }

    async fn process(
        &self,
        post: &PostRecord,
        resolved: &mut HashMap<String, MatchResult>,
        report: &mut RunReport,
    ) -> std::result::Result<(), CatalogError> {
        let Some(candidate) = self.extractor.extract(post) else {
            tracing::debug!(post = %post.permalink, "No song found");
            report.summary.skipped += 1;
            report.rows.push(ReportRow::skipped(&post.permalink));
            return Ok(());
        };

        tracing::info!(
            post = %post.permalink,
            source = candidate.source.as_str(),
            "Found song: {}",
            candidate
        );

        let key = dedup_key(&candidate);
        let result = match resolved.get(&key) {
            Some(earlier) => {
                tracing::debug!(title = %candidate.title, "Song already handled in this run");
                repeat_of(earlier, candidate)
            }
            None => {
                let result = match self.resolve(candidate.clone()).await {
                    Ok(result) => result,
                    Err(e) => {
                        let failed = MatchResult::error(candidate, e.to_string());
                        report.summary.record(&failed);
                        report.rows.push(ReportRow::resolved(&post.permalink, &failed));
                        return Err(e);
                    }
                };
                if result.outcome != Outcome::Error {
                    resolved.insert(key, result.clone());
                }
                result
            }
        };

        tracing::info!(
            outcome = result.outcome.as_str(),
            score = result.confidence,
            "{} {}",
            result.outcome.symbol(),
            result.candidate
        );

        report.summary.record(&result);
        report.rows.push(ReportRow::resolved(&post.permalink, &result));
        Ok(())
    }

    /// Search, match and (unless dry-run) add one candidate.
    ///
    /// Only fatal catalog errors come back as `Err`.
    async fn resolve(
        &self,
        candidate: SongCandidate,
    ) -> std::result::Result<MatchResult, CatalogError> {
        self.limiter.wait().await;
        let results = match self
            .catalog
            .search(&candidate.title, candidate.artist.as_deref())
            .await
        {
            Ok(results) => results,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                tracing::warn!(title = %candidate.title, "Search failed: {}", e);
                return Ok(MatchResult::error(candidate, format!("search failed: {}", e)));
            }
        };

        let pending = self.matcher.resolve(&candidate, &results);
        if pending.outcome != Outcome::Added || self.options.dry_run {
            return Ok(pending);
        }

        let Some(catalog_id) = pending.catalog_id.clone() else {
            return Ok(pending.failed("matched song has no catalog id"));
        };

        self.limiter.wait().await;
        match self.catalog.add_to_library(&catalog_id).await {
            Ok(status) => Ok(pending.settle(status)),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                tracing::warn!(catalog_id = %catalog_id, "Add failed: {}", e);
                Ok(pending.failed(format!("add failed: {}", e)))
            }
        }
    }
}

fn dedup_key(candidate: &SongCandidate) -> String {
    format!(
        "{}\u{1f}{}",
        normalize(&candidate.title),
        candidate.artist.as_deref().map(normalize).unwrap_or_default()
    )
}

/// Result for a candidate equal to one resolved earlier in the run
fn repeat_of(earlier: &MatchResult, candidate: SongCandidate) -> MatchResult {
    let result = MatchResult {
        candidate,
        ..earlier.clone()
    };
    if result.outcome.is_match() {
        result.settle(AddStatus::AlreadyPresent)
    } else {
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::extract::ExtractorConfig;
    use crate::matching::MatchPolicy;
    use crate::rate_limit::Unlimited;
    use crate::test_utils::{audio_post, caption_post, song};
    use crate::traits::mocks::{MockCatalog, MockPostSource};

    fn options(dry_run: bool) -> RunOptions {
        RunOptions {
            account: "someone".to_string(),
            max_posts: 50,
            dry_run,
        }
    }

    async fn run(
        source: &MockPostSource,
        catalog: &MockCatalog,
        dry_run: bool,
    ) -> Result<RunReport> {
        Pipeline::new(
            source,
            catalog,
            &Unlimited,
            Extractor::new(ExtractorConfig::default()),
            Matcher::new(MatchPolicy::default()),
            options(dry_run),
        )
        .run()
        .await
    }

    fn weeknd_catalog() -> MockCatalog {
        MockCatalog::empty().with_results(
            "Blinding Lights",
            vec![
                song("1488408568", "Blinding Lights", "The Weeknd"),
                song("1499378615", "Blinding Lights (Remix)", "The Weeknd"),
            ],
        )
    }

    #[tokio::test]
    async fn test_match_is_added() {
        let source = MockPostSource::with_pages(vec![vec![audio_post(
            "p1",
            "Blinding Lights",
            Some("The Weeknd"),
        )]]);
        let catalog = weeknd_catalog();

        let report = run(&source, &catalog, false).await.unwrap();
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].outcome, "added");
        assert_eq!(report.rows[0].catalog_id.as_deref(), Some("1488408568"));
        assert_eq!(catalog.add_calls(), vec!["1488408568"]);
        assert_eq!(report.summary.added, 1);
    }

    #[tokio::test]
    async fn test_dry_run_never_adds() {
        let source = MockPostSource::with_pages(vec![vec![audio_post(
            "p1",
            "Blinding Lights",
            Some("The Weeknd"),
        )]]);
        let catalog = weeknd_catalog();

        let report = run(&source, &catalog, true).await.unwrap();
        assert_eq!(report.rows[0].outcome, "added");
        assert!(catalog.add_calls().is_empty());
        assert_eq!(catalog.search_count(), 1);
    }

    #[tokio::test]
    async fn test_repeated_song_is_already_in_library() {
        let source = MockPostSource::with_pages(vec![vec![
            audio_post("p1", "Blinding Lights", Some("The Weeknd")),
            caption_post("p2", "No music here"),
            audio_post("p3", "blinding lights", Some("The Weeknd")),
        ]]);
        let catalog = weeknd_catalog();

        let report = run(&source, &catalog, false).await.unwrap();
        let outcomes: Vec<_> = report.rows.iter().map(|r| r.outcome).collect();
        assert_eq!(outcomes, vec!["added", "skipped", "already_in_library"]);
        assert_eq!(catalog.search_count(), 1);
        assert_eq!(catalog.add_calls().len(), 1);
        assert_eq!(report.summary.skipped, 1);
        assert_eq!(report.summary.already_in_library, 1);
    }

    #[tokio::test]
    async fn test_song_already_in_library() {
        let source = MockPostSource::with_pages(vec![vec![audio_post(
            "p1",
            "Blinding Lights",
            Some("The Weeknd"),
        )]]);
        let catalog = weeknd_catalog().with_library("1488408568");

        let report = run(&source, &catalog, false).await.unwrap();
        assert_eq!(report.rows[0].outcome, "already_in_library");
    }

    #[tokio::test]
    async fn test_not_found_and_ambiguous() {
        let source = MockPostSource::with_pages(vec![vec![
            audio_post("p1", "Unknown Song", None),
            audio_post("p2", "Love", None),
        ]]);
        let catalog = MockCatalog::empty()
            .with_results("Love", vec![song("1", "Love", "A"), song("2", "Love", "B")]);

        let report = run(&source, &catalog, false).await.unwrap();
        assert_eq!(report.rows[0].outcome, "not_found");
        assert_eq!(report.rows[0].confidence.as_deref(), Some("0.000"));
        assert_eq!(report.rows[1].outcome, "ambiguous");
        assert!(catalog.add_calls().is_empty());
        assert_eq!(report.summary.not_found_songs, vec!["Unknown Song"]);
        assert_eq!(report.summary.ambiguous_songs, vec!["Love"]);
    }

    #[tokio::test]
    async fn test_transient_search_error_becomes_error_row() {
        let source = MockPostSource::with_pages(vec![vec![
            audio_post("p1", "Blinding Lights", Some("The Weeknd")),
            audio_post("p2", "Blinding Lights", Some("The Weeknd")),
        ]]);
        let catalog = MockCatalog::empty()
            .with_search_error(CatalogError::Transient("HTTP 503".to_string()));

        let report = run(&source, &catalog, false).await.unwrap();
        assert_eq!(report.rows.len(), 2);
        assert!(report.rows.iter().all(|r| r.outcome == "error"));
        // Errors are not cached, so the repeat searches again
        assert_eq!(catalog.search_count(), 2);
        assert_eq!(report.summary.errors, 2);
    }

    #[tokio::test]
    async fn test_add_error_keeps_match() {
        let source = MockPostSource::with_pages(vec![vec![audio_post(
            "p1",
            "Blinding Lights",
            Some("The Weeknd"),
        )]]);
        let catalog = weeknd_catalog().with_add_error(CatalogError::Api("HTTP 400".to_string()));

        let report = run(&source, &catalog, false).await.unwrap();
        let row = &report.rows[0];
        assert_eq!(row.outcome, "error");
        assert_eq!(row.matched_title.as_deref(), Some("Blinding Lights"));
        assert!(row.detail.as_deref().unwrap().contains("HTTP 400"));
    }

    #[tokio::test]
    async fn test_catalog_auth_error_stops_run() {
        let source = MockPostSource::with_pages(vec![vec![
            audio_post("p1", "Love", None),
            audio_post("p2", "Blinding Lights", Some("The Weeknd")),
        ]]);
        let catalog =
            MockCatalog::empty().with_search_error(CatalogError::Auth("HTTP 401".to_string()));

        let report = run(&source, &catalog, false).await.unwrap();
        assert!(matches!(report.catalog_error, Some(CatalogError::Auth(_))));
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].outcome, "error");
        assert_eq!(catalog.search_count(), 1);
    }

    #[tokio::test]
    async fn test_fatal_error_mid_run_keeps_earlier_rows() {
        let source = MockPostSource::with_pages(vec![vec![
            audio_post("p1", "Blinding Lights", Some("The Weeknd")),
            audio_post("p2", "Love", None),
            audio_post("p3", "Summer Vibes", Some("DJ Sunny")),
        ]]);
        let catalog = weeknd_catalog()
            .failing_search_at(1, CatalogError::Auth("HTTP 401".to_string()));

        let report = run(&source, &catalog, false).await.unwrap();
        let outcomes: Vec<_> = report.rows.iter().map(|r| r.outcome).collect();
        assert_eq!(outcomes, vec!["added", "error"]);
        assert_eq!(catalog.add_calls(), vec!["1488408568"]);
        assert_eq!(report.summary.added, 1);
        assert_eq!(report.summary.errors, 1);
        assert_eq!(report.summary.posts_checked, 2);
        assert!(report.catalog_error.is_some_and(|e| e.is_fatal()));
    }

    #[tokio::test]
    async fn test_unknown_account_aborts() {
        let source = MockPostSource::with_error(FetchError::NotFound("someone".to_string()));
        let catalog = MockCatalog::empty();

        let err = run(&source, &catalog, false).await.unwrap_err();
        assert!(matches!(err, Error::Fetch(FetchError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_later_page_failure_keeps_partial_report() {
        let source = MockPostSource::with_pages(vec![vec![
            caption_post("p1", "Summer Vibes by DJ Sunny"),
            caption_post("p2", "just a sunset"),
        ]])
        .failing_at_page(1, FetchError::RateLimited);
        let catalog = MockCatalog::empty()
            .with_results("Summer Vibes", vec![song("7", "Summer Vibes", "DJ Sunny")]);

        let report = run(&source, &catalog, true).await.unwrap();
        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.rows[0].outcome, "added");
        assert!(matches!(report.fetch_error, Some(FetchError::RateLimited)));
    }

    #[tokio::test]
    async fn test_max_posts_respected() {
        let posts = (0..30)
            .map(|i| caption_post(&format!("p{i}"), "nothing"))
            .collect();
        let source = MockPostSource::with_pages(vec![posts]);
        let catalog = MockCatalog::empty();

        let mut opts = options(true);
        opts.max_posts = 12;
        let extractor = Extractor::new(ExtractorConfig::default());
        let matcher = Matcher::new(MatchPolicy::default());
        let report = Pipeline::new(&source, &catalog, &Unlimited, extractor, matcher, opts)
            .run()
            .await
            .unwrap();
        assert_eq!(report.summary.posts_checked, 12);
        assert_eq!(report.summary.skipped, 12);
    }
}
