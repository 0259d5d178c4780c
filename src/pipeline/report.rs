//! Run report: one row per checked post, optionally exported as CSV.

use std::path::Path;

use serde::Serialize;

use crate::model::{MatchResult, Outcome};

/// Outcome column value for posts without a song candidate
pub const SKIPPED: &str = "skipped";

/// CSV header, in [`ReportRow`] field order
const COLUMNS: [&str; 12] = [
    "permalink",
    "candidate_title",
    "candidate_artist",
    "source",
    "outcome",
    "confidence",
    "catalog_id",
    "matched_title",
    "matched_artist",
    "matched_album",
    "catalog_url",
    "detail",
];

/// Errors that can occur while writing the report
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// One report line. Field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub permalink: String,
    pub candidate_title: Option<String>,
    pub candidate_artist: Option<String>,
    pub source: Option<&'static str>,
    pub outcome: &'static str,
    pub confidence: Option<String>,
    pub catalog_id: Option<String>,
    pub matched_title: Option<String>,
    pub matched_artist: Option<String>,
    pub matched_album: Option<String>,
    pub catalog_url: Option<String>,
    pub detail: Option<String>,
}

impl ReportRow {
    /// Row for a post that yielded no candidate
    pub fn skipped(permalink: &str) -> Self {
        Self {
            permalink: permalink.to_string(),
            candidate_title: None,
            candidate_artist: None,
            source: None,
            outcome: SKIPPED,
            confidence: None,
            catalog_id: None,
            matched_title: None,
            matched_artist: None,
            matched_album: None,
            catalog_url: None,
            detail: None,
        }
    }

    /// Row for a resolved candidate
    pub fn resolved(permalink: &str, result: &MatchResult) -> Self {
        let confidence = match result.outcome {
            Outcome::Error => None,
            _ => Some(format!("{:.3}", result.confidence)),
        };
        Self {
            permalink: permalink.to_string(),
            candidate_title: Some(result.candidate.title.clone()),
            candidate_artist: result.candidate.artist.clone(),
            source: Some(result.candidate.source.as_str()),
            outcome: result.outcome.as_str(),
            confidence,
            catalog_id: result.catalog_id.clone(),
            matched_title: result.matched.as_ref().map(|s| s.title.clone()),
            matched_artist: result.matched.as_ref().map(|s| s.artist.clone()),
            matched_album: result.matched.as_ref().and_then(|s| s.album.clone()),
            catalog_url: result.matched.as_ref().and_then(|s| s.url.clone()),
            detail: result.detail.clone(),
        }
    }
}

/// Write rows as CSV with a header line, creating parent directories.
///
/// The header is written even when there are no rows.
pub fn write_csv(path: &Path, rows: &[ReportRow]) -> Result<(), ReportError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    writer.write_record(COLUMNS)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    tracing::info!("Results exported to {}", path.display());
    Ok(())
}
