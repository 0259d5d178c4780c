//! Core data models for a sync run.
//!
//! Defines the entities that flow through the pipeline:
//! [`PostRecord`] → [`SongCandidate`] → [`MatchResult`].
//!
//! These are OUR types. Instagram and Apple Music responses are converted into
//! them by the adapters in [`crate::instagram`] and [`crate::apple_music`].

use std::fmt;

/// A single post scraped from the target account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostRecord {
    /// Public URL of the post
    pub permalink: String,
    /// Caption text (may be multi-line)
    pub caption: Option<String>,
    /// Title of the attached audio track, as the platform reports it
    pub audio_title: Option<String>,
    /// Artist of the attached audio track
    pub audio_artist: Option<String>,
}

/// Where a candidate's title came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CandidateSource {
    AudioMetadata,
    CaptionHeuristic,
}

impl CandidateSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CandidateSource::AudioMetadata => "audio_metadata",
            CandidateSource::CaptionHeuristic => "caption",
        }
    }
}

/// An inferred (title, artist) pair, prior to catalog lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongCandidate {
    /// Song title, case preserved
    pub title: String,
    /// Artist name, if one could be determined
    pub artist: Option<String>,
    pub source: CandidateSource,
}

impl fmt::Display for SongCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.artist {
            Some(artist) => write!(f, "{} by {}", self.title, artist),
            None => write!(f, "{}", self.title),
        }
    }
}

/// One song returned by a catalog search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSong {
    /// Catalog ID (used for the add-to-library call)
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    /// Link to the song in the catalog's web player
    pub url: Option<String>,
}

/// Result of an add-to-library call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddStatus {
    AddedOk,
    AlreadyPresent,
}

/// Terminal outcome for a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// Matched and added (or would be added, in dry-run)
    Added,
    /// Matched, but the song was already in the library
    AlreadyInLibrary,
    /// No catalog result was close enough
    NotFound,
    /// Two different songs matched equally well; needs manual review
    Ambiguous,
    /// A per-post failure (search or add failed after retries)
    Error,
}

impl Outcome {
    /// Convert to string representation for reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Added => "added",
            Outcome::AlreadyInLibrary => "already_in_library",
            Outcome::NotFound => "not_found",
            Outcome::Ambiguous => "ambiguous",
            Outcome::Error => "error",
        }
    }

    /// Get symbol representation for console output.
    pub fn symbol(&self) -> &'static str {
        match self {
            Outcome::Added => "✓",
            Outcome::AlreadyInLibrary => "=",
            Outcome::NotFound => "✗",
            Outcome::Ambiguous => "?",
            Outcome::Error => "!",
        }
    }

    /// Whether the candidate was matched to a catalog song.
    pub fn is_match(&self) -> bool {
        matches!(self, Outcome::Added | Outcome::AlreadyInLibrary)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single, terminal result for one candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub candidate: SongCandidate,
    /// Catalog ID of the selected song (also kept for ambiguous results)
    pub catalog_id: Option<String>,
    /// Similarity score of the selected song (0.0 to 1.0)
    pub confidence: f32,
    pub outcome: Outcome,
    /// The catalog song the score refers to
    pub matched: Option<CatalogSong>,
    /// Human-readable note (error message, runner-up for ambiguous results)
    pub detail: Option<String>,
}

impl MatchResult {
    /// A result with no catalog song attached.
    pub fn not_found(candidate: SongCandidate, confidence: f32) -> Self {
        Self {
            candidate,
            catalog_id: None,
            confidence,
            outcome: Outcome::NotFound,
            matched: None,
            detail: None,
        }
    }

    /// A per-post failure.
    pub fn error(candidate: SongCandidate, message: impl Into<String>) -> Self {
        Self {
            candidate,
            catalog_id: None,
            confidence: 0.0,
            outcome: Outcome::Error,
            matched: None,
            detail: Some(message.into()),
        }
    }

    /// Settle a pending `Added` result with the catalog's add response.
    ///
    /// Consumes the pending result; any other outcome is returned unchanged.
    pub fn settle(self, status: AddStatus) -> Self {
        if self.outcome != Outcome::Added {
            return self;
        }
        match status {
            AddStatus::AddedOk => self,
            AddStatus::AlreadyPresent => Self {
                outcome: Outcome::AlreadyInLibrary,
                ..self
            },
        }
    }

    /// Turn a pending `Added` result into a failure, keeping the matched song.
    pub fn failed(self, message: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Error,
            detail: Some(message.into()),
            ..self
        }
    }
}
