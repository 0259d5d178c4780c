//! Catalog matching - scores search results against a candidate.
//!
//! Catalog search is free-text and noisy, so a result is only accepted when it
//! is both similar enough and clearly better than any competing song:
//!
//! | top score        | runner-up                          | outcome        |
//! |------------------|------------------------------------|----------------|
//! | no results       | -                                  | NotFound (0.0) |
//! | < min_score      | -                                  | NotFound       |
//! | < accept         | margin < min_margin                | Ambiguous      |
//! | < accept         | margin >= min_margin (or none)     | Added          |
//! | >= accept        | also >= accept, margin < min_margin| Ambiguous      |
//! | >= accept        | otherwise                          | Added          |
//!
//! The runner-up is the best result that is a *different* song from the top
//! one. The same recording listed twice (album and single editions) does not
//! compete with itself.

use serde::{Deserialize, Serialize};

use crate::model::{CatalogSong, MatchResult, Outcome, SongCandidate};

/// Weight of the title term when both sides have an artist
const TITLE_WEIGHT: f32 = 0.7;
/// Weight of the artist term when both sides have an artist
const ARTIST_WEIGHT: f32 = 0.3;
/// Scores within this of a threshold count as reaching it
const SCORE_TOLERANCE: f32 = 1e-5;

/// Thresholds for accepting a match. All values are in 0.0..=1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchPolicy {
    /// Scores at or above this are accepted without needing a margin
    pub accept_threshold: f32,
    /// Scores below this are never accepted
    pub min_score: f32,
    /// Required lead over the runner-up
    pub min_margin: f32,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            accept_threshold: 0.85,
            min_score: 0.5,
            min_margin: 0.15,
        }
    }
}

/// Picks the best catalog result for a candidate.
#[derive(Debug, Clone, Default)]
pub struct Matcher {
    policy: MatchPolicy,
}

impl Matcher {
    pub fn new(policy: MatchPolicy) -> Self {
        Self { policy }
    }

    /// Resolve a candidate against ordered search results.
    ///
    /// Accepted matches come back as [`Outcome::Added`], pending the add call.
    pub fn resolve(&self, candidate: &SongCandidate, results: &[CatalogSong]) -> MatchResult {
        let scored: Vec<(f32, &CatalogSong)> = results
            .iter()
            .map(|song| (score(candidate, song), song))
            .collect();

        // Earliest result wins ties, so keep the first maximum
        let Some(&(top_score, top)) = scored
            .iter()
            .fold(None, |best: Option<&(f32, &CatalogSong)>, item| match best {
                Some(b) if b.0 >= item.0 => Some(b),
                _ => Some(item),
            })
        else {
            return MatchResult::not_found(candidate.clone(), 0.0);
        };

        let runner_up = scored
            .iter()
            .filter(|(_, song)| !same_song(song, top))
            .map(|(s, song)| (*s, *song))
            .fold(None, |best: Option<(f32, &CatalogSong)>, item| match best {
                Some(b) if b.0 >= item.0 => Some(b),
                _ => Some(item),
            });

        tracing::debug!(
            candidate = %candidate,
            top = %top.title,
            top_score,
            runner_up = ?runner_up.map(|(s, _)| s),
            "Scored catalog results"
        );

        if !reaches(top_score, self.policy.min_score) {
            return MatchResult {
                matched: Some(top.clone()),
                ..MatchResult::not_found(candidate.clone(), top_score)
            };
        }

        let ambiguous_with = runner_up.filter(|(second_score, _)| {
            let close = !reaches(top_score - second_score, self.policy.min_margin);
            if reaches(top_score, self.policy.accept_threshold) {
                close && reaches(*second_score, self.policy.accept_threshold)
            } else {
                close
            }
        });

        let (outcome, detail) = match ambiguous_with {
            Some((second_score, second)) => (
                Outcome::Ambiguous,
                Some(format!(
                    "runner-up '{}' by {} ({:.2})",
                    second.title, second.artist, second_score
                )),
            ),
            None => (Outcome::Added, None),
        };

        MatchResult {
            candidate: candidate.clone(),
            catalog_id: Some(top.id.clone()),
            confidence: top_score,
            outcome,
            matched: Some(top.clone()),
            detail,
        }
    }
}

/// `value >= threshold`, forgiving f32 rounding of the weighted sum.
fn reaches(value: f32, threshold: f32) -> bool {
    value + SCORE_TOLERANCE >= threshold
}

/// Score a catalog song against a candidate (0.0 to 1.0).
pub fn score(candidate: &SongCandidate, song: &CatalogSong) -> f32 {
    let title_similarity = similarity(&candidate.title, &song.title);
    match candidate.artist.as_deref() {
        Some(artist) if !normalize(artist).is_empty() && !normalize(&song.artist).is_empty() => {
            TITLE_WEIGHT * title_similarity + ARTIST_WEIGHT * similarity(artist, &song.artist)
        }
        _ => title_similarity,
    }
}

/// Normalized Levenshtein similarity of two strings after [`normalize`].
pub fn similarity(a: &str, b: &str) -> f32 {
    let a = normalize(a);
    let b = normalize(b);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    strsim::normalized_levenshtein(&a, &b) as f32
}

/// Lowercase, drop punctuation, collapse whitespace.
pub fn normalize(s: &str) -> String {
    s.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn same_song(a: &CatalogSong, b: &CatalogSong) -> bool {
    a.id == b.id || (normalize(&a.title) == normalize(&b.title) && normalize(&a.artist) == normalize(&b.artist))
}
