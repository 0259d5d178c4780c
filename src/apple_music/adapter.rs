//! Adapter layer: Convert Apple Music DTOs to domain models
//!
//! This is the ONLY place where Apple Music DTO types are converted to domain
//! types.

use super::dto;
use crate::model::CatalogSong;

/// Convert a search response into catalog songs, keeping catalog order.
///
/// Resources without attributes cannot be scored and are dropped.
pub fn to_catalog_songs(response: dto::SearchResponse) -> Vec<CatalogSong> {
    response
        .results
        .songs
        .map(|page| page.data.into_iter().filter_map(to_catalog_song).collect())
        .unwrap_or_default()
}

fn to_catalog_song(song: dto::Song) -> Option<CatalogSong> {
    let attrs = song.attributes?;
    Some(CatalogSong {
        id: song.id,
        title: attrs.name,
        artist: attrs.artist_name,
        album: attrs.album_name.filter(|a| !a.is_empty()),
        url: attrs.url,
    })
}

/// Whether a `relate=library` lookup shows the song in the user's library
pub fn is_in_library(response: &dto::SongsResponse) -> bool {
    response
        .data
        .iter()
        .filter_map(|s| s.relationships.as_ref())
        .filter_map(|r| r.library.as_ref())
        .any(|l| !l.data.is_empty())
}

/// Best human-readable message from an error body
pub fn error_message(response: &dto::ErrorResponse) -> Option<String> {
    response.errors.first().and_then(|e| {
        match (e.title.as_deref(), e.detail.as_deref()) {
            (Some(title), Some(detail)) => Some(format!("{}: {}", title, detail)),
            (Some(title), None) => Some(title.to_string()),
            (None, Some(detail)) => Some(detail.to_string()),
            (None, None) => e.code.clone(),
        }
    })
}
