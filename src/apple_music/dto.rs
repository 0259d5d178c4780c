//! Apple Music API Data Transfer Objects
//!
//! These types match the Apple Music API JSON response format.
//! DO NOT use these types outside the apple_music module - convert via the adapter.
//!
//! See: https://developer.apple.com/documentation/applemusicapi

use serde::Deserialize;

/// Catalog search response
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: SearchResults,
}

/// Result groups, one per requested type. Absent when nothing matched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResults {
    pub songs: Option<SongPage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SongPage {
    #[serde(default)]
    pub data: Vec<Song>,
    /// Relative URL of the next page of results
    pub next: Option<String>,
}

/// Catalog song resource
#[derive(Debug, Clone, Deserialize)]
pub struct Song {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub attributes: Option<SongAttributes>,
    /// Present when requested with `relate=library`
    pub relationships: Option<SongRelationships>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongAttributes {
    pub name: String,
    pub artist_name: String,
    pub album_name: Option<String>,
    pub url: Option<String>,
    pub isrc: Option<String>,
    pub duration_in_millis: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SongRelationships {
    pub library: Option<LibraryRelationship>,
}

/// The user's library copies of a catalog song; empty when not in the library
#[derive(Debug, Clone, Deserialize)]
pub struct LibraryRelationship {
    #[serde(default)]
    pub data: Vec<LibraryResource>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LibraryResource {
    /// Library ID, e.g. "i.abc123"
    pub id: String,
}

/// Response of `GET /v1/catalog/{storefront}/songs/{id}`
#[derive(Debug, Clone, Deserialize)]
pub struct SongsResponse {
    #[serde(default)]
    pub data: Vec<Song>,
}

/// Error response body
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub errors: Vec<ApiError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    pub status: Option<String>,
    pub code: Option<String>,
    pub title: Option<String>,
    pub detail: Option<String>,
}
