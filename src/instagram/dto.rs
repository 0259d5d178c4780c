//! Instagram web API Data Transfer Objects
//!
//! These types match what the (undocumented) web endpoints return.
//! Only the fields we read are declared; everything else is ignored.
//! DO NOT use these types outside the instagram module - convert via the adapter.
//!
//! Two endpoints are used:
//! - `/api/v1/users/web_profile_info/?username=…` - profile + first page (GraphQL shape)
//! - `/api/v1/feed/user/{id}/?count=…&max_id=…` - later pages (private-API shape)

use serde::Deserialize;

// ============================================================================
// web_profile_info
// ============================================================================

/// Profile lookup response
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileResponse {
    pub data: Option<ProfileData>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProfileData {
    /// `null` when the account does not exist
    pub user: Option<User>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    /// Numeric user ID (as a string)
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub is_private: bool,
    /// First page of the timeline
    pub edge_owner_to_timeline_media: Option<MediaConnection>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaConnection {
    /// Total number of posts on the account
    pub count: Option<u64>,
    pub page_info: Option<PageInfo>,
    #[serde(default)]
    pub edges: Vec<MediaEdge>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PageInfo {
    #[serde(default)]
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaEdge {
    pub node: MediaNode,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaNode {
    /// Media ID
    pub id: String,
    /// Short code used in the post URL
    pub shortcode: String,
    #[serde(default)]
    pub is_video: bool,
    /// "clips" for Reels
    pub product_type: Option<String>,
    pub edge_media_to_caption: Option<CaptionConnection>,
    /// Present on Reels with attached audio
    pub clips_music_attribution_info: Option<MusicAttribution>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaptionConnection {
    #[serde(default)]
    pub edges: Vec<CaptionEdge>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaptionEdge {
    pub node: CaptionNode,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaptionNode {
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MusicAttribution {
    pub artist_name: Option<String>,
    pub song_name: Option<String>,
    /// True when the audio is the creator's own recording
    #[serde(default)]
    pub uses_original_audio: bool,
    pub audio_id: Option<String>,
}

// ============================================================================
// feed/user
// ============================================================================

/// User feed page
#[derive(Debug, Clone, Deserialize)]
pub struct FeedResponse {
    #[serde(default)]
    pub items: Vec<FeedItem>,
    #[serde(default)]
    pub more_available: bool,
    pub next_max_id: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedItem {
    /// Short code used in the post URL
    pub code: String,
    pub caption: Option<FeedCaption>,
    /// Present on Reels
    pub clips_metadata: Option<ClipsMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedCaption {
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClipsMetadata {
    /// Licensed music
    pub music_info: Option<MusicInfo>,
    /// Creator-uploaded sound
    pub original_sound_info: Option<OriginalSoundInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MusicInfo {
    pub music_asset_info: Option<MusicAssetInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MusicAssetInfo {
    pub title: Option<String>,
    pub display_artist: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OriginalSoundInfo {
    pub original_audio_title: Option<String>,
}

// ============================================================================
// Errors
// ============================================================================

/// Error body returned with 4xx responses
#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    pub message: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub require_login: bool,
}
