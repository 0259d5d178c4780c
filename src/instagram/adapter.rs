//! Adapter layer: Convert Instagram DTOs to domain models
//!
//! This is the ONLY place where Instagram DTO types are converted to domain
//! types. If Instagram changes its response format, only this file and dto.rs
//! need to change.

use super::dto;
use super::{PageCursor, PostPage};
use crate::model::PostRecord;

/// Title Instagram gives creator-recorded sounds; not a catalog song.
const GENERIC_ORIGINAL_AUDIO: &str = "original audio";

/// Build the public URL for a post short code
pub fn permalink(shortcode: &str) -> String {
    format!("https://www.instagram.com/p/{}/", shortcode)
}

/// Convert a profile's embedded first page into a [`PostPage`]
pub fn profile_to_page(user: dto::User) -> PostPage {
    let user_id = user.id;
    let Some(media) = user.edge_owner_to_timeline_media else {
        return PostPage::default();
    };

    let last_media_id = media.edges.last().map(|e| e.node.id.clone());
    let has_next = media.page_info.is_some_and(|p| p.has_next_page);

    let posts = media.edges.into_iter().map(|e| node_to_post(e.node)).collect();

    // The feed endpoint continues from "<media id>_<user id>"
    let next = match (has_next, last_media_id) {
        (true, Some(media_id)) => Some(PageCursor {
            user_id: user_id.clone(),
            max_id: format!("{}_{}", media_id, user_id),
        }),
        _ => None,
    };

    PostPage { posts, next }
}

/// Convert a feed page into a [`PostPage`]
pub fn feed_to_page(user_id: &str, response: dto::FeedResponse) -> PostPage {
    let next = match (response.more_available, response.next_max_id) {
        (true, Some(max_id)) => Some(PageCursor {
            user_id: user_id.to_string(),
            max_id,
        }),
        _ => None,
    };

    PostPage {
        posts: response.items.into_iter().map(item_to_post).collect(),
        next,
    }
}

fn node_to_post(node: dto::MediaNode) -> PostRecord {
    let caption = node
        .edge_media_to_caption
        .and_then(|c| c.edges.into_iter().next())
        .map(|e| e.node.text)
        .filter(|t| !t.trim().is_empty());

    let (audio_title, audio_artist) = match node.clips_music_attribution_info {
        Some(music) if music.uses_original_audio => (original_sound_title(music.song_name), None),
        Some(music) => (music.song_name, music.artist_name),
        None => (None, None),
    };

    PostRecord {
        permalink: permalink(&node.shortcode),
        caption,
        audio_title,
        audio_artist,
    }
}

fn item_to_post(item: dto::FeedItem) -> PostRecord {
    let caption = item
        .caption
        .map(|c| c.text)
        .filter(|t| !t.trim().is_empty());

    let (audio_title, audio_artist) = match item.clips_metadata {
        Some(clips) => match (clips.music_info, clips.original_sound_info) {
            (Some(dto::MusicInfo {
                music_asset_info: Some(asset),
            }), _) => (asset.title, asset.display_artist),
            (_, Some(original)) => (original_sound_title(original.original_audio_title), None),
            _ => (None, None),
        },
        None => (None, None),
    };

    PostRecord {
        permalink: permalink(&item.code),
        caption,
        audio_title,
        audio_artist,
    }
}

/// Creator sounds keep their title only when it is more than the generic label.
/// The uploader is not the artist, so no artist is reported.
fn original_sound_title(title: Option<String>) -> Option<String> {
    title.filter(|t| !t.trim().eq_ignore_ascii_case(GENERIC_ORIGINAL_AUDIO))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(shortcode: &str, music: Option<dto::MusicAttribution>) -> dto::MediaNode {
        dto::MediaNode {
            id: format!("{}-id", shortcode),
            shortcode: shortcode.to_string(),
            is_video: music.is_some(),
            product_type: music.as_ref().map(|_| "clips".to_string()),
            edge_media_to_caption: Some(dto::CaptionConnection {
                edges: vec![dto::CaptionEdge {
                    node: dto::CaptionNode {
                        text: "caption text".to_string(),
                    },
                }],
            }),
            clips_music_attribution_info: music,
        }
    }

    fn music(song: &str, artist: &str, original: bool) -> dto::MusicAttribution {
        dto::MusicAttribution {
            artist_name: Some(artist.to_string()),
            song_name: Some(song.to_string()),
            uses_original_audio: original,
            audio_id: None,
        }
    }

    fn user(edges: Vec<dto::MediaNode>, has_next: bool) -> dto::User {
        dto::User {
            id: "42".to_string(),
            username: "someone".to_string(),
            is_private: false,
            edge_owner_to_timeline_media: Some(dto::MediaConnection {
                count: Some(edges.len() as u64),
                page_info: Some(dto::PageInfo {
                    has_next_page: has_next,
                    end_cursor: None,
                }),
                edges: edges.into_iter().map(|node| dto::MediaEdge { node }).collect(),
            }),
        }
    }

    #[test]
    fn test_licensed_music_carried_over() {
        let page = profile_to_page(user(
            vec![node("abc", Some(music("Blinding Lights", "The Weeknd", false)))],
            false,
        ));
        let post = &page.posts[0];
        assert_eq!(post.permalink, "https://www.instagram.com/p/abc/");
        assert_eq!(post.caption.as_deref(), Some("caption text"));
        assert_eq!(post.audio_title.as_deref(), Some("Blinding Lights"));
        assert_eq!(post.audio_artist.as_deref(), Some("The Weeknd"));
        assert!(page.next.is_none());
    }

    #[test]
    fn test_generic_original_audio_dropped() {
        let page = profile_to_page(user(
            vec![node("abc", Some(music("Original audio", "someone", true)))],
            false,
        ));
        assert!(page.posts[0].audio_title.is_none());
        assert!(page.posts[0].audio_artist.is_none());
    }

    #[test]
    fn test_named_original_audio_kept_without_artist() {
        let page = profile_to_page(user(
            vec![node("abc", Some(music("Nightcall · Original audio", "someone", true)))],
            false,
        ));
        assert_eq!(
            page.posts[0].audio_title.as_deref(),
            Some("Nightcall · Original audio")
        );
        assert!(page.posts[0].audio_artist.is_none());
    }

    #[test]
    fn test_profile_cursor_uses_last_media_id() {
        let page = profile_to_page(user(vec![node("a", None), node("b", None)], true));
        let cursor = page.next.unwrap();
        assert_eq!(cursor.user_id, "42");
        assert_eq!(cursor.max_id, "b-id_42");
    }

    #[test]
    fn test_profile_without_media() {
        let mut u = user(vec![], false);
        u.edge_owner_to_timeline_media = None;
        let page = profile_to_page(u);
        assert!(page.posts.is_empty());
        assert!(page.next.is_none());
    }

    #[test]
    fn test_feed_page_conversion() {
        let response = dto::FeedResponse {
            items: vec![
                dto::FeedItem {
                    code: "x1".to_string(),
                    caption: Some(dto::FeedCaption {
                        text: "  ".to_string(),
                    }),
                    clips_metadata: Some(dto::ClipsMetadata {
                        music_info: Some(dto::MusicInfo {
                            music_asset_info: Some(dto::MusicAssetInfo {
                                title: Some("One More Time".to_string()),
                                display_artist: Some("Daft Punk".to_string()),
                            }),
                        }),
                        original_sound_info: None,
                    }),
                },
                dto::FeedItem {
                    code: "x2".to_string(),
                    caption: None,
                    clips_metadata: Some(dto::ClipsMetadata {
                        music_info: None,
                        original_sound_info: Some(dto::OriginalSoundInfo {
                            original_audio_title: Some("Original audio".to_string()),
                        }),
                    }),
                },
            ],
            more_available: true,
            next_max_id: Some("next".to_string()),
            status: Some("ok".to_string()),
        };

        let page = feed_to_page("42", response);
        assert_eq!(page.posts.len(), 2);
        assert!(page.posts[0].caption.is_none());
        assert_eq!(page.posts[0].audio_artist.as_deref(), Some("Daft Punk"));
        assert!(page.posts[1].audio_title.is_none());
        assert_eq!(page.next.unwrap().max_id, "next");
    }

    #[test]
    fn test_feed_end_has_no_cursor() {
        let response = dto::FeedResponse {
            items: vec![],
            more_available: false,
            next_max_id: Some("ignored".to_string()),
            status: None,
        };
        assert!(feed_to_page("42", response).next.is_none());
    }
}
