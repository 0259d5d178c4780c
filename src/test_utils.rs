//! Test fixtures shared across modules.
//!
//! # Example
//!
//! ```ignore
//! use crate::test_utils::{audio_post, song};
//!
//! let post = audio_post("abc", "Blinding Lights", Some("The Weeknd"));
//! let catalog = vec![song("1", "Blinding Lights", "The Weeknd")];
//! ```

use crate::instagram::permalink;
use crate::model::{CatalogSong, PostRecord};

/// A catalog search result.
pub fn song(id: &str, title: &str, artist: &str) -> CatalogSong {
    CatalogSong {
        id: id.to_string(),
        title: title.to_string(),
        artist: artist.to_string(),
        album: None,
        url: None,
    }
}

/// A Reel with licensed audio attached and no caption.
pub fn audio_post(shortcode: &str, title: &str, artist: Option<&str>) -> PostRecord {
    PostRecord {
        permalink: permalink(shortcode),
        caption: None,
        audio_title: Some(title.to_string()),
        audio_artist: artist.map(str::to_string),
    }
}

/// A post with only a caption.
pub fn caption_post(shortcode: &str, caption: &str) -> PostRecord {
    PostRecord {
        permalink: permalink(shortcode),
        caption: Some(caption.to_string()),
        audio_title: None,
        audio_artist: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_post_fixture() {
        let post = audio_post("abc", "Song", None);
        assert_eq!(post.permalink, "https://www.instagram.com/p/abc/");
        assert!(post.caption.is_none());
        assert!(post.audio_artist.is_none());
    }

    #[test]
    fn test_caption_post_fixture() {
        let post = caption_post("abc", "Song by Artist");
        assert_eq!(post.caption.as_deref(), Some("Song by Artist"));
        assert!(post.audio_title.is_none());
    }
}
