//! Caption delimiter patterns.
//!
//! Patterns are tried in priority order. Each pattern scans the caption line by
//! line; the first line it matches wins. Hashtags are removed from a line
//! before any pattern sees it.

use std::sync::OnceLock;

use regex::Regex;

use super::{clean, clean_artist, has_content};

/// Characters that mark a line as carrying music info.
const MUSIC_NOTES: &[char] = &['♫', '♪', '🎵', '🎶'];

/// Which capture group holds the title.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Order {
    TitleFirst,
    ArtistFirst,
}

struct CaptionPattern {
    name: &'static str,
    regex: Regex,
    order: Order,
    /// Line must contain one of these (they are removed before matching)
    marker: Option<&'static [char]>,
}

/// A title/artist pair parsed out of a caption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCaption {
    pub title: String,
    pub artist: String,
}

fn patterns() -> &'static [CaptionPattern] {
    static PATTERNS: OnceLock<Vec<CaptionPattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        vec![
            CaptionPattern {
                name: "quoted-title-dash-artist",
                regex: Regex::new(
                    r#"^.*?["“”«»„](?P<first>[^"“”«»„]+)["“”«»„]\s*[-–—]\s*(?P<second>.+)$"#,
                )
                .expect("valid regex"),
                order: Order::TitleFirst,
                marker: None,
            },
            CaptionPattern {
                name: "music-note-title-dash-artist",
                regex: Regex::new(r"^(?P<first>.+?)\s*(?:\s-\s|[–—])\s*(?P<second>.+)$")
                    .expect("valid regex"),
                order: Order::TitleFirst,
                marker: Some(MUSIC_NOTES),
            },
            CaptionPattern {
                name: "title-by-artist",
                regex: Regex::new(r"^(?P<first>.+?)\s+(?i:by)\s+(?P<second>.+)$")
                    .expect("valid regex"),
                order: Order::TitleFirst,
                marker: None,
            },
            CaptionPattern {
                name: "artist-dash-title",
                regex: Regex::new(r"^(?P<first>.+?)\s+[-–—]\s+(?P<second>.+)$")
                    .expect("valid regex"),
                order: Order::ArtistFirst,
                marker: None,
            },
        ]
    })
}

fn hashtag_regex() -> &'static Regex {
    static HASHTAG: OnceLock<Regex> = OnceLock::new();
    HASHTAG.get_or_init(|| Regex::new(r"#[\p{L}\p{N}_]+").expect("valid regex"))
}

/// Parse a caption into a title/artist pair.
///
/// `max_len` bounds each side in characters, so that whole sentences
/// containing " by " are not mistaken for song credits.
pub fn parse_caption(caption: &str, max_len: usize) -> Option<ParsedCaption> {
    let lines: Vec<String> = caption
        .lines()
        .map(|line| hashtag_regex().replace_all(line, "").trim().to_string())
        .filter(|line| !line.is_empty())
        .collect();

    for pattern in patterns() {
        for line in &lines {
            if let Some(parsed) = pattern.apply(line, max_len) {
                tracing::trace!(pattern = pattern.name, line = %line, "Caption pattern matched");
                return Some(parsed);
            }
        }
    }
    None
}

impl CaptionPattern {
    fn apply(&self, line: &str, max_len: usize) -> Option<ParsedCaption> {
        let stripped;
        let line = match self.marker {
            Some(markers) => {
                if !line.contains(markers) {
                    return None;
                }
                stripped = line.replace(markers, " ");
                stripped.trim()
            }
            None => line,
        };

        let caps = self.regex.captures(line)?;
        let first = caps.name("first")?.as_str();
        let second = caps.name("second")?.as_str();
        let (title, artist) = match self.order {
            Order::TitleFirst => (clean(first), clean_artist(second)),
            Order::ArtistFirst => (clean(second), clean_artist(first)),
        };

        let fits = |s: &str| has_content(s) && s.chars().count() <= max_len;
        if !fits(&title) || !fits(&artist) {
            return None;
        }
        Some(ParsedCaption { title, artist })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(caption: &str) -> Option<(String, String)> {
        parse_caption(caption, 80).map(|p| (p.title, p.artist))
    }

    fn pair(title: &str, artist: &str) -> Option<(String, String)> {
        Some((title.to_string(), artist.to_string()))
    }

    #[test]
    fn test_quoted_title_dash_artist() {
        assert_eq!(
            parse("Now playing “Midnight City” – M83"),
            pair("Midnight City", "M83")
        );
    }

    #[test]
    fn test_title_by_artist_with_emoji() {
        assert_eq!(
            parse("☀️ Summer Vibes by DJ Sunny"),
            pair("Summer Vibes", "DJ Sunny")
        );
    }

    #[test]
    fn test_artist_dash_title() {
        assert_eq!(parse("Daft Punk - One More Time"), pair("One More Time", "Daft Punk"));
    }

    #[test]
    fn test_music_note_line_is_title_first() {
        let caption = "Sunset session\n🎵 Sweet Disposition - The Temper Trap";
        assert_eq!(parse(caption), pair("Sweet Disposition", "The Temper Trap"));
    }

    #[test]
    fn test_quoted_pattern_wins_over_by() {
        let caption = "Shot by Alex\n\"Dreams\" - Fleetwood Mac";
        assert_eq!(parse(caption), pair("Dreams", "Fleetwood Mac"));
    }

    #[test]
    fn test_hashtags_and_mentions_removed() {
        assert_eq!(
            parse("Levitating by @dualipa #dance #fyp"),
            pair("Levitating", "dualipa")
        );
        assert_eq!(
            parse("Heat Waves by Glass Animals | link in bio"),
            pair("Heat Waves", "Glass Animals")
        );
    }

    #[test]
    fn test_unspaced_hyphen_is_not_a_delimiter() {
        assert_eq!(parse("A well-known place"), None);
    }

    #[test]
    fn test_no_pattern() {
        assert_eq!(parse("Great day at the beach!"), None);
        assert_eq!(parse(""), None);
    }

    #[test]
    fn test_overlong_sides_rejected() {
        let long = "word ".repeat(30);
        assert_eq!(parse(&format!("{long}by Someone")), None);
    }
}
