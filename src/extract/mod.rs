//! Metadata extraction - turns a scraped post into a song candidate.
//!
//! Attached audio metadata always wins. Only when a post carries no usable
//! audio title do we fall back to parsing the caption (see [`patterns`]).
//! A post that yields nothing is skipped; that is not an error.

mod patterns;

use std::sync::OnceLock;

use regex::Regex;

use crate::model::{CandidateSource, PostRecord, SongCandidate};

use patterns::parse_caption;

/// Quote characters stripped from either end of a title or artist.
const QUOTES: &[char] = &['"', '\'', '`', '“', '”', '‘', '’', '«', '»', '„'];

/// Separators the platform puts between title and artist in attributions.
const ATTRIBUTION_SEPARATORS: [char; 2] = ['·', '•'];

/// Extractor settings
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Maximum length (in characters) of a title or artist parsed from a caption
    pub max_caption_field_len: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            max_caption_field_len: 80,
        }
    }
}

/// Produces at most one [`SongCandidate`] per post.
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    config: ExtractorConfig,
}

impl Extractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    /// Extract a song candidate from a post.
    pub fn extract(&self, post: &PostRecord) -> Option<SongCandidate> {
        let audio_artist = post
            .audio_artist
            .as_deref()
            .map(clean)
            .filter(|a| has_content(a));

        if let Some(candidate) = post
            .audio_title
            .as_deref()
            .and_then(|title| from_audio_title(title, audio_artist.clone()))
        {
            return Some(candidate);
        }

        let parsed = parse_caption(post.caption.as_deref()?, self.config.max_caption_field_len)?;
        Some(SongCandidate {
            title: parsed.title,
            artist: audio_artist.or(Some(parsed.artist)),
            source: CandidateSource::CaptionHeuristic,
        })
    }
}

fn from_audio_title(raw: &str, audio_artist: Option<String>) -> Option<SongCandidate> {
    let without_boilerplate = boilerplate_regex().replace(raw.trim(), "");
    let text = without_boilerplate.as_ref();

    // "Title · Artist" attribution; the audio artist field still wins for the artist
    let (title, attributed) = match text.split_once(ATTRIBUTION_SEPARATORS) {
        Some((left, right)) if has_content(&clean(left)) => {
            let right = clean(right);
            (clean(left), has_content(&right).then_some(right))
        }
        _ => (clean(text), None),
    };

    has_content(&title).then_some(SongCandidate {
        title,
        artist: audio_artist.or(attributed),
        source: CandidateSource::AudioMetadata,
    })
}

fn boilerplate_regex() -> &'static Regex {
    static BOILERPLATE: OnceLock<Regex> = OnceLock::new();
    BOILERPLATE.get_or_init(|| {
        Regex::new(r"(?i)\s*(?:[·•|\-–—]\s*|\(\s*)original\s+(?:audio|sound)\s*\)?\s*$")
            .expect("valid regex")
    })
}

/// Characters trimmed from the ends of a title or artist: whitespace, quotes,
/// emoji and other non-ASCII symbols, and list-style punctuation.
fn is_decoration(c: char) -> bool {
    c.is_whitespace()
        || QUOTES.contains(&c)
        || (!c.is_alphanumeric() && !c.is_ascii())
        || matches!(c, '-' | '*' | '_' | '~' | ':' | ';' | ',' | '|')
}

/// Collapse internal whitespace and strip surrounding quotes/emoji.
/// Case is preserved.
pub fn clean(s: &str) -> String {
    let collapsed = s.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.trim_matches(is_decoration).to_string()
}

/// Clean an artist parsed from free text: drops a leading `@` and anything
/// after a hashtag, pipe, or mention.
pub fn clean_artist(s: &str) -> String {
    let s = s.trim_start().trim_start_matches('@');
    let end = s.find(['#', '|', '@']).unwrap_or(s.len());
    clean(&s[..end])
}

/// Whether a string holds at least one letter or digit.
pub fn has_content(s: &str) -> bool {
    s.chars().any(char::is_alphanumeric)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn post(caption: Option<&str>, title: Option<&str>, artist: Option<&str>) -> PostRecord {
        PostRecord {
            permalink: "https://www.instagram.com/p/abc/".to_string(),
            caption: caption.map(String::from),
            audio_title: title.map(String::from),
            audio_artist: artist.map(String::from),
        }
    }

    #[test]
    fn test_audio_metadata_wins() {
        let extractor = Extractor::default();
        let candidate = extractor
            .extract(&post(
                Some("Summer Vibes by DJ Sunny"),
                Some("  Blinding Lights "),
                Some("The Weeknd"),
            ))
            .unwrap();
        assert_eq!(candidate.title, "Blinding Lights");
        assert_eq!(candidate.artist.as_deref(), Some("The Weeknd"));
        assert_eq!(candidate.source, CandidateSource::AudioMetadata);
    }

    #[test]
    fn test_strips_original_audio_suffix() {
        let extractor = Extractor::default();
        for title in [
            "Nightcall · Original audio",
            "Nightcall • original audio",
            "Nightcall - Original Sound",
            "Nightcall (Original audio)",
        ] {
            let candidate = extractor.extract(&post(None, Some(title), Some("Kavinsky"))).unwrap();
            assert_eq!(candidate.title, "Nightcall", "input: {title}");
        }
    }

    #[test]
    fn test_attribution_separator_supplies_artist() {
        let extractor = Extractor::default();
        let candidate = extractor
            .extract(&post(None, Some("Espresso · Sabrina Carpenter"), None))
            .unwrap();
        assert_eq!(candidate.title, "Espresso");
        assert_eq!(candidate.artist.as_deref(), Some("Sabrina Carpenter"));
    }

    #[test]
    fn test_attribution_split_even_with_audio_artist() {
        let extractor = Extractor::default();
        let candidate = extractor
            .extract(&post(None, Some("Espresso · someone"), Some("Sabrina Carpenter")))
            .unwrap();
        assert_eq!(candidate.title, "Espresso");
        assert_eq!(candidate.artist.as_deref(), Some("Sabrina Carpenter"));

        let candidate = extractor
            .extract(&post(None, Some("Espresso • "), Some("Sabrina Carpenter")))
            .unwrap();
        assert_eq!(candidate.title, "Espresso");
    }

    #[test]
    fn test_caption_fallback() {
        let extractor = Extractor::default();
        let candidate = extractor
            .extract(&post(Some("☀️ Summer Vibes by DJ Sunny"), None, None))
            .unwrap();
        assert_eq!(candidate.title, "Summer Vibes");
        assert_eq!(candidate.artist.as_deref(), Some("DJ Sunny"));
        assert_eq!(candidate.source, CandidateSource::CaptionHeuristic);
    }

    #[test]
    fn test_audio_artist_overrides_caption_artist() {
        let extractor = Extractor::default();
        let candidate = extractor
            .extract(&post(Some("Summer Vibes by DJ Sunny"), Some("   "), Some("Sunny")))
            .unwrap();
        assert_eq!(candidate.artist.as_deref(), Some("Sunny"));
        assert_eq!(candidate.source, CandidateSource::CaptionHeuristic);
    }

    #[test]
    fn test_boilerplate_only_title_falls_through() {
        let extractor = Extractor::default();
        let candidate = extractor
            .extract(&post(Some("Daft Punk - One More Time"), Some("· Original audio"), None))
            .unwrap();
        assert_eq!(candidate.source, CandidateSource::CaptionHeuristic);
        assert_eq!(candidate.title, "One More Time");
    }

    #[test]
    fn test_nothing_to_extract() {
        let extractor = Extractor::default();
        assert!(extractor.extract(&post(None, None, Some("Artist"))).is_none());
        assert!(extractor.extract(&post(Some("Lovely day"), None, None)).is_none());
    }

    #[test]
    fn test_clean() {
        assert_eq!(clean("  “Hello   World”  "), "Hello World");
        assert_eq!(clean("🔥🔥 Help! 🔥"), "Help!");
        assert_eq!(clean("Café del Mar"), "Café del Mar");
        assert_eq!(clean("(Remix)"), "(Remix)");
    }

    #[test]
    fn test_clean_artist() {
        assert_eq!(clean_artist("@djsunny #house"), "djsunny");
        assert_eq!(clean_artist("Glass Animals | tickets"), "Glass Animals");
    }

    proptest! {
        #[test]
        fn prop_audio_title_always_wins(
            title in "[A-Za-z0-9][A-Za-z0-9 ]{0,30}",
            caption in ".{0,60}",
        ) {
            let extractor = Extractor::default();
            let candidate = extractor.extract(&post(Some(&caption), Some(&title), None));
            prop_assert!(candidate.is_some());
            prop_assert_eq!(candidate.unwrap().source, CandidateSource::AudioMetadata);
        }

        #[test]
        fn prop_clean_is_idempotent(s in "\\PC{0,40}") {
            let once = clean(&s);
            prop_assert_eq!(clean(&once), once.clone());
        }
    }
}
