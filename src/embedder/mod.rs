//! Third-party media embeds and the marker protocol that carries them
//! through sanitization.
//!
//! While the document tree is walked, a recognized provider URL inside a
//! text node is replaced by a marker token
//!
//! ```text
//! ~~~ embed:<id> <type> ~~~
//! ```
//!
//! and only after the allow-list sanitizer has run does
//! [`AssetEmbedder::insert_all_embeds`] turn the markers into provider
//! markup. A marker that does not parse is left as literal text. Markers
//! inside attribute values are defused when the tree is serialized, so only
//! text content is ever materialized.

mod instagram;
mod spotify;
mod threespeak;
mod twitch;
mod twitter;
mod vimeo;
mod youtube;

pub use instagram::InstagramEmbedder;
pub use spotify::SpotifyEmbedder;
pub use threespeak::ThreeSpeakEmbedder;
pub use twitch::TwitchEmbedder;
pub use twitter::TwitterEmbedder;
pub use vimeo::VimeoEmbedder;
pub use youtube::{YoutubeEmbedder, YoutubeLink};

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

/// Prefix shared by every embed marker.
pub const MARKER_PREFIX: &str = "~~~ embed:";

/// The marker prefix with its first `~` as a character reference. Parses
/// back to the same attribute value but is never materialized.
const INERT_MARKER_PREFIX: &str = "&#126;~~ embed:";

static MARKER_BODY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z0-9_/?=.-]+) ([^ ]*) ~~~").expect("MARKER_BODY: hardcoded regex is valid")
});

/// What an embedder found in a text node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmbedMetadata {
    /// Provider-defined id, later passed back to [`Embedder::process_embed`].
    pub id: String,
    /// The exact substring of the text that is replaced by the marker.
    pub url: String,
    /// Thumbnail for the embed, if the provider has one.
    pub image: Option<String>,
    /// Canonical link to the embedded content.
    pub link: Option<String>,
}

/// Dimensions of materialized embeds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EmbedSize {
    pub width: u32,
    pub height: u32,
}

/// A provider matched a URL but could not derive an id from it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{provider} embedder failed: {message}")]
pub struct EmbedError {
    pub provider: &'static str,
    pub message: String,
}

/// A stateless provider of embeddable media.
pub trait Embedder: Send + Sync {
    /// The provider name written into the marker.
    fn kind(&self) -> &'static str;

    /// Look for the first URL of this provider in raw (unescaped) text.
    fn get_embed_metadata(&self, text: &str) -> Result<Option<EmbedMetadata>, EmbedError>;

    /// Provider markup for a marker id, or `None` if the id is not one this
    /// provider could have produced.
    fn process_embed(&self, id: &str, size: EmbedSize) -> Option<String>;
}

/// Render a marker token.
pub fn embed_marker(id: &str, kind: &str) -> String {
    format!("{MARKER_PREFIX}{id} {kind} ~~~")
}

/// Text-node result of [`AssetEmbedder::process_text`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EmbedOutcome {
    /// The text with the matched URL replaced by its marker.
    pub text: String,
    pub links: Vec<String>,
    pub images: Vec<String>,
}

/// Tries every provider in a fixed order; the first match wins.
pub struct AssetEmbedder {
    embedders: Vec<Box<dyn Embedder>>,
}

impl AssetEmbedder {
    /// All seven providers. `twitch_parent` is the domain Twitch requires
    /// the player to be embedded on.
    pub fn new(twitch_parent: impl Into<String>) -> Self {
        Self {
            embedders: vec![
                Box::new(YoutubeEmbedder),
                Box::new(VimeoEmbedder),
                Box::new(TwitchEmbedder::new(twitch_parent)),
                Box::new(SpotifyEmbedder),
                Box::new(ThreeSpeakEmbedder),
                Box::new(InstagramEmbedder),
                Box::new(TwitterEmbedder),
            ],
        }
    }

    /// An aggregator over a custom provider list, tried in the given order.
    pub fn with_embedders(embedders: Vec<Box<dyn Embedder>>) -> Self {
        Self { embedders }
    }

    /// Replace the first recognized provider URL in `text` with its marker.
    ///
    /// Returns `None` if no provider matched. A provider that fails is
    /// logged and skipped.
    pub fn process_text(&self, text: &str) -> Option<EmbedOutcome> {
        for embedder in &self.embedders {
            match embedder.get_embed_metadata(text) {
                Ok(Some(metadata)) => {
                    let marker = embed_marker(&metadata.id, embedder.kind());
                    return Some(EmbedOutcome {
                        text: text.replacen(&metadata.url, &marker, 1),
                        links: metadata.link.into_iter().collect(),
                        images: metadata.image.into_iter().collect(),
                    });
                }
                Ok(None) => {}
                Err(e) => tracing::warn!("{e}"),
            }
        }
        None
    }

    fn embedder_by_kind(&self, kind: &str) -> Option<&dyn Embedder> {
        self.embedders
            .iter()
            .find(|e| e.kind() == kind)
            .map(AsRef::as_ref)
    }

    /// Replace every well-formed marker in `html` with provider markup.
    pub fn insert_all_embeds(&self, html: &str, size: EmbedSize) -> String {
        let mut sections = html.split(MARKER_PREFIX);
        let mut out = String::with_capacity(html.len());
        if let Some(first) = sections.next() {
            out.push_str(first);
        }

        for section in sections {
            let materialized = MARKER_BODY.captures(section).and_then(|caps| {
                let whole = caps.get(0)?;
                let id = caps.get(1)?.as_str();
                let kind = caps.get(2)?.as_str();
                let markup = self.embedder_by_kind(kind)?.process_embed(id, size)?;
                Some((markup, whole.end()))
            });

            match materialized {
                Some((markup, consumed)) => {
                    out.push_str(&markup);
                    out.push_str(&section[consumed..]);
                }
                None => {
                    tracing::debug!("Leaving malformed embed marker as text");
                    out.push_str(MARKER_PREFIX);
                    out.push_str(section);
                }
            }
        }
        out
    }
}

/// Neutralize markers inside an already escaped attribute value. Only
/// markers in text content are ever turned into provider markup.
pub(crate) fn defuse_markers(escaped: &str) -> Cow<'_, str> {
    if escaped.contains(MARKER_PREFIX) {
        Cow::Owned(escaped.replace(MARKER_PREFIX, INERT_MARKER_PREFIX))
    } else {
        Cow::Borrowed(escaped)
    }
}

/// A provider iframe with the attributes every embed shares.
pub(crate) fn iframe(src: &str, size: EmbedSize, extra: &str) -> String {
    format!(
        r#"<iframe src="{src}" width="{}" height="{}" frameborder="0"{extra}></iframe>"#,
        size.width, size.height
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIZE: EmbedSize = EmbedSize {
        width: 640,
        height: 480,
    };

    struct Failing;

    impl Embedder for Failing {
        fn kind(&self) -> &'static str {
            "failing"
        }

        fn get_embed_metadata(&self, _text: &str) -> Result<Option<EmbedMetadata>, EmbedError> {
            Err(EmbedError {
                provider: "failing",
                message: "boom".to_string(),
            })
        }

        fn process_embed(&self, _id: &str, _size: EmbedSize) -> Option<String> {
            None
        }
    }

    #[test]
    fn marker_format() {
        assert_eq!(embed_marker("abc", "youtube"), "~~~ embed:abc youtube ~~~");
    }

    #[test]
    fn process_text_replaces_first_provider_url() {
        let embedder = AssetEmbedder::new("hive.blog");
        let out = embedder
            .process_text("watch https://www.youtube.com/watch?v=dQw4w9WgXcQ now")
            .unwrap();
        assert_eq!(out.text, "watch ~~~ embed:dQw4w9WgXcQ youtube ~~~ now");
        assert_eq!(
            out.images,
            vec!["https://img.youtube.com/vi/dQw4w9WgXcQ/hqdefault.jpg".to_string()]
        );
        assert_eq!(
            out.links,
            vec!["https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string()]
        );
    }

    #[test]
    fn process_text_without_provider_url() {
        let embedder = AssetEmbedder::new("hive.blog");
        assert!(embedder.process_text("just https://example.com").is_none());
    }

    #[test]
    fn failing_embedder_falls_through() {
        let embedder =
            AssetEmbedder::with_embedders(vec![Box::new(Failing), Box::new(VimeoEmbedder)]);
        let out = embedder.process_text("https://vimeo.com/123456").unwrap();
        assert_eq!(out.text, "~~~ embed:123456 vimeo ~~~");
    }

    #[test]
    fn insert_all_embeds_materializes_markers() {
        let embedder = AssetEmbedder::new("hive.blog");
        let html = "<p>before ~~~ embed:123456 vimeo ~~~ after</p>";
        let out = embedder.insert_all_embeds(html, SIZE);
        assert!(out.starts_with("<p>before "));
        assert!(out.contains(r#"src="https://player.vimeo.com/video/123456""#));
        assert!(out.ends_with(" after</p>"));
        assert!(!out.contains("~~~"));
    }

    #[test]
    fn malformed_marker_is_left_as_text() {
        let embedder = AssetEmbedder::new("hive.blog");
        for html in [
            "<p>~~~ embed:123456 vimeo</p>",
            "<p>~~~ embed:bad\"id vimeo ~~~</p>",
            "<p>~~~ embed:123456 unknown ~~~</p>",
            "<p>~~~ embed:not-digits vimeo ~~~</p>",
        ] {
            assert_eq!(embedder.insert_all_embeds(html, SIZE), html);
        }
    }

    #[test]
    fn defused_markers_are_not_materialized() {
        let embedder = AssetEmbedder::new("hive.blog");
        let value = defuse_markers("~~~ embed:123456 vimeo ~~~");
        assert_eq!(value, "&#126;~~ embed:123456 vimeo ~~~");
        let html = format!(r#"<a title="{value}">t</a>"#);
        assert_eq!(embedder.insert_all_embeds(&html, SIZE), html);

        assert_eq!(defuse_markers("~~~~ embed:1 vimeo ~~~"), "~&#126;~~ embed:1 vimeo ~~~");
        assert!(matches!(defuse_markers("plain ~ value"), Cow::Borrowed(_)));
    }

    #[test]
    fn multiple_markers() {
        let embedder = AssetEmbedder::new("hive.blog");
        let html = "~~~ embed:1 vimeo ~~~ and ~~~ embed:2 vimeo ~~~";
        let out = embedder.insert_all_embeds(html, SIZE);
        assert!(out.contains("video/1\""));
        assert!(out.contains("video/2\""));
        assert!(out.contains(" and "));
    }
}
