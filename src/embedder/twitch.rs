//! Twitch channels and past broadcasts.

use std::sync::LazyLock;

use regex::Regex;

use super::{EmbedError, EmbedMetadata, EmbedSize, Embedder, iframe};

static LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r##"(?i)https?://(?:www\.|m\.)?twitch\.tv/(?:videos/(\d+)|([A-Za-z0-9][A-Za-z0-9_]{3,24}))(?:[/?#][^\s<>"]*)?"##,
    )
    .expect("LINK: hardcoded regex is valid")
});

static EMBED_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\?(?:video=\d+|channel=[A-Za-z0-9][A-Za-z0-9_]{3,24})$")
        .expect("EMBED_ID: hardcoded regex is valid")
});

/// Paths under twitch.tv that are not channels.
const RESERVED_PATHS: &[&str] = &["directory", "downloads", "jobs", "p", "search", "settings", "turbo", "videos"];

/// Twitch refuses to play unless the embedding page's domain is passed as
/// `parent`.
pub struct TwitchEmbedder {
    parent: String,
}

impl TwitchEmbedder {
    pub fn new(parent: impl Into<String>) -> Self {
        Self {
            parent: parent.into(),
        }
    }
}

impl Embedder for TwitchEmbedder {
    fn kind(&self) -> &'static str {
        "twitch"
    }

    fn get_embed_metadata(&self, text: &str) -> Result<Option<EmbedMetadata>, EmbedError> {
        let Some(caps) = LINK.captures(text) else {
            return Ok(None);
        };
        let Some(url) = caps.get(0) else {
            return Ok(None);
        };
        let id = match (caps.get(1), caps.get(2)) {
            (Some(video), _) => format!("?video={}", video.as_str()),
            (None, Some(channel)) => {
                let channel = channel.as_str().to_ascii_lowercase();
                if RESERVED_PATHS.contains(&channel.as_str()) {
                    return Ok(None);
                }
                format!("?channel={channel}")
            }
            (None, None) => {
                return Err(EmbedError {
                    provider: "twitch",
                    message: format!("no video or channel in {:?}", url.as_str()),
                });
            }
        };
        Ok(Some(EmbedMetadata {
            id,
            url: url.as_str().to_string(),
            image: None,
            link: Some(url.as_str().to_string()),
        }))
    }

    fn process_embed(&self, id: &str, size: EmbedSize) -> Option<String> {
        if !EMBED_ID.is_match(id) {
            return None;
        }
        let src = format!("https://player.twitch.tv/{id}&amp;parent={}", self.parent);
        Some(iframe(
            &src,
            size,
            r#" allowfullscreen="allowfullscreen""#,
        ))
    }
}
