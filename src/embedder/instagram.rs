//! Instagram posts and reels.

use std::sync::LazyLock;

use regex::Regex;

use super::{EmbedError, EmbedMetadata, EmbedSize, Embedder, iframe};

static LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r##"(?i)https?://(?:www\.)?instagram\.com/(p|reel)/([A-Za-z0-9_-]+)/?(?:[?#][^\s<>"]*)?"##,
    )
    .expect("LINK: hardcoded regex is valid")
});

static EMBED_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:p|reel)/[A-Za-z0-9_-]+$").expect("EMBED_ID: hardcoded regex is valid")
});

pub struct InstagramEmbedder;

impl Embedder for InstagramEmbedder {
    fn kind(&self) -> &'static str {
        "instagram"
    }

    fn get_embed_metadata(&self, text: &str) -> Result<Option<EmbedMetadata>, EmbedError> {
        let Some(caps) = LINK.captures(text) else {
            return Ok(None);
        };
        let (Some(url), Some(kind), Some(id)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            return Ok(None);
        };
        let id = format!("{}/{}", kind.as_str().to_ascii_lowercase(), id.as_str());
        Ok(Some(EmbedMetadata {
            link: Some(format!("https://www.instagram.com/{id}/")),
            id,
            url: url.as_str().to_string(),
            image: None,
        }))
    }

    fn process_embed(&self, id: &str, size: EmbedSize) -> Option<String> {
        if !EMBED_ID.is_match(id) {
            return None;
        }
        Some(iframe(
            &format!("https://www.instagram.com/{id}/embed/"),
            size,
            r#" allowtransparency="true""#,
        ))
    }
}
