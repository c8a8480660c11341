//! 3Speak videos, identified by `owner/permlink`.

use std::sync::LazyLock;

use regex::Regex;

use super::{EmbedError, EmbedMetadata, EmbedSize, Embedder, iframe};

static LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r##"(?i)https?://(?:www\.)?3speak\.(?:tv|online|co)/(?:watch|embed)\?v=([A-Za-z0-9_.-]+/[A-Za-z0-9_.-]+)(?:&[^\s<>"]*)?"##,
    )
    .expect("LINK: hardcoded regex is valid")
});

static EMBED_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_.-]+/[A-Za-z0-9_.-]+$").expect("EMBED_ID: hardcoded regex is valid")
});

pub struct ThreeSpeakEmbedder;

impl Embedder for ThreeSpeakEmbedder {
    fn kind(&self) -> &'static str {
        "threespeak"
    }

    fn get_embed_metadata(&self, text: &str) -> Result<Option<EmbedMetadata>, EmbedError> {
        let Some(caps) = LINK.captures(text) else {
            return Ok(None);
        };
        let (Some(url), Some(id)) = (caps.get(0), caps.get(1)) else {
            return Ok(None);
        };
        Ok(Some(EmbedMetadata {
            id: id.as_str().to_string(),
            url: url.as_str().to_string(),
            image: None,
            link: Some(format!("https://3speak.tv/watch?v={}", id.as_str())),
        }))
    }

    fn process_embed(&self, id: &str, size: EmbedSize) -> Option<String> {
        if !EMBED_ID.is_match(id) {
            return None;
        }
        Some(format!(
            r#"<div class="videoWrapper">{}</div>"#,
            iframe(
                &format!("https://3speak.tv/embed?v={id}"),
                size,
                r#" allowfullscreen="allowfullscreen""#,
            )
        ))
    }
}
