//! Vimeo videos.

use std::sync::LazyLock;

use regex::Regex;

use super::{EmbedError, EmbedMetadata, EmbedSize, Embedder, iframe};

static LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r##"(?i)https?://(?:www\.)?(?:vimeo\.com/|player\.vimeo\.com/video/)(\d+)(?:[/?#][^\s<>"]*)?"##,
    )
    .expect("LINK: hardcoded regex is valid")
});

static VIDEO_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+$").expect("VIDEO_ID: hardcoded regex is valid"));

pub struct VimeoEmbedder;

impl Embedder for VimeoEmbedder {
    fn kind(&self) -> &'static str {
        "vimeo"
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
            link: Some(format!("https://vimeo.com/{}", id.as_str())),
        }))
    }

    fn process_embed(&self, id: &str, size: EmbedSize) -> Option<String> {
        if !VIDEO_ID.is_match(id) {
            return None;
        }
        let src = format!("https://player.vimeo.com/video/{id}");
        Some(format!(
            r#"<div class="videoWrapper">{}</div>"#,
            iframe(
                &src,
                size,
                r#" webkitallowfullscreen="webkitallowfullscreen" mozallowfullscreen="mozallowfullscreen" allowfullscreen="allowfullscreen""#,
            )
        ))
    }
}
