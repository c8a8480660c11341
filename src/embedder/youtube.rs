//! YouTube videos, rendered as a click-to-load facade.

use std::sync::LazyLock;

use regex::Regex;

use super::{EmbedError, EmbedMetadata, EmbedSize, Embedder};

static LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r##"(?i)https?://(?:www\.|m\.)?(?:youtube\.com/(?:watch\?(?:[^\s<>"#]*&)?v=|embed/|shorts/|live/)|youtu\.be/)([A-Za-z0-9_-]{11})(?:[?&#][^\s<>"]*)?"##,
    )
    .expect("LINK: hardcoded regex is valid")
});

static IFRAME_SRC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:https?:)?//(?:www\.)?(?:youtube\.com|youtube-nocookie\.com)/embed/([A-Za-z0-9_-]{11})",
    )
    .expect("IFRAME_SRC: hardcoded regex is valid")
});

static VIDEO_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_-]{11}$").expect("VIDEO_ID: hardcoded regex is valid")
});

/// A YouTube video reference pulled out of a URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct YoutubeLink {
    pub id: String,
    pub url: String,
    pub thumbnail: String,
}

impl YoutubeLink {
    fn new(id: &str, url: &str) -> Self {
        Self {
            id: id.to_string(),
            url: url.to_string(),
            thumbnail: thumbnail_url(id),
        }
    }

    fn canonical_link(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.id)
    }
}

fn thumbnail_url(id: &str) -> String {
    format!("https://img.youtube.com/vi/{id}/hqdefault.jpg")
}

pub struct YoutubeEmbedder;

impl YoutubeEmbedder {
    /// Find the first YouTube video URL in free text.
    pub fn find_link(text: &str) -> Option<YoutubeLink> {
        let caps = LINK.captures(text)?;
        Some(YoutubeLink::new(caps.get(1)?.as_str(), caps.get(0)?.as_str()))
    }

    /// Recognize an embed-style iframe `src`, canonicalized to a watch URL.
    pub fn from_iframe_src(src: &str) -> Option<YoutubeLink> {
        let caps = IFRAME_SRC.captures(src.trim())?;
        let link = YoutubeLink::new(caps.get(1)?.as_str(), src);
        Some(YoutubeLink {
            url: link.canonical_link(),
            ..link
        })
    }
}

impl Embedder for YoutubeEmbedder {
    fn kind(&self) -> &'static str {
        "youtube"
    }

    fn get_embed_metadata(&self, text: &str) -> Result<Option<EmbedMetadata>, EmbedError> {
        Ok(Self::find_link(text).map(|link| EmbedMetadata {
            link: Some(link.canonical_link()),
            id: link.id,
            url: link.url,
            image: Some(link.thumbnail),
        }))
    }

    fn process_embed(&self, id: &str, size: EmbedSize) -> Option<String> {
        if !VIDEO_ID.is_match(id) {
            return None;
        }
        Some(format!(
            concat!(
                r#"<div class="videoWrapper youtube-facade" data-youtube-id="{id}" data-width="{w}" data-height="{h}">"#,
                r#"<img src="{thumb}" alt="YouTube video thumbnail" />"#,
                r#"<div class="youtube-play-button"></div>"#,
                "</div>"
            ),
            id = id,
            w = size.width,
            h = size.height,
            thumb = thumbnail_url(id),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIZE: EmbedSize = EmbedSize {
        width: 640,
        height: 480,
    };

    #[test]
    fn recognizes_url_shapes() {
        for url in [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtube.com/watch?feature=share&v=dQw4w9WgXcQ",
            "http://youtu.be/dQw4w9WgXcQ",
            "https://m.youtube.com/watch?v=dQw4w9WgXcQ&t=42s",
            "https://www.youtube.com/shorts/dQw4w9WgXcQ",
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
        ] {
            let link = YoutubeEmbedder::find_link(url).unwrap();
            assert_eq!(link.id, "dQw4w9WgXcQ", "{url}");
            assert_eq!(link.url, url);
        }
    }

    #[test]
    fn url_stops_at_whitespace() {
        let link =
            YoutubeEmbedder::find_link("see https://youtu.be/dQw4w9WgXcQ?t=1 please").unwrap();
        assert_eq!(link.url, "https://youtu.be/dQw4w9WgXcQ?t=1");
    }

    #[test]
    fn metadata_includes_thumbnail_and_link() {
        let meta = YoutubeEmbedder
            .get_embed_metadata("https://youtu.be/dQw4w9WgXcQ")
            .unwrap()
            .unwrap();
        assert_eq!(meta.id, "dQw4w9WgXcQ");
        assert_eq!(
            meta.image.as_deref(),
            Some("https://img.youtube.com/vi/dQw4w9WgXcQ/hqdefault.jpg")
        );
        assert_eq!(
            meta.link.as_deref(),
            Some("https://www.youtube.com/watch?v=dQw4w9WgXcQ")
        );
    }

    #[test]
    fn iframe_src_is_canonicalized() {
        let link =
            YoutubeEmbedder::from_iframe_src("//www.youtube.com/embed/dQw4w9WgXcQ?autoplay=1")
                .unwrap();
        assert_eq!(link.url, "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        assert!(YoutubeEmbedder::from_iframe_src("https://evil.example/embed/x").is_none());
    }

    #[test]
    fn facade_markup() {
        let html = YoutubeEmbedder.process_embed("dQw4w9WgXcQ", SIZE).unwrap();
        assert!(html.contains(r#"class="videoWrapper youtube-facade""#));
        assert!(html.contains(r#"data-youtube-id="dQw4w9WgXcQ""#));
        assert!(html.contains("https://img.youtube.com/vi/dQw4w9WgXcQ/hqdefault.jpg"));
    }

    #[test]
    fn rejects_foreign_ids() {
        assert!(YoutubeEmbedder.process_embed("short", SIZE).is_none());
        assert!(YoutubeEmbedder.process_embed("?channel=abcdefghi", SIZE).is_none());
    }
}
