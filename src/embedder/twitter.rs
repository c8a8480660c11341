//! Twitter / X statuses, rendered through the platform's tweet iframe.

use std::sync::LazyLock;

use regex::Regex;

use super::{EmbedError, EmbedMetadata, EmbedSize, Embedder, iframe};

static LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r##"(?i)https?://(?:www\.|mobile\.)?(?:twitter|x)\.com/([A-Za-z0-9_]{1,15})/status(?:es)?/(\d+)(?:[/?#][^\s<>"]*)?"##,
    )
    .expect("LINK: hardcoded regex is valid")
});

static STATUS_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+$").expect("STATUS_ID: hardcoded regex is valid"));

pub struct TwitterEmbedder;

impl Embedder for TwitterEmbedder {
    fn kind(&self) -> &'static str {
        "twitter"
    }

    fn get_embed_metadata(&self, text: &str) -> Result<Option<EmbedMetadata>, EmbedError> {
        let Some(caps) = LINK.captures(text) else {
            return Ok(None);
        };
        let (Some(url), Some(user), Some(id)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            return Ok(None);
        };
        Ok(Some(EmbedMetadata {
            id: id.as_str().to_string(),
            url: url.as_str().to_string(),
            image: None,
            link: Some(format!(
                "https://twitter.com/{}/status/{}",
                user.as_str(),
                id.as_str()
            )),
        }))
    }

    fn process_embed(&self, id: &str, size: EmbedSize) -> Option<String> {
        if !STATUS_ID.is_match(id) {
            return None;
        }
        Some(iframe(
            &format!("https://platform.twitter.com/embed/Tweet.html?id={id}"),
            size,
            "",
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
    fn twitter_and_x_statuses() {
        for url in [
            "https://twitter.com/hiveblocks/status/1234567890123456789",
            "https://x.com/hiveblocks/status/1234567890123456789?s=20",
            "https://mobile.twitter.com/hiveblocks/statuses/1234567890123456789",
        ] {
            let meta = TwitterEmbedder.get_embed_metadata(url).unwrap().unwrap();
            assert_eq!(meta.id, "1234567890123456789", "{url}");
            assert_eq!(meta.url, url);
        }
    }

    #[test]
    fn profile_links_are_ignored() {
        assert!(
            TwitterEmbedder
                .get_embed_metadata("https://x.com/hiveblocks")
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn markup() {
        let html = TwitterEmbedder.process_embed("1234567890", SIZE).unwrap();
        assert!(html.contains(
            r#"src="https://platform.twitter.com/embed/Tweet.html?id=1234567890""#
        ));
        assert!(TwitterEmbedder.process_embed("abc", SIZE).is_none());
    }
}
