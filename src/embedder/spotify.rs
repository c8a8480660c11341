//! Spotify tracks, albums, playlists, artists and podcasts.

use std::sync::LazyLock;

use regex::Regex;

use super::{EmbedError, EmbedMetadata, EmbedSize, Embedder, iframe};

static LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r##"(?i)https?://open\.spotify\.com/(?:embed/|embed-podcast/)?(playlist|show|episode|track|album|artist)/([A-Za-z0-9]{22})(?:[?#][^\s<>"]*)?"##,
    )
    .expect("LINK: hardcoded regex is valid")
});

static EMBED_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^embed(?:-podcast)?/(?:playlist|show|episode|track|album|artist)/[A-Za-z0-9]{22}$")
        .expect("EMBED_ID: hardcoded regex is valid")
});

pub struct SpotifyEmbedder;

impl Embedder for SpotifyEmbedder {
    fn kind(&self) -> &'static str {
        "spotify"
    }

    fn get_embed_metadata(&self, text: &str) -> Result<Option<EmbedMetadata>, EmbedError> {
        let Some(caps) = LINK.captures(text) else {
            return Ok(None);
        };
        let (Some(url), Some(kind), Some(id)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            return Ok(None);
        };
        let kind = kind.as_str().to_ascii_lowercase();
        // Podcasts are served from a separate embed route.
        let route = if matches!(kind.as_str(), "show" | "episode") {
            "embed-podcast"
        } else {
            "embed"
        };
        Ok(Some(EmbedMetadata {
            id: format!("{route}/{kind}/{}", id.as_str()),
            url: url.as_str().to_string(),
            image: None,
            link: Some(format!("https://open.spotify.com/{kind}/{}", id.as_str())),
        }))
    }

    fn process_embed(&self, id: &str, size: EmbedSize) -> Option<String> {
        if !EMBED_ID.is_match(id) {
            return None;
        }
        Some(iframe(
            &format!("https://open.spotify.com/{id}"),
            size,
            r#" allowtransparency="true" allow="encrypted-media""#,
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
    fn tracks_use_embed_route() {
        let meta = SpotifyEmbedder
            .get_embed_metadata("https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC?si=abc")
            .unwrap()
            .unwrap();
        assert_eq!(meta.id, "embed/track/4uLU6hMCjMI75M1A2tKUQC");
        assert_eq!(
            meta.url,
            "https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC?si=abc"
        );
    }

    #[test]
    fn episodes_use_podcast_route() {
        let meta = SpotifyEmbedder
            .get_embed_metadata("https://open.spotify.com/episode/0Q86acNRm6V9GYx55SXKwf")
            .unwrap()
            .unwrap();
        assert_eq!(meta.id, "embed-podcast/episode/0Q86acNRm6V9GYx55SXKwf");
    }

    #[test]
    fn markup() {
        let html = SpotifyEmbedder
            .process_embed("embed/album/1DFixLWuPkv3KT3TnV35m3", SIZE)
            .unwrap();
        assert!(html.contains(r#"src="https://open.spotify.com/embed/album/1DFixLWuPkv3KT3TnV35m3""#));
        assert!(SpotifyEmbedder.process_embed("embed/album/short", SIZE).is_none());
    }
}
