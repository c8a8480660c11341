//! The light pass run after embeds are materialized.

use ego_tree::NodeRef;

use super::Sanitizer;
use super::policy::{allowed_attributes, drops_content, is_allowed_tag, is_allowed_url};
use crate::dom::{Dom, DomNode, Element, VOID_ELEMENTS, write_start_tag};
use crate::security::parse_absolute;

/// Hosts a materialized iframe may point at. Subdomains are accepted.
pub const IFRAME_HOSTS: &[&str] = &[
    "youtube.com",
    "player.vimeo.com",
    "player.twitch.tv",
    "w.soundcloud.com",
    "open.spotify.com",
    "3speak.tv",
    "platform.twitter.com",
    "www.instagram.com",
];

/// Re-checks the whole document once provider markup has been inserted.
///
/// Looser than [`TagSanitizer`](super::TagSanitizer) on attributes
/// (`class`, `data-*`, and the iframe `allow` family survive) but every
/// iframe has to point at one of [`IFRAME_HOSTS`].
#[derive(Clone, Copy, Debug, Default)]
pub struct EmbedSanitizer;

impl EmbedSanitizer {
    pub fn is_allowed_iframe_src(src: &str) -> bool {
        let Some(url) = parse_absolute(src.trim()) else {
            return false;
        };
        if url.scheme() != "https" {
            return false;
        }
        let Some(host) = url.host_str().map(str::to_ascii_lowercase) else {
            return false;
        };
        IFRAME_HOSTS
            .iter()
            .any(|allowed| host == *allowed || host.ends_with(&format!(".{allowed}")))
    }

    fn allows_attribute(tag: &str, name: &str) -> bool {
        if allowed_attributes(tag).contains(&name) {
            return true;
        }
        match tag {
            "div" => name == "class" || name.starts_with("data-"),
            "img" => name == "class",
            "iframe" => matches!(name, "class" | "allow" | "allowtransparency"),
            _ => false,
        }
    }

    fn write_children(node: NodeRef<'_, DomNode>, out: &mut String) {
        for child in node.children() {
            Self::write_node(child, out);
        }
    }

    fn write_node(node: NodeRef<'_, DomNode>, out: &mut String) {
        match node.value() {
            DomNode::Root => Self::write_children(node, out),
            DomNode::Text(text) => out.push_str(&html_escape::encode_text(text)),
            DomNode::Comment(_) => {}
            DomNode::Element(el) => Self::write_element(node, el, out),
        }
    }

    fn write_element(node: NodeRef<'_, DomNode>, el: &Element, out: &mut String) {
        let name = el.name.to_ascii_lowercase();
        if !is_allowed_tag(&name) {
            if !drops_content(&name) {
                Self::write_children(node, out);
            }
            return;
        }

        let src = el.attr("src").unwrap_or_default();
        if name == "iframe" && !Self::is_allowed_iframe_src(src) {
            tracing::warn!("Dropped embedded iframe with disallowed host {src:?}");
            return;
        }

        let attrs = el
            .attrs
            .iter()
            .filter(|(k, v)| {
                Self::allows_attribute(&name, k)
                    && (!matches!(k.as_str(), "href" | "src") || is_allowed_url(v))
            })
            .map(|(k, v)| (k.as_str(), v.as_str()));
        write_start_tag(out, &name, attrs);
        if VOID_ELEMENTS.contains(&name.as_str()) {
            return;
        }
        if name != "iframe" {
            Self::write_children(node, out);
        }
        out.push_str("</");
        out.push_str(&name);
        out.push('>');
    }
}

impl Sanitizer for EmbedSanitizer {
    fn sanitize(&self, html: &str) -> String {
        let dom = Dom::parse_fragment(html);
        let mut out = String::with_capacity(html.len());
        Self::write_children(dom.root(), &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::{AssetEmbedder, EmbedSize};

    const SIZE: EmbedSize = EmbedSize {
        width: 640,
        height: 480,
    };

    #[test]
    fn iframe_hosts() {
        assert!(EmbedSanitizer::is_allowed_iframe_src(
            "https://www.youtube.com/embed/dQw4w9WgXcQ"
        ));
        assert!(EmbedSanitizer::is_allowed_iframe_src(
            "//player.vimeo.com/video/1"
        ));
        assert!(EmbedSanitizer::is_allowed_iframe_src(
            "https://3speak.tv/embed?v=a/b"
        ));
        assert!(!EmbedSanitizer::is_allowed_iframe_src(
            "https://youtube.com.evil.example/embed"
        ));
        assert!(!EmbedSanitizer::is_allowed_iframe_src(
            "https://evilyoutube.com/embed"
        ));
        assert!(!EmbedSanitizer::is_allowed_iframe_src(
            "http://player.vimeo.com/video/1"
        ));
        assert!(!EmbedSanitizer::is_allowed_iframe_src("/relative"));
    }

    #[test]
    fn materialized_embeds_survive() {
        let embedder = AssetEmbedder::new("hive.blog");
        for marker in [
            "~~~ embed:dQw4w9WgXcQ youtube ~~~",
            "~~~ embed:123456 vimeo ~~~",
            "~~~ embed:?channel=someone twitch ~~~",
            "~~~ embed:embed/track/4uLU6hMCjMI75M1A2tKUQC spotify ~~~",
            "~~~ embed:alice/abc threespeak ~~~",
            "~~~ embed:p/CxYz123 instagram ~~~",
            "~~~ embed:1234567890 twitter ~~~",
        ] {
            let html = embedder.insert_all_embeds(marker, SIZE);
            let once = EmbedSanitizer.sanitize(&html);
            assert!(!once.contains("~~~"), "{marker} was not materialized");
            assert_eq!(EmbedSanitizer.sanitize(&once), once, "{marker}");
            assert!(
                once.contains("<iframe") || once.contains("youtube-facade"),
                "{marker}: {once}"
            );
        }
    }

    #[test]
    fn youtube_facade_keeps_data_attributes() {
        let embedder = AssetEmbedder::new("hive.blog");
        let html = embedder.insert_all_embeds("~~~ embed:dQw4w9WgXcQ youtube ~~~", SIZE);
        let out = EmbedSanitizer.sanitize(&html);
        assert!(out.contains(r#"data-youtube-id="dQw4w9WgXcQ""#));
        assert!(out.contains(r#"class="videoWrapper youtube-facade""#));
        assert!(out.contains(r#"src="https://img.youtube.com/vi/dQw4w9WgXcQ/hqdefault.jpg""#));
    }

    #[test]
    fn foreign_iframe_is_dropped() {
        let out = EmbedSanitizer.sanitize(
            r#"<p>a</p><iframe src="https://evil.example/x"></iframe><p>b</p>"#,
        );
        assert_eq!(out, "<p>a</p><p>b</p>");
    }

    #[test]
    fn still_strips_scripts_and_handlers() {
        let out = EmbedSanitizer.sanitize(
            r#"<div class="x" onclick="y" data-a="1"><script>z</script><a href="javascript:x">l</a></div>"#,
        );
        assert_eq!(out, r#"<div class="x" data-a="1"><a>l</a></div>"#);
    }
}
