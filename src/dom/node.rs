//! Element handlers for `<img>`, `<iframe>` and `<a>`.

use ego_tree::NodeId;

use super::{Dom, DomNode, Element, ParserState};
use crate::config::RendererOptions;
use crate::embedder::YoutubeEmbedder;
use crate::error::Result;
use crate::security::LinkSanitizer;

/// What the walker does after an element handler returns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Visit {
    Descend,
    Skip,
}

/// Rewrites the elements the walker meets.
pub struct NodeProcessor<'a> {
    options: &'a RendererOptions,
    links: LinkSanitizer<'a>,
}

impl<'a> NodeProcessor<'a> {
    pub fn new(options: &'a RendererOptions) -> Self {
        Self {
            options,
            links: LinkSanitizer::new(options.base_host(), &options.phishing_domains),
        }
    }

    /// Record the image and rewrite its `src` through the IPFS prefix and
    /// the image proxy. Images the link checks reject become a `div.phishy`
    /// naming the source.
    pub(crate) fn process_img(
        &self,
        dom: &mut Dom,
        id: NodeId,
        state: &mut ParserState,
        mutate: bool,
    ) -> Result<Visit> {
        let Some(src) = dom.attr(id, "src").map(str::to_string) else {
            return Ok(Visit::Skip);
        };
        if self.links.sanitize_link(&src, &src).is_err() {
            if mutate {
                self.replace_with_warning(dom, id, src)?;
            }
            return Ok(Visit::Skip);
        }
        state.images.insert(src.clone());
        if mutate {
            let proxied = proxied_image_src(self.options, &src);
            if proxied != src {
                dom.set_attr(id, "src", proxied)?;
            }
        }
        Ok(Visit::Skip)
    }

    /// Record YouTube iframes and wrap every iframe in `div.videoWrapper`.
    pub(crate) fn process_iframe(
        &self,
        dom: &mut Dom,
        id: NodeId,
        state: &mut ParserState,
        mutate: bool,
    ) -> Result<Visit> {
        if let Some(link) = dom.attr(id, "src").and_then(YoutubeEmbedder::from_iframe_src) {
            state.links.insert(link.url);
            state.images.insert(link.thumbnail);
        }
        if !mutate || self.parent_is_video_wrapper(dom, id) {
            return Ok(Visit::Skip);
        }
        dom.wrap(id, Element::new("div").with_attr("class", "videoWrapper"))?;
        Ok(Visit::Skip)
    }

    fn parent_is_video_wrapper(&self, dom: &Dom, id: NodeId) -> bool {
        let Some(parent) = dom.get(id).and_then(|n| n.parent()) else {
            return false;
        };
        match parent.value() {
            DomNode::Element(el) => {
                el.name.eq_ignore_ascii_case("div") && el.attr("class") == Some("videoWrapper")
            }
            _ => false,
        }
    }

    /// Record the link and either sanitize its `href` or turn it into a
    /// `div.phishy` that shows text and target side by side.
    pub(crate) fn process_link(
        &self,
        dom: &mut Dom,
        id: NodeId,
        state: &mut ParserState,
        mutate: bool,
    ) -> Result<Visit> {
        let Some(href) = dom.attr(id, "href").map(str::to_string) else {
            return Ok(Visit::Descend);
        };
        state.links.insert(href.clone());
        if !mutate {
            return Ok(Visit::Descend);
        }

        let text = dom.text_content(id);
        match self.links.sanitize_link(&href, &text) {
            Ok(url) => {
                if url != href {
                    dom.set_attr(id, "href", url)?;
                }
                Ok(Visit::Descend)
            }
            Err(_) => {
                self.replace_with_warning(dom, id, format!("{text} / {href}"))?;
                Ok(Visit::Skip)
            }
        }
    }

    fn replace_with_warning(&self, dom: &mut Dom, id: NodeId, text: String) -> Result<()> {
        let warning = Element::new("div")
            .with_attr("title", self.options.localization.phishing_warning.clone())
            .with_attr("class", "phishy");
        let div = dom.replace_with(id, DomNode::Element(warning))?;
        dom.append(div, DomNode::Text(text))?;
        Ok(())
    }
}

/// The `src` an image is finally rendered with.
pub(crate) fn proxied_image_src(options: &RendererOptions, src: &str) -> String {
    let mut normalized = normalize_ipfs(src, &options.ipfs_prefix);
    if normalized.starts_with("//") {
        normalized = format!("https:{normalized}");
    }
    (options.image_proxy_fn)(&normalized)
}

/// Rewrite `/ipfs/<hash>` and `//ipfs/<hash>` onto the configured gateway.
fn normalize_ipfs(src: &str, prefix: &str) -> String {
    if prefix.is_empty() {
        return src.to_string();
    }
    let rest = src
        .strip_prefix("//ipfs/")
        .or_else(|| src.strip_prefix("/ipfs/"));
    match rest {
        Some(rest) => format!("{}/{rest}", prefix.trim_end_matches('/')),
        None => src.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn first_child(dom: &Dom) -> NodeId {
        dom.child_ids(dom.root_id())[0]
    }

    #[test]
    fn ipfs_paths_use_prefix() {
        assert_eq!(
            normalize_ipfs("//ipfs/QmHash", "https://gateway.example/ipfs/"),
            "https://gateway.example/ipfs/QmHash"
        );
        assert_eq!(
            normalize_ipfs("/ipfs/QmHash", "https://gateway.example/ipfs"),
            "https://gateway.example/ipfs/QmHash"
        );
        assert_eq!(normalize_ipfs("//ipfs/QmHash", ""), "//ipfs/QmHash");
        assert_eq!(
            normalize_ipfs("https://x.example/a.png", "https://g"),
            "https://x.example/a.png"
        );
    }

    #[test]
    fn image_src_is_proxied() {
        let mut options = RendererOptions::new("https://hive.blog");
        options.image_proxy_fn = Arc::new(|url: &str| format!("https://proxy.example/0x0/{url}"));
        let processor = NodeProcessor::new(&options);

        let mut dom = Dom::parse_fragment(r#"<img src="//cdn.example/a.png">"#);
        let img = first_child(&dom);
        let mut state = ParserState::default();
        processor.process_img(&mut dom, img, &mut state, true).unwrap();

        assert_eq!(
            dom.attr(img, "src"),
            Some("https://proxy.example/0x0/https://cdn.example/a.png")
        );
        assert!(state.images.contains("//cdn.example/a.png"));
    }

    #[test]
    fn iframe_is_wrapped_once() {
        let options = RendererOptions::new("https://hive.blog");
        let processor = NodeProcessor::new(&options);
        let mut state = ParserState::default();

        let mut dom =
            Dom::parse_fragment(r#"<iframe src="https://www.youtube.com/embed/dQw4w9WgXcQ"></iframe>"#);
        let iframe = first_child(&dom);
        processor
            .process_iframe(&mut dom, iframe, &mut state, true)
            .unwrap();
        processor
            .process_iframe(&mut dom, iframe, &mut state, true)
            .unwrap();

        assert_eq!(
            dom.to_html(),
            r#"<div class="videoWrapper"><iframe src="https://www.youtube.com/embed/dQw4w9WgXcQ"></iframe></div>"#
        );
        assert!(
            state
                .links
                .contains("https://www.youtube.com/watch?v=dQw4w9WgXcQ")
        );
        assert!(
            state
                .images
                .contains("https://img.youtube.com/vi/dQw4w9WgXcQ/hqdefault.jpg")
        );
    }

    #[test]
    fn mismatched_anchor_text_becomes_phishy_div() {
        let options = RendererOptions::new("https://hive.blog");
        let processor = NodeProcessor::new(&options);
        let mut state = ParserState::default();

        let mut dom = Dom::parse_fragment(r#"<a href="https://evil.example">hive.blog/login</a>"#);
        let a = first_child(&dom);
        let visit = processor.process_link(&mut dom, a, &mut state, true).unwrap();

        assert_eq!(visit, Visit::Skip);
        let html = dom.to_html();
        assert!(html.starts_with(r#"<div title=""#));
        assert!(html.contains(r#"class="phishy">hive.blog/login / https://evil.example</div>"#));
    }

    #[test]
    fn private_image_becomes_warning() {
        let options = RendererOptions::new("https://hive.blog");
        let processor = NodeProcessor::new(&options);
        let mut state = ParserState::default();

        let mut dom = Dom::parse_fragment(r#"<p><img src="http://127.0.0.1/a.png" alt="x"></p>"#);
        let p = first_child(&dom);
        let img = dom.child_ids(p)[0];
        processor.process_img(&mut dom, img, &mut state, true).unwrap();

        assert!(dom.to_html().starts_with(r#"<p><div title=""#));
        assert!(dom.to_html().ends_with(r#"class="phishy">http://127.0.0.1/a.png</div></p>"#));
        assert!(state.images.is_empty());
    }

    #[test]
    fn safe_link_gets_protocol() {
        let options = RendererOptions::new("https://hive.blog");
        let processor = NodeProcessor::new(&options);
        let mut state = ParserState::default();

        let mut dom = Dom::parse_fragment(r#"<a href="example.com/page">page</a>"#);
        let a = first_child(&dom);
        processor.process_link(&mut dom, a, &mut state, true).unwrap();

        assert_eq!(dom.attr(a, "href"), Some("https://example.com/page"));
        assert!(state.links.contains("example.com/page"));
    }

    #[test]
    fn read_only_walk_does_not_mutate() {
        let options = RendererOptions::new("https://hive.blog");
        let processor = NodeProcessor::new(&options);
        let mut state = ParserState::default();

        let html = r#"<a href="https://evil.example">hive.blog</a>"#;
        let mut dom = Dom::parse_fragment(html);
        let a = first_child(&dom);
        processor.process_link(&mut dom, a, &mut state, false).unwrap();

        assert_eq!(dom.to_html(), html);
        assert!(state.links.contains("https://evil.example"));
    }
}
