//! The document walk that collects metadata and applies the element and
//! text handlers.

use std::collections::BTreeSet;

use ego_tree::NodeId;

use super::node::Visit;
use super::{Dom, DomNode, NodeProcessor, TextProcessor};
use crate::config::RendererOptions;
use crate::embedder::AssetEmbedder;
use crate::error::{RendererError, Result};

/// Everything the walk saw, reset at the start of every parse.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParserState {
    /// Lowercased hashtags without the `#`.
    pub hashtags: BTreeSet<String>,
    /// Lowercased account names that were linked.
    pub usertags: BTreeSet<String>,
    /// Lowercased names of every element encountered.
    pub htmltags: BTreeSet<String>,
    pub images: BTreeSet<String>,
    pub links: BTreeSet<String>,
}

/// Walks a parsed fragment in document order.
///
/// ```
/// use content_renderer::{AssetEmbedder, HtmlDomParser, RendererOptions};
///
/// let options = RendererOptions::new("https://hive.blog");
/// let embedder = AssetEmbedder::new("hive.blog");
/// let mut parser = HtmlDomParser::new(&options, &embedder);
///
/// let html = parser.parse("<p>hello #world</p>").unwrap().to_html().unwrap();
/// assert_eq!(html, r#"<p>hello <a href="/trending/world">#world</a></p>"#);
/// assert!(parser.state().hashtags.contains("world"));
/// ```
pub struct HtmlDomParser<'a> {
    nodes: NodeProcessor<'a>,
    text: TextProcessor<'a>,
    mutate: bool,
    state: ParserState,
    dom: Option<Dom>,
}

impl<'a> HtmlDomParser<'a> {
    pub fn new(options: &'a RendererOptions, embedder: &'a AssetEmbedder) -> Self {
        Self {
            nodes: NodeProcessor::new(options),
            text: TextProcessor::new(options, embedder),
            mutate: true,
            state: ParserState::default(),
            dom: None,
        }
    }

    /// With `false`, only collect [`ParserState`] and leave the markup as is.
    pub fn mutate(mut self, mutate: bool) -> Self {
        self.mutate = mutate;
        self
    }

    /// Parse `html` and run the walk over it.
    pub fn parse(&mut self, html: &str) -> Result<&mut Self> {
        self.state = ParserState::default();
        let mut dom = Dom::parse_fragment(html);
        let root = dom.root_id();
        self.traverse(&mut dom, root)?;
        self.dom = Some(dom);
        Ok(self)
    }

    /// The processed document. Fails if [`parse`](Self::parse) was never
    /// called.
    pub fn to_html(&self) -> Result<String> {
        self.dom
            .as_ref()
            .map(Dom::to_html)
            .ok_or_else(|| RendererError::Parser("no document has been parsed".to_string()))
    }

    pub fn state(&self) -> &ParserState {
        &self.state
    }

    pub fn into_state(self) -> ParserState {
        self.state
    }

    fn traverse(&mut self, dom: &mut Dom, parent: NodeId) -> Result<()> {
        for child in dom.child_ids(parent) {
            if self.visit(dom, child)? == Visit::Descend {
                self.traverse(dom, child)?;
            }
        }
        Ok(())
    }

    fn visit(&mut self, dom: &mut Dom, id: NodeId) -> Result<Visit> {
        let element_name = match dom.get(id).map(|n| n.value()) {
            Some(DomNode::Element(el)) => Some(el.name.to_ascii_lowercase()),
            Some(DomNode::Text(_)) => None,
            _ => return Ok(Visit::Skip),
        };
        let Some(name) = element_name else {
            self.text
                .process_text_node(dom, id, &mut self.state, self.mutate)?;
            return Ok(Visit::Skip);
        };

        self.state.htmltags.insert(name.clone());
        match name.as_str() {
            "img" => self.nodes.process_img(dom, id, &mut self.state, self.mutate),
            "iframe" => self
                .nodes
                .process_iframe(dom, id, &mut self.state, self.mutate),
            "a" => self.nodes.process_link(dom, id, &mut self.state, self.mutate),
            _ => Ok(Visit::Descend),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(html: &str) -> (String, ParserState) {
        let options = RendererOptions::new("https://hive.blog");
        let embedder = AssetEmbedder::new("hive.blog");
        let mut parser = HtmlDomParser::new(&options, &embedder);
        let out = parser.parse(html).unwrap().to_html().unwrap();
        (out, parser.into_state())
    }

    #[test]
    fn collects_tags_and_links() {
        let (_, state) = parse(
            r#"<html><p>Hi <a href="https://example.com">there</a> <img src="https://x.example/a.png"></p></html>"#,
        );
        assert_eq!(
            state.htmltags.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["a", "img", "p"]
        );
        assert!(state.links.contains("https://example.com"));
        assert!(state.images.contains("https://x.example/a.png"));
    }

    #[test]
    fn text_inside_links_is_not_linkified() {
        let (out, state) = parse(r#"<p><a href="/x">#tag @alice</a></p>"#);
        assert_eq!(out, r#"<p><a href="/x">#tag @alice</a></p>"#);
        assert!(state.hashtags.is_empty());
    }

    #[test]
    fn images_inside_links_are_processed() {
        let options = RendererOptions::new("https://hive.blog");
        let embedder = AssetEmbedder::new("hive.blog");
        let mut parser = HtmlDomParser::new(&options, &embedder);
        parser
            .parse(r#"<a href="/x"><img src="//cdn.example/a.png"></a>"#)
            .unwrap();
        assert_eq!(
            parser.to_html().unwrap(),
            r#"<a href="/x"><img src="https://cdn.example/a.png" /></a>"#
        );
    }

    #[test]
    fn state_is_reset_between_parses() {
        let options = RendererOptions::new("https://hive.blog");
        let embedder = AssetEmbedder::new("hive.blog");
        let mut parser = HtmlDomParser::new(&options, &embedder);
        parser.parse("<p>#first</p>").unwrap();
        parser.parse("<p>#second</p>").unwrap();
        assert!(!parser.state().hashtags.contains("first"));
        assert!(parser.state().hashtags.contains("second"));
    }

    #[test]
    fn read_only_mode_collects_without_rewriting() {
        let options = RendererOptions::new("https://hive.blog");
        let embedder = AssetEmbedder::new("hive.blog");
        let mut parser = HtmlDomParser::new(&options, &embedder).mutate(false);
        let html = "<p>#hive by @alice</p>";
        let out = parser.parse(html).unwrap().to_html().unwrap();
        assert_eq!(out, html);
        assert!(parser.state().hashtags.contains("hive"));
        assert!(parser.state().usertags.contains("alice"));
    }

    #[test]
    fn to_html_before_parse_fails() {
        let options = RendererOptions::new("https://hive.blog");
        let embedder = AssetEmbedder::new("hive.blog");
        let parser = HtmlDomParser::new(&options, &embedder);
        assert!(matches!(parser.to_html(), Err(RendererError::Parser(_))));
    }

    #[test]
    fn linkified_nodes_are_not_walked_again() {
        let (out, _) = parse("<p>https://example.com/#tag</p>");
        assert_eq!(
            out,
            r#"<p><a href="https://example.com/#tag">https://example.com/#tag</a></p>"#
        );
    }
}
