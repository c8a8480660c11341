//! Arena document tree used by every pass that rewrites markup.
//!
//! HTML is parsed with `scraper` (html5ever) and copied into an
//! [`ego_tree::Tree`] of owned [`DomNode`]s. Nodes are addressed by
//! [`NodeId`], so replacing or wrapping a node while walking the tree is an
//! index operation and never invalidates the walk.
//!
//! - [`Dom`] -- the tree plus parse/serialize/mutation helpers.
//! - [`HtmlDomParser`] -- the walking pass that collects [`ParserState`].

mod node;
mod parser;
mod text;

pub use node::NodeProcessor;
pub use parser::{HtmlDomParser, ParserState};
pub use text::TextProcessor;

use ego_tree::{NodeId, NodeMut, NodeRef, Tree};
use scraper::{Html, node::Node};

use crate::embedder::defuse_markers;
use crate::error::{RendererError, Result};

/// HTML5 void elements that must not have a closing tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Nesting deeper than this is cut off while parsing.
const MAX_DEPTH: usize = 256;

/// An element with its attributes in document order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Replace the value in place, or append the attribute.
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attrs.iter_mut().find(|(k, _)| *k == name) {
            Some((_, v)) => *v = value,
            None => self.attrs.push((name, value)),
        }
    }

    pub fn remove_attr(&mut self, name: &str) {
        self.attrs.retain(|(k, _)| k != name);
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DomNode {
    Root,
    Element(Element),
    Text(String),
    Comment(String),
}

/// An owned, mutable HTML fragment.
#[derive(Clone, Debug)]
pub struct Dom {
    tree: Tree<DomNode>,
}

impl Dom {
    /// Parse an HTML fragment. Never fails: html5ever recovers from any
    /// input, and its parse errors are only logged.
    ///
    /// A top-level `<html>` element is flattened into the root.
    pub fn parse_fragment(html: &str) -> Self {
        let parsed = Html::parse_fragment(html);
        for error in &parsed.errors {
            tracing::trace!("Swallowed HTML parse warning: {error}");
        }

        let mut tree = Tree::new(DomNode::Root);
        copy_children(&mut tree.root_mut(), parsed.tree.root(), 0);
        Self { tree }
    }

    pub fn root_id(&self) -> NodeId {
        self.tree.root().id()
    }

    pub fn get(&self, id: NodeId) -> Option<NodeRef<'_, DomNode>> {
        self.tree.get(id)
    }

    pub fn root(&self) -> NodeRef<'_, DomNode> {
        self.tree.root()
    }

    /// Ids of the current children of `id`, detached from the tree borrow.
    pub fn child_ids(&self, id: NodeId) -> Vec<NodeId> {
        self.tree
            .get(id)
            .map(|node| node.children().map(|c| c.id()).collect())
            .unwrap_or_default()
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match self.tree.get(id)?.value() {
            DomNode::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.tree.get(id)?.value() {
            DomNode::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?.attr(name)
    }

    /// `true` if any ancestor element of `id` has one of `names`.
    pub fn has_ancestor(&self, id: NodeId, names: &[&str]) -> bool {
        let Some(node) = self.tree.get(id) else {
            return false;
        };
        node.ancestors().any(|a| match a.value() {
            DomNode::Element(el) => names.iter().any(|n| el.name.eq_ignore_ascii_case(n)),
            _ => false,
        })
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        if let Some(node) = self.tree.get(id) {
            for descendant in node.descendants() {
                if let DomNode::Text(text) = descendant.value() {
                    out.push_str(text);
                }
            }
        }
        out
    }

    fn node_mut(&mut self, id: NodeId) -> Result<NodeMut<'_, DomNode>> {
        self.tree
            .get_mut(id)
            .ok_or_else(|| RendererError::Parser(format!("node {id:?} is not in the document")))
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: impl Into<String>) -> Result<()> {
        let mut node = self.node_mut(id)?;
        match node.value() {
            DomNode::Element(el) => {
                el.set_attr(name, value);
                Ok(())
            }
            _ => Err(RendererError::Parser(format!(
                "node {id:?} is not an element"
            ))),
        }
    }

    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) -> Result<()> {
        let mut node = self.node_mut(id)?;
        match node.value() {
            DomNode::Text(current) => {
                *current = text.into();
                Ok(())
            }
            _ => Err(RendererError::Parser(format!(
                "node {id:?} is not a text node"
            ))),
        }
    }

    pub fn append(&mut self, parent: NodeId, value: DomNode) -> Result<NodeId> {
        Ok(self.node_mut(parent)?.append(value).id())
    }

    /// Put `value` where `id` was and detach `id`.
    pub fn replace_with(&mut self, id: NodeId, value: DomNode) -> Result<NodeId> {
        self.ensure_has_parent(id)?;
        let new_id = self.node_mut(id)?.insert_before(value).id();
        self.node_mut(id)?.detach();
        Ok(new_id)
    }

    /// Replace `id` with the top-level nodes of a parsed HTML fragment.
    pub fn replace_with_fragment(&mut self, id: NodeId, html: &str) -> Result<Vec<NodeId>> {
        self.ensure_has_parent(id)?;
        let fragment = Dom::parse_fragment(html);
        let mut inserted = Vec::new();
        for child in fragment.root().children() {
            let new_id = self.node_mut(id)?.insert_before(child.value().clone()).id();
            self.graft_children(new_id, child)?;
            inserted.push(new_id);
        }
        self.node_mut(id)?.detach();
        Ok(inserted)
    }

    /// Move `id` into a new `wrapper` element placed where `id` was.
    pub fn wrap(&mut self, id: NodeId, wrapper: Element) -> Result<NodeId> {
        self.ensure_has_parent(id)?;
        let wrapper_id = self
            .node_mut(id)?
            .insert_before(DomNode::Element(wrapper))
            .id();
        self.node_mut(wrapper_id)?.append_id(id);
        Ok(wrapper_id)
    }

    fn ensure_has_parent(&self, id: NodeId) -> Result<()> {
        match self.tree.get(id).and_then(|n| n.parent()) {
            Some(_) => Ok(()),
            None => Err(RendererError::Parser(format!(
                "node {id:?} has no parent to be replaced in"
            ))),
        }
    }

    fn graft_children(&mut self, parent: NodeId, source: NodeRef<'_, DomNode>) -> Result<()> {
        for child in source.children() {
            let new_id = self.append(parent, child.value().clone())?;
            self.graft_children(new_id, child)?;
        }
        Ok(())
    }

    /// Serialize the whole fragment.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for child in self.tree.root().children() {
            write_node(child, &mut out);
        }
        out
    }
}

fn copy_children(dest: &mut NodeMut<'_, DomNode>, source: NodeRef<'_, Node>, depth: usize) {
    if depth >= MAX_DEPTH {
        tracing::warn!("Document nested deeper than {MAX_DEPTH} levels, truncating");
        return;
    }
    for child in source.children() {
        match child.value() {
            Node::Element(el) if el.name() == "html" => copy_children(dest, child, depth),
            Node::Element(el) => {
                let element = Element {
                    name: el.name().to_string(),
                    attrs: el
                        .attrs()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect(),
                };
                let mut copied = dest.append(DomNode::Element(element));
                copy_children(&mut copied, child, depth + 1);
            }
            Node::Text(text) => {
                dest.append(DomNode::Text(String::from(&**text)));
            }
            Node::Comment(comment) => {
                dest.append(DomNode::Comment(String::from(&**comment)));
            }
            _ => {}
        }
    }
}

/// Write `<name attr="value" ...>`, or `<name ... />` for void elements.
/// Attributes with an empty value are written bare.
pub(crate) fn write_start_tag<'a>(
    out: &mut String,
    name: &str,
    attrs: impl IntoIterator<Item = (&'a str, &'a str)>,
) {
    out.push('<');
    out.push_str(name);
    for (k, v) in attrs {
        out.push(' ');
        out.push_str(k);
        if v.is_empty() {
            continue;
        }
        out.push_str("=\"");
        let escaped = html_escape::encode_double_quoted_attribute(v);
        out.push_str(&defuse_markers(&escaped));
        out.push('"');
    }
    if VOID_ELEMENTS.contains(&name) {
        out.push_str(" />");
    } else {
        out.push('>');
    }
}

fn write_node(node: NodeRef<'_, DomNode>, out: &mut String) {
    match node.value() {
        DomNode::Root => {
            for child in node.children() {
                write_node(child, out);
            }
        }
        DomNode::Element(el) => {
            write_start_tag(
                out,
                &el.name,
                el.attrs.iter().map(|(k, v)| (k.as_str(), v.as_str())),
            );
            if VOID_ELEMENTS.contains(&el.name.as_str()) {
                return;
            }
            for child in node.children() {
                write_node(child, out);
            }
            out.push_str("</");
            out.push_str(&el.name);
            out.push('>');
        }
        DomNode::Text(text) => {
            out.push_str(&html_escape::encode_text(text));
        }
        DomNode::Comment(comment) => {
            out.push_str("<!--");
            out.push_str(comment);
            out.push_str("-->");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_serialize_round_trip() {
        let dom = Dom::parse_fragment(r#"<p>Hello <b>world</b></p><img src="a.png">"#);
        assert_eq!(dom.to_html(), r#"<p>Hello <b>world</b></p><img src="a.png" />"#);
    }

    #[test]
    fn html_wrapper_is_flattened() {
        let dom = Dom::parse_fragment("<html><p>inside</p></html>");
        assert_eq!(dom.to_html(), "<p>inside</p>");
    }

    #[test]
    fn text_and_attributes_are_escaped() {
        let dom = Dom::parse_fragment(r#"<p title="a &quot;b&quot; <c>">1 &lt; 2 &amp; 3</p>"#);
        assert_eq!(
            dom.to_html(),
            r#"<p title="a &quot;b&quot; &lt;c&gt;">1 &lt; 2 &amp; 3</p>"#
        );
    }

    #[test]
    fn embed_markers_in_attributes_are_defused() {
        let dom = Dom::parse_fragment(
            r#"<a id="~~~ embed:dQw4w9WgXcQ youtube ~~~" title="x ~~~ embed:1 vimeo ~~~">~~~ embed:1 vimeo ~~~</a>"#,
        );
        assert_eq!(
            dom.to_html(),
            r#"<a id="&#126;~~ embed:dQw4w9WgXcQ youtube ~~~" title="x &#126;~~ embed:1 vimeo ~~~">~~~ embed:1 vimeo ~~~</a>"#
        );
    }

    #[test]
    fn replace_with_detaches_original() {
        let mut dom = Dom::parse_fragment(r#"<p><a href="x">link</a> after</p>"#);
        let p = dom.child_ids(dom.root_id())[0];
        let a = dom.child_ids(p)[0];
        let div = dom
            .replace_with(a, DomNode::Element(Element::new("div")))
            .unwrap();
        dom.append(div, DomNode::Text("replaced".to_string())).unwrap();
        assert_eq!(dom.to_html(), "<p><div>replaced</div> after</p>");
    }

    #[test]
    fn replace_with_fragment_splices_nodes() {
        let mut dom = Dom::parse_fragment("<p>one two</p>");
        let p = dom.child_ids(dom.root_id())[0];
        let text = dom.child_ids(p)[0];
        let inserted = dom
            .replace_with_fragment(text, r#"one <a href="/x">two</a>"#)
            .unwrap();
        assert_eq!(inserted.len(), 2);
        assert_eq!(dom.to_html(), r#"<p>one <a href="/x">two</a></p>"#);
    }

    #[test]
    fn wrap_moves_node_into_wrapper() {
        let mut dom = Dom::parse_fragment(r#"<p>x</p><iframe src="https://a"></iframe>"#);
        let iframe = dom.child_ids(dom.root_id())[1];
        dom.wrap(iframe, Element::new("div").with_attr("class", "videoWrapper"))
            .unwrap();
        assert_eq!(
            dom.to_html(),
            r#"<p>x</p><div class="videoWrapper"><iframe src="https://a"></iframe></div>"#
        );
        let parent = dom.get(iframe).and_then(|n| n.parent()).map(|p| p.id());
        assert_eq!(dom.element(parent.unwrap()).map(|el| el.name.as_str()), Some("div"));
    }

    #[test]
    fn ancestors_and_text_content() {
        let dom = Dom::parse_fragment("<a href='#'><b>bold</b> text</a>");
        let a = dom.child_ids(dom.root_id())[0];
        let b = dom.child_ids(a)[0];
        let bold_text = dom.child_ids(b)[0];
        assert!(dom.has_ancestor(bold_text, &["a"]));
        assert!(!dom.has_ancestor(bold_text, &["code"]));
        assert_eq!(dom.text_content(a), "bold text");
    }

    #[test]
    fn replacing_the_root_is_a_parser_error() {
        let mut dom = Dom::parse_fragment("<p>x</p>");
        let root = dom.root_id();
        let err = dom
            .replace_with(root, DomNode::Text("x".to_string()))
            .unwrap_err();
        assert!(matches!(err, RendererError::Parser(_)));
    }

    #[test]
    fn deep_nesting_is_truncated() {
        let html = "<div>".repeat(MAX_DEPTH + 50);
        let dom = Dom::parse_fragment(&html);
        let depth = dom
            .root()
            .descendants()
            .map(|n| n.ancestors().count())
            .max()
            .unwrap_or(0);
        assert!(depth <= MAX_DEPTH);
    }

    #[test]
    fn element_attribute_helpers() {
        let mut el = Element::new("a").with_attr("href", "/x").with_attr("rel", "a");
        el.set_attr("rel", "b");
        assert_eq!(el.attr("rel"), Some("b"));
        assert_eq!(el.attrs.len(), 2);
        el.remove_attr("href");
        assert_eq!(el.attr("href"), None);
    }
}
