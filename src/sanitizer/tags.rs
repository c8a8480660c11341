//! The tag-transforming allow-list pass.

use std::collections::HashSet;
use std::sync::LazyLock;

use ego_tree::NodeRef;
use regex::Regex;

use super::policy::{
    ALLOWED_DIV_CLASSES, SanitizationConfig, allowed_attributes, drops_content, iframe_rule,
    is_allowed_tag, is_allowed_url,
};
use crate::dom::{Dom, DomNode, Element, VOID_ELEMENTS, write_start_tag};
use crate::error::Violation;
use crate::renderer::PostContext;
use crate::security::LinkSanitizer;

static ABSOLUTE_IMAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:https?:)?//").expect("ABSOLUTE_IMAGE: hardcoded regex is valid")
});

const BROKEN_IMAGE: &str = "brokenimg.jpg";

/// What an allowed element is rewritten to.
enum Output {
    Element(Element),
    /// A replacement element holding only text.
    Placeholder { tag: &'static str, text: String },
}

/// Rebuilds a fragment from the allow-list, rewriting iframes, images,
/// links, `div`s and table cells on the way.
///
/// Everything that was blocked is recorded in [`errors`](Self::errors),
/// which only describes the most recent call. Sanitizing the output a
/// second time returns it unchanged.
pub struct TagSanitizer {
    config: SanitizationConfig,
    errors: Vec<Violation>,
    removed_tags: HashSet<String>,
    context: Option<String>,
}

impl TagSanitizer {
    pub fn new(config: SanitizationConfig) -> Self {
        Self {
            config,
            errors: Vec::new(),
            removed_tags: HashSet::new(),
            context: None,
        }
    }

    /// Sanitize one fragment. `post` only labels log lines.
    pub fn sanitize(&mut self, html: &str, post: Option<&PostContext>) -> String {
        self.errors.clear();
        self.removed_tags.clear();
        self.context = post.map(ToString::to_string);

        let dom = Dom::parse_fragment(html);
        let mut out = String::with_capacity(html.len());
        self.write_children(dom.root(), &mut out);
        out
    }

    pub fn errors(&self) -> &[Violation] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<Violation> {
        self.errors
    }

    fn location(&self) -> String {
        self.context
            .as_deref()
            .map(|c| format!(" in {c}"))
            .unwrap_or_default()
    }

    fn write_children(&mut self, node: NodeRef<'_, DomNode>, out: &mut String) {
        for child in node.children() {
            self.write_node(child, out);
        }
    }

    fn write_node(&mut self, node: NodeRef<'_, DomNode>, out: &mut String) {
        match node.value() {
            DomNode::Root => self.write_children(node, out),
            DomNode::Text(text) => out.push_str(&html_escape::encode_text(text)),
            DomNode::Comment(_) => {}
            DomNode::Element(el) => self.write_element(node, el, out),
        }
    }

    fn write_element(&mut self, node: NodeRef<'_, DomNode>, el: &Element, out: &mut String) {
        let name = el.name.to_ascii_lowercase();
        if !is_allowed_tag(&name) {
            if self.removed_tags.insert(name.clone()) {
                tracing::debug!("Removed disallowed tag <{name}>{}", self.location());
                self.errors.push(Violation::DisallowedTag(name.clone()));
            }
            if !drops_content(&name) {
                self.write_children(node, out);
            }
            return;
        }

        match self.transform(&name, el) {
            Output::Placeholder { tag, text } => {
                write_start_tag(out, tag, []);
                out.push_str(&html_escape::encode_text(&text));
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
            Output::Element(element) => {
                let allowed = allowed_attributes(&name);
                let attrs = element
                    .attrs
                    .iter()
                    .filter(|(k, v)| {
                        allowed.contains(&k.as_str())
                            && (!matches!(k.as_str(), "href" | "src") || is_allowed_url(v))
                    })
                    .map(|(k, v)| (k.as_str(), v.as_str()));
                write_start_tag(out, &name, attrs);
                if VOID_ELEMENTS.contains(&name.as_str()) {
                    return;
                }
                if name != "iframe" {
                    self.write_children(node, out);
                }
                out.push_str("</");
                out.push_str(&name);
                out.push('>');
            }
        }
    }

    fn transform(&mut self, name: &str, el: &Element) -> Output {
        match name {
            "iframe" => self.transform_iframe(el),
            "img" => self.transform_img(el),
            "div" => Output::Element(self.transform_div(el)),
            "td" | "th" => Output::Element(transform_cell(name, el)),
            "a" => Output::Element(self.transform_link(el)),
            _ => Output::Element(el.clone()),
        }
    }

    fn transform_iframe(&mut self, el: &Element) -> Output {
        let src = el.attr("src").unwrap_or_default().trim();
        if let Some(canonical) = iframe_rule(src).and_then(|rule| rule.canonicalize(src)) {
            return Output::Element(
                Element::new("iframe")
                    .with_attr("src", canonical)
                    .with_attr("width", self.config.iframe_width.to_string())
                    .with_attr("height", self.config.iframe_height.to_string())
                    .with_attr("frameborder", "0")
                    .with_attr("allowfullscreen", "")
                    .with_attr("webkitallowfullscreen", "")
                    .with_attr("mozallowfullscreen", ""),
            );
        }

        tracing::warn!("Blocked unsupported iframe {src:?}{}", self.location());
        self.errors
            .push(Violation::UnsupportedIframe(src.to_string()));
        Output::Placeholder {
            tag: "div",
            text: format!("(Unsupported {src})"),
        }
    }

    fn transform_img(&mut self, el: &Element) -> Output {
        if self.config.do_not_show_images {
            return Output::Placeholder {
                tag: "div",
                text: self.config.no_image.clone(),
            };
        }

        let src = el.attr("src").unwrap_or_default().trim();
        let rejected = !ABSOLUTE_IMAGE.is_match(src)
            || LinkSanitizer::new(self.config.base_host.clone(), &self.config.phishing_domains)
                .sanitize_link(src, src)
                .is_err();
        if rejected {
            tracing::warn!("Replaced image with invalid src {src:?}{}", self.location());
            self.errors.push(Violation::InvalidImage(src.to_string()));
            return Output::Element(Element::new("img").with_attr("src", BROKEN_IMAGE));
        }

        let src = match src.get(..7) {
            Some(scheme) if scheme.eq_ignore_ascii_case("http://") => format!("//{}", &src[7..]),
            _ => src.to_string(),
        };
        let mut img = Element::new("img").with_attr("src", src);
        if let Some(alt) = el.attr("alt").filter(|alt| !alt.is_empty()) {
            img.set_attr("alt", alt);
        }
        Output::Element(img)
    }

    fn transform_div(&self, el: &Element) -> Element {
        let mut div = Element::new("div");
        let class = el
            .attr("class")
            .map(str::trim)
            .filter(|class| ALLOWED_DIV_CLASSES.contains(class));
        if let Some(class) = class {
            div.set_attr("class", class);
        }
        let title = el.attr("title");
        if class == Some("phishy") && title == Some(self.config.phishing_warning.as_str()) {
            div.set_attr("title", self.config.phishing_warning.clone());
        }
        div
    }

    fn transform_link(&self, el: &Element) -> Element {
        let href = el
            .attr("href")
            .map(str::trim)
            .filter(|href| !href.is_empty() && is_allowed_url(href))
            .unwrap_or("#")
            .to_string();

        let mut a = el.clone();
        a.set_attr("href", href.clone());
        if !(self.config.is_link_safe_fn)(&href) {
            let rel = if self.config.add_nofollow_to_links {
                "nofollow noopener"
            } else {
                "noopener"
            };
            let target = if self.config.add_target_blank_to_links {
                "_blank"
            } else {
                "_self"
            };
            a.set_attr("rel", rel);
            a.set_attr("title", self.config.external_link.clone());
            a.set_attr("target", target);
        }

        let class = if (self.config.add_external_css_class_to_matching_links_fn)(&href) {
            &self.config.css_class_for_external_links
        } else {
            &self.config.css_class_for_internal_links
        };
        if class.is_empty() {
            a.remove_attr("class");
        } else {
            a.set_attr("class", class.clone());
        }
        a
    }
}

/// Only right and center alignment survive on table cells.
fn transform_cell(name: &str, el: &Element) -> Element {
    let mut cell = Element::new(name);
    let style: String = el
        .attr("style")
        .unwrap_or_default()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ';')
        .collect::<String>()
        .to_ascii_lowercase();
    if matches!(style.as_str(), "text-align:right" | "text-align:center") {
        cell.set_attr("style", style);
    }
    cell
}
