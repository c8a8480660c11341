//! Markdown to HTML, plus the checks that decide whether input needs it.

mod spoiler;

pub use spoiler::apply_spoilers;

use std::sync::LazyLock;

use pulldown_cmark::{Event, Options, Parser, TextMergeStream, html};
use regex::Regex;

use crate::config::RendererOptions;

static HTML_DOCUMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^<html>(.*)</html>$").expect("HTML_DOCUMENT: hardcoded regex is valid")
});

static HTML_PARAGRAPH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^<p>.*</p>").expect("HTML_PARAGRAPH: hardcoded regex is valid")
});

/// Input that is already HTML skips Markdown: a whole `<html>...</html>`
/// document, or text that opens with `<p>` and closes a paragraph.
pub fn is_html(text: &str) -> bool {
    HTML_DOCUMENT.is_match(text) || HTML_PARAGRAPH.is_match(text)
}

/// Wrap `html` in a single `<html>` root unless it already has one.
pub fn wrap_html(html: &str) -> String {
    if html.starts_with("<html>") {
        html.to_string()
    } else {
        format!("<html>{html}</html>")
    }
}

/// CommonMark with tables, strikethrough and spoiler blocks. Raw HTML is
/// passed through for the sanitizers to deal with.
#[derive(Clone, Debug)]
pub struct MarkdownRenderer {
    breaks: bool,
    spoiler_prefix: String,
    spoiler_reveal: String,
}

impl MarkdownRenderer {
    pub fn new(
        breaks: bool,
        spoiler_prefix: impl Into<String>,
        spoiler_reveal: impl Into<String>,
    ) -> Self {
        Self {
            breaks,
            spoiler_prefix: spoiler_prefix.into(),
            spoiler_reveal: spoiler_reveal.into(),
        }
    }

    pub fn from_options(options: &RendererOptions) -> Self {
        Self::new(
            options.breaks,
            options.spoiler_prefix.clone(),
            options.localization.spoiler_reveal.clone(),
        )
    }

    pub fn render(&self, markdown: &str) -> String {
        let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;
        let events: Vec<Event> = TextMergeStream::new(Parser::new_ext(markdown, options))
            .map(|event| match event {
                Event::SoftBreak if self.breaks => Event::HardBreak,
                other => other,
            })
            .collect();
        let events = apply_spoilers(events, &self.spoiler_prefix, &self.spoiler_reveal);

        let mut out = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut out, events.into_iter());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renderer(breaks: bool) -> MarkdownRenderer {
        MarkdownRenderer::new(breaks, "!", "Reveal spoiler")
    }

    #[test]
    fn detects_html_input() {
        assert!(is_html("<html><p>x</p></html>"));
        assert!(is_html("<p>para</p>\n<p>two</p>"));
        assert!(is_html("<p>para</p> trailing"));
        assert!(!is_html("# Heading"));
        assert!(!is_html("text <p>x</p>"));
        assert!(!is_html("<div>x</div>"));
        assert!(!is_html("<html>unterminated"));
    }

    #[test]
    fn wraps_once() {
        assert_eq!(wrap_html("<p>x</p>"), "<html><p>x</p></html>");
        assert_eq!(wrap_html("<html><p>x</p></html>"), "<html><p>x</p></html>");
    }

    #[test]
    fn basic_markdown() {
        let out = renderer(true).render("# Title\n\nSome **bold** and ~~gone~~.");
        assert!(out.contains("<h1>Title</h1>"));
        assert!(out.contains("<strong>bold</strong>"));
        assert!(out.contains("<del>gone</del>"));
    }

    #[test]
    fn tables() {
        let out = renderer(true).render("| a | b |\n|---|--:|\n| 1 | 2 |");
        assert!(out.contains("<table>"));
        assert!(out.contains("<td>1</td>"));
        assert!(out.contains(r#"<td style="text-align: right">2</td>"#));
    }

    #[test]
    fn breaks_option() {
        assert!(renderer(true).render("one\ntwo").contains("one<br />"));
        assert!(!renderer(false).render("one\ntwo").contains("<br"));
    }

    #[test]
    fn raw_html_passes_through() {
        let out = renderer(true).render("<center>x</center>\n\ntext");
        assert!(out.contains("<center>x</center>"));
    }

    #[test]
    fn spoilers_are_rendered() {
        assert_eq!(
            renderer(true).render("> ![Click me] secret text"),
            "<details><summary>Click me</summary>secret text</details>"
        );
    }

    #[test]
    fn custom_spoiler_prefix() {
        let md = MarkdownRenderer::new(true, "spoiler:", "Show");
        assert_eq!(
            md.render("> spoiler: hidden"),
            "<details><summary>Show</summary>hidden</details>"
        );
    }
}
