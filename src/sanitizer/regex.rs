//! Regex find-and-replace over raw text, before any parsing happens.

use std::sync::LazyLock;

use regex::Regex;

use super::Sanitizer;

static HTML_COMMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<!--(.*?)(?:-->|$)").expect("HTML_COMMENT: hardcoded regex is valid")
});

/// Applies `(pattern, replacement)` rules in order; each rule sees the
/// output of the previous one.
///
/// # Example
///
/// ```
/// use content_renderer::{RegexSanitizer, Sanitizer};
///
/// let sanitizer = RegexSanitizer::html_comments();
/// assert_eq!(
///     sanitizer.sanitize("a <!-- hidden --> b"),
///     "a (html comment removed:  hidden ) b"
/// );
/// ```
#[derive(Clone, Debug)]
pub struct RegexSanitizer {
    rules: Vec<(Regex, String)>,
}

impl RegexSanitizer {
    pub fn new(rules: Vec<(Regex, String)>) -> Self {
        Self { rules }
    }

    /// Surface HTML comments as visible text instead of passing them on.
    /// An unterminated comment runs to the end of the input.
    pub fn html_comments() -> Self {
        Self::new(vec![(
            HTML_COMMENT.clone(),
            "(html comment removed: $1)".to_string(),
        )])
    }
}

impl Sanitizer for RegexSanitizer {
    fn sanitize(&self, html: &str) -> String {
        self.rules
            .iter()
            .fold(html.to_string(), |acc, (re, replacement)| {
                re.replace_all(&acc, replacement.as_str()).into_owned()
            })
    }
}
