//! Text-node handler: embed markers, then linkification of URLs, hashtags
//! and `@mentions`.

use std::sync::LazyLock;

use ego_tree::NodeId;
use html_escape::{decode_html_entities, encode_double_quoted_attribute, encode_text};
use regex::{Captures, Regex};

use super::node::proxied_image_src;
use super::{Dom, ParserState};
use crate::account::AccountNameValidator;
use crate::config::RendererOptions;
use crate::embedder::AssetEmbedder;
use crate::error::Result;
use crate::security::LinkSanitizer;

/// Runs over entity-escaped text. `&amp;` is the only entity allowed inside
/// a URL; the last character may not be punctuation.
static URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)(?:https?:)?//[-a-z0-9._]*[-a-z0-9](?:(?:[^\s"<>\[\]()&]|&amp;)*[^\s"<>\[\]().,'&;:!?])?"#,
    )
    .expect("URL: hardcoded regex is valid")
});

static IMAGE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:\.(?:tiff?|jpe?g|gif|png|svg|ico|webp)|ipfs/[a-z0-9]{40,})$")
        .expect("IMAGE_URL: hardcoded regex is valid")
});

static DOWNLOAD_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\.(?:zip|exe)$").expect("DOWNLOAD_URL: hardcoded regex is valid")
});

static HASHTAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(^|\s)#([-a-z0-9]+)").expect("HASHTAG: hardcoded regex is valid")
});

static MENTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(^|[^a-z0-9_!#$%&*@＠/.+~-])[@＠]([a-z][-.a-z0-9]+[a-z0-9])")
        .expect("MENTION: hardcoded regex is valid")
});

/// Rewrites text nodes outside of `<a>` and `<code>`.
pub struct TextProcessor<'a> {
    options: &'a RendererOptions,
    embedder: &'a AssetEmbedder,
    links: LinkSanitizer<'a>,
    accounts: AccountNameValidator<'a>,
}

impl<'a> TextProcessor<'a> {
    pub fn new(options: &'a RendererOptions, embedder: &'a AssetEmbedder) -> Self {
        Self {
            options,
            embedder,
            links: LinkSanitizer::new(options.base_host(), &options.phishing_domains),
            accounts: AccountNameValidator::new(&options.bad_actors, &options.localization),
        }
    }

    pub(crate) fn process_text_node(
        &self,
        dom: &mut Dom,
        id: NodeId,
        state: &mut ParserState,
        mutate: bool,
    ) -> Result<()> {
        if dom.has_ancestor(id, &["a", "code"]) {
            return Ok(());
        }
        let Some(raw) = dom.text(id).map(str::to_string) else {
            return Ok(());
        };
        if raw.trim().is_empty() {
            return Ok(());
        }

        let mut text = raw.clone();
        if let Some(outcome) = self.embedder.process_text(&raw) {
            state.links.extend(outcome.links);
            state.images.extend(outcome.images);
            text = outcome.text;
        }

        let escaped = encode_text(&text).into_owned();
        let linked = self.linkify(&escaped, state, mutate);
        if !mutate {
            return Ok(());
        }
        if linked != escaped {
            dom.replace_with_fragment(id, &linked)?;
        } else if text != raw {
            dom.set_text(id, text)?;
        }
        Ok(())
    }

    /// Linkify escaped text. URL spans are handled first so hashtags and
    /// mentions are never looked for inside generated markup.
    pub fn linkify(&self, escaped: &str, state: &mut ParserState, mutate: bool) -> String {
        let mut out = String::with_capacity(escaped.len());
        let mut last = 0;
        for m in URL.find_iter(escaped) {
            if is_glued_path(escaped, m.start(), m.as_str()) {
                continue;
            }
            out.push_str(&self.link_words(&escaped[last..m.start()], state, mutate));
            out.push_str(&self.link_url(m.as_str(), state, mutate));
            last = m.end();
        }
        out.push_str(&self.link_words(&escaped[last..], state, mutate));
        out
    }

    fn link_url(&self, escaped_url: &str, state: &mut ParserState, mutate: bool) -> String {
        let url = decode_html_entities(escaped_url).into_owned();
        let is_image = IMAGE_URL.is_match(&url);
        if !is_image && DOWNLOAD_URL.is_match(&url) {
            return escaped_url.to_string();
        }

        let href = match self.links.sanitize_link(&url, &url) {
            Ok(href) => href,
            Err(_) if !mutate => return escaped_url.to_string(),
            Err(_) => {
                return format!(
                    r#"<div title="{}" class="phishy">{escaped_url}</div>"#,
                    encode_double_quoted_attribute(&self.options.localization.phishing_warning)
                );
            }
        };

        if is_image {
            state.images.insert(url.clone());
            if !mutate {
                return escaped_url.to_string();
            }
            let src = proxied_image_src(self.options, &url);
            return format!(r#"<img src="{}" />"#, encode_double_quoted_attribute(&src));
        }

        state.links.insert(url);
        if !mutate {
            return escaped_url.to_string();
        }
        format!(
            r#"<a href="{}">{escaped_url}</a>"#,
            encode_double_quoted_attribute(&href)
        )
    }

    fn link_words(&self, escaped: &str, state: &mut ParserState, mutate: bool) -> String {
        let with_tags = HASHTAG.replace_all(escaped, |caps: &Captures| {
            let tag = &caps[2];
            if tag.chars().all(|c| c.is_ascii_digit()) {
                return caps[0].to_string();
            }
            let lower = tag.to_lowercase();
            let href = (self.options.hashtag_url_fn)(&lower);
            state.hashtags.insert(lower);
            if !mutate {
                return caps[0].to_string();
            }
            format!(
                r#"{}<a href="{}">#{tag}</a>"#,
                &caps[1],
                encode_double_quoted_attribute(&href)
            )
        });

        MENTION
            .replace_all(&with_tags, |caps: &Captures| {
                let user = &caps[2];
                let lower = user.to_lowercase();
                if !self.accounts.is_valid(&lower) {
                    return caps[0].to_string();
                }
                let href = (self.options.usertag_url_fn)(&lower);
                state.usertags.insert(lower);
                if !mutate {
                    return caps[0].to_string();
                }
                format!(
                    r#"{}<a href="{}">@{user}</a>"#,
                    &caps[1],
                    encode_double_quoted_attribute(&href)
                )
            })
            .into_owned()
    }
}

/// `foo//bar` is a path, not a protocol-relative URL.
fn is_glued_path(text: &str, start: usize, matched: &str) -> bool {
    if !matched.starts_with("//") {
        return false;
    }
    text[..start]
        .chars()
        .next_back()
        .is_some_and(|c| c.is_alphanumeric() || matches!(c, '/' | ':' | '.'))
}
