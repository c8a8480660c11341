//! Client-hydrated embeds for providers the built-in embedders do not know.

use regex::{Captures, Regex};

use super::{Cleanup, MountTarget, RenderPlugin};
use crate::error::{RendererError, Result};

/// Carries provider URLs through rendering as opaque hex tokens and emits
/// empty containers for the client to hydrate.
///
/// ```
/// use content_renderer::{PlaceholderEmbedPlugin, RenderPlugin};
///
/// let plugin = PlaceholderEmbedPlugin::new("gist", r"https://gist\.github\.com/\w+/\w+").unwrap();
/// let token = plugin.pre_process("https://gist.github.com/alice/abc123");
/// assert!(!token.contains("https://"));
///
/// let html = plugin.post_process(&format!("<p>{token}</p>"));
/// assert_eq!(
///     html,
///     r#"<p><div class="gist-embed" id="gist-embed-0" data-embed-url="https://gist.github.com/alice/abc123"></div></p>"#
/// );
/// ```
#[derive(Clone, Debug)]
pub struct PlaceholderEmbedPlugin {
    name: String,
    url_pattern: Regex,
    /// `url_pattern` anchored at both ends, for decoded tokens.
    whole_url: Regex,
    token_pattern: Regex,
}

impl PlaceholderEmbedPlugin {
    /// `name` must be lowercase ASCII letters, digits and dashes, starting
    /// with a letter. `url_pattern` matches the URLs to carry.
    pub fn new(name: impl Into<String>, url_pattern: &str) -> Result<Self> {
        let name = name.into();
        let valid_name = name.starts_with(|c: char| c.is_ascii_lowercase())
            && name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        if !valid_name {
            return Err(RendererError::Config(format!(
                "plugin name {name:?} may only contain lowercase letters, digits and '-'"
            )));
        }

        let invalid =
            |e: regex::Error| RendererError::Config(format!("invalid pattern for {name}: {e}"));
        let whole_url = Regex::new(&format!("^(?:{url_pattern})$"));
        let url_pattern = Regex::new(url_pattern).map_err(invalid)?;
        let whole_url = whole_url.map_err(invalid)?;
        let token_pattern = Regex::new(&format!(
            r"\[\[{}-embed:([0-9a-f]+)\]\]",
            regex::escape(&name)
        ))
        .map_err(|e| RendererError::Config(format!("invalid token pattern for {name}: {e}")))?;

        Ok(Self {
            name,
            url_pattern,
            whole_url,
            token_pattern,
        })
    }

    pub fn container_class(&self) -> String {
        format!("{}-embed", self.name)
    }

    fn token(&self, url: &str) -> String {
        format!("[[{}-embed:{}]]", self.name, hex::encode(url))
    }

    /// The URL behind a token, if the whole decoded string is something
    /// this plugin would have tokenized.
    fn decode(&self, encoded: &str) -> Option<String> {
        let bytes = hex::decode(encoded).ok()?;
        let url = String::from_utf8(bytes).ok()?;
        self.whole_url.is_match(&url).then_some(url)
    }
}

impl RenderPlugin for PlaceholderEmbedPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn pre_process(&self, text: &str) -> String {
        self.url_pattern
            .replace_all(text, |caps: &Captures| self.token(&caps[0]))
            .into_owned()
    }

    fn post_process(&self, html: &str) -> String {
        let mut count = 0;
        self.token_pattern
            .replace_all(html, |caps: &Captures| match self.decode(&caps[1]) {
                Some(url) => {
                    let container = format!(
                        r#"<div class="{class}" id="{class}-{count}" data-embed-url="{url}"></div>"#,
                        class = self.container_class(),
                        url = html_escape::encode_double_quoted_attribute(&url),
                    );
                    count += 1;
                    container
                }
                None => {
                    tracing::warn!("Ignoring forged {} embed token", self.name);
                    caps[0].to_string()
                }
            })
            .into_owned()
    }

    fn on_mount(&self, root: &mut dyn MountTarget) -> Option<Cleanup> {
        let ids = root.element_ids_by_class(&self.container_class());
        if ids.is_empty() {
            return None;
        }
        for id in &ids {
            root.set_attribute(id, "data-embed-mounted", "true");
        }
        let name = self.name.clone();
        Some(Cleanup::new(move || {
            tracing::debug!("Released {} {name} embed containers", ids.len());
        }))
    }
}
