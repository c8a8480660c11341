//! The renderer that runs the whole pipeline.

use std::fmt;

use crate::config::RendererOptions;
use crate::dom::{HtmlDomParser, ParserState};
use crate::embedder::{AssetEmbedder, EmbedSize};
use crate::error::{RendererError, Result, Violation};
use crate::markdown::{MarkdownRenderer, is_html, wrap_html};
use crate::plugin::{Cleanup, MountTarget, PluginChain};
use crate::sanitizer::{EmbedSanitizer, RegexSanitizer, SanitizationConfig, Sanitizer, TagSanitizer};
use crate::security::check_security;

/// Identifies the post being rendered. Only used to label log lines.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PostContext {
    pub author: Option<String>,
    pub permlink: Option<String>,
}

impl PostContext {
    pub fn new(author: impl Into<String>, permlink: impl Into<String>) -> Self {
        Self {
            author: Some(author.into()),
            permlink: Some(permlink.into()),
        }
    }
}

impl fmt::Display for PostContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "@{}/{}",
            self.author.as_deref().unwrap_or("unknown"),
            self.permlink.as_deref().unwrap_or("unknown")
        )
    }
}

/// Turns Markdown or HTML post bodies into safe HTML.
///
/// One render runs these stages in order:
///
/// 1. plugin pre-processing
/// 2. HTML comments made visible
/// 3. HTML detection, and 4. Markdown for everything else
/// 5. wrapping in a single root element
/// 6. the document walk (links, images, iframes, hashtags, mentions,
///    embed markers)
/// 7. the tag-transforming allow-list pass
/// 8. the script gate
/// 9. embed markers materialized into provider markup
/// 10. the embed allow-list pass
/// 11. plugin post-processing
///
/// A renderer is not shared between concurrent renders: [`render`](Self::render)
/// takes `&mut self` because the violations and [`ParserState`] of the last
/// render are kept for inspection.
pub struct DefaultRenderer {
    options: RendererOptions,
    embedder: AssetEmbedder,
    plugins: PluginChain,
    comments: RegexSanitizer,
    markdown: MarkdownRenderer,
    sanitization_errors: Vec<Violation>,
    last_state: ParserState,
}

impl DefaultRenderer {
    /// Validate `options` and build a renderer.
    pub fn new(options: RendererOptions) -> Result<Self> {
        options.validate()?;
        let twitch_parent = options.base_host().unwrap_or_default();
        Ok(Self {
            embedder: AssetEmbedder::new(twitch_parent),
            plugins: PluginChain::new(options.plugins.clone()),
            comments: RegexSanitizer::html_comments(),
            markdown: MarkdownRenderer::from_options(&options),
            sanitization_errors: Vec::new(),
            last_state: ParserState::default(),
            options,
        })
    }

    pub fn options(&self) -> &RendererOptions {
        &self.options
    }

    /// Render one post body.
    ///
    /// Fails with [`RendererError::EmptyInput`] on an empty string and with
    /// [`RendererError::Security`] if a script tag survives sanitization.
    /// Everything else is recovered and shows up in
    /// [`sanitization_errors`](Self::sanitization_errors).
    pub fn render(&mut self, input: &str, post: Option<&PostContext>) -> Result<String> {
        if input.is_empty() {
            return Err(RendererError::EmptyInput);
        }
        self.sanitization_errors.clear();
        let location = post.map(|p| format!(" for {p}")).unwrap_or_default();
        tracing::debug!("Rendering {} bytes{location}", input.len());

        let text = self.plugins.pre_process(input);
        let text = self.comments.sanitize(&text);
        let html = if is_html(&text) {
            text
        } else {
            tracing::debug!("Input is Markdown{location}");
            self.markdown.render(&text)
        };
        let html = wrap_html(&html);

        let (walked, state) = {
            let mut parser = HtmlDomParser::new(&self.options, &self.embedder);
            let walked = parser.parse(&html)?.to_html()?;
            (walked, parser.into_state())
        };
        self.last_state = state;

        let skip_sanitization = self.options.skip_sanitization;
        if skip_sanitization {
            tracing::warn!("Sanitization is disabled, rendering untrusted markup as is{location}");
        }

        let sanitized = if skip_sanitization {
            walked
        } else {
            let mut tags = TagSanitizer::new(SanitizationConfig::from_options(&self.options));
            let sanitized = tags.sanitize(&walked, post);
            self.sanitization_errors = tags.into_errors();
            sanitized
        };

        check_security(&sanitized, self.options.allow_insecure_script_tags)?;

        let size = EmbedSize {
            width: self.options.assets_width,
            height: self.options.assets_height,
        };
        let embedded = self.embedder.insert_all_embeds(&sanitized, size);
        let embedded = if skip_sanitization {
            embedded
        } else {
            EmbedSanitizer.sanitize(&embedded)
        };

        Ok(self.plugins.post_process(&embedded))
    }

    /// Violations recovered during the last render.
    pub fn sanitization_errors(&self) -> &[Violation] {
        &self.sanitization_errors
    }

    /// Hashtags, mentions, links and images seen by the last render.
    pub fn last_state(&self) -> &ParserState {
        &self.last_state
    }

    /// Run every plugin's mount hook against the host's element tree.
    pub fn mount(&self, root: &mut dyn MountTarget) -> Vec<Cleanup> {
        self.plugins.mount(root)
    }
}

impl fmt::Debug for DefaultRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultRenderer")
            .field("options", &self.options)
            .field("plugins", &self.plugins)
            .finish_non_exhaustive()
    }
}
