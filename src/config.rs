//! Renderer options, the localization table, and the fluent builder that
//! validates both before a [`DefaultRenderer`] is handed out.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use url::Url;

use crate::account::BadActorList;
use crate::error::{RendererError, Result};
use crate::plugin::RenderPlugin;
use crate::renderer::DefaultRenderer;
use crate::security::PhishingDomains;

/// Rewrites a URL (image proxy, hashtag link, usertag link).
pub type UrlFn = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Classifies a URL (link safety, external-link styling).
pub type UrlPredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// User-visible strings emitted by the renderer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Localization {
    /// Title of the `div.phishy` block that replaces a rejected link.
    pub phishing_warning: String,
    /// Title added to links that leave the site.
    pub external_link: String,
    /// Placeholder text for images when images are disabled.
    pub no_image: String,
    /// Prefix of account-name validation messages.
    pub account_name_should: String,
    /// Message for names on the bad-actor list.
    pub account_name_bad_actor: String,
    /// Summary text of a spoiler without an explicit reveal label.
    pub spoiler_reveal: String,
}

impl Default for Localization {
    fn default() -> Self {
        Self {
            phishing_warning: "Link expanded to plain text; beware of a potential phishing attempt"
                .to_string(),
            external_link: "This link will take you away from this site".to_string(),
            no_image: "Images not allowed".to_string(),
            account_name_should: "Account name should ".to_string(),
            account_name_bad_actor: "Use caution sending to this account. Please double check your spelling for possible phishing.".to_string(),
            spoiler_reveal: "Reveal spoiler".to_string(),
        }
    }
}

impl Localization {
    /// Reject a table with any empty entry.
    pub fn validate(&self) -> Result<()> {
        let entries = [
            ("phishing_warning", &self.phishing_warning),
            ("external_link", &self.external_link),
            ("no_image", &self.no_image),
            ("account_name_should", &self.account_name_should),
            ("account_name_bad_actor", &self.account_name_bad_actor),
            ("spoiler_reveal", &self.spoiler_reveal),
        ];
        for (key, value) in entries {
            if value.trim().is_empty() {
                return Err(RendererError::Config(format!(
                    "localization.{key} must not be empty"
                )));
            }
        }
        Ok(())
    }
}

/// Immutable configuration of one renderer instance.
///
/// Construct with [`RendererOptions::new`], adjust fields, then pass to
/// [`DefaultRenderer::new`], or use [`RendererBuilder`]. The default link
/// predicates close over the base URL given to `new`.
#[derive(Clone)]
pub struct RendererOptions {
    pub base_url: String,
    /// Turn single newlines in Markdown into `<br>`.
    pub breaks: bool,
    /// Skip both allow-list passes. Trusted content only.
    pub skip_sanitization: bool,
    pub allow_insecure_script_tags: bool,
    pub add_nofollow_to_links: bool,
    pub add_target_blank_to_links: bool,
    pub css_class_for_internal_links: String,
    pub css_class_for_external_links: String,
    pub do_not_show_images: bool,
    pub ipfs_prefix: String,
    pub assets_width: u32,
    pub assets_height: u32,
    pub spoiler_prefix: String,
    pub image_proxy_fn: UrlFn,
    pub hashtag_url_fn: UrlFn,
    pub usertag_url_fn: UrlFn,
    pub is_link_safe_fn: UrlPredicate,
    pub add_external_css_class_to_matching_links_fn: UrlPredicate,
    pub localization: Localization,
    pub bad_actors: Arc<BadActorList>,
    pub phishing_domains: Arc<PhishingDomains>,
    pub plugins: Vec<Arc<dyn RenderPlugin>>,
}

impl RendererOptions {
    /// Options with defaults for the site at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        let base_host = host_of(&base_url);

        let safe_host = base_host.clone();
        let is_link_safe_fn: UrlPredicate =
            Arc::new(move |url: &str| is_same_site(url, safe_host.as_deref()));
        let external_host = base_host;
        let add_external_css_class_to_matching_links_fn: UrlPredicate =
            Arc::new(move |url: &str| !is_same_site(url, external_host.as_deref()));

        Self {
            base_url,
            breaks: true,
            skip_sanitization: false,
            allow_insecure_script_tags: false,
            add_nofollow_to_links: true,
            add_target_blank_to_links: true,
            css_class_for_internal_links: String::new(),
            css_class_for_external_links: String::new(),
            do_not_show_images: false,
            ipfs_prefix: String::new(),
            assets_width: 640,
            assets_height: 480,
            spoiler_prefix: "!".to_string(),
            image_proxy_fn: Arc::new(|url: &str| url.to_string()),
            hashtag_url_fn: Arc::new(|tag: &str| format!("/trending/{tag}")),
            usertag_url_fn: Arc::new(|user: &str| format!("/@{user}")),
            is_link_safe_fn,
            add_external_css_class_to_matching_links_fn,
            localization: Localization::default(),
            bad_actors: Arc::new(BadActorList::default()),
            phishing_domains: Arc::new(PhishingDomains::default()),
            plugins: Vec::new(),
        }
    }

    /// Check every field. Called by every constructor of [`DefaultRenderer`].
    pub fn validate(&self) -> Result<()> {
        let base = Url::parse(&self.base_url).map_err(|e| {
            RendererError::Config(format!("base_url {:?} is not a valid URL: {e}", self.base_url))
        })?;
        if !matches!(base.scheme(), "http" | "https") || base.host_str().is_none() {
            return Err(RendererError::Config(format!(
                "base_url {:?} must be an absolute http(s) URL",
                self.base_url
            )));
        }

        if !self.ipfs_prefix.is_empty() {
            let prefix = Url::parse(&self.ipfs_prefix).map_err(|e| {
                RendererError::Config(format!(
                    "ipfs_prefix {:?} is not a valid URL: {e}",
                    self.ipfs_prefix
                ))
            })?;
            if !matches!(prefix.scheme(), "http" | "https") {
                return Err(RendererError::Config(format!(
                    "ipfs_prefix {:?} must be an http(s) URL",
                    self.ipfs_prefix
                )));
            }
        }

        if self.assets_width == 0 || self.assets_height == 0 {
            return Err(RendererError::Config(
                "assets_width and assets_height must be positive".to_string(),
            ));
        }

        for (key, class) in [
            ("css_class_for_internal_links", &self.css_class_for_internal_links),
            ("css_class_for_external_links", &self.css_class_for_external_links),
        ] {
            let valid = class
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ' '));
            if !valid {
                return Err(RendererError::Config(format!(
                    "{key} {class:?} may only contain letters, digits, '-', '_' and spaces"
                )));
            }
        }

        if self.spoiler_prefix.is_empty() || self.spoiler_prefix.chars().any(char::is_whitespace)
        {
            return Err(RendererError::Config(
                "spoiler_prefix must be a non-empty string without whitespace".to_string(),
            ));
        }

        self.localization.validate()?;

        let mut names = HashSet::new();
        for plugin in &self.plugins {
            let name = plugin.name();
            if name.trim().is_empty() {
                return Err(RendererError::Config(
                    "plugin names must not be empty".to_string(),
                ));
            }
            if !names.insert(name.to_string()) {
                return Err(RendererError::Config(format!(
                    "plugin {name:?} registered twice"
                )));
            }
        }

        Ok(())
    }

    /// Lowercase host of the base URL, if it has one.
    pub fn base_host(&self) -> Option<String> {
        host_of(&self.base_url)
    }
}

impl fmt::Debug for RendererOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RendererOptions")
            .field("base_url", &self.base_url)
            .field("breaks", &self.breaks)
            .field("skip_sanitization", &self.skip_sanitization)
            .field("allow_insecure_script_tags", &self.allow_insecure_script_tags)
            .field("add_nofollow_to_links", &self.add_nofollow_to_links)
            .field("add_target_blank_to_links", &self.add_target_blank_to_links)
            .field("css_class_for_internal_links", &self.css_class_for_internal_links)
            .field("css_class_for_external_links", &self.css_class_for_external_links)
            .field("do_not_show_images", &self.do_not_show_images)
            .field("ipfs_prefix", &self.ipfs_prefix)
            .field("assets_width", &self.assets_width)
            .field("assets_height", &self.assets_height)
            .field("spoiler_prefix", &self.spoiler_prefix)
            .field("localization", &self.localization)
            .field(
                "plugins",
                &self.plugins.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

fn host_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
}

/// Relative links and links to the base host are considered safe.
fn is_same_site(url: &str, base_host: Option<&str>) -> bool {
    let url = url.trim();
    if url.starts_with('#') || (url.starts_with('/') && !url.starts_with("//")) {
        return true;
    }
    let absolute = if url.starts_with("//") {
        format!("https:{url}")
    } else {
        url.to_string()
    };
    match (host_of(&absolute), base_host) {
        (Some(host), Some(base)) => host == base || host.ends_with(&format!(".{base}")),
        _ => false,
    }
}

/// Builder for configuring and validating a [`DefaultRenderer`].
///
/// # Example
///
/// ```
/// use content_renderer::RendererBuilder;
///
/// let mut renderer = RendererBuilder::new("https://hive.blog")
///     .breaks(false)
///     .assets_size(480, 270)
///     .css_class_for_external_links("link-external")
///     .build()
///     .unwrap();
///
/// let html = renderer.render("Hello **world**", None).unwrap();
/// assert!(html.contains("<strong>world</strong>"));
/// ```
pub struct RendererBuilder {
    options: RendererOptions,
}

impl RendererBuilder {
    /// Start from [`RendererOptions::new`] defaults for `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            options: RendererOptions::new(base_url),
        }
    }

    pub fn breaks(mut self, breaks: bool) -> Self {
        self.options.breaks = breaks;
        self
    }

    /// Disable both allow-list passes. Every render logs a warning.
    pub fn skip_sanitization(mut self, skip: bool) -> Self {
        self.options.skip_sanitization = skip;
        self
    }

    pub fn allow_insecure_script_tags(mut self, allow: bool) -> Self {
        self.options.allow_insecure_script_tags = allow;
        self
    }

    pub fn add_nofollow_to_links(mut self, add: bool) -> Self {
        self.options.add_nofollow_to_links = add;
        self
    }

    pub fn add_target_blank_to_links(mut self, add: bool) -> Self {
        self.options.add_target_blank_to_links = add;
        self
    }

    pub fn css_class_for_internal_links(mut self, class: impl Into<String>) -> Self {
        self.options.css_class_for_internal_links = class.into();
        self
    }

    pub fn css_class_for_external_links(mut self, class: impl Into<String>) -> Self {
        self.options.css_class_for_external_links = class.into();
        self
    }

    pub fn do_not_show_images(mut self, hide: bool) -> Self {
        self.options.do_not_show_images = hide;
        self
    }

    pub fn ipfs_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.options.ipfs_prefix = prefix.into();
        self
    }

    /// Width and height used for materialized embeds and sanitized iframes.
    pub fn assets_size(mut self, width: u32, height: u32) -> Self {
        self.options.assets_width = width;
        self.options.assets_height = height;
        self
    }

    pub fn spoiler_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.options.spoiler_prefix = prefix.into();
        self
    }

    pub fn image_proxy_fn(mut self, f: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        self.options.image_proxy_fn = Arc::new(f);
        self
    }

    pub fn hashtag_url_fn(mut self, f: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        self.options.hashtag_url_fn = Arc::new(f);
        self
    }

    pub fn usertag_url_fn(mut self, f: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        self.options.usertag_url_fn = Arc::new(f);
        self
    }

    pub fn is_link_safe_fn(mut self, f: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        self.options.is_link_safe_fn = Arc::new(f);
        self
    }

    pub fn add_external_css_class_to_matching_links_fn(
        mut self,
        f: impl Fn(&str) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.options.add_external_css_class_to_matching_links_fn = Arc::new(f);
        self
    }

    pub fn localization(mut self, localization: Localization) -> Self {
        self.options.localization = localization;
        self
    }

    /// Replace the table of account names that are never linked.
    pub fn bad_actors(mut self, list: BadActorList) -> Self {
        self.options.bad_actors = Arc::new(list);
        self
    }

    /// Replace the table of known phishing domains.
    pub fn phishing_domains(mut self, domains: PhishingDomains) -> Self {
        self.options.phishing_domains = Arc::new(domains);
        self
    }

    /// Append a plugin. Plugins run in the order they are added.
    pub fn add_plugin(mut self, plugin: impl RenderPlugin + 'static) -> Self {
        self.options.plugins.push(Arc::new(plugin));
        self
    }

    /// Validate the options and construct the renderer.
    pub fn build(self) -> Result<DefaultRenderer> {
        DefaultRenderer::new(self.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(RendererOptions::new("https://hive.blog").validate().is_ok());
    }

    #[test]
    fn rejects_relative_base_url() {
        let err = RendererOptions::new("hive.blog").validate().unwrap_err();
        assert!(matches!(err, RendererError::Config(_)));
    }

    #[test]
    fn rejects_non_http_base_url() {
        let err = RendererOptions::new("ftp://hive.blog").validate().unwrap_err();
        assert!(err.to_string().contains("absolute http(s) URL"));
    }

    #[test]
    fn rejects_zero_asset_size() {
        let mut options = RendererOptions::new("https://hive.blog");
        options.assets_height = 0;
        assert!(options.validate().is_err());
    }

    #[test]
    fn rejects_css_class_with_quotes() {
        let mut options = RendererOptions::new("https://hive.blog");
        options.css_class_for_external_links = r#"x" onclick="alert(1)"#.to_string();
        assert!(options.validate().is_err());
    }

    #[test]
    fn rejects_invalid_ipfs_prefix() {
        let mut options = RendererOptions::new("https://hive.blog");
        options.ipfs_prefix = "not a url".to_string();
        assert!(options.validate().is_err());

        options.ipfs_prefix = "https://ipfs.io/ipfs".to_string();
        assert!(options.validate().is_ok());
    }

    #[test]
    fn rejects_empty_localization_entry() {
        let mut options = RendererOptions::new("https://hive.blog");
        options.localization.no_image = "  ".to_string();
        let err = options.validate().unwrap_err();
        assert!(err.to_string().contains("localization.no_image"));
    }

    #[test]
    fn default_link_safety_follows_base_host() {
        let options = RendererOptions::new("https://hive.blog/");
        let safe = &options.is_link_safe_fn;
        assert!(safe("/@alice/post"));
        assert!(safe("#section"));
        assert!(safe("https://hive.blog/trending"));
        assert!(safe("//hive.blog/trending"));
        assert!(!safe("https://example.com"));
        assert!(!safe("//example.com"));

        let external = &options.add_external_css_class_to_matching_links_fn;
        assert!(external("https://example.com"));
        assert!(!external("/trending/hive"));
    }

    #[test]
    fn base_host_is_lowercase() {
        let options = RendererOptions::new("https://Hive.Blog/path");
        assert_eq!(options.base_host().as_deref(), Some("hive.blog"));
    }

    #[test]
    fn debug_output_lists_plugin_names() {
        let options = RendererOptions::new("https://hive.blog");
        let debug = format!("{options:?}");
        assert!(debug.contains("base_url"));
        assert!(debug.contains("plugins: []"));
    }
}
