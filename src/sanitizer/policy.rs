//! Allow-lists shared by both sanitizer passes and the per-render
//! configuration of the tag-transforming pass.

use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::config::{RendererOptions, UrlPredicate};
use crate::security::PhishingDomains;

pub const ALLOWED_TAGS: &[&str] = &[
    "div", "iframe", "del", "a", "p", "b", "i", "q", "br", "ul", "li", "ol", "img", "h1", "h2",
    "h3", "h4", "h5", "h6", "hr", "blockquote", "pre", "code", "em", "strong", "center", "table",
    "thead", "tbody", "tr", "th", "td", "strike", "sup", "sub", "details", "summary",
];

/// Disallowed tags whose content is dropped along with the tag.
pub const DROP_CONTENT_TAGS: &[&str] = &[
    "script", "style", "textarea", "option", "noscript", "title", "xmp", "noembed", "noframes",
    "template", "svg", "math", "object", "embed",
];

/// `div` classes that survive sanitization.
pub const ALLOWED_DIV_CLASSES: &[&str] = &[
    "pull-right",
    "pull-left",
    "text-justify",
    "text-rtl",
    "text-center",
    "text-right",
    "videoWrapper",
    "phishy",
];

pub fn allowed_attributes(tag: &str) -> &'static [&'static str] {
    match tag {
        "iframe" => &[
            "src",
            "width",
            "height",
            "frameborder",
            "allowfullscreen",
            "webkitallowfullscreen",
            "mozallowfullscreen",
        ],
        "div" => &["class", "title"],
        "td" | "th" => &["style"],
        "img" => &["src", "alt"],
        "a" => &["href", "rel", "title", "class", "target", "id"],
        _ => &[],
    }
}

pub fn is_allowed_tag(tag: &str) -> bool {
    ALLOWED_TAGS.contains(&tag)
}

pub fn drops_content(tag: &str) -> bool {
    DROP_CONTENT_TAGS.contains(&tag)
}

static URL_SCHEME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-z][a-z0-9+.-]*):").expect("URL_SCHEME: hardcoded regex is valid")
});

/// `href`/`src` values must be relative, protocol-relative, or use
/// `http`, `https` or `hive`.
pub fn is_allowed_url(value: &str) -> bool {
    let compact: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();
    match URL_SCHEME.captures(&compact) {
        Some(caps) => matches!(&caps[1], "http" | "https" | "hive"),
        None => true,
    }
}

/// A supported iframe provider: the `src` pattern and the canonical URL
/// the iframe is rewritten to.
pub struct IframeRule {
    pub provider: &'static str,
    pattern: Regex,
    canonicalize: fn(&Regex, &str) -> Option<String>,
}

impl IframeRule {
    fn new(
        provider: &'static str,
        pattern: &str,
        canonicalize: fn(&Regex, &str) -> Option<String>,
    ) -> Self {
        Self {
            provider,
            pattern: Regex::new(pattern).expect("IFRAME_RULES: hardcoded regex is valid"),
            canonicalize,
        }
    }

    pub fn matches(&self, src: &str) -> bool {
        self.pattern.is_match(src)
    }

    /// The rewritten `src`, or `None` if the URL lacks a required part.
    pub fn canonicalize(&self, src: &str) -> Option<String> {
        (self.canonicalize)(&self.pattern, src)
    }
}

fn capture(pattern: &Regex, src: &str) -> Option<String> {
    Some(pattern.captures(src)?.get(1)?.as_str().to_string())
}

fn force_https(src: &str) -> String {
    if let Some(rest) = src.strip_prefix("//") {
        format!("https://{rest}")
    } else if src
        .get(..7)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("http://"))
    {
        format!("https://{}", &src[7..])
    } else {
        src.to_string()
    }
}

static SOUNDCLOUD_TRACK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"url=(.+?)&").expect("SOUNDCLOUD_TRACK: hardcoded regex is valid")
});

/// Iframe providers accepted by the tag-transforming pass, in match order.
pub static IFRAME_RULES: LazyLock<Vec<IframeRule>> = LazyLock::new(|| {
    vec![
        IframeRule::new(
            "twitter",
            r"(?i)^(?:https?:)?//(?:platform\.twitter\.com/embed/Tweet\.html\?id=|(?:www\.|mobile\.)?(?:twitter|x)\.com/[A-Za-z0-9_]{1,15}/status/)(\d+)",
            |re, src| {
                capture(re, src).map(|id| format!("https://platform.twitter.com/embed/Tweet.html?id={id}"))
            },
        ),
        IframeRule::new(
            "vimeo",
            r"(?i)^(?:https?:)?//player\.vimeo\.com/video/(\d+)",
            |re, src| capture(re, src).map(|id| format!("https://player.vimeo.com/video/{id}")),
        ),
        IframeRule::new(
            "youtube",
            r"(?i)^(?:https?:)?//(?:www\.)?youtube\.com/embed/([A-Za-z0-9_-]+)",
            |re, src| capture(re, src).map(|id| format!("https://www.youtube.com/embed/{id}")),
        ),
        IframeRule::new(
            "soundcloud",
            r"(?i)^https://w\.soundcloud\.com/player/",
            |_, src| {
                let track = SOUNDCLOUD_TRACK.captures(src)?.get(1)?.as_str();
                Some(format!(
                    "https://w.soundcloud.com/player/?url={track}&auto_play=false&hide_related=false&show_comments=true&show_user=true&show_reposts=false&visual=true"
                ))
            },
        ),
        IframeRule::new(
            "twitch",
            r"(?i)^(?:https?:)?//player\.twitch\.tv/",
            |_, src| Some(force_https(src)),
        ),
        IframeRule::new(
            "spotify",
            r"(?i)^https://open\.spotify\.com/(?:embed|embed-podcast)/(?:playlist|show|episode|track|album|artist)/",
            |_, src| Some(src.to_string()),
        ),
        IframeRule::new(
            "3speak",
            r"(?i)^(?:https?:)?//3speak\.(?:online|co|tv)/embed\?v=([A-Za-z0-9_.-]+/[A-Za-z0-9_.-]+)",
            |re, src| capture(re, src).map(|id| format!("https://3speak.tv/embed?v={id}")),
        ),
        IframeRule::new(
            "3speak",
            r"(?i)^(?:https?:)?//3speak\.(?:online|co|tv)/watch\?v=([A-Za-z0-9_.-]+/[A-Za-z0-9_.-]+)",
            |re, src| capture(re, src).map(|id| format!("https://3speak.tv/embed?v={id}")),
        ),
    ]
});

/// The provider rule an iframe `src` is checked against.
pub fn iframe_rule(src: &str) -> Option<&'static IframeRule> {
    IFRAME_RULES.iter().find(|rule| rule.matches(src))
}

/// Everything the tag-transforming pass needs from the renderer options.
///
/// Built again for every render because the link predicates close over
/// the options.
#[derive(Clone)]
pub struct SanitizationConfig {
    pub iframe_width: u32,
    pub iframe_height: u32,
    pub do_not_show_images: bool,
    pub add_nofollow_to_links: bool,
    pub add_target_blank_to_links: bool,
    pub css_class_for_internal_links: String,
    pub css_class_for_external_links: String,
    pub is_link_safe_fn: UrlPredicate,
    pub add_external_css_class_to_matching_links_fn: UrlPredicate,
    pub phishing_warning: String,
    pub external_link: String,
    pub no_image: String,
    /// Base host for the link checks applied to image sources.
    pub base_host: Option<String>,
    pub phishing_domains: Arc<PhishingDomains>,
}

impl SanitizationConfig {
    pub fn from_options(options: &RendererOptions) -> Self {
        Self {
            iframe_width: options.assets_width,
            iframe_height: options.assets_height,
            do_not_show_images: options.do_not_show_images,
            add_nofollow_to_links: options.add_nofollow_to_links,
            add_target_blank_to_links: options.add_target_blank_to_links,
            css_class_for_internal_links: options.css_class_for_internal_links.clone(),
            css_class_for_external_links: options.css_class_for_external_links.clone(),
            is_link_safe_fn: options.is_link_safe_fn.clone(),
            add_external_css_class_to_matching_links_fn: options
                .add_external_css_class_to_matching_links_fn
                .clone(),
            phishing_warning: options.localization.phishing_warning.clone(),
            external_link: options.localization.external_link.clone(),
            no_image: options.localization.no_image.clone(),
            base_host: options.base_host(),
            phishing_domains: Arc::clone(&options.phishing_domains),
        }
    }
}
