//! HTML sanitizers run by the renderer.
//!
//! - [`RegexSanitizer`] -- regex rules over raw input, used to surface HTML
//!   comments before Markdown sees them.
//! - [`TagSanitizer`] -- the allow-list pass that rewrites iframes, images,
//!   links, `div`s and table cells, and reports what it blocked.
//! - [`EmbedSanitizer`] -- a looser pass over materialized embeds that
//!   pins iframes to a host allow-list.

mod embeds;
mod policy;
mod regex;
mod tags;

pub use self::regex::RegexSanitizer;
pub use embeds::{EmbedSanitizer, IFRAME_HOSTS};
pub use policy::{
    ALLOWED_TAGS, IFRAME_RULES, IframeRule, SanitizationConfig, iframe_rule, is_allowed_url,
};
pub use tags::TagSanitizer;

/// A stateless transformation of an HTML (or pre-HTML text) string.
///
/// Implementations must be `Send + Sync` so one instance can be shared by
/// every renderer.
pub trait Sanitizer: Send + Sync {
    fn sanitize(&self, html: &str) -> String;
}
