//! # content_renderer
//!
//! Renders user-submitted post bodies (Markdown or HTML) into HTML that is
//! safe to insert into a page.
//!
//! ## Overview
//!
//! A [`DefaultRenderer`] runs every body through a fixed pipeline: Markdown
//! with spoiler blocks, a document walk that linkifies URLs, `#hashtags` and
//! `@mentions` and turns recognized media URLs into embed markers, a
//! tag-transforming allow-list [`TagSanitizer`], a fatal script gate, embed
//! materialization and a final [`EmbedSanitizer`] pass. Links that look like
//! phishing or point into private networks are never rendered clickable.
//!
//! [`RenderPlugin`]s can rewrite the raw input before the pipeline and the
//! final HTML after it.
//!
//! ## Quick start
//!
//! ```rust
//! use content_renderer::{PostContext, RendererBuilder};
//!
//! let mut renderer = RendererBuilder::new("https://hive.blog")
//!     .css_class_for_external_links("link-external")
//!     .build()
//!     .unwrap();
//!
//! let post = PostContext::new("alice", "first-post");
//! let html = renderer
//!     .render("Hi @bob, see https://example.com #intro", Some(&post))
//!     .unwrap();
//!
//! assert!(html.contains(r#"<a href="/@bob">@bob</a>"#));
//! assert!(html.contains(r#"class="link-external""#));
//! assert!(renderer.last_state().hashtags.contains("intro"));
//! ```

pub mod account;
pub mod config;
pub mod dom;
pub mod embedder;
pub mod error;
pub mod markdown;
pub mod plugin;
pub mod renderer;
pub mod sanitizer;
pub mod security;

pub use account::{AccountNameError, AccountNameValidator, BadActorList};
pub use config::{Localization, RendererBuilder, RendererOptions, UrlFn, UrlPredicate};
pub use dom::{HtmlDomParser, ParserState};
pub use embedder::{AssetEmbedder, EmbedMetadata, EmbedSize, Embedder};
pub use error::{RendererError, Result, Violation};
pub use markdown::MarkdownRenderer;
pub use plugin::{Cleanup, MountTarget, PlaceholderEmbedPlugin, PluginChain, RenderPlugin};
pub use renderer::{DefaultRenderer, PostContext};
pub use sanitizer::{EmbedSanitizer, RegexSanitizer, Sanitizer, SanitizationConfig, TagSanitizer};
pub use security::{LinkRejection, LinkSanitizer, PhishingDomains};
