//! Error types for the `content_renderer` crate.

/// Errors that abort a render or a renderer construction.
///
/// Recoverable problems found while sanitizing (blocked iframes, broken
/// images, phishing links) are not errors: they are replaced with a visible
/// placeholder and reported as [`Violation`]s instead.
#[derive(Debug, thiserror::Error)]
pub enum RendererError {
    /// The renderer options or localization table are invalid.
    #[error("Config error: {0}")]
    Config(String),

    /// A `<script` tag survived sanitization. The render is aborted.
    #[error("Security error: {0}")]
    Security(String),

    /// The HTML could not be turned into a document tree.
    #[error("Parser error: {0}")]
    Parser(String),

    /// `render()` was called with an empty string.
    #[error("Input must be a non-empty string")]
    EmptyInput,
}

/// A type alias for `Result<T, RendererError>`.
pub type Result<T> = std::result::Result<T, RendererError>;

/// A sanitization rejection that was recovered locally.
///
/// The offending markup has already been replaced by a safe fallback by the
/// time a `Violation` is observed.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Violation {
    /// An iframe whose `src` matched none of the supported providers.
    #[error("Invalid iframe URL: {0}")]
    UnsupportedIframe(String),

    /// An image whose `src` is neither absolute nor protocol-relative.
    #[error("An image in this post did not save properly: {0}")]
    InvalidImage(String),

    /// A tag that is not on the allow-list was removed.
    #[error("Disallowed tag removed: <{0}>")]
    DisallowedTag(String),
}
