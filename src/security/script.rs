//! Fatal script-tag gate.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{RendererError, Result};

static SCRIPT_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<\s*script").expect("SCRIPT_TAG: hardcoded regex is valid"));

/// Returns `true` if `html` contains an opening `<script` in any case or
/// with whitespace after the `<`.
pub fn contains_script_tag(html: &str) -> bool {
    SCRIPT_TAG.is_match(html)
}

/// Fail the render if a script tag is still present after sanitization.
///
/// Reaching this error means the allow-list was bypassed, so it is never
/// downgraded to a warning unless `allow_script_tag` is set.
pub fn check_security(html: &str, allow_script_tag: bool) -> Result<()> {
    if !allow_script_tag && contains_script_tag(html) {
        tracing::error!("Script tag found after sanitization, aborting render");
        return Err(RendererError::Security(
            "Renderer rejected the input because of insecure content: text contains script tag"
                .to_string(),
        ));
    }
    Ok(())
}
