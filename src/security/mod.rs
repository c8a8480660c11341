//! Link-safety heuristics and the post-sanitization script gate.
//!
//! - [`LinkSanitizer`] -- phishing, pseudo-local and private-network checks
//!   for a single link.
//! - [`PhishingDomains`] -- swappable table of known phishing domains and
//!   protected brand domains.
//! - [`check_security`] -- fatal `<script` gate run after sanitization.

mod link;
mod phishing;
mod script;

pub use link::{LinkRejection, LinkSanitizer};
pub use phishing::PhishingDomains;
pub(crate) use phishing::parse_absolute;
pub use script::{check_security, contains_script_tag};
