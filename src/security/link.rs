//! Per-link safety checks applied while walking the document tree.

use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::LazyLock;

use regex::Regex;
use url::Host;

use super::phishing::{PhishingDomains, parse_absolute};

static KNOWN_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^((hive|https?):)?//").expect("KNOWN_PREFIX: hardcoded regex is valid")
});

/// Why a link was refused. The caller renders a phishing warning instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LinkRejection {
    #[error("link looks like a phishing attempt")]
    Phishing,
    #[error("link text names this site but the link goes elsewhere")]
    PseudoLocal,
    #[error("link points into a private network")]
    PrivateNetwork,
}

/// Decides whether a link may be rendered clickable.
pub struct LinkSanitizer<'a> {
    base_host: Option<String>,
    phishing: &'a PhishingDomains,
}

impl<'a> LinkSanitizer<'a> {
    /// `base_host` is the renderer's own host, used for the pseudo-local
    /// check.
    pub fn new(base_host: Option<String>, phishing: &'a PhishingDomains) -> Self {
        Self {
            base_host: base_host.map(|h| h.to_ascii_lowercase()),
            phishing,
        }
    }

    /// Return the URL to use for a link with visible text `title`, or the
    /// reason it must not be clickable.
    ///
    /// URLs without a recognized prefix get `https://` prepended first.
    pub fn sanitize_link(&self, url: &str, title: &str) -> Result<String, LinkRejection> {
        let url = prepend_unknown_protocol(url.trim());

        if self.phishing.looks_phishy(&url) {
            tracing::warn!("Rejected phishing link {url:?}");
            return Err(LinkRejection::Phishing);
        }
        if self.is_pseudo_local_url(&url, title) {
            tracing::warn!("Rejected pseudo-local link {url:?} with text {title:?}");
            return Err(LinkRejection::PseudoLocal);
        }
        if Self::is_private_network_url(&url) {
            tracing::warn!("Rejected private-network link {url:?}");
            return Err(LinkRejection::PrivateNetwork);
        }
        Ok(url)
    }

    /// The link text mentions our own domain but the link goes elsewhere.
    pub fn is_pseudo_local_url(&self, url: &str, title: &str) -> bool {
        if url.starts_with('#') {
            return false;
        }
        let Some(base) = self.base_host.as_deref() else {
            return false;
        };
        let url = url.to_lowercase();
        let title = title.to_lowercase();
        title.contains(base) && !url.contains(base)
    }

    /// Lexical check for loopback, private, link-local and unique-local
    /// hosts. No name resolution is performed.
    pub fn is_private_network_url(url: &str) -> bool {
        let Some(parsed) = parse_absolute(url.trim()) else {
            return false;
        };
        match parsed.host() {
            Some(Host::Ipv4(ip)) => is_private_ipv4(ip),
            Some(Host::Ipv6(ip)) => is_private_ipv6(ip),
            Some(Host::Domain(domain)) => {
                let domain = domain.trim_end_matches('.').to_ascii_lowercase();
                domain == "localhost" || domain.ends_with(".localhost")
            }
            None => false,
        }
    }
}

fn prepend_unknown_protocol(url: &str) -> String {
    let known = url.starts_with('#')
        || (url.starts_with('/') && !url.starts_with("//"))
        || KNOWN_PREFIX.is_match(url);
    if known {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}

fn is_private_ipv4(ip: Ipv4Addr) -> bool {
    ip.is_loopback() || ip.is_private() || ip.is_link_local() || ip.is_unspecified()
}

fn is_private_ipv6(ip: Ipv6Addr) -> bool {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return is_private_ipv4(v4);
    }
    let first = ip.segments()[0];
    ip.is_loopback()
        || ip.is_unspecified()
        // fe80::/10 link-local
        || (first & 0xffc0) == 0xfe80
        // fc00::/7 unique-local
        || (first & 0xfe00) == 0xfc00
}
