//! Phishing-domain table and confusable-domain heuristic.

use std::collections::HashSet;

use url::Url;

/// Domains reported for phishing against blockchain social sites.
const DEFAULT_PHISHING_DOMAINS: &[&str] = &[
    "steewit.com",
    "steemiit.com",
    "steemitt.com",
    "steemlt.com",
    "steamit.com",
    "hive-blog.com",
    "hiveblog.io",
    "hive-login.com",
    "hivesigner-login.com",
    "peakd-login.com",
    "ecency-login.com",
    "blocktrades.cc",
    "bittrex.cc",
    "wallet-hive.com",
];

/// Domains whose look-alikes are treated as phishing.
const DEFAULT_BRAND_DOMAINS: &[&str] = &[
    "hive.blog",
    "hive.io",
    "peakd.com",
    "ecency.com",
    "hivesigner.com",
    "steemit.com",
];

/// Known phishing domains plus protected brands.
///
/// A URL looks phishy when its host is (a subdomain of) a listed phishing
/// domain, carries an IDN (`xn--`) label, embeds credentials before the
/// host, or reduces to the same skeleton as a brand domain without being
/// that domain (`hiive.blog`, `h1ve.blog`, `peakcl.com` ...).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhishingDomains {
    domains: HashSet<String>,
    brands: Vec<(String, String)>,
}

impl PhishingDomains {
    pub fn new<D, B, S, T>(domains: D, brands: B) -> Self
    where
        D: IntoIterator<Item = S>,
        B: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            domains: domains
                .into_iter()
                .map(|d| d.into().to_ascii_lowercase())
                .collect(),
            brands: brands
                .into_iter()
                .map(|b| {
                    let brand = b.into().to_ascii_lowercase();
                    let shape = skeleton(&brand);
                    (brand, shape)
                })
                .collect(),
        }
    }

    /// Returns `true` if `url` should not be rendered as a clickable link.
    ///
    /// Relative URLs never look phishy.
    pub fn looks_phishy(&self, url: &str) -> bool {
        let url = url.trim();
        if url.chars().any(|c| !c.is_ascii() && !c.is_whitespace()) && has_authority(url) {
            // Unicode anywhere in an absolute URL's authority is a disguise
            // candidate; the authority check happens after IDNA below too.
            if let Some(authority) = authority_of(url) {
                if !authority.is_ascii() {
                    return true;
                }
            }
        }

        let Some(parsed) = parse_absolute(url) else {
            return false;
        };
        if !parsed.username().is_empty() || parsed.password().is_some() {
            return true;
        }
        let Some(host) = parsed.host_str() else {
            return false;
        };
        let host = host.trim_end_matches('.').to_ascii_lowercase();

        if host.split('.').any(|label| label.starts_with("xn--")) {
            return true;
        }

        if self
            .domains
            .iter()
            .any(|d| host == *d || host.ends_with(&format!(".{d}")))
        {
            return true;
        }

        let bare = host.strip_prefix("www.").unwrap_or(&host);
        let shape = skeleton(bare);
        self.brands.iter().any(|(brand, brand_shape)| {
            bare != brand && !bare.ends_with(&format!(".{brand}")) && shape == *brand_shape
        })
    }
}

impl Default for PhishingDomains {
    fn default() -> Self {
        Self::new(
            DEFAULT_PHISHING_DOMAINS.iter().copied(),
            DEFAULT_BRAND_DOMAINS.iter().copied(),
        )
    }
}

fn has_authority(url: &str) -> bool {
    url.contains("//")
}

fn authority_of(url: &str) -> Option<&str> {
    let start = url.find("//")? + 2;
    let rest = &url[start..];
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    Some(&rest[..end])
}

/// Parse `url` as absolute, treating protocol-relative URLs as https.
pub(crate) fn parse_absolute(url: &str) -> Option<Url> {
    if url.starts_with("//") {
        Url::parse(&format!("https:{url}")).ok()
    } else {
        Url::parse(url).ok()
    }
}

/// Fold look-alike characters together and collapse repeats, so that
/// `hiive.blog` and `h1ve.bl0g` share the skeleton of `hive.blog`.
fn skeleton(host: &str) -> String {
    let folded = host.replace("rn", "m").replace("vv", "w").replace("cl", "d");
    let mut out = String::with_capacity(folded.len());
    for c in folded.chars() {
        let c = match c {
            '0' => 'o',
            '1' | 'l' | '!' | '|' => 'i',
            '3' => 'e',
            '4' => 'a',
            '5' | '$' => 's',
            '7' => 't',
            '-' | '_' => continue,
            other => other,
        };
        if !out.ends_with(c) {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listed_domain_and_subdomains_are_phishy() {
        let table = PhishingDomains::default();
        assert!(table.looks_phishy("https://steamit.com/login"));
        assert!(table.looks_phishy("https://www.steamit.com"));
        assert!(table.looks_phishy("//hive-login.com/?next=/"));
    }

    #[test]
    fn brand_domains_are_not_phishy() {
        let table = PhishingDomains::default();
        assert!(!table.looks_phishy("https://hive.blog/@alice"));
        assert!(!table.looks_phishy("https://www.peakd.com/"));
        assert!(!table.looks_phishy("https://api.hive.blog"));
    }

    #[test]
    fn confusable_brand_is_phishy() {
        let table = PhishingDomains::default();
        assert!(table.looks_phishy("https://hiive.blog/wallet"));
        assert!(table.looks_phishy("https://h1ve.blog"));
        assert!(table.looks_phishy("https://peakcl.com"));
    }

    #[test]
    fn unicode_host_is_phishy() {
        let table = PhishingDomains::default();
        assert!(table.looks_phishy("https://hіve.blog/"));
        assert!(table.looks_phishy("https://xn--hve-ydb.blog/"));
    }

    #[test]
    fn credentials_before_host_are_phishy() {
        let table = PhishingDomains::default();
        assert!(table.looks_phishy("https://hive.blog@evil.example/"));
    }

    #[test]
    fn unicode_in_path_is_fine() {
        let table = PhishingDomains::default();
        assert!(!table.looks_phishy("https://example.com/wiki/Café"));
    }

    #[test]
    fn relative_urls_are_not_phishy() {
        let table = PhishingDomains::default();
        assert!(!table.looks_phishy("/@alice/post"));
        assert!(!table.looks_phishy("#top"));
    }

    #[test]
    fn custom_table() {
        let table = PhishingDomains::new(["evil.test"], ["good.test"]);
        assert!(table.looks_phishy("https://evil.test"));
        assert!(table.looks_phishy("https://g00d.test"));
        assert!(!table.looks_phishy("https://steamit.com"));
    }
}
