// src/checker/rules.rs
// =============================================================================
// "Obviously broken" rules that need no network access.
//
// Some bookmarks can be rejected just by looking at them:
// - Browser-internal or local-only schemes (file:, chrome:, about:, ...)
// - javascript: bookmarklets other than the known no-ops
// - data: URLs too short to hold any real content
// - Hosts that are placeholders ("undefined", "null", "false") or empty
// - Loopback hosts without an explicit port (http://localhost/foo)
// - Reserved documentation/test domains (example.com, *.test, ...)
// - http/https hosts with no dot, which no public DNS name looks like
//
// Anything that does not match is Unknown and goes on to the probe chain.
// The rules are a pure function of the URL and the config: no I/O, and the
// same input always gives the same answer.
//
// Rust concepts:
// - url::Host: tells domains, IPv4 and IPv6 addresses apart for us
// - Option combinators: .or_else() chains rules, first match wins
// =============================================================================

use super::validate::ParsedUrl;
use crate::config::Config;
use std::net::{Ipv4Addr, Ipv6Addr};
use url::Host;

// Placeholder hosts produced by buggy pages/scripts that saved a bookmark
const PLACEHOLDER_HOSTS: &[&str] = &["undefined", "null", "false"];

// Schemes that must carry a host to mean anything
const HOSTED_SCHEMES: &[&str] = &["http", "https", "ftp", "ws", "wss"];

/// Result of the static pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaticVerdict {
    /// A rule matched; holds a short description of which one
    Broken(String),
    /// No rule matched, the network has to decide
    Unknown,
}

/// The static pattern classifier, built once from the config.
#[derive(Debug, Clone)]
pub struct StaticRules {
    disallowed_schemes: Vec<String>,
    javascript_noops: Vec<String>,
    min_data_url_len: usize,
    sentinel_domains: Vec<String>,
}

impl StaticRules {
    pub fn from_config(config: &Config) -> Self {
        StaticRules {
            disallowed_schemes: lowercase_all(&config.disallowed_schemes),
            javascript_noops: config
                .javascript_noops
                .iter()
                .map(|s| normalize_script(s))
                .collect(),
            min_data_url_len: config.min_data_url_len,
            sentinel_domains: config
                .sentinel_domains
                .iter()
                .map(|d| d.trim().trim_matches('.').to_lowercase())
                .filter(|d| !d.is_empty())
                .collect(),
        }
    }

    // Runs every rule against the URL
    //
    // Returns the first matching rule's reason, or Unknown.
    pub fn classify(&self, parsed: &ParsedUrl) -> StaticVerdict {
        let reason = self
            .check_scheme(parsed)
            .or_else(|| self.check_host(parsed));

        match reason {
            Some(reason) => StaticVerdict::Broken(reason),
            None => StaticVerdict::Unknown,
        }
    }

    fn check_scheme(&self, parsed: &ParsedUrl) -> Option<String> {
        // url::Url already lowercases the scheme
        let scheme = parsed.scheme();

        if self.disallowed_schemes.iter().any(|s| s == scheme) {
            return Some(format!("disallowed scheme '{}:'", scheme));
        }

        match scheme {
            "javascript" => {
                let script = normalize_script(parsed.raw());
                if self.javascript_noops.iter().any(|noop| *noop == script) {
                    None
                } else {
                    Some("javascript: bookmarklet".to_string())
                }
            }
            "data" => {
                let payload_len = data_payload(parsed.raw()).map_or(0, str::len);
                if payload_len < self.min_data_url_len {
                    Some(format!(
                        "data: URL payload too short ({} < {} bytes)",
                        payload_len, self.min_data_url_len
                    ))
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    fn check_host(&self, parsed: &ParsedUrl) -> Option<String> {
        let url = parsed.url();
        if !HOSTED_SCHEMES.contains(&url.scheme()) {
            return None;
        }

        let host = match url.host() {
            Some(host) => host,
            None => return Some("missing host".to_string()),
        };

        match host {
            Host::Domain(domain) => {
                let domain = domain.trim_end_matches('.').to_lowercase();
                self.check_domain(&domain, url.port(), parsed.is_web())
            }
            Host::Ipv4(addr) => {
                if is_loopback_v4(addr) && url.port().is_none() {
                    Some(format!("loopback address {} without a port", addr))
                } else {
                    None
                }
            }
            Host::Ipv6(addr) => {
                if addr == Ipv6Addr::LOCALHOST && url.port().is_none() {
                    Some("loopback address ::1 without a port".to_string())
                } else {
                    None
                }
            }
        }
    }

    fn check_domain(&self, domain: &str, port: Option<u16>, is_web: bool) -> Option<String> {
        if domain.is_empty() {
            return Some("empty host".to_string());
        }

        if PLACEHOLDER_HOSTS.contains(&domain) {
            return Some(format!("placeholder host '{}'", domain));
        }

        if domain == "localhost" {
            return if port.is_none() {
                Some("localhost without a port".to_string())
            } else {
                None
            };
        }

        if let Some(sentinel) = self
            .sentinel_domains
            .iter()
            .find(|s| domain == s.as_str() || domain.ends_with(&format!(".{}", s)))
        {
            return Some(format!("reserved domain '{}'", sentinel));
        }

        if is_web && !domain.contains('.') {
            return Some(format!("host '{}' is not a resolvable name", domain));
        }

        None
    }
}

// 127.0.0.0/8 and the unspecified address 0.0.0.0
fn is_loopback_v4(addr: Ipv4Addr) -> bool {
    addr.is_loopback() || addr.is_unspecified()
}

// "javascript: Void(0) ;" and "javascript:void(0);" compare equal
fn normalize_script(script: &str) -> String {
    script
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

// The part of a data: URL after the first comma
fn data_payload(raw: &str) -> Option<&str> {
    raw.split_once(',').map(|(_, payload)| payload)
}

fn lowercase_all(items: &[String]) -> Vec<String> {
    items
        .iter()
        .map(|s| s.trim().trim_end_matches(':').to_lowercase())
        .collect()
}

// -----------------------------------------------------------------------------
// NOTES:
//
// 1. Why does localhost with a port pass?
//    - http://localhost:3000 is a typical dev-server bookmark; it may well
//      be alive when the developer is working, so we let the probes decide
//    - url::Url reports no port when the default one is written out
//      (http://localhost:80), so that case is treated as "no port"
//
// 2. Why match subdomains of sentinel domains?
//    - www.example.com is just as reserved as example.com
//    - TLD-style entries like "test" catch anything.test the same way
// -----------------------------------------------------------------------------
