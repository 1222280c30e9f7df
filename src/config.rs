// src/config.rs
// =============================================================================
// Runtime configuration for the link checker.
//
// Values come from three places, later ones winning:
// 1. Built-in defaults (Config::default)
// 2. An optional JSON file passed with --config
// 3. Command-line flags (--timeout, --concurrency, --relay)
//
// Every field has a default, so a config file only needs the keys it wants
// to change:
//
//   { "probe_timeout_secs": 3, "sentinel_domains": ["example.com", "corp.test"] }
//
// Rust concepts:
// - #[serde(default)]: missing fields are filled from Default::default()
// - anyhow::Context: attach a human-readable message to an error
// =============================================================================

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

// Placeholder in relay_endpoint that is replaced by the URL-encoded target
pub const URL_PLACEHOLDER: &str = "{url}";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Upper bound for a single probe strategy, in seconds
    pub probe_timeout_secs: u64,
    /// How many bookmarks are classified at the same time (1 = sequential)
    pub concurrency: usize,
    /// Relay endpoint template, must contain `{url}`
    pub relay_endpoint: String,
    /// User-Agent sent with every probe request
    pub user_agent: String,
    /// Schemes that can never be a live, shareable bookmark
    pub disallowed_schemes: Vec<String>,
    /// `javascript:` URLs that are tolerated (compared after trimming)
    pub javascript_noops: Vec<String>,
    /// `data:` URLs with a shorter payload are treated as broken
    pub min_data_url_len: usize,
    /// Reserved documentation/test domains (subdomains match too)
    pub sentinel_domains: Vec<String>,
    /// Phrases that mark a relayed page as a "not found" page
    pub not_found_phrases: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            probe_timeout_secs: 5,
            concurrency: 4,
            relay_endpoint: "https://api.allorigins.win/get?url={url}".to_string(),
            user_agent: concat!("bookmark-guardian/", env!("CARGO_PKG_VERSION")).to_string(),
            disallowed_schemes: to_strings(&[
                "file",
                "chrome",
                "chrome-extension",
                "chrome-untrusted",
                "chrome-search",
                "edge",
                "brave",
                "opera",
                "vivaldi",
                "moz-extension",
                "safari-extension",
                "view-source",
                "about",
            ]),
            javascript_noops: to_strings(&["javascript:void(0)", "javascript:void(0);"]),
            min_data_url_len: 16,
            sentinel_domains: to_strings(&[
                "example.com",
                "example.org",
                "example.net",
                "example",
                "test",
                "invalid",
                "localhost.localdomain",
            ]),
            not_found_phrases: to_strings(&[
                "404 not found",
                "page not found",
                "page does not exist",
                "page you requested could not be found",
                "this page isn't available",
                "no longer available",
            ]),
        }
    }
}

impl Config {
    // Loads the config file if one was given, otherwise returns the defaults
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read config file {}", path.display()))?;
                serde_json::from_str(&raw)
                    .with_context(|| format!("invalid config file {}", path.display()))?
            }
            None => Config::default(),
        };
        config.validate()?;
        Ok(config)
    }

    // Rejects values that would make the checker misbehave
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            bail!("concurrency must be at least 1");
        }
        if self.probe_timeout_secs == 0 {
            bail!("probe_timeout_secs must be at least 1");
        }
        if !self.relay_endpoint.contains(URL_PLACEHOLDER) {
            bail!(
                "relay_endpoint '{}' must contain the {} placeholder",
                self.relay_endpoint,
                URL_PLACEHOLDER
            );
        }
        Ok(())
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
