// src/checker/http.rs
// =============================================================================
// The network probes that make up the default probe chain.
//
// Key functionality:
// - DirectProbe: HEAD request to the bookmark, falls back to GET. Only a
//   hard network failure on BOTH requests (DNS, connection refused) is
//   conclusive; an answer of any kind is not, since the site's own status
//   code is never trusted (login walls, bot protection and geo blocks all
//   produce scary codes for live pages)
// - RelayProbe: asks a content relay (allorigins-style) to fetch the page
//   server-side and report the status code and the page content
// - FaviconProbe: requests /favicon.ico on the bookmark's origin; any
//   answer at all means the host is up
//
// Every probe answers Inconclusive for non-web schemes, and any reqwest
// error becomes a ProbeError that the chain turns into Inconclusive.
//
// Rust concepts:
// - async/await: For network I/O
// - Result<T, E>: For error handling
// - Error source chains: walking std::error::Error::source()
// =============================================================================

use super::probe::{Probe, ProbeChain, ProbeReport};
use super::validate::ParsedUrl;
use crate::config::{Config, URL_PLACEHOLDER};
use crate::error::ProbeError;
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use serde::Deserialize;
use std::error::Error as StdError;
use url::form_urlencoded;

// Builds the HTTP client shared by every probe
//
// We'll reuse this client for all requests (connection pooling)
pub fn build_client(config: &Config) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(config.probe_timeout()) // same budget as the chain's timeout
        .redirect(reqwest::redirect::Policy::limited(5)) // Follow up to 5 redirects
        .user_agent(config.user_agent.clone())
        .build()
}

// Builds the default chain: direct -> relay -> favicon
pub fn standard_chain(config: &Config) -> Result<ProbeChain, reqwest::Error> {
    let client = build_client(config)?;

    Ok(ProbeChain::new(
        vec![
            Box::new(DirectProbe::new(client.clone())),
            Box::new(RelayProbe::new(
                client.clone(),
                config.relay_endpoint.clone(),
                config.not_found_phrases.clone(),
            )),
            Box::new(FaviconProbe::new(client)),
        ],
        config.probe_timeout(),
    ))
}

// Broad categories of reqwest failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailureKind {
    Timeout,
    TooManyRedirects,
    Dns,
    Refused,
    Tls,
    Other,
}

impl FailureKind {
    // Failures that mean "there is nothing at this address"
    fn is_unreachable(self) -> bool {
        matches!(self, FailureKind::Dns | FailureKind::Refused)
    }

    fn describe(self) -> &'static str {
        match self {
            FailureKind::Timeout => "request timed out",
            FailureKind::TooManyRedirects => "too many redirects",
            FailureKind::Dns => "could not resolve hostname",
            FailureKind::Refused => "connection refused",
            FailureKind::Tls => "TLS/certificate error",
            FailureKind::Other => "request failed",
        }
    }
}

// Categorizes the different reqwest error types
//
// Only errors raised while connecting are looked at more closely. The
// details (dns, refused, tls) live in the source chain below the reqwest
// error; the reqwest message itself carries the URL, which must not be
// matched against.
fn categorize_error(error: &reqwest::Error) -> FailureKind {
    if error.is_timeout() {
        return FailureKind::Timeout;
    }
    if error.is_redirect() {
        return FailureKind::TooManyRedirects;
    }
    if !error.is_connect() {
        return FailureKind::Other;
    }

    if has_io_kind(error, std::io::ErrorKind::ConnectionRefused) {
        return FailureKind::Refused;
    }

    let causes = source_chain(error).to_lowercase();
    if causes.contains("dns error") || causes.contains("failed to lookup address") {
        FailureKind::Dns
    } else if causes.contains("certificate") || causes.contains("tls") || causes.contains("ssl") {
        FailureKind::Tls
    } else {
        FailureKind::Other
    }
}

// Messages of every error below `error`, joined with ": "
fn source_chain(error: &reqwest::Error) -> String {
    let mut parts = Vec::new();
    let mut source = error.source();
    while let Some(inner) = source {
        parts.push(inner.to_string());
        source = inner.source();
    }
    parts.join(": ")
}

// True if some io::Error in the source chain has this kind
fn has_io_kind(error: &reqwest::Error, kind: std::io::ErrorKind) -> bool {
    let mut source = error.source();
    while let Some(inner) = source {
        if let Some(io) = inner.downcast_ref::<std::io::Error>() {
            if io.kind() == kind {
                return true;
            }
        }
        source = inner.source();
    }
    false
}

fn not_probeable(url: &ParsedUrl) -> ProbeReport {
    ProbeReport::inconclusive(format!("nothing to probe for '{}:' URLs", url.scheme()))
}

/// Talks to the bookmarked site directly.
pub struct DirectProbe {
    client: Client,
}

impl DirectProbe {
    pub fn new(client: Client) -> Self {
        DirectProbe { client }
    }
}

#[async_trait]
impl Probe for DirectProbe {
    fn name(&self) -> &str {
        "direct"
    }

    async fn probe(&self, url: &ParsedUrl) -> Result<ProbeReport, ProbeError> {
        if !url.is_web() {
            return Ok(not_probeable(url));
        }

        // First, try a HEAD request (faster, no body download)
        let head_failure = match self.client.head(url.url().clone()).send().await {
            Ok(response) => {
                return Ok(ProbeReport::inconclusive(format!(
                    "host answered HEAD ({}), status not trusted",
                    response.status().as_u16()
                )))
            }
            Err(e) => categorize_error(&e),
        };

        // Some servers refuse HEAD outright, so give GET a chance too
        let get_failure = match self.client.get(url.url().clone()).send().await {
            Ok(response) => {
                return Ok(ProbeReport::inconclusive(format!(
                    "host answered GET ({}), status not trusted",
                    response.status().as_u16()
                )))
            }
            Err(e) => categorize_error(&e),
        };

        if head_failure.is_unreachable() && get_failure.is_unreachable() {
            Ok(ProbeReport::broken(format!(
                "unreachable: {}",
                get_failure.describe()
            )))
        } else {
            Ok(ProbeReport::inconclusive(get_failure.describe()))
        }
    }
}

// What the relay sends back:
//   { "contents": "<html>...", "status": { "http_code": 404, ... } }
#[derive(Debug, Default, Deserialize)]
struct RelayReply {
    #[serde(default)]
    contents: Option<String>,
    #[serde(default)]
    status: Option<RelayStatus>,
}

#[derive(Debug, Default, Deserialize)]
struct RelayStatus {
    #[serde(default)]
    http_code: Option<u16>,
}

/// Fetches the page through a third-party relay that reports the status.
pub struct RelayProbe {
    client: Client,
    endpoint: String,
    not_found_phrases: Vec<String>,
}

impl RelayProbe {
    pub fn new(client: Client, endpoint: String, not_found_phrases: Vec<String>) -> Self {
        RelayProbe {
            client,
            endpoint,
            not_found_phrases: not_found_phrases
                .into_iter()
                .map(|p| p.to_lowercase())
                .collect(),
        }
    }

    // Substitutes the URL-encoded target into the endpoint template
    fn relay_url(&self, target: &str) -> String {
        let encoded: String = form_urlencoded::byte_serialize(target.as_bytes()).collect();
        self.endpoint.replace(URL_PLACEHOLDER, &encoded)
    }

    fn interpret(&self, reply: &RelayReply) -> ProbeReport {
        let code = reply
            .status
            .as_ref()
            .and_then(|s| s.http_code)
            .filter(|code| *code != 0);

        let code = match code {
            Some(code) => code,
            None => return ProbeReport::inconclusive("relay could not resolve a status"),
        };

        if (400..=499).contains(&code) {
            return ProbeReport::broken(format!("HTTP {} via relay", code));
        }

        if let Some(contents) = reply.contents.as_deref() {
            let text = page_text(contents);
            if let Some(phrase) = self
                .not_found_phrases
                .iter()
                .find(|p| text.contains(p.as_str()))
            {
                return ProbeReport::broken(format!(
                    "HTTP {} via relay, page says '{}'",
                    code, phrase
                ));
            }
        }

        ProbeReport::alive(format!("HTTP {} via relay", code))
    }
}

#[async_trait]
impl Probe for RelayProbe {
    fn name(&self) -> &str {
        "relay"
    }

    async fn probe(&self, url: &ParsedUrl) -> Result<ProbeReport, ProbeError> {
        if !url.is_web() {
            return Ok(not_probeable(url));
        }

        let response = self.client.get(self.relay_url(url.raw())).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::Relay(format!(
                "relay answered HTTP {}",
                status.as_u16()
            )));
        }

        let reply: RelayReply = response
            .json()
            .await
            .map_err(|e| ProbeError::Relay(format!("unreadable relay reply: {}", e)))?;

        Ok(self.interpret(&reply))
    }
}

// Pulls the title and visible body text out of a page, lowercased and with
// whitespace collapsed, so phrases match across line breaks
fn page_text(html: &str) -> String {
    let document = Html::parse_document(html);

    let selector = match Selector::parse("title, body") {
        Ok(selector) => selector,
        Err(_) => return String::new(),
    };

    document
        .select(&selector)
        .flat_map(|element| element.text())
        .flat_map(|text| text.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Asks the bookmark's origin for its favicon.
pub struct FaviconProbe {
    client: Client,
}

impl FaviconProbe {
    pub fn new(client: Client) -> Self {
        FaviconProbe { client }
    }
}

#[async_trait]
impl Probe for FaviconProbe {
    fn name(&self) -> &str {
        "favicon"
    }

    async fn probe(&self, url: &ParsedUrl) -> Result<ProbeReport, ProbeError> {
        if !url.is_web() {
            return Ok(not_probeable(url));
        }

        let favicon = match url.url().join("/favicon.ico") {
            Ok(favicon) => favicon,
            Err(e) => return Ok(ProbeReport::inconclusive(format!("no favicon URL: {}", e))),
        };

        // Any answer, even a 404, proves the origin is up
        let response = self.client.get(favicon).send().await?;
        Ok(ProbeReport::alive(format!(
            "origin answered favicon request ({})",
            response.status().as_u16()
        )))
    }
}

// -----------------------------------------------------------------------------
// NOTES:
//
// 1. Why is the direct probe so reluctant?
//    - A 403 or 503 from the site itself is very often a live page behind
//      bot protection; deleting it would be a false positive
//    - A DNS failure on both HEAD and GET is the one thing that really
//      means "there is nothing here any more"
//
// 2. Why can a 200 through the relay still be broken?
//    - Plenty of sites serve their "page not found" page with status 200
//    - The phrase list is configurable (Config::not_found_phrases)
// -----------------------------------------------------------------------------
