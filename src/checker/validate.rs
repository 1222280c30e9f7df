// src/checker/validate.rs
// =============================================================================
// This module is the first gate every bookmark URL goes through.
//
// A bookmark URL that does not even parse can never point at a live page, so
// the caller treats UrlError::Malformed as a conclusive "broken" verdict.
//
// We lean on the `url` crate (WHATWG URL parsing, same rules a browser uses)
// and wrap the result in ParsedUrl so the rest of the checker can only ever
// see URLs that already passed this step.
//
// Rust concepts:
// - Newtype pattern: ParsedUrl wraps url::Url to mark "already validated"
// - Result<T, E>: validation either succeeds or says why it failed
// =============================================================================

use crate::error::UrlError;
use url::Url;

/// A URL that parsed successfully.
///
/// Only `validate` can build one, so holding a ParsedUrl means the string
/// was well-formed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedUrl {
    raw: String,
    url: Url,
}

impl ParsedUrl {
    /// The string as it was stored in the bookmark (trimmed)
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }

    /// True for the schemes our network probes know how to talk to
    pub fn is_web(&self) -> bool {
        matches!(self.url.scheme(), "http" | "https")
    }
}

// Parses a raw bookmark URL
//
// Leading/trailing whitespace is ignored (bookmark titles and URLs copied
// from web pages often carry a stray space), everything else must parse.
//
// Examples:
//   "https://github.com/foo" -> Ok
//   "not a url"              -> Err(Malformed)
//   ""                       -> Err(Malformed)
pub fn validate(raw: &str) -> Result<ParsedUrl, UrlError> {
    let trimmed = raw.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Malformed {
            raw: raw.to_string(),
            reason: "empty URL".to_string(),
        });
    }

    let url = Url::parse(trimmed).map_err(|e| UrlError::Malformed {
        raw: raw.to_string(),
        reason: e.to_string(),
    })?;

    Ok(ParsedUrl {
        raw: trimmed.to_string(),
        url,
    })
}
