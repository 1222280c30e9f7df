// src/error.rs
// =============================================================================
// Typed errors for the checker and the bookmark store.
//
// The application layer (main.rs) still uses anyhow::Result, but the pieces
// underneath it return these enums so callers can match on what went wrong:
// - UrlError: the bookmark URL could not be parsed at all
// - ProbeError: a network probe failed (never escapes the probe chain)
// - StoreError: the bookmark store could not be read or changed
//
// Rust concepts:
// - thiserror: derive macro that writes the Display/Error impls for us
// - #[from]: lets the ? operator convert one error type into another
// =============================================================================

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// The URL Validator's only failure mode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlError {
    /// The string does not parse as an absolute URL
    #[error("malformed URL '{raw}': {reason}")]
    Malformed { raw: String, reason: String },
}

/// Failures inside a single probe strategy.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Network-level failure talking to the target or the relay
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// The relay answered, but not with something we can read
    #[error("relay reply unusable: {0}")]
    Relay(String),

    /// The probe did not finish within the configured budget
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),
}

/// Failures of the external bookmark store (the "host" side).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access bookmarks file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("bookmarks file {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("bookmarks file {path} has an unexpected layout: {reason}")]
    Format { path: PathBuf, reason: String },

    #[error("no bookmark with id {id}")]
    NotFound { id: String },
}
