// src/lib.rs
// =============================================================================
// Library root: everything except the command-line layer lives here so the
// checker can be reused (and tested) without going through main.rs.
//
// Control flow, top to bottom:
//   scan (bulk scan/delete)
//     -> checker::LinkPolicy (one verdict per bookmark)
//          -> checker::validate, checker::StaticRules, checker::ProbeChain
//   bookmarks (store + session) feeds records in and takes deletions out
// =============================================================================

pub mod bookmarks; // src/bookmarks/ - bookmark store and per-run session
pub mod checker; // src/checker/ - URL validation, rules, probes, policy
pub mod config; // src/config.rs - runtime configuration
pub mod error; // src/error.rs - typed errors
pub mod scan; // src/scan/ - bulk scan and bulk delete
