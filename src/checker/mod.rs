// src/checker/mod.rs
// =============================================================================
// This module contains all link checking logic.
//
// Submodules (leaf to root):
// - validate: parses a bookmark URL or rejects it as malformed
// - rules: static "obviously broken" rules, no network access
// - probe: the Probe trait, the tri-state Verdict and the ProbeChain
// - http: the network probes (direct, relay, favicon)
// - policy: combines all of the above into one Alive/Broken answer
//
// This file (mod.rs) is the module root - it ties everything together and
// exports the public API that other parts of our application can use.
// =============================================================================

mod http;
mod policy;
mod probe;
mod rules;
mod validate;

// Re-export public items from submodules
// This lets users write `checker::LinkPolicy` instead of
// `checker::policy::LinkPolicy`
pub use http::{build_client, standard_chain, DirectProbe, FaviconProbe, RelayProbe};
pub use policy::{AggregateResult, LinkPolicy, Liveness};
pub use probe::{ChainOutcome, Probe, ProbeChain, ProbeReport, Verdict};
pub use rules::{StaticRules, StaticVerdict};
pub use validate::{validate, ParsedUrl};
