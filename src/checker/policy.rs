// src/checker/policy.rs
// =============================================================================
// Turns validator + static rules + probe chain into one yes/no answer.
//
// The decision for one bookmark goes like this:
//   1. URL doesn't parse            -> Broken
//   2. A static rule matches        -> Broken (no network traffic at all)
//   3. Probe chain says Alive/Broken -> that
//   4. Probe chain is Inconclusive  -> Alive
//
// Step 4 is the conservative default: the result feeds a bulk delete, so
// ambiguous evidence must never mark a bookmark broken.
//
// Rust concepts:
// - Two enums: Verdict has three states, Liveness only two, so the type
//   system guarantees an AggregateResult is never "inconclusive"
// =============================================================================

use super::probe::{ProbeChain, Verdict};
use super::rules::{StaticRules, StaticVerdict};
use super::validate::validate;
use crate::bookmarks::UrlRecord;
use crate::config::Config;
use serde::Serialize;
use tracing::debug;

/// Final, binary answer for one bookmark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Liveness {
    Alive,
    Broken,
}

/// The checked bookmark, its verdict and how we got there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateResult {
    #[serde(flatten)]
    pub record: UrlRecord,
    pub verdict: Liveness,
    /// Diagnostics in the order they were produced
    pub reasons: Vec<String>,
}

impl AggregateResult {
    pub fn is_broken(&self) -> bool {
        self.verdict == Liveness::Broken
    }
}

/// The aggregate policy: owns the static rules and the probe chain.
pub struct LinkPolicy {
    rules: StaticRules,
    chain: ProbeChain,
}

impl LinkPolicy {
    pub fn new(rules: StaticRules, chain: ProbeChain) -> Self {
        LinkPolicy { rules, chain }
    }

    pub fn from_config(config: &Config, chain: ProbeChain) -> Self {
        LinkPolicy::new(StaticRules::from_config(config), chain)
    }

    // Classifies a single bookmark
    pub async fn classify(&self, record: &UrlRecord) -> AggregateResult {
        let (verdict, reasons) = self.decide(&record.url).await;

        debug!(id = %record.id, url = %record.url, ?verdict, "classified");

        AggregateResult {
            record: record.clone(),
            verdict,
            reasons,
        }
    }

    async fn decide(&self, raw: &str) -> (Liveness, Vec<String>) {
        let parsed = match validate(raw) {
            Ok(parsed) => parsed,
            Err(e) => return (Liveness::Broken, vec![e.to_string()]),
        };

        if let StaticVerdict::Broken(reason) = self.rules.classify(&parsed) {
            return (Liveness::Broken, vec![reason]);
        }

        let outcome = self.chain.run(&parsed).await;
        let mut reasons = outcome.reasons;

        let liveness = match outcome.verdict {
            Verdict::Alive => Liveness::Alive,
            Verdict::Broken => Liveness::Broken,
            Verdict::Inconclusive => {
                reasons.push("no conclusive evidence, assuming alive".to_string());
                Liveness::Alive
            }
        };

        (liveness, reasons)
    }
}
