// src/checker/probe.rs
// =============================================================================
// The liveness probe chain.
//
// From a URL alone we cannot always tell whether a page is alive, so we ask
// several strategies in a fixed order:
//
//   1. direct probe   (talk to the site itself)
//   2. relay probe    (ask a third-party relay to fetch it for us)
//   3. favicon probe  (does the site's origin answer at all?)
//
// Each strategy answers Alive, Broken or Inconclusive. The first conclusive
// answer wins; if every strategy shrugs, the chain is Inconclusive too.
//
// Errors never leave this module: a probe that fails, or runs past the
// timeout, simply counts as Inconclusive and the chain moves on.
//
// Rust concepts:
// - Traits: Probe is the interface every strategy implements
// - async_trait: lets a trait have async methods
// - Box<dyn Probe>: a list of different strategy types behind one interface
// - tokio::time::timeout: puts an upper bound on any future
// =============================================================================

use super::validate::ParsedUrl;
use crate::error::ProbeError;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Tri-state answer of a single probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Alive,
    Broken,
    Inconclusive,
}

impl Verdict {
    pub fn is_conclusive(self) -> bool {
        !matches!(self, Verdict::Inconclusive)
    }
}

/// What a probe found, plus a human-readable note about why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub verdict: Verdict,
    pub detail: String,
}

impl ProbeReport {
    pub fn alive(detail: impl Into<String>) -> Self {
        ProbeReport {
            verdict: Verdict::Alive,
            detail: detail.into(),
        }
    }

    pub fn broken(detail: impl Into<String>) -> Self {
        ProbeReport {
            verdict: Verdict::Broken,
            detail: detail.into(),
        }
    }

    pub fn inconclusive(detail: impl Into<String>) -> Self {
        ProbeReport {
            verdict: Verdict::Inconclusive,
            detail: detail.into(),
        }
    }
}

/// One strategy for estimating whether a URL is reachable.
#[async_trait]
pub trait Probe: Send + Sync {
    /// Short name used in diagnostics ("direct", "relay", ...)
    fn name(&self) -> &str;

    /// Runs the probe. Returning Err is the same as Inconclusive.
    async fn probe(&self, url: &ParsedUrl) -> Result<ProbeReport, ProbeError>;
}

/// Final answer of the whole chain, with one reason per probe that ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainOutcome {
    pub verdict: Verdict,
    pub reasons: Vec<String>,
}

/// An ordered list of probes, tried until one is conclusive.
pub struct ProbeChain {
    probes: Vec<Box<dyn Probe>>,
    timeout: Duration,
}

impl ProbeChain {
    pub fn new(probes: Vec<Box<dyn Probe>>, timeout: Duration) -> Self {
        ProbeChain { probes, timeout }
    }

    /// A chain with no probes; always Inconclusive (used by --offline)
    pub fn empty() -> Self {
        ProbeChain::new(Vec::new(), Duration::from_secs(1))
    }

    // Runs the probes in order and stops at the first conclusive verdict
    pub async fn run(&self, url: &ParsedUrl) -> ChainOutcome {
        let mut reasons = Vec::with_capacity(self.probes.len());

        for probe in &self.probes {
            let report = self.run_one(probe.as_ref(), url).await;

            debug!(
                probe = probe.name(),
                url = url.raw(),
                verdict = ?report.verdict,
                detail = %report.detail,
                "probe finished"
            );
            reasons.push(format!("{}: {}", probe.name(), report.detail));

            if report.verdict.is_conclusive() {
                return ChainOutcome {
                    verdict: report.verdict,
                    reasons,
                };
            }
        }

        ChainOutcome {
            verdict: Verdict::Inconclusive,
            reasons,
        }
    }

    // Runs a single probe under the timeout and turns every failure into
    // an Inconclusive report
    async fn run_one(&self, probe: &dyn Probe, url: &ParsedUrl) -> ProbeReport {
        let result = match tokio::time::timeout(self.timeout, probe.probe(url)).await {
            Ok(result) => result,
            Err(_) => Err(ProbeError::Timeout(self.timeout)),
        };

        match result {
            Ok(report) => report,
            Err(e) => ProbeReport::inconclusive(e.to_string()),
        }
    }
}
