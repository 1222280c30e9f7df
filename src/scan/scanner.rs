// src/scan/scanner.rs
// =============================================================================
// Runs the link policy over a whole bookmark collection, and deletes the
// broken ones on request.
//
// How a scan works:
// 1. Every record becomes one classification task
// 2. At most `concurrency` tasks run at once (1 = strictly one by one)
// 3. Results come back in input order, whatever order the tasks finish in
// 4. A task that blows up counts as Alive and the scan carries on
//
// Deleting is just as forgiving: every id is tried on its own, a failure is
// logged and reported, and the rest still get deleted.
//
// Rust concepts:
// - Arc: shares the policy between spawned tasks
// - tokio::spawn + JoinError: a panic in one task doesn't take down the scan
// - StreamExt::buffered: bounded concurrency that keeps the original order
// =============================================================================

use crate::bookmarks::{BookmarkStore, UrlRecord};
use crate::checker::{AggregateResult, LinkPolicy, Liveness};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::task::{JoinError, JoinHandle};
use tracing::{info, warn};

/// Outcome of one scan pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanSummary {
    /// How many records were classified (always the input length)
    pub checked: usize,
    pub alive: usize,
    /// Broken records, in input order
    pub broken: Vec<AggregateResult>,
}

/// Outcome of a bulk delete.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeleteReport {
    pub deleted: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<DeleteFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteFailure {
    pub id: String,
    pub error: String,
}

// Classifies every record and collects the broken ones
//
// Parameters:
//   policy: shared link policy (cloned into each task)
//   records: the bookmarks to check, in display order
//   concurrency: how many classifications may run at once (min 1)
pub async fn scan_all(
    policy: Arc<LinkPolicy>,
    records: &[UrlRecord],
    concurrency: usize,
) -> ScanSummary {
    let tasks = records.iter().cloned().map(|record| {
        let policy = Arc::clone(&policy);
        async move {
            let fallback = record.clone();
            let task = AbortOnDrop(tokio::spawn(async move { policy.classify(&record).await }));
            match task.await {
                Ok(result) => result,
                Err(e) => isolated_failure(fallback, e),
            }
        }
    });

    // .buffered() (unlike .buffer_unordered()) yields results in the order
    // the futures were created, which is the input order
    let results: Vec<AggregateResult> = stream::iter(tasks)
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let checked = results.len();
    let broken: Vec<AggregateResult> = results.into_iter().filter(|r| r.is_broken()).collect();

    info!(checked, broken = broken.len(), "scan finished");

    ScanSummary {
        checked,
        alive: checked - broken.len(),
        broken,
    }
}

// A spawned task that is cancelled when its handle is dropped
//
// A plain JoinHandle detaches on drop, so dropping the scan would leave
// every in-flight classification running in the background.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Future for AbortOnDrop<T> {
    type Output = Result<T, JoinError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.0).poll(cx)
    }
}

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

// A classification task panicked or was cancelled
fn isolated_failure(record: UrlRecord, error: JoinError) -> AggregateResult {
    warn!(id = %record.id, url = %record.url, %error, "classification failed, assuming alive");

    AggregateResult {
        record,
        verdict: Liveness::Alive,
        reasons: vec![format!("classification failed ({}), assuming alive", error)],
    }
}

// Deletes every id independently
//
// Returns how many were deleted plus one entry per failed id. Nothing here
// is transactional: a failure halfway leaves the earlier deletions in place.
pub async fn delete_all(store: &dyn BookmarkStore, ids: &[String]) -> DeleteReport {
    let mut report = DeleteReport::default();

    for id in ids {
        match store.remove(id).await {
            Ok(()) => report.deleted += 1,
            Err(e) => {
                warn!(id = %id, error = %e, "failed to delete bookmark");
                report.failures.push(DeleteFailure {
                    id: id.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    report
}

// -----------------------------------------------------------------------------
// NOTES:
//
// 1. Why spawn a task per record instead of awaiting classify() directly?
//    - A panic inside a plain future would unwind through the whole scan
//    - tokio::spawn catches it and hands back a JoinError instead
//
// 2. Why buffered and not buffer_unordered?
//    - The summary must list broken bookmarks in the order the user sees
//      them; buffered keeps that order for free
//
// 3. Why AbortOnDrop?
//    - Dropping scan_all (a timeout, Ctrl-C) drops the task handles too,
//      and the tasks stop with it instead of probing on unobserved
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::{ParsedUrl, Probe, ProbeChain, ProbeReport};
    use crate::error::{ProbeError, StoreError};
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    // Broken for URLs containing "dead", panics on "boom", shrugs otherwise
    struct ScriptedProbe;

    #[async_trait]
    impl Probe for ScriptedProbe {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn probe(&self, url: &ParsedUrl) -> Result<ProbeReport, ProbeError> {
            if url.raw().contains("boom") {
                panic!("probe exploded");
            }
            if url.raw().contains("dead") {
                // Finish out of order to make sure ordering still holds
                tokio::time::sleep(Duration::from_millis(20)).await;
                return Ok(ProbeReport::broken("scripted dead"));
            }
            Ok(ProbeReport::inconclusive("scripted shrug"))
        }
    }

    fn policy() -> Arc<LinkPolicy> {
        let chain = ProbeChain::new(vec![Box::new(ScriptedProbe)], Duration::from_secs(5));
        Arc::new(LinkPolicy::from_config(&crate::config::Config::default(), chain))
    }

    fn record(id: &str, url: &str) -> UrlRecord {
        UrlRecord {
            id: id.to_string(),
            title: format!("Bookmark {}", id),
            url: url.to_string(),
        }
    }

    fn records() -> Vec<UrlRecord> {
        vec![
            record("a", "https://dead.rust-lang.org/one"),
            record("b", "https://github.com/foo"),
            record("c", "http://localhost/foo"),
            record("d", "not a url"),
            record("e", "https://crates.io/"),
            record("f", "https://dead.crates.io/two"),
        ]
    }

    fn broken_ids(summary: &ScanSummary) -> Vec<&str> {
        summary.broken.iter().map(|r| r.record.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_scan_counts_and_order() {
        let input = records();
        let summary = scan_all(policy(), &input, 4).await;

        assert_eq!(summary.checked, input.len());
        assert_eq!(summary.alive, 2);
        assert_eq!(broken_ids(&summary), vec!["a", "c", "d", "f"]);
    }

    #[tokio::test]
    async fn test_sequential_scan_matches_concurrent() {
        let input = records();
        let sequential = scan_all(policy(), &input, 1).await;
        let concurrent = scan_all(policy(), &input, 8).await;

        assert_eq!(broken_ids(&sequential), broken_ids(&concurrent));
    }

    #[tokio::test]
    async fn test_broken_is_subset_of_input() {
        let input = records();
        let summary = scan_all(policy(), &input, 3).await;

        let input_ids: HashSet<_> = input.iter().map(|r| r.id.as_str()).collect();
        assert!(broken_ids(&summary).iter().all(|id| input_ids.contains(id)));
    }

    #[tokio::test]
    async fn test_panicking_probe_is_isolated() {
        let input = vec![
            record("1", "https://boom.rust-lang.org/"),
            record("2", "https://dead.rust-lang.org/"),
        ];
        let summary = scan_all(policy(), &input, 2).await;

        assert_eq!(summary.checked, 2);
        assert_eq!(summary.alive, 1);
        assert_eq!(broken_ids(&summary), vec!["2"]);
    }

    #[tokio::test]
    async fn test_empty_scan() {
        let summary = scan_all(policy(), &[], 4).await;
        assert_eq!(summary.checked, 0);
        assert!(summary.broken.is_empty());
    }

    // Sets its flag when dropped, which happens when its task is aborted
    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    // Never answers; holds a DropFlag for as long as it runs
    struct HangingProbe {
        dropped: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Probe for HangingProbe {
        fn name(&self) -> &str {
            "hanging"
        }

        async fn probe(&self, _url: &ParsedUrl) -> Result<ProbeReport, ProbeError> {
            let _flag = DropFlag(Arc::clone(&self.dropped));
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(ProbeReport::alive("finished after all"))
        }
    }

    #[tokio::test]
    async fn test_dropping_the_scan_stops_its_tasks() {
        let dropped = Arc::new(AtomicBool::new(false));
        let probe = HangingProbe {
            dropped: Arc::clone(&dropped),
        };
        let chain = ProbeChain::new(vec![Box::new(probe)], Duration::from_secs(60));
        let policy = Arc::new(LinkPolicy::from_config(&crate::config::Config::default(), chain));
        let input = vec![record("1", "https://github.com/foo")];

        let scan = scan_all(policy, &input, 1);
        assert!(tokio::time::timeout(Duration::from_millis(50), scan)
            .await
            .is_err());

        // Abort is asynchronous; give the runtime a moment to drop the task
        for _ in 0..50 {
            if dropped.load(Ordering::SeqCst) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(dropped.load(Ordering::SeqCst));
    }

    // In-memory store where some ids refuse to be deleted
    struct FlakyStore {
        records: Mutex<Vec<UrlRecord>>,
        stuck: Vec<String>,
    }

    #[async_trait]
    impl BookmarkStore for FlakyStore {
        async fn get_all(&self) -> Result<Vec<UrlRecord>, StoreError> {
            Ok(self.records.lock().unwrap().clone())
        }

        async fn remove(&self, id: &str) -> Result<(), StoreError> {
            if self.stuck.iter().any(|s| s == id) {
                return Err(StoreError::NotFound { id: id.to_string() });
            }
            let mut records = self.records.lock().unwrap();
            let before = records.len();
            records.retain(|r| r.id != id);
            if records.len() == before {
                return Err(StoreError::NotFound { id: id.to_string() });
            }
            Ok(())
        }

        async fn move_to(&self, id: &str, _folder_id: &str) -> Result<(), StoreError> {
            Err(StoreError::NotFound { id: id.to_string() })
        }
    }

    #[tokio::test]
    async fn test_delete_all_continues_past_failures() {
        let store = FlakyStore {
            records: Mutex::new(vec![
                record("1", "https://dead.rust-lang.org/"),
                record("2", "https://dead.crates.io/"),
            ]),
            stuck: vec!["1".to_string()],
        };

        let report = delete_all(&store, &["1".to_string(), "2".to_string()]).await;

        assert_eq!(report.deleted, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].id, "1");

        let left = store.get_all().await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].id, "1");
    }
}
