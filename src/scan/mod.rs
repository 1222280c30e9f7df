// src/scan/mod.rs
// =============================================================================
// This module handles bulk operations over a whole bookmark collection.
//
// Features:
// - scan_all: classify every bookmark with bounded concurrency
// - delete_all: remove a list of bookmarks, one failure at a time
// =============================================================================

mod scanner;

pub use scanner::{delete_all, scan_all, DeleteReport, ScanSummary};
