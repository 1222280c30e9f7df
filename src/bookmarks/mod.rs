// src/bookmarks/mod.rs
// =============================================================================
// This module handles the bookmarks themselves.
//
// Submodules:
// - store: the BookmarkStore trait and the JSON-file implementation
// - session: a per-run snapshot of the store with search
// =============================================================================

mod session;
mod store;

pub use session::BookmarkSession;
pub use store::{BookmarkStore, JsonBookmarkStore, UrlRecord};
