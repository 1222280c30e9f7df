// src/bookmarks/session.rs
// =============================================================================
// A snapshot of the bookmark store for one run of the tool.
//
// Instead of keeping a global bookmark cache around, every command loads a
// fresh BookmarkSession from the store and passes it to whatever needs it.
// Loading again (after a delete, say) simply builds a new session.
//
// Rust concepts:
// - Borrowing: search() hands out &UrlRecord, no copies
// - Iterator adaptors: filter() + collect()
// =============================================================================

use super::store::{BookmarkStore, UrlRecord};
use crate::error::StoreError;

#[derive(Debug, Clone, Default)]
pub struct BookmarkSession {
    records: Vec<UrlRecord>,
}

impl BookmarkSession {
    pub async fn load(store: &dyn BookmarkStore) -> Result<Self, StoreError> {
        Ok(BookmarkSession {
            records: store.get_all().await?,
        })
    }

    pub fn from_records(records: Vec<UrlRecord>) -> Self {
        BookmarkSession { records }
    }

    pub fn records(&self) -> &[UrlRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    // Case-insensitive substring match on title or URL
    //
    // A blank term matches everything, like an empty search box.
    pub fn search(&self, term: &str) -> Vec<&UrlRecord> {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return self.records.iter().collect();
        }

        self.records
            .iter()
            .filter(|r| {
                r.title.to_lowercase().contains(&term) || r.url.to_lowercase().contains(&term)
            })
            .collect()
    }
}
