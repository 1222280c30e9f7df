// src/bookmarks/store.rs
// =============================================================================
// This module is the bridge to wherever the bookmarks actually live.
//
// The checker never owns bookmarks; it only needs a few things from the
// outside world:
// - get_all(): every bookmark (folders left out), in tree order
// - remove(id): delete one bookmark
// - move_to(id, folder): file a bookmark under another folder
//
// BookmarkStore is the trait for that contract. JsonBookmarkStore implements
// it on top of a Chromium-style `Bookmarks` file:
//
//   {
//     "checksum": "...",
//     "roots": {
//       "bookmark_bar": { "type": "folder", "children": [ ... ] },
//       "other":        { "type": "folder", "children": [ ... ] },
//       "synced":       { "type": "folder", "children": [ ... ] }
//     },
//     "version": 1
//   }
//
// where every node is either { "type": "folder", "children": [...] } or
// { "type": "url", "id": "5", "name": "Rust", "url": "https://..." }.
//
// Rust concepts:
// - async_trait: async methods on a trait
// - serde_json::Value: edit a JSON document without modelling every field
// - tokio::sync::Mutex: a lock that can be held across .await points
// =============================================================================

use crate::error::StoreError;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::sync::Mutex;
use tracing::debug;

// Roots are visited in the order the browser shows them
const ROOT_ORDER: &[&str] = &["bookmark_bar", "other", "synced"];

/// One bookmark, as read from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UrlRecord {
    /// Opaque identifier assigned by the store
    pub id: String,
    pub title: String,
    pub url: String,
}

/// The external bookmark collaborator.
#[async_trait]
pub trait BookmarkStore: Send + Sync {
    /// Every bookmark, depth-first in tree order, folders excluded
    async fn get_all(&self) -> Result<Vec<UrlRecord>, StoreError>;

    /// Removes a single bookmark by id
    async fn remove(&self, id: &str) -> Result<(), StoreError>;

    /// Moves a bookmark to the end of another folder
    async fn move_to(&self, id: &str, folder_id: &str) -> Result<(), StoreError>;
}

/// A BookmarkStore backed by a Chromium `Bookmarks` JSON file.
pub struct JsonBookmarkStore {
    path: PathBuf,
    tree: Mutex<Value>,
}

impl JsonBookmarkStore {
    // Reads and parses the bookmarks file
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        let raw = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;

        let tree: Value = serde_json::from_str(&raw).map_err(|source| StoreError::Parse {
            path: path.clone(),
            source,
        })?;

        if !tree.get("roots").map_or(false, Value::is_object) {
            return Err(StoreError::Format {
                path,
                reason: "missing \"roots\" object".to_string(),
            });
        }

        Ok(JsonBookmarkStore {
            path,
            tree: Mutex::new(tree),
        })
    }

    // Applies `change` to a copy of the tree and writes the copy out
    //
    // The in-memory tree is only replaced once the file is on disk, so a
    // failed edit or a failed write leaves both exactly as they were.
    async fn edit<F>(&self, change: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Value) -> Result<(), StoreError> + Send,
    {
        let mut tree = self.tree.lock().await;
        let mut updated = tree.clone();

        change(&mut updated)?;
        self.save(&mut updated).await?;

        *tree = updated;
        Ok(())
    }

    // Writes a tree to disk
    //
    // The browser keeps a checksum of the file; after an edit it no longer
    // matches, so we drop it and let the browser compute a new one.
    async fn save(&self, tree: &mut Value) -> Result<(), StoreError> {
        if let Some(object) = tree.as_object_mut() {
            object.remove("checksum");
        }

        let text = serde_json::to_string_pretty(tree).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })?;

        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomically(&path, &text))
            .await
            .map_err(std::io::Error::from)
            .and_then(|written| written)
            .map_err(|source| StoreError::Io {
                path: self.path.clone(),
                source,
            })
    }
}

#[async_trait]
impl BookmarkStore for JsonBookmarkStore {
    async fn get_all(&self) -> Result<Vec<UrlRecord>, StoreError> {
        let tree = self.tree.lock().await;
        let mut records = Vec::new();

        if let Some(roots) = tree.get("roots").and_then(Value::as_object) {
            for name in ROOT_ORDER {
                if let Some(root) = roots.get(*name) {
                    collect_urls(root, &mut records);
                }
            }
            // Any root this version of the format doesn't know about
            for (name, root) in roots {
                if !ROOT_ORDER.contains(&name.as_str()) {
                    collect_urls(root, &mut records);
                }
            }
        }

        Ok(records)
    }

    async fn remove(&self, id: &str) -> Result<(), StoreError> {
        self.edit(|tree| {
            roots_mut(tree)
                .find_map(|root| take_url(root, id))
                .map(|_| ())
                .ok_or_else(|| not_found(id))
        })
        .await?;

        debug!(id, path = %self.path.display(), "removed bookmark");
        Ok(())
    }

    async fn move_to(&self, id: &str, folder_id: &str) -> Result<(), StoreError> {
        self.edit(|tree| {
            let node = roots_mut(tree)
                .find_map(|root| take_url(root, id))
                .ok_or_else(|| not_found(id))?;
            let children = roots_mut(tree)
                .find_map(|root| folder_children_mut(root, folder_id))
                .ok_or_else(|| not_found(folder_id))?;
            children.push(node);
            Ok(())
        })
        .await?;

        debug!(id, folder_id, path = %self.path.display(), "moved bookmark");
        Ok(())
    }
}

// Writes to a temp file next to `path`, then renames it over `path`
fn write_atomically(path: &Path, contents: &str) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(contents.as_bytes())?;
    if let Ok(metadata) = std::fs::metadata(path) {
        file.as_file().set_permissions(metadata.permissions())?;
    }
    file.as_file().sync_all()?;

    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

fn not_found(id: &str) -> StoreError {
    StoreError::NotFound { id: id.to_string() }
}

fn roots_mut(tree: &mut Value) -> impl Iterator<Item = &mut Value> {
    tree.get_mut("roots")
        .and_then(Value::as_object_mut)
        .into_iter()
        .flat_map(|roots| roots.values_mut())
}

fn is_url_node(node: &Value) -> bool {
    node.get("type").and_then(Value::as_str) == Some("url") || node.get("url").is_some()
}

fn node_str<'a>(node: &'a Value, key: &str) -> &'a str {
    node.get(key).and_then(Value::as_str).unwrap_or("")
}

// Depth-first walk that keeps the order of the children arrays
fn collect_urls(node: &Value, out: &mut Vec<UrlRecord>) {
    if is_url_node(node) {
        out.push(UrlRecord {
            id: node_str(node, "id").to_string(),
            title: node_str(node, "name").to_string(),
            url: node_str(node, "url").to_string(),
        });
        return;
    }

    if let Some(children) = node.get("children").and_then(Value::as_array) {
        for child in children {
            collect_urls(child, out);
        }
    }
}

// Takes the url node with this id out of the tree below `node`
// Folders are never taken, even when their id matches.
fn take_url(node: &mut Value, id: &str) -> Option<Value> {
    let children = node.get_mut("children")?.as_array_mut()?;

    if let Some(index) = children
        .iter()
        .position(|child| is_url_node(child) && node_str(child, "id") == id)
    {
        return Some(children.remove(index));
    }

    children.iter_mut().find_map(|child| take_url(child, id))
}

// The children of the folder with this id, `node` included
fn folder_children_mut<'a>(node: &'a mut Value, id: &str) -> Option<&'a mut Vec<Value>> {
    let matches = node_str(node, "id") == id;
    let children = node.get_mut("children")?.as_array_mut()?;

    if matches {
        return Some(children);
    }

    children
        .iter_mut()
        .find_map(|child| folder_children_mut(child, id))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const FIXTURE: &str = r#"{
        "checksum": "0123456789abcdef",
        "roots": {
            "bookmark_bar": {
                "id": "1", "name": "Bookmarks bar", "type": "folder",
                "children": [
                    { "id": "5", "name": "Rust", "type": "url", "url": "https://www.rust-lang.org/" },
                    { "id": "6", "name": "Dev", "type": "folder", "children": [
                        { "id": "7", "name": "Local app", "type": "url", "url": "http://localhost/foo" },
                        { "id": "8", "name": "Crates", "type": "url", "url": "https://crates.io/" }
                    ]}
                ]
            },
            "other": {
                "id": "2", "name": "Other bookmarks", "type": "folder",
                "children": [
                    { "id": "9", "name": "Docs example", "type": "url", "url": "https://example.com/test" }
                ]
            },
            "synced": {
                "id": "3", "name": "Mobile bookmarks", "type": "folder", "children": []
            }
        },
        "version": 1
    }"#;

    pub(crate) fn fixture_file() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(FIXTURE.as_bytes()).unwrap();
        file
    }

    fn ids(records: &[UrlRecord]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_get_all_flattens_in_tree_order() {
        let file = fixture_file();
        let store = JsonBookmarkStore::open(file.path()).await.unwrap();

        let records = store.get_all().await.unwrap();
        assert_eq!(ids(&records), vec!["5", "7", "8", "9"]);
        assert_eq!(records[0].title, "Rust");
        assert_eq!(records[1].url, "http://localhost/foo");
    }

    #[tokio::test]
    async fn test_remove_rewrites_file() {
        let file = fixture_file();
        let store = JsonBookmarkStore::open(file.path()).await.unwrap();

        store.remove("7").await.unwrap();
        assert_eq!(ids(&store.get_all().await.unwrap()), vec!["5", "8", "9"]);

        // A fresh store sees the change, and the stale checksum is gone
        let reopened = JsonBookmarkStore::open(file.path()).await.unwrap();
        assert_eq!(ids(&reopened.get_all().await.unwrap()), vec!["5", "8", "9"]);
        let text = std::fs::read_to_string(file.path()).unwrap();
        assert!(!text.contains("checksum"));
    }

    #[tokio::test]
    async fn test_remove_unknown_or_folder_id_fails() {
        let file = fixture_file();
        let store = JsonBookmarkStore::open(file.path()).await.unwrap();

        assert!(matches!(
            store.remove("404").await,
            Err(StoreError::NotFound { .. })
        ));
        assert!(matches!(
            store.remove("6").await,
            Err(StoreError::NotFound { .. })
        ));
        assert_eq!(store.get_all().await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_open_rejects_bad_files() {
        let mut not_json = NamedTempFile::new().unwrap();
        not_json.write_all(b"{ nope").unwrap();
        assert!(matches!(
            JsonBookmarkStore::open(not_json.path()).await,
            Err(StoreError::Parse { .. })
        ));

        let mut no_roots = NamedTempFile::new().unwrap();
        no_roots.write_all(b"{\"version\": 1}").unwrap();
        assert!(matches!(
            JsonBookmarkStore::open(no_roots.path()).await,
            Err(StoreError::Format { .. })
        ));

        assert!(matches!(
            JsonBookmarkStore::open("/no/such/Bookmarks").await,
            Err(StoreError::Io { .. })
        ));
    }

    #[tokio::test]
    async fn test_remove_leaves_no_temp_files_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Bookmarks");
        std::fs::write(&path, FIXTURE).unwrap();
        let store = JsonBookmarkStore::open(&path).await.unwrap();

        store.remove("5").await.unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("Bookmarks")]);
    }

    #[tokio::test]
    async fn test_failed_save_keeps_the_bookmark() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Bookmarks");
        std::fs::write(&path, FIXTURE).unwrap();
        let store = JsonBookmarkStore::open(&path).await.unwrap();

        // A directory now sits where the file was, so writing back fails
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        assert!(matches!(
            store.remove("7").await,
            Err(StoreError::Io { .. })
        ));
        assert_eq!(ids(&store.get_all().await.unwrap()), vec!["5", "7", "8", "9"]);
    }

    #[tokio::test]
    async fn test_move_to_appends_to_folder() {
        let file = fixture_file();
        let store = JsonBookmarkStore::open(file.path()).await.unwrap();

        store.move_to("8", "2").await.unwrap();
        assert_eq!(ids(&store.get_all().await.unwrap()), vec!["5", "7", "9", "8"]);

        let reopened = JsonBookmarkStore::open(file.path()).await.unwrap();
        assert_eq!(ids(&reopened.get_all().await.unwrap()), vec!["5", "7", "9", "8"]);
    }

    #[tokio::test]
    async fn test_move_to_nested_folder() {
        let file = fixture_file();
        let store = JsonBookmarkStore::open(file.path()).await.unwrap();

        store.move_to("9", "6").await.unwrap();
        assert_eq!(ids(&store.get_all().await.unwrap()), vec!["5", "7", "8", "9"]);

        let text = std::fs::read_to_string(file.path()).unwrap();
        let tree: Value = serde_json::from_str(&text).unwrap();
        let other = &tree["roots"]["other"]["children"];
        assert_eq!(other.as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_move_to_rejects_unknown_ids() {
        let file = fixture_file();
        let store = JsonBookmarkStore::open(file.path()).await.unwrap();

        // Unknown bookmark, unknown folder, and a bookmark used as a folder
        for (id, folder) in [("404", "2"), ("8", "404"), ("8", "9"), ("6", "2")] {
            assert!(
                matches!(
                    store.move_to(id, folder).await,
                    Err(StoreError::NotFound { .. })
                ),
                "{} -> {}",
                id,
                folder
            );
        }

        // Nothing moved, not even the bookmark taken out before the
        // missing folder was noticed
        assert_eq!(ids(&store.get_all().await.unwrap()), vec!["5", "7", "8", "9"]);
        let text = std::fs::read_to_string(file.path()).unwrap();
        assert!(text.contains("checksum"));
    }
}
