//! Store fixtures and builders for remote records.

use readlist_core::{Database, RemoteEntry, RemoteId, RemoteList, Timestamp};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// A test store with automatic cleanup.
pub struct TestStore {
    /// The store, shareable with sync engines.
    pub db: Arc<Database>,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: Option<TempDir>,
}

impl TestStore {
    /// Creates a new in-memory store.
    pub fn memory() -> Self {
        Self {
            db: Arc::new(Database::open_in_memory().expect("Failed to open in-memory store")),
            _temp_dir: None,
        }
    }

    /// Creates a new store in a temporary directory.
    pub fn file() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db = Database::open(&temp_dir.path().join("store")).expect("Failed to open file store");
        Self {
            db: Arc::new(db),
            _temp_dir: Some(temp_dir),
        }
    }

    /// Returns the store directory if file-based, None if in-memory.
    pub fn path(&self) -> Option<PathBuf> {
        self._temp_dir.as_ref().map(|d| d.path().join("store"))
    }

    /// Closes and reopens a file-based store, returning the new handle.
    ///
    /// Panics if the store is in memory or another handle is still alive.
    pub fn reopen(self) -> Self {
        let path = self.path().expect("Only file stores can be reopened");
        let temp_dir = self._temp_dir;
        drop(
            Arc::try_unwrap(self.db).expect("Store handle still shared; drop engines first"),
        );
        let db = Database::open(&path).expect("Failed to reopen file store");
        Self {
            db: Arc::new(db),
            _temp_dir: temp_dir,
        }
    }
}

impl std::ops::Deref for TestStore {
    type Target = Database;

    fn deref(&self) -> &Self::Target {
        &self.db
    }
}

/// Runs a test with a temporary directory that outlives the closure's use.
pub fn with_temp_dir<F, R>(f: F) -> R
where
    F: FnOnce(&Path) -> R,
{
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    f(temp_dir.path())
}

/// Parses an ISO-8601 timestamp, panicking on bad input.
pub fn ts(value: &str) -> Timestamp {
    Timestamp::parse(value).expect("Invalid test timestamp")
}

/// Builds a live, non-default remote list.
pub fn remote_list(id: RemoteId, name: &str, updated: &str) -> RemoteList {
    RemoteList {
        id,
        name: name.to_string(),
        description: None,
        is_default: false,
        deleted: false,
        created: None,
        updated: ts(updated),
    }
}

/// Builds a remote list the service marks as default.
pub fn default_remote_list(id: RemoteId, name: &str, updated: &str) -> RemoteList {
    RemoteList {
        is_default: true,
        ..remote_list(id, name, updated)
    }
}

/// Builds a remote entry as returned by a per-list fetch (no list ID).
pub fn remote_entry(id: RemoteId, title: &str, updated: &str) -> RemoteEntry {
    RemoteEntry {
        id,
        list_id: None,
        project: "https://en.wikipedia.org".to_string(),
        title: title.to_string(),
        deleted: false,
        created: None,
        updated: ts(updated),
    }
}

/// Builds a remote entry as returned by a delta fetch (carrying its list ID).
pub fn remote_entry_in(list_id: RemoteId, id: RemoteId, title: &str, updated: &str) -> RemoteEntry {
    RemoteEntry {
        list_id: Some(list_id),
        ..remote_entry(id, title, updated)
    }
}
