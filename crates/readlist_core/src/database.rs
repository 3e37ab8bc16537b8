//! The reading-list store.

use crate::backend::{FileBackend, MemoryBackend, SnapshotBackend};
use crate::config::StoreConfig;
use crate::error::{CoreError, CoreResult};
use crate::model::{ReadingList, ReadingListEntry};
use crate::snapshot::StoreState;
use crate::transaction::Transaction;
use parking_lot::RwLock;
use std::path::Path;
use std::sync::Arc;

/// A local store of reading lists and entries.
///
/// All writes go through a [`Transaction`]: a private working copy that is
/// published as a whole on [`Transaction::save`] or dropped without trace.
/// Readers never observe a partially applied transaction.
///
/// # Example
///
/// ```rust
/// use readlist_core::Database;
///
/// let db = Database::open_in_memory().unwrap();
/// let mut txn = db.begin();
/// txn.set_value("greeting", "hello");
/// txn.save().unwrap();
/// assert_eq!(db.get_value("greeting").as_deref(), Some("hello"));
/// ```
pub struct Database {
    config: StoreConfig,
    backend: Arc<dyn SnapshotBackend>,
    state: RwLock<Arc<StoreState>>,
}

impl Database {
    /// Opens an ephemeral in-memory store.
    pub fn open_in_memory() -> CoreResult<Self> {
        Self::with_backend(StoreConfig::default(), Arc::new(MemoryBackend::new()))
    }

    /// Opens or creates a store directory with the default configuration.
    pub fn open(path: &Path) -> CoreResult<Self> {
        Self::open_with_config(path, StoreConfig::default())
    }

    /// Opens or creates a store directory.
    ///
    /// The directory stays locked until the database is dropped.
    pub fn open_with_config(path: &Path, config: StoreConfig) -> CoreResult<Self> {
        let backend = FileBackend::open(path, config.create_if_missing)?;
        Self::with_backend(config, Arc::new(backend))
    }

    /// Opens a store over an arbitrary backend.
    ///
    /// A store without a snapshot is initialized with the default list.
    pub fn with_backend(config: StoreConfig, backend: Arc<dyn SnapshotBackend>) -> CoreResult<Self> {
        let state = match backend.load()? {
            Some(bytes) => StoreState::decode(&bytes)?,
            None => StoreState::default(),
        };

        let db = Self {
            config,
            backend,
            state: RwLock::new(Arc::new(state)),
        };
        db.ensure_default_list()?;
        Ok(db)
    }

    fn ensure_default_list(&self) -> CoreResult<()> {
        let defaults = self.state.read().lists.values().filter(|l| l.is_default).count();
        match defaults {
            0 => {
                let mut txn = self.begin();
                txn.insert_list(ReadingList::new_default(&self.config.default_list_name))?;
                txn.save()?;
                tracing::debug!(name = %self.config.default_list_name, "created default reading list");
                Ok(())
            }
            1 => Ok(()),
            n => Err(CoreError::invalid_operation(format!(
                "store has {n} default lists"
            ))),
        }
    }

    /// Returns the store configuration.
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Begins a transaction over the current committed state.
    #[must_use]
    pub fn begin(&self) -> Transaction<'_> {
        let snapshot = Arc::clone(&self.state.read());
        Transaction::new(self, (*snapshot).clone())
    }

    /// Executes a function within a transaction.
    ///
    /// The transaction is saved if the function returns `Ok` and left
    /// changes; otherwise it is discarded.
    pub fn transaction<F, T>(&self, f: F) -> CoreResult<T>
    where
        F: FnOnce(&mut Transaction<'_>) -> CoreResult<T>,
    {
        let mut txn = self.begin();
        let value = f(&mut txn)?;
        if txn.has_changes() {
            txn.save()?;
        }
        Ok(value)
    }

    /// Publishes a transaction's working state.
    pub(crate) fn commit(&self, mut working: StoreState, base_version: u64) -> CoreResult<u64> {
        let mut current = self.state.write();
        if current.version != base_version {
            return Err(CoreError::TransactionConflict {
                expected: base_version,
                actual: current.version,
            });
        }

        working.version = base_version + 1;
        self.backend.store(&working.encode()?)?;

        let version = working.version;
        *current = Arc::new(working);
        Ok(version)
    }

    /// Returns the committed version.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.state.read().version
    }

    /// Returns a copy of the committed state.
    #[must_use]
    pub fn snapshot(&self) -> StoreState {
        (**self.state.read()).clone()
    }

    /// Returns all committed lists.
    #[must_use]
    pub fn lists(&self) -> Vec<ReadingList> {
        self.state.read().lists.values().cloned().collect()
    }

    /// Returns all committed entries.
    #[must_use]
    pub fn entries(&self) -> Vec<ReadingListEntry> {
        self.state.read().entries.values().cloned().collect()
    }

    /// Returns the committed default list.
    #[must_use]
    pub fn default_list(&self) -> Option<ReadingList> {
        self.state.read().default_list().cloned()
    }

    /// Returns a committed key-value slot.
    #[must_use]
    pub fn get_value(&self, key: &str) -> Option<String> {
        self.state.read().values.get(key).cloned()
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("Database")
            .field("version", &state.version)
            .field("lists", &state.lists.len())
            .field("entries", &state.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn new_store_has_one_default_list() {
        let db = Database::open_in_memory().unwrap();
        let lists = db.lists();
        assert_eq!(lists.len(), 1);
        assert!(lists[0].is_default);
        assert_eq!(lists[0].name, "Saved");
        assert_eq!(lists[0].remote_id, None);
        assert_eq!(db.version(), 1);
    }

    #[test]
    fn custom_default_list_name() {
        let config = StoreConfig::default().with_default_list_name("Favorites");
        let db = Database::with_backend(config, Arc::new(MemoryBackend::new())).unwrap();
        assert_eq!(db.default_list().unwrap().name, "Favorites");
    }

    #[test]
    fn reopen_keeps_default_list() {
        let backend = Arc::new(MemoryBackend::new());
        let key = {
            let db = Database::with_backend(StoreConfig::default(), backend.clone()).unwrap();
            db.default_list().unwrap().key
        };

        let db = Database::with_backend(StoreConfig::default(), backend.clone()).unwrap();
        assert_eq!(db.lists().len(), 1);
        assert_eq!(db.default_list().unwrap().key, key);
        assert_eq!(backend.write_count(), 1);
    }

    #[test]
    fn transaction_closure_saves_changes() {
        let db = Database::open_in_memory().unwrap();
        db.transaction(|txn| {
            txn.insert_list(ReadingList::new_local("Later"))?;
            Ok(())
        })
        .unwrap();
        assert_eq!(db.lists().len(), 2);
    }

    #[test]
    fn transaction_closure_discards_on_error() {
        let db = Database::open_in_memory().unwrap();
        let result: CoreResult<()> = db.transaction(|txn| {
            txn.insert_list(ReadingList::new_local("Later"))?;
            Err(CoreError::invalid_operation("boom"))
        });
        assert!(result.is_err());
        assert_eq!(db.lists().len(), 1);
    }

    #[test]
    fn file_store_persists_across_reopen() {
        let temp = tempdir().unwrap();
        {
            let db = Database::open(temp.path()).unwrap();
            let mut txn = db.begin();
            txn.set_value("reading-lists.last-sync", "2020-01-01T00:00:00Z");
            txn.insert_list(ReadingList::new_local("Later")).unwrap();
            txn.save().unwrap();
        }

        let db = Database::open(temp.path()).unwrap();
        assert_eq!(db.lists().len(), 2);
        assert_eq!(
            db.get_value("reading-lists.last-sync").as_deref(),
            Some("2020-01-01T00:00:00Z")
        );
    }

    #[test]
    fn file_store_is_exclusive() {
        let temp = tempdir().unwrap();
        let _db = Database::open(temp.path()).unwrap();
        assert!(matches!(
            Database::open(temp.path()),
            Err(CoreError::StoreLocked)
        ));
    }
}
