//! Scoped transactions over the store.

use crate::database::Database;
use crate::error::{CoreError, CoreResult};
use crate::model::{ReadingList, ReadingListEntry};
use crate::snapshot::StoreState;
use crate::types::{LocalKey, RemoteId};

/// A scoped, all-or-nothing unit of work.
///
/// A transaction owns a private copy of the store taken when it began.
/// Mutations only touch that copy and set the change flag when they actually
/// alter stored data. [`Transaction::save`] publishes the copy in one step;
/// dropping the transaction without saving discards it.
///
/// Invariants enforced here:
/// - at most one list is the default list
/// - the default flag cannot be toggled on an existing list
/// - entries always reference an existing list
pub struct Transaction<'db> {
    db: &'db Database,
    base_version: u64,
    working: StoreState,
    dirty: bool,
}

impl<'db> Transaction<'db> {
    pub(crate) fn new(db: &'db Database, working: StoreState) -> Self {
        Self {
            db,
            base_version: working.version,
            working,
            dirty: false,
        }
    }

    /// Returns true if the transaction holds uncommitted changes.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.dirty
    }

    /// Returns the committed version this transaction started from.
    #[must_use]
    pub fn base_version(&self) -> u64 {
        self.base_version
    }

    /// Commits the transaction.
    ///
    /// Saving a transaction without changes is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `TransactionConflict` if another transaction committed since
    /// this one began, or a backend error if the snapshot cannot be written.
    /// The store is unchanged in both cases.
    pub fn save(mut self) -> CoreResult<()> {
        if !self.dirty {
            return Ok(());
        }
        let working = std::mem::take(&mut self.working);
        let version = self.db.commit(working, self.base_version)?;
        self.dirty = false;
        tracing::debug!(version, "transaction committed");
        Ok(())
    }

    // --- key-value slot ---

    /// Reads a key-value slot.
    #[must_use]
    pub fn get_value(&self, key: &str) -> Option<&str> {
        self.working.values.get(key).map(String::as_str)
    }

    /// Writes a key-value slot.
    pub fn set_value(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let value = value.into();
        let previous = self.working.values.insert(key.into(), value.clone());
        if previous.as_ref() != Some(&value) {
            self.dirty = true;
        }
    }

    /// Removes a key-value slot.
    pub fn remove_value(&mut self, key: &str) {
        if self.working.values.remove(key).is_some() {
            self.dirty = true;
        }
    }

    // --- lists ---

    /// Iterates over all lists.
    pub fn lists(&self) -> impl Iterator<Item = &ReadingList> {
        self.working.lists.values()
    }

    /// Gets a list by local key.
    #[must_use]
    pub fn list(&self, key: LocalKey) -> Option<&ReadingList> {
        self.working.lists.get(&key)
    }

    /// Gets the default list.
    #[must_use]
    pub fn default_list(&self) -> Option<&ReadingList> {
        self.working.default_list()
    }

    /// Gets a list by remote ID. The default list wins ties.
    #[must_use]
    pub fn list_by_remote_id(&self, remote_id: RemoteId) -> Option<&ReadingList> {
        let mut matches = self
            .working
            .lists
            .values()
            .filter(|l| l.remote_id == Some(remote_id));
        let first = matches.next()?;
        if first.is_default {
            return Some(first);
        }
        matches.find(|l| l.is_default).or(Some(first))
    }

    /// Inserts a new list.
    ///
    /// # Errors
    ///
    /// Fails if the key is already used or the list would be a second
    /// default list.
    pub fn insert_list(&mut self, list: ReadingList) -> CoreResult<LocalKey> {
        if self.working.lists.contains_key(&list.key) {
            return Err(CoreError::invalid_operation(format!(
                "list {} already exists",
                list.key
            )));
        }
        if list.is_default && self.default_list().is_some() {
            return Err(CoreError::invalid_operation("store already has a default list"));
        }
        let key = list.key;
        self.working.lists.insert(key, list);
        self.dirty = true;
        Ok(key)
    }

    /// Updates a list in place.
    ///
    /// Returns true if the update changed any field.
    pub fn update_list<F>(&mut self, key: LocalKey, f: F) -> CoreResult<bool>
    where
        F: FnOnce(&mut ReadingList),
    {
        let current = self
            .working
            .lists
            .get(&key)
            .ok_or_else(|| CoreError::list_not_found(key))?;
        let mut updated = current.clone();
        f(&mut updated);

        if updated.key != key || updated.is_default != current.is_default {
            return Err(CoreError::invalid_operation(
                "list key and default flag are immutable",
            ));
        }
        if updated == *current {
            return Ok(false);
        }
        self.working.lists.insert(key, updated);
        self.dirty = true;
        Ok(true)
    }

    /// Returns copies of all lists with pending local edits.
    #[must_use]
    pub fn lists_updated_locally(&self) -> Vec<ReadingList> {
        self.lists().filter(|l| l.is_updated_locally).cloned().collect()
    }

    // --- entries ---

    /// Iterates over all entries.
    pub fn entries(&self) -> impl Iterator<Item = &ReadingListEntry> {
        self.working.entries.values()
    }

    /// Gets an entry by local key.
    #[must_use]
    pub fn entry(&self, key: LocalKey) -> Option<&ReadingListEntry> {
        self.working.entries.get(&key)
    }

    /// Gets an entry by remote ID.
    #[must_use]
    pub fn entry_by_remote_id(&self, remote_id: RemoteId) -> Option<&ReadingListEntry> {
        self.entries().find(|e| e.remote_id == Some(remote_id))
    }

    /// Iterates over the entries of one list.
    pub fn entries_in_list(&self, list_key: LocalKey) -> impl Iterator<Item = &ReadingListEntry> {
        self.entries().filter(move |e| e.list_key == list_key)
    }

    /// Inserts a new entry.
    ///
    /// # Errors
    ///
    /// Fails if the key is already used or the owning list does not exist.
    pub fn insert_entry(&mut self, entry: ReadingListEntry) -> CoreResult<LocalKey> {
        if self.working.entries.contains_key(&entry.key) {
            return Err(CoreError::invalid_operation(format!(
                "entry {} already exists",
                entry.key
            )));
        }
        if !self.working.lists.contains_key(&entry.list_key) {
            return Err(CoreError::list_not_found(entry.list_key));
        }
        let key = entry.key;
        self.working.entries.insert(key, entry);
        self.dirty = true;
        Ok(key)
    }

    /// Updates an entry in place.
    ///
    /// Returns true if the update changed any field.
    pub fn update_entry<F>(&mut self, key: LocalKey, f: F) -> CoreResult<bool>
    where
        F: FnOnce(&mut ReadingListEntry),
    {
        let current = self
            .working
            .entries
            .get(&key)
            .ok_or_else(|| CoreError::entry_not_found(key))?;
        let mut updated = current.clone();
        f(&mut updated);

        if updated.key != key {
            return Err(CoreError::invalid_operation("entry key is immutable"));
        }
        if !self.working.lists.contains_key(&updated.list_key) {
            return Err(CoreError::list_not_found(updated.list_key));
        }
        if updated == *current {
            return Ok(false);
        }
        self.working.entries.insert(key, updated);
        self.dirty = true;
        Ok(true)
    }

    /// Returns copies of all entries with pending local edits.
    #[must_use]
    pub fn entries_updated_locally(&self) -> Vec<ReadingListEntry> {
        self.entries()
            .filter(|e| e.is_updated_locally)
            .cloned()
            .collect()
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.dirty {
            tracing::debug!(
                base_version = self.base_version,
                "discarding uncommitted transaction"
            );
        }
    }
}
