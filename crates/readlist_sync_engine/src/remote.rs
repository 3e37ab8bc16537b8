//! Remote service abstraction.

use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use readlist_core::{LocalKey, ReadingList, ReadingListEntry, RemoteEntry, RemoteId, RemoteList, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};

/// Client for the remote reading-list service.
///
/// This trait abstracts the API layer so the engine can run against HTTP,
/// a local fixture, or a mock. Timeouts, authentication and retries belong
/// to the implementation; the engine treats every failure as a fetch or
/// push error.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Fetches every list of the account.
    async fn fetch_all_lists(&self) -> SyncResult<Vec<RemoteList>>;

    /// Fetches every entry of one list. Returned entries need not carry
    /// their list ID.
    async fn fetch_entries(&self, list_id: RemoteId) -> SyncResult<Vec<RemoteEntry>>;

    /// Fetches lists and entries modified after `since` (ISO-8601, passed
    /// verbatim). Entries carry their list ID.
    async fn fetch_delta(&self, since: &str) -> SyncResult<RemoteDelta>;

    /// Pushes local changes.
    ///
    /// The acknowledgement maps the local key of every accepted item to its
    /// remote ID. Items missing from the ack were not accepted.
    async fn push(&self, changes: &LocalChanges) -> SyncResult<PushAck>;
}

/// Lists and entries changed since a watermark.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteDelta {
    /// Changed lists.
    pub lists: Vec<RemoteList>,
    /// Changed entries.
    pub entries: Vec<RemoteEntry>,
}

/// A local list edit awaiting upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingList {
    /// Local key, echoed in the ack.
    pub key: LocalKey,
    /// Remote ID; `None` asks the service to create the list.
    pub remote_id: Option<RemoteId>,
    /// Display name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Whether the list was deleted locally.
    pub deleted: bool,
}

impl From<&ReadingList> for PendingList {
    fn from(list: &ReadingList) -> Self {
        Self {
            key: list.key,
            remote_id: list.remote_id,
            name: list.name.clone(),
            description: list.description.clone(),
            deleted: list.is_deleted,
        }
    }
}

/// A local entry edit awaiting upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingEntry {
    /// Local key, echoed in the ack.
    pub key: LocalKey,
    /// Remote ID; `None` asks the service to create the entry.
    pub remote_id: Option<RemoteId>,
    /// Remote ID of the owning list.
    pub list_id: RemoteId,
    /// Site the page belongs to.
    pub project: String,
    /// Page title.
    pub title: String,
    /// Whether the entry was deleted locally.
    pub deleted: bool,
}

impl PendingEntry {
    /// Builds an upload record for an entry whose list has remote ID `list_id`.
    pub fn new(entry: &ReadingListEntry, list_id: RemoteId) -> Self {
        Self {
            key: entry.key,
            remote_id: entry.remote_id,
            list_id,
            project: entry.project.clone(),
            title: entry.title.clone(),
            deleted: entry.is_deleted,
        }
    }
}

/// A batch of local changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalChanges {
    /// Pending lists.
    pub lists: Vec<PendingList>,
    /// Pending entries.
    pub entries: Vec<PendingEntry>,
}

impl LocalChanges {
    /// Returns true if there is nothing to push.
    pub fn is_empty(&self) -> bool {
        self.lists.is_empty() && self.entries.is_empty()
    }

    /// Returns the number of items in the batch.
    pub fn len(&self) -> usize {
        self.lists.len() + self.entries.len()
    }
}

/// Acknowledgement of a push.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushAck {
    /// Remote IDs of accepted lists by local key.
    pub lists: BTreeMap<LocalKey, RemoteId>,
    /// Remote IDs of accepted entries by local key.
    pub entries: BTreeMap<LocalKey, RemoteId>,
}

/// A mock remote for testing.
///
/// Serves lists and per-list entries set by the test, derives deltas from
/// them unless an explicit delta is set, and records pushes. Individual
/// calls can be made to fail.
#[derive(Debug, Default)]
pub struct MockRemote {
    lists: Mutex<Vec<RemoteList>>,
    entries: Mutex<BTreeMap<RemoteId, Vec<RemoteEntry>>>,
    delta: Mutex<Option<RemoteDelta>>,
    failing_entry_lists: Mutex<BTreeSet<RemoteId>>,
    fail_list_fetch: AtomicBool,
    fail_delta: AtomicBool,
    fail_push: AtomicBool,
    pushes: Mutex<Vec<LocalChanges>>,
    delta_requests: Mutex<Vec<String>>,
    next_id: AtomicI64,
    list_fetches: AtomicU64,
    entry_fetches: AtomicU64,
}

impl MockRemote {
    /// First ID handed out to pushed items.
    pub const FIRST_ASSIGNED_ID: RemoteId = 1000;

    /// Creates an empty mock remote.
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(Self::FIRST_ASSIGNED_ID),
            ..Self::default()
        }
    }

    /// Sets the lists served by `fetch_all_lists`.
    pub fn set_lists(&self, lists: Vec<RemoteList>) {
        *self.lists.lock() = lists;
    }

    /// Sets the entries served for one list.
    pub fn set_entries(&self, list_id: RemoteId, entries: Vec<RemoteEntry>) {
        self.entries.lock().insert(list_id, entries);
    }

    /// Sets an explicit delta, overriding the derived one.
    pub fn set_delta(&self, delta: RemoteDelta) {
        *self.delta.lock() = Some(delta);
    }

    /// Makes entry fetches for one list fail.
    pub fn fail_entries_for(&self, list_id: RemoteId) {
        self.failing_entry_lists.lock().insert(list_id);
    }

    /// Makes `fetch_all_lists` fail.
    pub fn set_fail_list_fetch(&self, fail: bool) {
        self.fail_list_fetch.store(fail, Ordering::SeqCst);
    }

    /// Makes `fetch_delta` fail.
    pub fn set_fail_delta(&self, fail: bool) {
        self.fail_delta.store(fail, Ordering::SeqCst);
    }

    /// Makes `push` fail.
    pub fn set_fail_push(&self, fail: bool) {
        self.fail_push.store(fail, Ordering::SeqCst);
    }

    /// Returns every accepted push.
    pub fn pushes(&self) -> Vec<LocalChanges> {
        self.pushes.lock().clone()
    }

    /// Returns the `since` argument of every delta request.
    pub fn delta_requests(&self) -> Vec<String> {
        self.delta_requests.lock().clone()
    }

    /// Returns the number of `fetch_all_lists` calls.
    pub fn list_fetch_count(&self) -> u64 {
        self.list_fetches.load(Ordering::SeqCst)
    }

    /// Returns the number of `fetch_entries` calls.
    pub fn entry_fetch_count(&self) -> u64 {
        self.entry_fetches.load(Ordering::SeqCst)
    }

    fn derived_delta(&self, since: Timestamp) -> RemoteDelta {
        let lists = self
            .lists
            .lock()
            .iter()
            .filter(|l| l.updated > since)
            .cloned()
            .collect();
        let entries = self
            .entries
            .lock()
            .iter()
            .flat_map(|(list_id, entries)| {
                entries.iter().map(move |e| RemoteEntry {
                    list_id: Some(*list_id),
                    ..e.clone()
                })
            })
            .filter(|e| e.updated > since)
            .collect();
        RemoteDelta { lists, entries }
    }

    fn assign_id(&self, existing: Option<RemoteId>) -> RemoteId {
        existing.unwrap_or_else(|| self.next_id.fetch_add(1, Ordering::SeqCst))
    }
}

#[async_trait]
impl RemoteClient for MockRemote {
    async fn fetch_all_lists(&self) -> SyncResult<Vec<RemoteList>> {
        self.list_fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_list_fetch.load(Ordering::SeqCst) {
            return Err(SyncError::fetch_retryable("mock list fetch failure"));
        }
        Ok(self.lists.lock().clone())
    }

    async fn fetch_entries(&self, list_id: RemoteId) -> SyncResult<Vec<RemoteEntry>> {
        self.entry_fetches.fetch_add(1, Ordering::SeqCst);
        if self.failing_entry_lists.lock().contains(&list_id) {
            return Err(SyncError::fetch_retryable(format!(
                "mock entry fetch failure for list {list_id}"
            )));
        }
        Ok(self.entries.lock().get(&list_id).cloned().unwrap_or_default())
    }

    async fn fetch_delta(&self, since: &str) -> SyncResult<RemoteDelta> {
        self.delta_requests.lock().push(since.to_string());
        if self.fail_delta.load(Ordering::SeqCst) {
            return Err(SyncError::fetch_retryable("mock delta failure"));
        }
        if let Some(delta) = self.delta.lock().clone() {
            return Ok(delta);
        }
        let since = Timestamp::parse(since)
            .map_err(|e| SyncError::fetch_fatal(format!("bad since parameter: {e}")))?;
        Ok(self.derived_delta(since))
    }

    async fn push(&self, changes: &LocalChanges) -> SyncResult<PushAck> {
        if self.fail_push.load(Ordering::SeqCst) {
            return Err(SyncError::push("mock push failure"));
        }
        let mut ack = PushAck::default();
        for list in &changes.lists {
            ack.lists.insert(list.key, self.assign_id(list.remote_id));
        }
        for entry in &changes.entries {
            ack.entries.insert(entry.key, self.assign_id(entry.remote_id));
        }
        self.pushes.lock().push(changes.clone());
        Ok(ack)
    }
}
