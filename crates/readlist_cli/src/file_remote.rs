//! A remote backed by a JSON file, for offline use and scripting.
//!
//! File layout:
//!
//! ```json
//! {
//!   "lists":   [{ "id": 1, "name": "Saved", "default": true, "updated": "..." }],
//!   "entries": [{ "id": 10, "list_id": 1, "project": "...", "title": "...", "updated": "..." }],
//!   "next_id": 11
//! }
//! ```

use async_trait::async_trait;
use parking_lot::Mutex;
use readlist_core::{RemoteEntry, RemoteId, RemoteList, Timestamp};
use readlist_sync_engine::{LocalChanges, PushAck, RemoteClient, RemoteDelta, SyncError, SyncResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Contents of a remote data file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteFile {
    /// Every list, live or deleted.
    #[serde(default)]
    pub lists: Vec<RemoteList>,
    /// Every entry, each carrying its list ID.
    #[serde(default)]
    pub entries: Vec<RemoteEntry>,
    /// Next ID handed out to pushed items.
    #[serde(default = "first_id")]
    pub next_id: RemoteId,
}

fn first_id() -> RemoteId {
    1
}

impl RemoteFile {
    fn allocate_id(&mut self) -> RemoteId {
        let used = self
            .lists
            .iter()
            .map(|l| l.id)
            .chain(self.entries.iter().map(|e| e.id))
            .max()
            .unwrap_or(0);
        let id = self.next_id.max(used + 1);
        self.next_id = id + 1;
        id
    }
}

/// A [`RemoteClient`] reading and writing a [`RemoteFile`].
///
/// The file is read once when opened; pushes update the in-memory copy and
/// rewrite the file.
#[derive(Debug)]
pub struct FileRemote {
    path: PathBuf,
    data: Mutex<RemoteFile>,
}

impl FileRemote {
    /// Opens a remote file. A missing file is an empty remote.
    pub fn open(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let data = if path.exists() {
            serde_json::from_slice(&fs::read(path)?)?
        } else {
            RemoteFile {
                next_id: first_id(),
                ..RemoteFile::default()
            }
        };
        Ok(Self {
            path: path.to_path_buf(),
            data: Mutex::new(data),
        })
    }

    /// Returns a copy of the current contents.
    pub fn snapshot(&self) -> RemoteFile {
        self.data.lock().clone()
    }

    fn write(&self, data: &RemoteFile) -> SyncResult<()> {
        let bytes = serde_json::to_vec_pretty(data)
            .map_err(|e| SyncError::push(format!("encode remote file: {e}")))?;
        let temp = self.path.with_extension("json.tmp");
        fs::write(&temp, bytes)
            .and_then(|()| fs::rename(&temp, &self.path))
            .map_err(|e| SyncError::push(format!("write {}: {e}", self.path.display())))
    }
}

#[async_trait]
impl RemoteClient for FileRemote {
    async fn fetch_all_lists(&self) -> SyncResult<Vec<RemoteList>> {
        Ok(self.data.lock().lists.clone())
    }

    async fn fetch_entries(&self, list_id: RemoteId) -> SyncResult<Vec<RemoteEntry>> {
        Ok(self
            .data
            .lock()
            .entries
            .iter()
            .filter(|e| e.list_id == Some(list_id))
            .cloned()
            .collect())
    }

    async fn fetch_delta(&self, since: &str) -> SyncResult<RemoteDelta> {
        let since = Timestamp::parse(since)
            .map_err(|e| SyncError::fetch_fatal(format!("bad since parameter: {e}")))?;
        let data = self.data.lock();
        Ok(RemoteDelta {
            lists: data.lists.iter().filter(|l| l.updated > since).cloned().collect(),
            entries: data.entries.iter().filter(|e| e.updated > since).cloned().collect(),
        })
    }

    async fn push(&self, changes: &LocalChanges) -> SyncResult<PushAck> {
        let now = Timestamp::now();
        let mut ack = PushAck::default();
        let mut data = self.data.lock().clone();

        for pending in &changes.lists {
            let existing = pending
                .remote_id
                .and_then(|id| data.lists.iter().position(|l| l.id == id));
            let id = match existing {
                Some(index) => {
                    let list = &mut data.lists[index];
                    list.name.clone_from(&pending.name);
                    list.description.clone_from(&pending.description);
                    list.deleted = pending.deleted;
                    list.updated = now;
                    list.id
                }
                None => {
                    let id = pending.remote_id.unwrap_or_else(|| data.allocate_id());
                    data.lists.push(RemoteList {
                        id,
                        name: pending.name.clone(),
                        description: pending.description.clone(),
                        is_default: false,
                        deleted: pending.deleted,
                        created: Some(now),
                        updated: now,
                    });
                    id
                }
            };
            ack.lists.insert(pending.key, id);
        }

        for pending in &changes.entries {
            let existing = pending
                .remote_id
                .and_then(|id| data.entries.iter().position(|e| e.id == id));
            let id = match existing {
                Some(index) => {
                    let entry = &mut data.entries[index];
                    entry.list_id = Some(pending.list_id);
                    entry.project.clone_from(&pending.project);
                    entry.title.clone_from(&pending.title);
                    entry.deleted = pending.deleted;
                    entry.updated = now;
                    entry.id
                }
                None => {
                    let id = pending.remote_id.unwrap_or_else(|| data.allocate_id());
                    data.entries.push(RemoteEntry {
                        id,
                        list_id: Some(pending.list_id),
                        project: pending.project.clone(),
                        title: pending.title.clone(),
                        deleted: pending.deleted,
                        created: Some(now),
                        updated: now,
                    });
                    id
                }
            };
            ack.entries.insert(pending.key, id);
        }

        self.write(&data)?;
        debug!(
            lists = ack.lists.len(),
            entries = ack.entries.len(),
            path = %self.path.display(),
            "remote file updated"
        );
        *self.data.lock() = data;
        Ok(ack)
    }
}
