//! Local records and the remote wire records they merge from.

use crate::types::{LocalKey, RemoteId, Timestamp};
use serde::{Deserialize, Serialize};

/// A reading list stored locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadingList {
    /// Local surrogate key.
    pub key: LocalKey,
    /// Remote ID, unset until the list has been synced.
    pub remote_id: Option<RemoteId>,
    /// Display name.
    pub name: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Whether this is the store's single default list.
    #[serde(default)]
    pub is_default: bool,
    /// Whether this list carries edits not yet pushed upstream.
    #[serde(default)]
    pub is_updated_locally: bool,
    /// Soft-delete flag.
    #[serde(default)]
    pub is_deleted: bool,
    /// Last modification time, local or remote.
    #[serde(default)]
    pub updated_at: Option<Timestamp>,
}

impl ReadingList {
    /// Creates a list from a local user action, pending upload.
    pub fn new_local(name: impl Into<String>) -> Self {
        Self {
            key: LocalKey::new(),
            remote_id: None,
            name: name.into(),
            description: None,
            is_default: false,
            is_updated_locally: true,
            is_deleted: false,
            updated_at: Some(Timestamp::now()),
        }
    }

    /// Creates the default list. Only store initialization does this.
    pub(crate) fn new_default(name: impl Into<String>) -> Self {
        Self {
            key: LocalKey::new(),
            remote_id: None,
            name: name.into(),
            description: None,
            is_default: true,
            is_updated_locally: false,
            is_deleted: false,
            updated_at: None,
        }
    }

    /// Creates a local copy of a remote list.
    pub fn from_remote(remote: &RemoteList) -> Self {
        let mut list = Self {
            key: LocalKey::new(),
            remote_id: Some(remote.id),
            name: String::new(),
            description: None,
            is_default: false,
            is_updated_locally: false,
            is_deleted: false,
            updated_at: None,
        };
        list.apply_remote(remote);
        list
    }

    /// Copies the mutable fields of a remote record onto this list.
    ///
    /// A pending local edit newer than the remote record wins and nothing
    /// is changed; the return value is false in that case. The default flag
    /// is never taken from the remote record.
    pub fn apply_remote(&mut self, remote: &RemoteList) -> bool {
        if self.has_newer_local_edit(remote.updated) {
            return false;
        }
        self.remote_id = Some(remote.id);
        self.name.clone_from(&remote.name);
        self.description.clone_from(&remote.description);
        self.is_deleted = remote.deleted;
        self.updated_at = Some(remote.updated);
        self.is_updated_locally = false;
        true
    }

    fn has_newer_local_edit(&self, remote_updated: Timestamp) -> bool {
        self.is_updated_locally && self.updated_at.is_some_and(|local| local > remote_updated)
    }
}

/// A saved page in a reading list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadingListEntry {
    /// Local surrogate key.
    pub key: LocalKey,
    /// Remote ID, unset until the entry has been synced.
    pub remote_id: Option<RemoteId>,
    /// Local key of the owning list.
    pub list_key: LocalKey,
    /// Site the page belongs to, e.g. `https://en.wikipedia.org`.
    pub project: String,
    /// Page title.
    pub title: String,
    /// Whether this entry carries edits not yet pushed upstream.
    #[serde(default)]
    pub is_updated_locally: bool,
    /// Soft-delete flag.
    #[serde(default)]
    pub is_deleted: bool,
    /// Last modification time, local or remote.
    #[serde(default)]
    pub updated_at: Option<Timestamp>,
}

impl ReadingListEntry {
    /// Creates an entry from a local user action, pending upload.
    pub fn new_local(list_key: LocalKey, project: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            key: LocalKey::new(),
            remote_id: None,
            list_key,
            project: project.into(),
            title: title.into(),
            is_updated_locally: true,
            is_deleted: false,
            updated_at: Some(Timestamp::now()),
        }
    }

    /// Creates a local copy of a remote entry attached to `list_key`.
    pub fn from_remote(remote: &RemoteEntry, list_key: LocalKey) -> Self {
        let mut entry = Self {
            key: LocalKey::new(),
            remote_id: Some(remote.id),
            list_key,
            project: String::new(),
            title: String::new(),
            is_updated_locally: false,
            is_deleted: false,
            updated_at: None,
        };
        entry.apply_remote(remote, list_key);
        entry
    }

    /// Copies the mutable fields of a remote record onto this entry.
    ///
    /// Same last-writer-wins rule as [`ReadingList::apply_remote`].
    pub fn apply_remote(&mut self, remote: &RemoteEntry, list_key: LocalKey) -> bool {
        if self.is_updated_locally && self.updated_at.is_some_and(|local| local > remote.updated) {
            return false;
        }
        self.remote_id = Some(remote.id);
        self.list_key = list_key;
        self.project.clone_from(&remote.project);
        self.title.clone_from(&remote.title);
        self.is_deleted = remote.deleted;
        self.updated_at = Some(remote.updated);
        self.is_updated_locally = false;
        true
    }
}

/// A reading list as served by the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteList {
    /// Remote ID.
    pub id: RemoteId,
    /// Display name.
    pub name: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Whether the service marks this as the default list.
    #[serde(rename = "default", default)]
    pub is_default: bool,
    /// Whether the list was deleted remotely.
    #[serde(default)]
    pub deleted: bool,
    /// Creation time.
    #[serde(default)]
    pub created: Option<Timestamp>,
    /// Last modification time.
    pub updated: Timestamp,
}

/// A reading-list entry as served by the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntry {
    /// Remote ID.
    pub id: RemoteId,
    /// Owning list. Absent when fetched per list.
    #[serde(default)]
    pub list_id: Option<RemoteId>,
    /// Site the page belongs to.
    pub project: String,
    /// Page title.
    pub title: String,
    /// Whether the entry was deleted remotely.
    #[serde(default)]
    pub deleted: bool,
    /// Creation time.
    #[serde(default)]
    pub created: Option<Timestamp>,
    /// Last modification time.
    pub updated: Timestamp,
}
