//! Committed store state and its on-disk encoding.

use crate::error::CoreResult;
use crate::model::{ReadingList, ReadingListEntry};
use crate::types::LocalKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Current snapshot format version.
const FORMAT_VERSION: u32 = 1;

/// The full contents of a store at one committed version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreState {
    /// Commit counter, bumped by every successful save.
    pub version: u64,
    /// Lists by local key.
    pub lists: BTreeMap<LocalKey, ReadingList>,
    /// Entries by local key.
    pub entries: BTreeMap<LocalKey, ReadingListEntry>,
    /// Small key-value slot (holds the sync watermark).
    pub values: BTreeMap<String, String>,
}

/// Serialized form. Records are stored as arrays so keys never have to
/// round-trip through JSON object keys.
#[derive(Serialize, Deserialize)]
struct SnapshotFile {
    format: u32,
    version: u64,
    lists: Vec<ReadingList>,
    entries: Vec<ReadingListEntry>,
    #[serde(default)]
    values: BTreeMap<String, String>,
}

impl StoreState {
    /// Encodes the state as pretty-printed JSON.
    pub fn encode(&self) -> CoreResult<Vec<u8>> {
        let file = SnapshotFile {
            format: FORMAT_VERSION,
            version: self.version,
            lists: self.lists.values().cloned().collect(),
            entries: self.entries.values().cloned().collect(),
            values: self.values.clone(),
        };
        Ok(serde_json::to_vec_pretty(&file)?)
    }

    /// Decodes a state previously produced by [`StoreState::encode`].
    pub fn decode(bytes: &[u8]) -> CoreResult<Self> {
        let file: SnapshotFile = serde_json::from_slice(bytes)?;
        Ok(Self {
            version: file.version,
            lists: file.lists.into_iter().map(|l| (l.key, l)).collect(),
            entries: file.entries.into_iter().map(|e| (e.key, e)).collect(),
            values: file.values,
        })
    }

    /// Returns the default list, if any.
    pub fn default_list(&self) -> Option<&ReadingList> {
        self.lists.values().find(|l| l.is_default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode() {
        let mut state = StoreState {
            version: 4,
            ..StoreState::default()
        };
        let list = ReadingList::new_local("Later");
        let entry = ReadingListEntry::new_local(list.key, "https://en.wikipedia.org", "Rust");
        state.lists.insert(list.key, list);
        state.entries.insert(entry.key, entry);
        state
            .values
            .insert("reading-lists.last-sync".into(), "2020-01-01T00:00:00Z".into());

        let decoded = StoreState::decode(&state.encode().unwrap()).unwrap();
        assert_eq!(decoded, state);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(StoreState::decode(b"not json").is_err());
    }
}
