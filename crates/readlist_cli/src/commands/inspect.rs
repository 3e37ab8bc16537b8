//! Inspect command implementation.

use super::open_store;
use crate::FormatArg;
use readlist_core::{Database, ReadingList, ReadingListEntry};
use readlist_sync_engine::WATERMARK_KEY;
use serde::Serialize;
use std::path::Path;

/// Store inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Store path.
    pub path: String,
    /// Committed snapshot version.
    pub version: u64,
    /// Last sync watermark, if any.
    pub watermark: Option<String>,
    /// Number of lists, including soft-deleted ones.
    pub list_count: usize,
    /// Number of entries, including soft-deleted ones.
    pub entry_count: usize,
    /// Lists and entries awaiting upload.
    pub pending_uploads: usize,
    /// Per-list details.
    pub lists: Vec<ListSummary>,
}

/// Summary of a single list.
#[derive(Debug, Serialize)]
pub struct ListSummary {
    /// The list itself.
    #[serde(flatten)]
    pub list: ReadingList,
    /// Number of live entries.
    pub live_entries: usize,
    /// Entries of the list (if requested).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entries: Option<Vec<ReadingListEntry>>,
}

/// Runs the inspect command.
pub fn run(path: &Path, show_entries: bool, format: FormatArg) -> Result<(), Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("No store found at {}", path.display()).into());
    }
    let db = open_store(path)?;
    let result = inspect(&db, path, show_entries);

    match format {
        FormatArg::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        FormatArg::Text => print_text_output(&result),
    }
    Ok(())
}

pub(crate) fn inspect(db: &Database, path: &Path, show_entries: bool) -> InspectResult {
    let entries = db.entries();
    let mut lists = db.lists();
    lists.sort_by(|a, b| b.is_default.cmp(&a.is_default).then_with(|| a.name.cmp(&b.name)));

    let pending_uploads = lists.iter().filter(|l| l.is_updated_locally).count()
        + entries.iter().filter(|e| e.is_updated_locally).count();

    let summaries = lists
        .into_iter()
        .map(|list| {
            let own: Vec<ReadingListEntry> = entries
                .iter()
                .filter(|e| e.list_key == list.key)
                .cloned()
                .collect();
            ListSummary {
                live_entries: own.iter().filter(|e| !e.is_deleted).count(),
                entries: show_entries.then_some(own),
                list,
            }
        })
        .collect::<Vec<_>>();

    InspectResult {
        path: path.display().to_string(),
        version: db.version(),
        watermark: db.get_value(WATERMARK_KEY),
        list_count: summaries.len(),
        entry_count: entries.len(),
        pending_uploads,
        lists: summaries,
    }
}

fn print_text_output(result: &InspectResult) {
    println!("Store: {}", result.path);
    println!("Version: {}", result.version);
    println!(
        "Last sync: {}",
        result.watermark.as_deref().unwrap_or("never")
    );
    println!(
        "Lists: {}  Entries: {}  Pending uploads: {}",
        result.list_count, result.entry_count, result.pending_uploads
    );
    println!();

    for summary in &result.lists {
        let list = &summary.list;
        let mut flags = Vec::new();
        if list.is_default {
            flags.push("default");
        }
        if list.is_updated_locally {
            flags.push("pending");
        }
        if list.is_deleted {
            flags.push("deleted");
        }
        let remote = list
            .remote_id
            .map_or_else(|| "-".to_string(), |id| id.to_string());
        println!(
            "{:<24} remote={:<8} entries={:<5} {}",
            list.name,
            remote,
            summary.live_entries,
            flags.join(",")
        );

        for entry in summary.entries.iter().flatten() {
            let marker = if entry.is_deleted { "x" } else { "-" };
            println!("  {marker} {} ({})", entry.title, entry.project);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use readlist_core::ReadingList;

    #[test]
    fn counts_pending_and_live_entries() {
        let db = Database::open_in_memory().unwrap();
        db.transaction(|txn| {
            let list = txn.insert_list(ReadingList::new_local("Later"))?;
            txn.insert_entry(ReadingListEntry::new_local(list, "p", "one"))?;
            let mut gone = ReadingListEntry::new_local(list, "p", "two");
            gone.is_deleted = true;
            txn.insert_entry(gone)?;
            Ok(())
        })
        .unwrap();

        let result = inspect(&db, Path::new("mem"), true);
        assert_eq!(result.list_count, 2);
        assert_eq!(result.entry_count, 2);
        assert_eq!(result.pending_uploads, 3);
        assert!(result.watermark.is_none());

        // default list sorts first
        assert!(result.lists[0].list.is_default);
        let later = &result.lists[1];
        assert_eq!(later.live_entries, 1);
        assert_eq!(later.entries.as_ref().unwrap().len(), 2);
    }

    #[test]
    fn json_output_flattens_lists() {
        let db = Database::open_in_memory().unwrap();
        let result = inspect(&db, Path::new("mem"), false);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["lists"][0]["is_default"], true);
        assert!(json["lists"][0].get("entries").is_none());
    }
}
