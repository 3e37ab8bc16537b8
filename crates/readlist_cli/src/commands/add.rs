//! Add-list and add-entry command implementations.

use super::open_store;
use readlist_core::{LocalKey, ReadingList, ReadingListEntry, Transaction};
use std::path::Path;

/// Runs the add-list command.
pub fn run_list(
    path: &Path,
    name: &str,
    description: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let db = open_store(path)?;
    let key = db.transaction(|txn| {
        let mut list = ReadingList::new_local(name);
        list.description = description;
        txn.insert_list(list)
    })?;
    println!("Created list {name} ({key})");
    Ok(())
}

/// Runs the add-entry command.
///
/// `list` is matched against local keys first, then live list names.
pub fn run_entry(
    path: &Path,
    list: &str,
    project: &str,
    title: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let db = open_store(path)?;
    let mut txn = db.begin();
    let list_key = resolve_list(&txn, list).ok_or_else(|| format!("No list named {list:?}"))?;
    let key = txn.insert_entry(ReadingListEntry::new_local(list_key, project, title))?;
    txn.save()?;
    println!("Saved {title:?} ({key})");
    Ok(())
}

fn resolve_list(txn: &Transaction<'_>, list: &str) -> Option<LocalKey> {
    if let Ok(key) = list.parse::<LocalKey>() {
        if txn.list(key).is_some() {
            return Some(key);
        }
    }
    txn.lists()
        .find(|l| !l.is_deleted && l.name == list)
        .map(|l| l.key)
}
