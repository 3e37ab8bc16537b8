//! Property-based test generators using proptest.
//!
//! Generated data sets keep the invariants the service guarantees: unique
//! remote IDs, at most one default list, and entries that reference a
//! generated list.

use proptest::prelude::*;
use readlist_core::{RemoteEntry, RemoteId, RemoteList, Timestamp};

/// First remote ID used for generated entries.
pub const FIRST_ENTRY_ID: RemoteId = 10_000;

/// Strategy for generating whole-second UTC timestamps.
pub fn timestamp_strategy() -> impl Strategy<Value = Timestamp> {
    (2015u32..2030, 1u32..=12, 1u32..=28, 0u32..24, 0u32..60, 0u32..60).prop_map(
        |(year, month, day, hour, minute, second)| {
            Timestamp::parse(&format!(
                "{year:04}-{month:02}-{day:02}T{hour:02}:{minute:02}:{second:02}Z"
            ))
            .expect("Generated timestamp must parse")
        },
    )
}

/// Strategy for generating list names.
pub fn name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Za-z][A-Za-z0-9 ]{0,23}").expect("Invalid regex")
}

/// Strategy for generating up to `max` remote lists with IDs `1..`.
///
/// The first list is the default list when the generated flag says so; a
/// default list is never deleted.
pub fn remote_lists_strategy(max: usize) -> impl Strategy<Value = Vec<RemoteList>> {
    (
        prop::collection::vec(
            (
                name_strategy(),
                prop::option::of(name_strategy()),
                prop::bool::weighted(0.2),
                timestamp_strategy(),
            ),
            0..=max,
        ),
        any::<bool>(),
    )
        .prop_map(|(specs, with_default)| {
            specs
                .into_iter()
                .enumerate()
                .map(|(i, (name, description, deleted, updated))| {
                    let is_default = with_default && i == 0;
                    RemoteList {
                        id: i as RemoteId + 1,
                        name,
                        description,
                        is_default,
                        deleted: deleted && !is_default,
                        created: None,
                        updated,
                    }
                })
                .collect()
        })
}

/// Strategy for generating up to `max` remote entries spread over `lists`.
///
/// Entries carry their list ID. No entries are generated without lists.
pub fn remote_entries_strategy(
    lists: Vec<RemoteList>,
    max: usize,
) -> impl Strategy<Value = Vec<RemoteEntry>> {
    let max = if lists.is_empty() { 0 } else { max };
    prop::collection::vec(
        (
            any::<prop::sample::Index>(),
            name_strategy(),
            prop::bool::weighted(0.1),
            timestamp_strategy(),
        ),
        0..=max,
    )
    .prop_map(move |specs| {
        specs
            .into_iter()
            .enumerate()
            .map(|(i, (list, title, deleted, updated))| RemoteEntry {
                id: FIRST_ENTRY_ID + i as RemoteId,
                list_id: Some(list.get(lists.as_slice()).id),
                project: "https://en.wikipedia.org".to_string(),
                title,
                deleted,
                created: None,
                updated,
            })
            .collect()
    })
}

/// Strategy for generating a consistent remote data set.
pub fn remote_data_set_strategy(
    max_lists: usize,
    max_entries: usize,
) -> impl Strategy<Value = (Vec<RemoteList>, Vec<RemoteEntry>)> {
    remote_lists_strategy(max_lists).prop_flat_map(move |lists| {
        let entries = remote_entries_strategy(lists.clone(), max_entries);
        (Just(lists), entries)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    proptest! {
        #[test]
        fn lists_have_unique_ids_and_one_default((lists, entries) in remote_data_set_strategy(8, 16)) {
            let ids: BTreeSet<_> = lists.iter().map(|l| l.id).collect();
            prop_assert_eq!(ids.len(), lists.len());
            prop_assert!(lists.iter().filter(|l| l.is_default).count() <= 1);
            for entry in &entries {
                prop_assert!(entry.list_id.is_some_and(|id| ids.contains(&id)));
            }
        }

        #[test]
        fn timestamps_are_real(t in timestamp_strategy()) {
            prop_assert!(!t.is_distant_past());
        }
    }
}
