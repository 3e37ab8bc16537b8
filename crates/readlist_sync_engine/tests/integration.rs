//! Integration tests for full and incremental sync against a mock remote.

use proptest::prelude::*;
use readlist_core::{ReadingList, ReadingListEntry, RemoteEntry, RemoteId, RemoteList};
use readlist_sync_engine::{
    MockRemote, PassStatus, RemoteDelta, SyncConfig, SyncCoordinator, SyncError, SyncMode,
    WATERMARK_KEY,
};
use readlist_testkit::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;

fn coordinator(store: &TestStore, remote: &Arc<MockRemote>) -> SyncCoordinator<MockRemote> {
    SyncCoordinator::with_shared_remote(
        SyncConfig::default(),
        Arc::clone(remote),
        Arc::clone(&store.db),
    )
}

fn serve(remote: &MockRemote, lists: &[RemoteList], entries: &[RemoteEntry]) {
    remote.set_lists(lists.to_vec());
    let mut by_list: BTreeMap<RemoteId, Vec<RemoteEntry>> = BTreeMap::new();
    for entry in entries {
        if let Some(list_id) = entry.list_id {
            by_list.entry(list_id).or_default().push(RemoteEntry {
                list_id: None,
                ..entry.clone()
            });
        }
    }
    for (list_id, entries) in by_list {
        remote.set_entries(list_id, entries);
    }
}

#[tokio::test]
async fn full_sync_bootstraps_store() {
    let store = TestStore::memory();
    let remote = Arc::new(MockRemote::new());
    remote.set_lists(vec![default_remote_list(1, "Saved", "2020-01-01T00:00:00Z")]);
    remote.set_entries(1, vec![remote_entry(10, "Rust", "2020-02-01T00:00:00Z")]);

    let report = coordinator(&store, &remote).sync().await.unwrap();

    assert_eq!(report.mode, SyncMode::Full);
    assert!(report.is_clean());
    assert!(report.committed);

    let default = store.default_list().unwrap();
    assert_eq!(default.remote_id, Some(1));
    assert_eq!(store.lists().iter().filter(|l| l.is_default).count(), 1);

    let entries = store.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].remote_id, Some(10));
    assert_eq!(entries[0].list_key, default.key);

    assert_eq!(
        store.get_value(WATERMARK_KEY).as_deref(),
        Some("2020-02-01T00:00:00Z")
    );
}

#[tokio::test]
async fn incremental_sync_takes_earlier_timestamp() {
    let store = TestStore::memory();
    store
        .transaction(|txn| {
            txn.set_value(WATERMARK_KEY, "2020-01-01T00:00:00Z");
            Ok(())
        })
        .unwrap();

    let remote = Arc::new(MockRemote::new());
    remote.set_delta(RemoteDelta {
        lists: vec![remote_list(2, "Later", "2020-02-01T00:00:00Z")],
        entries: vec![remote_entry_in(2, 20, "Ferris", "2020-03-01T00:00:00Z")],
    });

    let report = coordinator(&store, &remote).sync().await.unwrap();

    assert_eq!(report.mode, SyncMode::Incremental);
    assert_eq!(remote.delta_requests(), vec!["2020-01-01T00:00:00Z"]);
    assert_eq!(remote.list_fetch_count(), 0);
    assert_eq!(report.lists.created, 1);
    assert_eq!(report.entries.created, 1);
    assert_eq!(
        store.get_value(WATERMARK_KEY).as_deref(),
        Some("2020-02-01T00:00:00Z")
    );
}

#[tokio::test]
async fn full_sync_tolerates_entry_fetch_failure() {
    let store = TestStore::memory();
    let remote = Arc::new(MockRemote::new());
    remote.set_lists(vec![
        default_remote_list(1, "Saved", "2020-01-01T00:00:00Z"),
        remote_list(2, "Later", "2020-01-01T00:00:00Z"),
    ]);
    remote.set_entries(1, vec![remote_entry(10, "Lost", "2020-05-01T00:00:00Z")]);
    remote.set_entries(2, vec![remote_entry(20, "Kept", "2020-02-01T00:00:00Z")]);
    remote.fail_entries_for(1);

    let report = coordinator(&store, &remote).run_full_sync().await.unwrap();

    assert_eq!(report.status, PassStatus::Completed);
    assert_eq!(report.failed_entry_lists, vec![1]);
    assert!(matches!(report.errors[0], SyncError::Fetch { .. }));
    assert!(report.committed);

    let entries = store.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].remote_id, Some(20));
    assert_eq!(
        store.get_value(WATERMARK_KEY).as_deref(),
        Some("2020-02-01T00:00:00Z")
    );
}

#[tokio::test]
async fn incremental_without_watermark_does_nothing() {
    let store = TestStore::memory();
    let remote = Arc::new(MockRemote::new());
    let version = store.version();
    let before = store.snapshot();

    let report = coordinator(&store, &remote)
        .run_incremental_sync()
        .await
        .unwrap();

    assert_eq!(report.status, PassStatus::Skipped);
    assert!(remote.delta_requests().is_empty());
    assert_eq!(store.version(), version);
    assert_eq!(store.snapshot(), before);
}

#[tokio::test]
async fn local_entry_is_pushed_once() {
    let store = TestStore::memory();
    let default_key = store.default_list().unwrap().key;
    let entry_key = store
        .transaction(|txn| {
            txn.insert_entry(ReadingListEntry::new_local(
                default_key,
                "https://en.wikipedia.org",
                "Offline reading",
            ))
        })
        .unwrap();

    let remote = Arc::new(MockRemote::new());
    remote.set_lists(vec![default_remote_list(1, "Saved", "2020-01-01T00:00:00Z")]);
    let coordinator = coordinator(&store, &remote);

    let report = coordinator.run_full_sync().await.unwrap();
    assert_eq!(report.pushed, 1);

    let pushes = remote.pushes();
    assert_eq!(pushes.len(), 1);
    assert_eq!(pushes[0].entries.len(), 1);
    assert_eq!(pushes[0].entries[0].list_id, 1);

    let entry = store
        .entries()
        .into_iter()
        .find(|e| e.key == entry_key)
        .unwrap();
    assert!(!entry.is_updated_locally);
    assert_eq!(entry.remote_id, Some(MockRemote::FIRST_ASSIGNED_ID));

    coordinator.run_full_sync().await.unwrap();
    assert_eq!(remote.pushes().len(), 1);
}

#[tokio::test]
async fn push_failure_keeps_flags_and_merged_data() {
    let store = TestStore::memory();
    let list_key = store
        .transaction(|txn| txn.insert_list(ReadingList::new_local("Offline")))
        .unwrap();

    let remote = Arc::new(MockRemote::new());
    remote.set_lists(vec![remote_list(2, "Later", "2020-01-01T00:00:00Z")]);
    remote.set_fail_push(true);

    let report = coordinator(&store, &remote).run_full_sync().await.unwrap();

    assert!(report.committed);
    assert!(report
        .errors
        .iter()
        .any(|e| matches!(e, SyncError::Push { .. })));

    let lists = store.lists();
    assert!(lists.iter().any(|l| l.remote_id == Some(2)));
    let offline = lists.iter().find(|l| l.key == list_key).unwrap();
    assert!(offline.is_updated_locally);
    assert_eq!(offline.remote_id, None);
}

#[tokio::test]
async fn remote_ids_adopted_for_new_lists_and_entries() {
    let store = TestStore::memory();
    let (list_key, entry_key) = store
        .transaction(|txn| {
            let list_key = txn.insert_list(ReadingList::new_local("Trip"))?;
            let entry_key = txn.insert_entry(ReadingListEntry::new_local(
                list_key,
                "https://en.wikivoyage.org",
                "Lisbon",
            ))?;
            Ok((list_key, entry_key))
        })
        .unwrap();

    let remote = Arc::new(MockRemote::new());
    coordinator(&store, &remote).run_full_sync().await.unwrap();

    let list = store.lists().into_iter().find(|l| l.key == list_key).unwrap();
    let entry = store.entries().into_iter().find(|e| e.key == entry_key).unwrap();
    assert_eq!(list.remote_id, Some(MockRemote::FIRST_ASSIGNED_ID));
    assert_eq!(entry.remote_id, Some(MockRemote::FIRST_ASSIGNED_ID + 1));
    assert_eq!(remote.pushes()[1].entries[0].list_id, MockRemote::FIRST_ASSIGNED_ID);
}

#[tokio::test]
async fn capped_fan_out_fetches_every_list() {
    let store = TestStore::memory();
    let remote = Arc::new(MockRemote::new());
    let lists: Vec<_> = (1..=6)
        .map(|id| remote_list(id, &format!("List {id}"), "2020-01-01T00:00:00Z"))
        .collect();
    remote.set_lists(lists);
    for id in 1..=6 {
        remote.set_entries(id, vec![remote_entry(100 + id, "Page", "2020-01-02T00:00:00Z")]);
    }

    let coordinator = SyncCoordinator::with_shared_remote(
        SyncConfig::default().with_entry_fetch_concurrency(2),
        Arc::clone(&remote),
        Arc::clone(&store.db),
    );
    let report = coordinator.run_full_sync().await.unwrap();

    assert_eq!(remote.entry_fetch_count(), 6);
    assert_eq!(report.entries.created, 6);
    assert_eq!(store.entries().len(), 6);
}

#[tokio::test]
async fn file_store_keeps_sync_results_across_reopen() {
    let store = TestStore::file();
    let remote = Arc::new(MockRemote::new());
    remote.set_lists(vec![default_remote_list(1, "Saved", "2020-01-01T00:00:00Z")]);
    remote.set_entries(1, vec![remote_entry(10, "Rust", "2020-02-01T00:00:00Z")]);

    {
        let coordinator = coordinator(&store, &remote);
        coordinator.sync().await.unwrap();
    }

    let store = store.reopen();
    assert_eq!(store.default_list().unwrap().remote_id, Some(1));
    assert_eq!(store.entries().len(), 1);
    assert_eq!(
        store.get_value(WATERMARK_KEY).as_deref(),
        Some("2020-02-01T00:00:00Z")
    );

    let coordinator = coordinator(&store, &remote);
    assert_eq!(coordinator.next_mode(), SyncMode::Incremental);
}

#[tokio::test]
async fn remote_delete_soft_deletes_local_entry() {
    let store = TestStore::memory();
    let remote = Arc::new(MockRemote::new());
    remote.set_lists(vec![default_remote_list(1, "Saved", "2020-01-01T00:00:00Z")]);
    remote.set_entries(1, vec![remote_entry(10, "Rust", "2020-02-01T00:00:00Z")]);
    let coordinator = coordinator(&store, &remote);
    coordinator.sync().await.unwrap();

    let mut gone = remote_entry_in(1, 10, "Rust", "2020-03-01T00:00:00Z");
    gone.deleted = true;
    remote.set_delta(RemoteDelta {
        lists: vec![default_remote_list(1, "Saved", "2020-03-01T00:00:00Z")],
        entries: vec![gone],
    });
    coordinator.sync().await.unwrap();

    let entries = store.entries();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].is_deleted);
    assert_eq!(
        store.get_value(WATERMARK_KEY).as_deref(),
        Some("2020-03-01T00:00:00Z")
    );
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn full_sync_is_idempotent((lists, entries) in remote_data_set_strategy(6, 20)) {
        let store = TestStore::memory();
        let remote = Arc::new(MockRemote::new());
        serve(&remote, &lists, &entries);
        let coordinator = coordinator(&store, &remote);

        block_on(coordinator.run_full_sync()).unwrap();
        let version = store.version();
        let before = store.snapshot();

        let report = block_on(coordinator.run_full_sync()).unwrap();

        prop_assert!(!report.committed);
        prop_assert_eq!(report.lists.created + report.lists.updated, 0);
        prop_assert_eq!(report.entries.created + report.entries.updated, 0);
        prop_assert_eq!(store.version(), version);
        prop_assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn exactly_one_default_list_after_any_merge((lists, entries) in remote_data_set_strategy(6, 20)) {
        let store = TestStore::memory();
        let remote = Arc::new(MockRemote::new());
        serve(&remote, &lists, &entries);

        block_on(coordinator(&store, &remote).run_full_sync()).unwrap();

        let defaults: Vec<_> = store.lists().into_iter().filter(|l| l.is_default).collect();
        prop_assert_eq!(defaults.len(), 1);
        let remote_default = lists.iter().find(|l| l.is_default).map(|l| l.id);
        if remote_default.is_some() {
            prop_assert_eq!(defaults[0].remote_id, remote_default);
        }
    }

    #[test]
    fn watermark_is_never_distant_past((lists, entries) in remote_data_set_strategy(4, 8)) {
        let store = TestStore::memory();
        let remote = Arc::new(MockRemote::new());
        serve(&remote, &lists, &entries);

        let report = block_on(coordinator(&store, &remote).run_full_sync()).unwrap();

        match store.get_value(WATERMARK_KEY) {
            Some(value) => {
                let watermark = ts(&value);
                prop_assert!(!watermark.is_distant_past());
                prop_assert_eq!(report.watermark, Some(watermark));
            }
            None => prop_assert!(lists.is_empty()),
        }
    }
}
