//! Full (bootstrap) sync.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::reconciler::{full_sync_since, MergeCounts, MergeReconciler};
use crate::remote::RemoteClient;
use crate::report::{PassReport, SyncMode};
use crate::watermark::WatermarkStore;
use parking_lot::RwLock;
use readlist_core::{Database, RemoteEntry, RemoteId, Timestamp};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Phase of a full sync pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FullSyncPhase {
    /// No pass has run.
    Idle,
    /// Fetching and merging remote lists.
    FetchingLists,
    /// Waiting on the per-list entry fetches.
    FetchingEntries,
    /// Merging fetched entries.
    Merging,
    /// Writing the watermark, pushing local edits and saving.
    Committing,
    /// The last pass finished.
    Done,
    /// The last pass failed before touching the store.
    Failed,
}

impl FullSyncPhase {
    /// Returns true while a pass is running.
    pub fn is_active(&self) -> bool {
        !matches!(
            self,
            FullSyncPhase::Idle | FullSyncPhase::Done | FullSyncPhase::Failed
        )
    }
}

/// Bootstrap reconciliation over the entire remote data set.
///
/// One pass fetches every remote list, fetches the entries of all lists
/// concurrently, merges everything into a single transaction, advances the
/// watermark to the latest timestamp seen, pushes pending local edits and
/// saves. Only a failure to fetch the lists aborts the pass; everything
/// after that is recorded in the report and the pass still saves.
pub struct FullSyncEngine<R: RemoteClient + 'static> {
    remote: Arc<R>,
    store: Arc<Database>,
    reconciler: MergeReconciler,
    watermark: WatermarkStore,
    entry_fetch_concurrency: Option<usize>,
    phase: RwLock<FullSyncPhase>,
}

impl<R: RemoteClient + 'static> FullSyncEngine<R> {
    /// Creates a full sync engine.
    pub fn new(config: &SyncConfig, remote: Arc<R>, store: Arc<Database>) -> Self {
        Self {
            remote,
            store,
            reconciler: MergeReconciler::new(config.push_batch_size),
            watermark: WatermarkStore::new(config.watermark_key.clone()),
            entry_fetch_concurrency: config.entry_fetch_concurrency,
            phase: RwLock::new(FullSyncPhase::Idle),
        }
    }

    /// Returns the current phase.
    pub fn phase(&self) -> FullSyncPhase {
        *self.phase.read()
    }

    fn set_phase(&self, phase: FullSyncPhase) {
        *self.phase.write() = phase;
    }

    /// Runs one full sync pass.
    ///
    /// # Errors
    ///
    /// Returns an error only if the remote lists cannot be fetched. The
    /// store is untouched in that case.
    pub async fn run(&self) -> SyncResult<PassReport> {
        let start = Instant::now();
        let mut report = PassReport::new(SyncMode::Full);

        self.set_phase(FullSyncPhase::FetchingLists);
        let remote_lists = match self.remote.fetch_all_lists().await {
            Ok(lists) => lists,
            Err(e) => {
                error!(error = %e, "full sync failed to fetch lists");
                self.set_phase(FullSyncPhase::Failed);
                return Err(e);
            }
        };
        debug!(count = remote_lists.len(), "fetched remote lists");

        let mut txn = self.store.begin();
        let lists = self.reconciler.merge_lists(&mut txn, &remote_lists);
        let list_since = lists.since;
        report.lists = lists.counts;
        report.errors.extend(lists.failures);

        self.set_phase(FullSyncPhase::FetchingEntries);
        let list_ids: Vec<RemoteId> = remote_lists.iter().map(|l| l.id).collect();
        let batches = self.fetch_entry_batches(list_ids, &mut report).await;

        self.set_phase(FullSyncPhase::Merging);
        let mut entry_since = Timestamp::DISTANT_PAST;
        let mut entry_counts = MergeCounts::default();
        for (list_id, entries) in &batches {
            let merged = self.reconciler.merge_entries(&mut txn, entries, Some(*list_id));
            entry_since = entry_since.max(merged.since);
            entry_counts += merged.counts;
            report.errors.extend(merged.failures);
        }
        report.entries = entry_counts;

        self.set_phase(FullSyncPhase::Committing);
        let since = full_sync_since(list_since, entry_since);
        report.watermark = self.watermark.advance(&mut txn, since);

        match self
            .reconciler
            .push_local_changes(&mut txn, self.remote.as_ref())
            .await
        {
            Ok(push) => report.absorb_push(push),
            Err(e) => {
                warn!(error = %e, "failed to apply push acknowledgements");
                report.errors.push(e);
            }
        }

        report.commit(txn);
        report.duration = start.elapsed();
        self.set_phase(FullSyncPhase::Done);

        info!(
            lists = report.lists.total(),
            entries = report.entries.total(),
            pushed = report.pushed,
            failures = report.errors.len(),
            watermark = ?report.watermark,
            "full sync finished"
        );
        Ok(report)
    }

    /// Fetches the entries of every list concurrently and waits for all of
    /// them. Failed lists are recorded and left out of the result, which is
    /// ordered by list ID.
    async fn fetch_entry_batches(
        &self,
        list_ids: Vec<RemoteId>,
        report: &mut PassReport,
    ) -> Vec<(RemoteId, Vec<RemoteEntry>)> {
        let limiter = self
            .entry_fetch_concurrency
            .map(|limit| Arc::new(Semaphore::new(limit)));

        let mut tasks = JoinSet::new();
        for list_id in list_ids {
            let remote = Arc::clone(&self.remote);
            let limiter = limiter.clone();
            tasks.spawn(async move {
                let _permit = match limiter {
                    Some(semaphore) => semaphore.acquire_owned().await.ok(),
                    None => None,
                };
                (list_id, remote.fetch_entries(list_id).await)
            });
        }

        let mut batches = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((list_id, Ok(entries))) => {
                    debug!(list_id, count = entries.len(), "fetched list entries");
                    batches.push((list_id, entries));
                }
                Ok((list_id, Err(e))) => {
                    warn!(list_id, error = %e, "failed to fetch list entries");
                    report.failed_entry_lists.push(list_id);
                    report.errors.push(e);
                }
                Err(e) => {
                    warn!(error = %e, "entry fetch task failed");
                    report.errors.push(SyncError::Task(e.to_string()));
                }
            }
        }

        batches.sort_by_key(|(list_id, _)| *list_id);
        report.failed_entry_lists.sort_unstable();
        batches
    }
}

impl<R: RemoteClient + 'static> std::fmt::Debug for FullSyncEngine<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FullSyncEngine")
            .field("phase", &self.phase())
            .field("entry_fetch_concurrency", &self.entry_fetch_concurrency)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MockRemote;
    use readlist_core::RemoteList;

    fn ts(value: &str) -> Timestamp {
        Timestamp::parse(value).unwrap()
    }

    fn list(id: RemoteId, is_default: bool, updated: &str) -> RemoteList {
        RemoteList {
            id,
            name: format!("List {id}"),
            description: None,
            is_default,
            deleted: false,
            created: None,
            updated: ts(updated),
        }
    }

    fn entry(id: RemoteId, updated: &str) -> RemoteEntry {
        RemoteEntry {
            id,
            list_id: None,
            project: "https://en.wikipedia.org".into(),
            title: format!("Page {id}"),
            deleted: false,
            created: None,
            updated: ts(updated),
        }
    }

    fn engine(remote: MockRemote, config: SyncConfig) -> (FullSyncEngine<MockRemote>, Arc<MockRemote>, Arc<Database>) {
        let remote = Arc::new(remote);
        let store = Arc::new(Database::open_in_memory().unwrap());
        let engine = FullSyncEngine::new(&config, Arc::clone(&remote), Arc::clone(&store));
        (engine, remote, store)
    }

    #[tokio::test]
    async fn list_fetch_failure_leaves_store_untouched() {
        let remote = MockRemote::new();
        remote.set_fail_list_fetch(true);
        let (engine, remote, store) = engine(remote, SyncConfig::default());
        let version = store.version();

        assert!(engine.run().await.is_err());
        assert_eq!(engine.phase(), FullSyncPhase::Failed);
        assert_eq!(store.version(), version);
        assert_eq!(remote.entry_fetch_count(), 0);
    }

    #[tokio::test]
    async fn fetches_entries_of_every_list() {
        let remote = MockRemote::new();
        remote.set_lists(vec![
            list(1, true, "2020-01-01T00:00:00Z"),
            list(2, false, "2020-01-01T00:00:00Z"),
        ]);
        remote.set_entries(2, vec![entry(20, "2020-02-01T00:00:00Z")]);
        let (engine, remote, store) = engine(remote, SyncConfig::default().with_entry_fetch_concurrency(1));

        let report = engine.run().await.unwrap();
        assert_eq!(remote.entry_fetch_count(), 2);
        assert_eq!(report.entries.created, 1);

        // the list and its entry are then deleted upstream
        let mut gone = list(2, false, "2020-08-01T00:00:00Z");
        gone.deleted = true;
        let mut tombstone = entry(20, "2020-09-01T00:00:00Z");
        tombstone.deleted = true;
        remote.set_lists(vec![list(1, true, "2020-01-01T00:00:00Z"), gone]);
        remote.set_entries(2, vec![tombstone]);

        let report = engine.run().await.unwrap();

        assert_eq!(engine.phase(), FullSyncPhase::Done);
        assert_eq!(remote.entry_fetch_count(), 4);
        assert_eq!(report.entries.updated, 1);
        assert_eq!(report.watermark, Some(ts("2020-09-01T00:00:00Z")));
        assert!(report.committed);
        let entries = store.entries();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].is_deleted);
        assert!(store.lists().iter().any(|l| l.remote_id == Some(2) && l.is_deleted));
    }

    #[tokio::test]
    async fn deleted_list_tombstones_advance_watermark() {
        let remote = MockRemote::new();
        let mut gone = list(2, false, "2020-01-01T00:00:00Z");
        gone.deleted = true;
        let mut tombstone = entry(20, "2020-09-01T00:00:00Z");
        tombstone.deleted = true;
        remote.set_lists(vec![list(1, true, "2020-01-01T00:00:00Z"), gone]);
        remote.set_entries(2, vec![tombstone]);
        let (engine, remote, store) = engine(remote, SyncConfig::default());

        let report = engine.run().await.unwrap();

        assert_eq!(remote.entry_fetch_count(), 2);
        assert_eq!(report.entries.skipped, 1);
        assert!(report.errors.is_empty());
        assert_eq!(report.watermark, Some(ts("2020-09-01T00:00:00Z")));
        assert!(store.entries().is_empty());
    }

    #[tokio::test]
    async fn empty_remote_does_not_write_watermark() {
        let (engine, _remote, store) = engine(MockRemote::new(), SyncConfig::default());
        let version = store.version();

        let report = engine.run().await.unwrap();

        assert!(report.watermark.is_none());
        assert!(!report.committed);
        assert_eq!(store.version(), version);
    }

    #[tokio::test]
    async fn watermark_does_not_move_backwards() {
        let remote = MockRemote::new();
        remote.set_lists(vec![list(1, true, "2020-01-01T00:00:00Z")]);
        let (engine, _remote, store) = engine(remote, SyncConfig::default());
        store
            .transaction(|txn| {
                WatermarkStore::default().write(txn, ts("2021-01-01T00:00:00Z"));
                Ok(())
            })
            .unwrap();

        let report = engine.run().await.unwrap();

        assert!(report.watermark.is_none());
        assert_eq!(
            store.get_value(crate::watermark::WATERMARK_KEY).as_deref(),
            Some("2021-01-01T00:00:00Z")
        );
    }
}
