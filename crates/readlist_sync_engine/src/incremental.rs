//! Incremental (delta) sync.

use crate::config::SyncConfig;
use crate::reconciler::{incremental_since, MergeReconciler};
use crate::remote::RemoteClient;
use crate::report::{PassReport, SyncMode};
use crate::watermark::WatermarkStore;
use parking_lot::RwLock;
use readlist_core::Database;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Phase of an incremental sync pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncrementalSyncPhase {
    /// No pass has run.
    Idle,
    /// Reading the stored watermark.
    CheckWatermark,
    /// Waiting on the delta fetch.
    FetchingDelta,
    /// Merging the delta.
    Merging,
    /// Writing the watermark and saving.
    Committing,
    /// The last pass finished.
    Done,
    /// The last pass found no watermark and did nothing.
    Skipped,
}

impl IncrementalSyncPhase {
    /// Returns true while a pass is running.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            IncrementalSyncPhase::CheckWatermark
                | IncrementalSyncPhase::FetchingDelta
                | IncrementalSyncPhase::Merging
                | IncrementalSyncPhase::Committing
        )
    }
}

/// Steady-state reconciliation of changes since the stored watermark.
///
/// Without a watermark the pass is skipped. Otherwise it fetches a single
/// delta, merges it into one transaction and saves. A failed delta fetch is
/// recorded in the report and leaves the store untouched; the next pass
/// retries from the same watermark. Incremental passes do not push local
/// edits.
pub struct IncrementalSyncEngine<R: RemoteClient + 'static> {
    remote: Arc<R>,
    store: Arc<Database>,
    reconciler: MergeReconciler,
    watermark: WatermarkStore,
    phase: RwLock<IncrementalSyncPhase>,
}

impl<R: RemoteClient + 'static> IncrementalSyncEngine<R> {
    /// Creates an incremental sync engine.
    pub fn new(config: &SyncConfig, remote: Arc<R>, store: Arc<Database>) -> Self {
        Self {
            remote,
            store,
            reconciler: MergeReconciler::new(config.push_batch_size),
            watermark: WatermarkStore::new(config.watermark_key.clone()),
            phase: RwLock::new(IncrementalSyncPhase::Idle),
        }
    }

    /// Returns the current phase.
    pub fn phase(&self) -> IncrementalSyncPhase {
        *self.phase.read()
    }

    fn set_phase(&self, phase: IncrementalSyncPhase) {
        *self.phase.write() = phase;
    }

    /// Runs one incremental sync pass.
    ///
    /// Never fails: fetch, merge and save errors all land in
    /// [`PassReport::errors`].
    pub async fn run(&self) -> PassReport {
        let start = Instant::now();

        self.set_phase(IncrementalSyncPhase::CheckWatermark);
        let since = {
            let txn = self.store.begin();
            self.watermark.read_raw(&txn)
        };
        let Some(since) = since else {
            info!("no watermark; incremental sync skipped");
            self.set_phase(IncrementalSyncPhase::Skipped);
            let mut report = PassReport::skipped(SyncMode::Incremental);
            report.duration = start.elapsed();
            return report;
        };

        self.set_phase(IncrementalSyncPhase::FetchingDelta);
        let delta = match self.remote.fetch_delta(&since).await {
            Ok(delta) => delta,
            Err(e) => {
                warn!(since = %since, error = %e, "incremental sync failed to fetch delta");
                let mut report = PassReport::new(SyncMode::Incremental);
                report.errors.push(e);
                report.duration = start.elapsed();
                self.set_phase(IncrementalSyncPhase::Done);
                return report;
            }
        };
        debug!(
            since = %since,
            lists = delta.lists.len(),
            entries = delta.entries.len(),
            "fetched delta"
        );

        self.set_phase(IncrementalSyncPhase::Merging);
        let mut report = PassReport::new(SyncMode::Incremental);
        let mut txn = self.store.begin();

        let lists = self.reconciler.merge_lists(&mut txn, &delta.lists);
        report.lists = lists.counts;
        report.errors.extend(lists.failures);

        let entries = self.reconciler.merge_entries(&mut txn, &delta.entries, None);
        report.entries = entries.counts;
        report.errors.extend(entries.failures);

        self.set_phase(IncrementalSyncPhase::Committing);
        let next = incremental_since(lists.since, entries.since);
        report.watermark = self.watermark.advance(&mut txn, next);

        report.commit(txn);
        report.duration = start.elapsed();
        self.set_phase(IncrementalSyncPhase::Done);

        info!(
            lists = report.lists.total(),
            entries = report.entries.total(),
            failures = report.errors.len(),
            watermark = ?report.watermark,
            "incremental sync finished"
        );
        report
    }
}

impl<R: RemoteClient + 'static> std::fmt::Debug for IncrementalSyncEngine<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IncrementalSyncEngine")
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use crate::remote::{MockRemote, RemoteDelta};
    use crate::report::PassStatus;
    use readlist_core::{RemoteEntry, RemoteList, Timestamp};

    fn ts(value: &str) -> Timestamp {
        Timestamp::parse(value).unwrap()
    }

    fn setup(remote: MockRemote) -> (IncrementalSyncEngine<MockRemote>, Arc<MockRemote>, Arc<Database>) {
        let remote = Arc::new(remote);
        let store = Arc::new(Database::open_in_memory().unwrap());
        let engine = IncrementalSyncEngine::new(&SyncConfig::default(), Arc::clone(&remote), Arc::clone(&store));
        (engine, remote, store)
    }

    fn set_watermark(store: &Database, value: &str) {
        store
            .transaction(|txn| {
                WatermarkStore::default().write(txn, ts(value));
                Ok(())
            })
            .unwrap();
    }

    #[tokio::test]
    async fn skipped_without_watermark() {
        let (engine, remote, store) = setup(MockRemote::new());
        let version = store.version();

        let report = engine.run().await;

        assert_eq!(report.status, PassStatus::Skipped);
        assert_eq!(engine.phase(), IncrementalSyncPhase::Skipped);
        assert!(remote.delta_requests().is_empty());
        assert_eq!(store.version(), version);
    }

    #[tokio::test]
    async fn passes_watermark_verbatim() {
        let (engine, remote, store) = setup(MockRemote::new());
        store
            .transaction(|txn| {
                txn.set_value(crate::watermark::WATERMARK_KEY, "2020-01-01T00:00:00.5Z");
                Ok(())
            })
            .unwrap();

        engine.run().await;

        assert_eq!(remote.delta_requests(), vec!["2020-01-01T00:00:00.5Z"]);
    }

    #[tokio::test]
    async fn delta_failure_is_recorded_and_pass_finishes() {
        let remote = MockRemote::new();
        remote.set_fail_delta(true);
        let (engine, remote, store) = setup(remote);
        set_watermark(&store, "2020-01-01T00:00:00Z");
        let version = store.version();

        let report = engine.run().await;

        assert_eq!(report.status, PassStatus::Completed);
        assert_eq!(engine.phase(), IncrementalSyncPhase::Done);
        assert_eq!(report.errors.len(), 1);
        assert!(matches!(report.errors[0], SyncError::Fetch { .. }));
        assert!(report.watermark.is_none());
        assert!(!report.committed);
        assert_eq!(store.version(), version);
        assert_eq!(
            store.get_value(crate::watermark::WATERMARK_KEY).as_deref(),
            Some("2020-01-01T00:00:00Z")
        );

        // next pass retries from the same watermark
        remote.set_fail_delta(false);
        engine.run().await;
        assert_eq!(
            remote.delta_requests(),
            vec!["2020-01-01T00:00:00Z", "2020-01-01T00:00:00Z"]
        );
    }

    #[tokio::test]
    async fn lists_only_delta_keeps_watermark() {
        let remote = MockRemote::new();
        remote.set_delta(RemoteDelta {
            lists: vec![RemoteList {
                id: 3,
                name: "New".into(),
                description: None,
                is_default: false,
                deleted: false,
                created: None,
                updated: ts("2020-06-01T00:00:00Z"),
            }],
            entries: Vec::<RemoteEntry>::new(),
        });
        let (engine, _remote, store) = setup(remote);
        set_watermark(&store, "2020-01-01T00:00:00Z");

        let report = engine.run().await;

        // min(list, DISTANT_PAST) is the sentinel
        assert!(report.watermark.is_none());
        assert!(report.committed);
        assert_eq!(
            store.get_value(crate::watermark::WATERMARK_KEY).as_deref(),
            Some("2020-01-01T00:00:00Z")
        );
        assert_eq!(store.lists().len(), 2);
    }
}
