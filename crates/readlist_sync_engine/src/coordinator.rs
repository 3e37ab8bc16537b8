//! Entry point choosing between full and incremental sync.

use crate::config::SyncConfig;
use crate::error::SyncResult;
use crate::full::FullSyncEngine;
use crate::incremental::IncrementalSyncEngine;
use crate::remote::RemoteClient;
use crate::report::{PassReport, PassStatus, SyncMode};
use crate::watermark::WatermarkStore;
use parking_lot::RwLock;
use readlist_core::Database;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Cumulative statistics over every pass run by a coordinator.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Completed full passes.
    pub full_passes: u64,
    /// Completed incremental passes.
    pub incremental_passes: u64,
    /// Incremental passes skipped for lack of a watermark.
    pub skipped_passes: u64,
    /// Full passes that failed to fetch the remote lists.
    pub failed_passes: u64,
    /// Lists created or updated.
    pub lists_merged: u64,
    /// Entries created or updated.
    pub entries_merged: u64,
    /// Items acknowledged by the service.
    pub items_pushed: u64,
    /// Soft failures recorded in reports.
    pub soft_failures: u64,
    /// Last pass time.
    pub last_sync_time: Option<Instant>,
    /// Last error message.
    pub last_error: Option<String>,
}

/// Runs sync passes against one store and one remote.
///
/// [`SyncCoordinator::sync`] picks the pass from the stored watermark: a
/// full pass if no sync has completed yet, an incremental pass otherwise.
/// The coordinator does not serialize passes; callers running passes
/// concurrently get a `TransactionConflict` on the losing save.
pub struct SyncCoordinator<R: RemoteClient + 'static> {
    store: Arc<Database>,
    watermark: WatermarkStore,
    full: FullSyncEngine<R>,
    incremental: IncrementalSyncEngine<R>,
    stats: RwLock<SyncStats>,
}

impl<R: RemoteClient + 'static> SyncCoordinator<R> {
    /// Creates a coordinator owning `remote`.
    pub fn new(config: SyncConfig, remote: R, store: Arc<Database>) -> Self {
        Self::with_shared_remote(config, Arc::new(remote), store)
    }

    /// Creates a coordinator over a shared remote.
    pub fn with_shared_remote(config: SyncConfig, remote: Arc<R>, store: Arc<Database>) -> Self {
        Self {
            watermark: WatermarkStore::new(config.watermark_key.clone()),
            full: FullSyncEngine::new(&config, Arc::clone(&remote), Arc::clone(&store)),
            incremental: IncrementalSyncEngine::new(&config, remote, Arc::clone(&store)),
            store,
            stats: RwLock::new(SyncStats::default()),
        }
    }

    /// Returns the store.
    pub fn store(&self) -> &Arc<Database> {
        &self.store
    }

    /// Returns the full sync engine.
    pub fn full_engine(&self) -> &FullSyncEngine<R> {
        &self.full
    }

    /// Returns the incremental sync engine.
    pub fn incremental_engine(&self) -> &IncrementalSyncEngine<R> {
        &self.incremental
    }

    /// Returns cumulative statistics.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Returns the pass [`SyncCoordinator::sync`] would run now.
    pub fn next_mode(&self) -> SyncMode {
        let txn = self.store.begin();
        if self.watermark.read_raw(&txn).is_some() {
            SyncMode::Incremental
        } else {
            SyncMode::Full
        }
    }

    /// Runs a full pass if no sync has completed yet, an incremental pass
    /// otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error only if a full pass could not fetch the remote lists.
    /// Every other failure is recorded in the returned report.
    pub async fn sync(&self) -> SyncResult<PassReport> {
        let mode = self.next_mode();
        debug!(%mode, "dispatching sync pass");
        match mode {
            SyncMode::Full => self.run_full_sync().await,
            SyncMode::Incremental => self.run_incremental_sync().await,
        }
    }

    /// Runs a full pass.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote lists cannot be fetched.
    pub async fn run_full_sync(&self) -> SyncResult<PassReport> {
        let result = self.full.run().await;
        self.record(&result);
        result
    }

    /// Runs an incremental pass.
    ///
    /// A failed delta fetch is a soft failure in the report, never an error.
    pub async fn run_incremental_sync(&self) -> SyncResult<PassReport> {
        let result = Ok(self.incremental.run().await);
        self.record(&result);
        result
    }

    fn record(&self, result: &SyncResult<PassReport>) {
        let mut stats = self.stats.write();
        stats.last_sync_time = Some(Instant::now());

        let report = match result {
            Ok(report) => report,
            Err(e) => {
                stats.failed_passes += 1;
                stats.last_error = Some(e.to_string());
                return;
            }
        };

        match (report.mode, report.status) {
            (_, PassStatus::Skipped) => stats.skipped_passes += 1,
            (SyncMode::Full, PassStatus::Completed) => stats.full_passes += 1,
            (SyncMode::Incremental, PassStatus::Completed) => stats.incremental_passes += 1,
        }
        stats.lists_merged += (report.lists.created + report.lists.updated) as u64;
        stats.entries_merged += (report.entries.created + report.entries.updated) as u64;
        stats.items_pushed += report.pushed as u64;
        stats.soft_failures += report.errors.len() as u64;
        if let Some(last) = report.errors.last() {
            stats.last_error = Some(last.to_string());
        }

        info!(
            mode = %report.mode,
            status = ?report.status,
            committed = report.committed,
            duration_ms = report.duration.as_millis() as u64,
            "sync pass recorded"
        );
    }
}

impl<R: RemoteClient + 'static> std::fmt::Debug for SyncCoordinator<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncCoordinator")
            .field("full", &self.full)
            .field("incremental", &self.incremental)
            .field("stats", &*self.stats.read())
            .finish_non_exhaustive()
    }
}
