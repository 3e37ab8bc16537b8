//! Create-or-update merge of remote records and upload of local edits.

use crate::error::{SyncError, SyncResult};
use crate::remote::{LocalChanges, PendingEntry, PendingList, RemoteClient};
use readlist_core::{
    CoreError, CoreResult, ReadingList, ReadingListEntry, RemoteEntry, RemoteId, RemoteList,
    Timestamp, Transaction,
};
use std::ops::AddAssign;
use tracing::{debug, info, warn};

/// Watermark candidate for a full sync: the later of the two maxima.
pub fn full_sync_since(list_since: Timestamp, entry_since: Timestamp) -> Timestamp {
    list_since.max(entry_since)
}

/// Watermark candidate for an incremental sync: the earlier of the two
/// maxima.
pub fn incremental_since(list_since: Timestamp, entry_since: Timestamp) -> Timestamp {
    list_since.min(entry_since)
}

/// Per-record outcome counts of a merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeCounts {
    /// Records created locally.
    pub created: usize,
    /// Existing records whose fields changed.
    pub updated: usize,
    /// Existing records already up to date (or kept by a newer local edit).
    pub unchanged: usize,
    /// Remote tombstones with no local counterpart.
    pub skipped: usize,
    /// Records that could not be merged.
    pub failed: usize,
}

impl MergeCounts {
    /// Total records processed.
    pub fn total(&self) -> usize {
        self.created + self.updated + self.unchanged + self.skipped + self.failed
    }
}

impl AddAssign for MergeCounts {
    fn add_assign(&mut self, other: Self) {
        self.created += other.created;
        self.updated += other.updated;
        self.unchanged += other.unchanged;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

/// Result of merging one batch of remote records.
#[derive(Debug)]
pub struct MergeSummary {
    /// Latest `updated` observed, or [`Timestamp::DISTANT_PAST`].
    pub since: Timestamp,
    /// Outcome counts.
    pub counts: MergeCounts,
    /// Records that failed to merge. Already merged records are kept.
    pub failures: Vec<SyncError>,
}

impl Default for MergeSummary {
    fn default() -> Self {
        Self {
            since: Timestamp::DISTANT_PAST,
            counts: MergeCounts::default(),
            failures: Vec::new(),
        }
    }
}

impl MergeSummary {
    fn observe(&mut self, updated: Timestamp) {
        if updated > self.since {
            self.since = updated;
        }
    }

    fn record(&mut self, outcome: CoreResult<Outcome>) {
        match outcome {
            Ok(Outcome::Created) => self.counts.created += 1,
            Ok(Outcome::Updated) => self.counts.updated += 1,
            Ok(Outcome::Unchanged) => self.counts.unchanged += 1,
            Ok(Outcome::Skipped) => self.counts.skipped += 1,
            Err(e) => {
                warn!(error = %e, "failed to merge remote record");
                self.counts.failed += 1;
                self.failures.push(SyncError::Merge(e));
            }
        }
    }
}

enum Outcome {
    Created,
    Updated,
    Unchanged,
    Skipped,
}

impl From<bool> for Outcome {
    fn from(changed: bool) -> Self {
        if changed {
            Outcome::Updated
        } else {
            Outcome::Unchanged
        }
    }
}

/// Result of pushing local edits.
#[derive(Debug, Default)]
pub struct PushReport {
    /// Lists acknowledged and cleared.
    pub lists_pushed: usize,
    /// Entries acknowledged and cleared.
    pub entries_pushed: usize,
    /// Local-only tombstones cleared without an upload.
    pub discarded: usize,
    /// Items left flagged for a later pass.
    pub deferred: usize,
    /// Failed push batches.
    pub failures: Vec<SyncError>,
}

/// Merges remote records into a transaction and uploads local edits.
#[derive(Debug, Clone)]
pub struct MergeReconciler {
    push_batch_size: usize,
}

impl MergeReconciler {
    /// Creates a reconciler pushing at most `push_batch_size` items per call.
    pub fn new(push_batch_size: usize) -> Self {
        Self {
            push_batch_size: push_batch_size.max(1),
        }
    }

    /// Creates or updates local lists from remote lists.
    ///
    /// The first remote list marked default lends its ID to the local
    /// default list before any other record is merged.
    pub fn merge_lists(&self, txn: &mut Transaction<'_>, remote_lists: &[RemoteList]) -> MergeSummary {
        let mut summary = MergeSummary::default();

        if let Err(e) = self.adopt_default_list(txn, remote_lists) {
            warn!(error = %e, "failed to adopt remote default list");
            summary.failures.push(SyncError::Merge(e));
        }

        for remote in remote_lists {
            summary.observe(remote.updated);
            summary.record(self.merge_list(txn, remote));
        }

        debug!(
            created = summary.counts.created,
            updated = summary.counts.updated,
            since = ?summary.since,
            "merged remote lists"
        );
        summary
    }

    fn adopt_default_list(&self, txn: &mut Transaction<'_>, remote_lists: &[RemoteList]) -> CoreResult<()> {
        let mut defaults = remote_lists.iter().filter(|l| l.is_default);
        let Some(remote_default) = defaults.next() else {
            return Ok(());
        };
        if defaults.next().is_some() {
            warn!(
                adopted = remote_default.id,
                "service marked more than one default list"
            );
        }

        let Some(local_key) = txn.default_list().map(|l| l.key) else {
            warn!("store has no default list to adopt the remote default");
            return Ok(());
        };
        let stale: Vec<_> = txn
            .lists()
            .filter(|l| l.key != local_key && l.remote_id == Some(remote_default.id))
            .map(|l| l.key)
            .collect();
        for key in stale {
            warn!(
                list = %key,
                remote_id = remote_default.id,
                "remote default moved; clearing remote ID of the old local copy"
            );
            txn.update_list(key, |l| l.remote_id = None)?;
        }
        if txn.update_list(local_key, |l| l.remote_id = Some(remote_default.id))? {
            info!(remote_id = remote_default.id, "default list adopted remote ID");
        }
        Ok(())
    }

    fn merge_list(&self, txn: &mut Transaction<'_>, remote: &RemoteList) -> CoreResult<Outcome> {
        match txn.list_by_remote_id(remote.id).map(|l| l.key) {
            Some(key) => Ok(txn
                .update_list(key, |list| {
                    list.apply_remote(remote);
                })?
                .into()),
            None if remote.deleted => Ok(Outcome::Skipped),
            None => {
                txn.insert_list(ReadingList::from_remote(remote))?;
                Ok(Outcome::Created)
            }
        }
    }

    /// Creates or updates local entries from remote entries.
    ///
    /// `list_remote_id` names the owning list for batches fetched per list;
    /// otherwise each entry's own `list_id` is used.
    pub fn merge_entries(
        &self,
        txn: &mut Transaction<'_>,
        remote_entries: &[RemoteEntry],
        list_remote_id: Option<RemoteId>,
    ) -> MergeSummary {
        let mut summary = MergeSummary::default();

        for remote in remote_entries {
            summary.observe(remote.updated);
            let list_id = list_remote_id.or(remote.list_id);
            summary.record(self.merge_entry(txn, remote, list_id));
        }

        debug!(
            list_id = ?list_remote_id,
            created = summary.counts.created,
            updated = summary.counts.updated,
            since = ?summary.since,
            "merged remote entries"
        );
        summary
    }

    fn merge_entry(
        &self,
        txn: &mut Transaction<'_>,
        remote: &RemoteEntry,
        list_id: Option<RemoteId>,
    ) -> CoreResult<Outcome> {
        let list_key = list_id.and_then(|id| txn.list_by_remote_id(id)).map(|l| l.key);
        let Some(list_key) = list_key else {
            if remote.deleted {
                return Ok(Outcome::Skipped);
            }
            return Err(CoreError::list_not_found(format!(
                "remote list {list_id:?} for entry {}",
                remote.id
            )));
        };

        match txn.entry_by_remote_id(remote.id).map(|e| e.key) {
            Some(key) => Ok(txn
                .update_entry(key, |entry| {
                    entry.apply_remote(remote, list_key);
                })?
                .into()),
            None if remote.deleted => Ok(Outcome::Skipped),
            None => {
                txn.insert_entry(ReadingListEntry::from_remote(remote, list_key))?;
                Ok(Outcome::Created)
            }
        }
    }

    /// Pushes every list and entry flagged as updated locally, then clears
    /// the flag on acknowledged items and adopts their remote IDs.
    ///
    /// Lists go first so entries of new lists can reference the IDs the
    /// service assigned. A failed batch stays flagged and is recorded in
    /// the report; it does not undo anything already merged.
    ///
    /// # Errors
    ///
    /// Returns an error only if the transaction itself rejects an update.
    pub async fn push_local_changes<R>(&self, txn: &mut Transaction<'_>, remote: &R) -> SyncResult<PushReport>
    where
        R: RemoteClient + ?Sized,
    {
        let mut report = PushReport::default();

        let mut pending_lists = Vec::new();
        for list in txn.lists_updated_locally() {
            if list.is_deleted && list.remote_id.is_none() {
                txn.update_list(list.key, |l| l.is_updated_locally = false)?;
                report.discarded += 1;
            } else if list.is_default && list.remote_id.is_none() {
                // The service owns the default list; wait until it is adopted.
                report.deferred += 1;
            } else {
                pending_lists.push(PendingList::from(&list));
            }
        }

        for batch in pending_lists.chunks(self.push_batch_size) {
            let changes = LocalChanges {
                lists: batch.to_vec(),
                entries: Vec::new(),
            };
            match remote.push(&changes).await {
                Ok(ack) => {
                    for pending in batch {
                        match ack.lists.get(&pending.key) {
                            Some(&remote_id) => {
                                txn.update_list(pending.key, |l| {
                                    l.remote_id = Some(remote_id);
                                    l.is_updated_locally = false;
                                })?;
                                report.lists_pushed += 1;
                            }
                            None => report.deferred += 1,
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, count = batch.len(), "failed to push local lists");
                    report.deferred += batch.len();
                    report.failures.push(e);
                }
            }
        }

        let mut pending_entries = Vec::new();
        for entry in txn.entries_updated_locally() {
            let list_id = txn.list(entry.list_key).and_then(|l| l.remote_id);
            match list_id {
                _ if entry.is_deleted && entry.remote_id.is_none() => {
                    txn.update_entry(entry.key, |e| e.is_updated_locally = false)?;
                    report.discarded += 1;
                }
                Some(list_id) => pending_entries.push(PendingEntry::new(&entry, list_id)),
                None => {
                    debug!(entry = %entry.key, "list not yet synced; entry deferred");
                    report.deferred += 1;
                }
            }
        }

        for batch in pending_entries.chunks(self.push_batch_size) {
            let changes = LocalChanges {
                lists: Vec::new(),
                entries: batch.to_vec(),
            };
            match remote.push(&changes).await {
                Ok(ack) => {
                    for pending in batch {
                        match ack.entries.get(&pending.key) {
                            Some(&remote_id) => {
                                txn.update_entry(pending.key, |e| {
                                    e.remote_id = Some(remote_id);
                                    e.is_updated_locally = false;
                                })?;
                                report.entries_pushed += 1;
                            }
                            None => report.deferred += 1,
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, count = batch.len(), "failed to push local entries");
                    report.deferred += batch.len();
                    report.failures.push(e);
                }
            }
        }

        if report.lists_pushed + report.entries_pushed > 0 {
            info!(
                lists = report.lists_pushed,
                entries = report.entries_pushed,
                "pushed local changes"
            );
        }
        Ok(report)
    }
}

impl Default for MergeReconciler {
    fn default() -> Self {
        Self::new(50)
    }
}
