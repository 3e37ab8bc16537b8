//! Outcome of a sync pass.

use crate::error::SyncError;
use crate::reconciler::{MergeCounts, PushReport};
use readlist_core::{RemoteId, Timestamp, Transaction};
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

/// Which kind of pass ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Bootstrap pass over the entire remote data set.
    Full,
    /// Delta pass since the stored watermark.
    Incremental,
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncMode::Full => write!(f, "full"),
            SyncMode::Incremental => write!(f, "incremental"),
        }
    }
}

/// How a pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassStatus {
    /// The pass ran to the end. Soft failures may still be recorded.
    Completed,
    /// The pass had nothing to do (incremental sync without a watermark).
    Skipped,
}

/// Report of a finished pass.
#[derive(Debug)]
pub struct PassReport {
    /// Kind of pass.
    pub mode: SyncMode,
    /// How the pass ended.
    pub status: PassStatus,
    /// List merge counts.
    pub lists: MergeCounts,
    /// Entry merge counts.
    pub entries: MergeCounts,
    /// Lists whose entry fetch failed (full sync only).
    pub failed_entry_lists: Vec<RemoteId>,
    /// Items acknowledged by the service (full sync only).
    pub pushed: usize,
    /// Watermark written by this pass, if it moved.
    pub watermark: Option<Timestamp>,
    /// Whether a transaction was saved.
    pub committed: bool,
    /// Soft failures, in the order they happened.
    pub errors: Vec<SyncError>,
    /// Wall-clock duration.
    pub duration: Duration,
}

impl PassReport {
    pub(crate) fn new(mode: SyncMode) -> Self {
        Self {
            mode,
            status: PassStatus::Completed,
            lists: MergeCounts::default(),
            entries: MergeCounts::default(),
            failed_entry_lists: Vec::new(),
            pushed: 0,
            watermark: None,
            committed: false,
            errors: Vec::new(),
            duration: Duration::ZERO,
        }
    }

    pub(crate) fn skipped(mode: SyncMode) -> Self {
        Self {
            status: PassStatus::Skipped,
            ..Self::new(mode)
        }
    }

    /// Returns true if the pass recorded no soft failures.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub(crate) fn absorb_push(&mut self, push: PushReport) {
        self.pushed += push.lists_pushed + push.entries_pushed;
        self.errors.extend(push.failures);
    }

    /// Saves `txn` if it holds changes, recording the outcome.
    pub(crate) fn commit(&mut self, txn: Transaction<'_>) {
        if !txn.has_changes() {
            debug!(mode = %self.mode, "nothing changed; skipping save");
            return;
        }
        match txn.save() {
            Ok(()) => self.committed = true,
            Err(e) => {
                warn!(mode = %self.mode, error = %e, "failed to save sync transaction");
                // nothing written; the watermark did not move either
                self.watermark = None;
                self.errors.push(SyncError::Persist(e));
            }
        }
    }
}
