//! # Readlist Sync Engine
//!
//! Full and incremental reconciliation of reading lists between a remote
//! service and the local store.
//!
//! This crate provides:
//! - Remote client abstraction with a mock for tests
//! - Create-or-update merge keyed by remote ID, with last-writer-wins for
//!   pending local edits
//! - Full sync with concurrent per-list entry fetches
//! - Incremental sync driven by a persisted watermark
//! - Upload of local edits with remote ID adoption
//!
//! ## Architecture
//!
//! A pass fetches first and only then opens a transaction:
//! 1. Fetch remote data (only a failed list fetch aborts a full pass)
//! 2. Merge into one transaction, recording soft failures
//! 3. Advance the watermark inside the same transaction
//! 4. Save once, only if anything changed
//!
//! ## Key Invariants
//!
//! - The watermark never moves backwards and never takes the distant-past
//!   sentinel
//! - The store holds exactly one default list
//! - Merging the same remote data twice leaves the store unchanged
//! - Errors after the fetch never roll back merged data

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod coordinator;
mod error;
mod full;
mod incremental;
mod reconciler;
mod remote;
mod report;
mod watermark;

pub use config::SyncConfig;
pub use coordinator::{SyncCoordinator, SyncStats};
pub use error::{SyncError, SyncResult};
pub use full::{FullSyncEngine, FullSyncPhase};
pub use incremental::{IncrementalSyncEngine, IncrementalSyncPhase};
pub use reconciler::{
    full_sync_since, incremental_since, MergeCounts, MergeReconciler, MergeSummary, PushReport,
};
pub use remote::{
    LocalChanges, MockRemote, PendingEntry, PendingList, PushAck, RemoteClient, RemoteDelta,
};
pub use report::{PassReport, PassStatus, SyncMode};
pub use watermark::{WatermarkStore, WATERMARK_KEY};
