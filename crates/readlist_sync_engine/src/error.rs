//! Error types for the sync engine.

use readlist_core::CoreError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Network or API failure fetching lists, entries, or a delta.
    #[error("fetch error: {message}")]
    Fetch {
        /// Error message.
        message: String,
        /// Whether the fetch can be retried.
        retryable: bool,
    },

    /// A remote record could not be created or updated locally.
    #[error("merge error: {0}")]
    Merge(#[source] CoreError),

    /// Local changes could not be pushed upstream.
    #[error("push error: {message}")]
    Push {
        /// Error message.
        message: String,
    },

    /// The transaction could not be saved.
    #[error("persist error: {0}")]
    Persist(#[source] CoreError),

    /// Store error outside merge and save (e.g. watermark access).
    #[error("store error: {0}")]
    Store(#[from] CoreError),

    /// A fan-out task panicked or was aborted.
    #[error("task failed: {0}")]
    Task(String),
}

impl SyncError {
    /// Creates a retryable fetch error.
    pub fn fetch_retryable(message: impl Into<String>) -> Self {
        Self::Fetch {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable fetch error.
    pub fn fetch_fatal(message: impl Into<String>) -> Self {
        Self::Fetch {
            message: message.into(),
            retryable: false,
        }
    }

    /// Creates a push error.
    pub fn push(message: impl Into<String>) -> Self {
        Self::Push {
            message: message.into(),
        }
    }

    /// Returns true if this error can be retried on the next pass.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Fetch { retryable, .. } => *retryable,
            SyncError::Push { .. } => true,
            SyncError::Persist(CoreError::TransactionConflict { .. }) => true,
            _ => false,
        }
    }

    /// Short name of the error class, for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            SyncError::Fetch { .. } => "fetch",
            SyncError::Merge(_) => "merge",
            SyncError::Push { .. } => "push",
            SyncError::Persist(_) => "persist",
            SyncError::Store(_) => "store",
            SyncError::Task(_) => "task",
        }
    }
}
