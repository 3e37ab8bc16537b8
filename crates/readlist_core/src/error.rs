//! Error types for the reading-list store.

use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in store operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Snapshot could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Another process holds the store lock.
    #[error("store locked: another process has exclusive access")]
    StoreLocked,

    /// Another transaction committed since this one began.
    #[error("transaction conflict: began at version {expected}, store is at {actual}")]
    TransactionConflict {
        /// Version the transaction was based on.
        expected: u64,
        /// Version currently committed.
        actual: u64,
    },

    /// Operation not permitted in current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why operation is invalid.
        message: String,
    },

    /// A timestamp string is not valid ISO-8601.
    #[error("invalid timestamp: {value:?}")]
    InvalidTimestamp {
        /// The rejected value.
        value: String,
    },

    /// A list or entry was not found.
    #[error("{kind} not found: {key}")]
    NotFound {
        /// "list" or "entry".
        kind: &'static str,
        /// The key that was searched.
        key: String,
    },
}

impl CoreError {
    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Creates an invalid timestamp error.
    pub fn invalid_timestamp(value: impl Into<String>) -> Self {
        Self::InvalidTimestamp {
            value: value.into(),
        }
    }

    /// Creates a list-not-found error.
    pub fn list_not_found(key: impl ToString) -> Self {
        Self::NotFound {
            kind: "list",
            key: key.to_string(),
        }
    }

    /// Creates an entry-not-found error.
    pub fn entry_not_found(key: impl ToString) -> Self {
        Self::NotFound {
            kind: "entry",
            key: key.to_string(),
        }
    }
}
