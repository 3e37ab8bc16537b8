//! # Readlist Core
//!
//! Data model and local store for reading-list synchronization.
//!
//! This crate provides:
//! - Reading lists and entries, plus the remote wire records they merge from
//! - ISO-8601 timestamps with a distant-past sentinel
//! - A snapshot store with scoped, all-or-nothing transactions
//! - In-memory and file-backed snapshot backends
//!
//! ## Example
//!
//! ```rust
//! use readlist_core::{Database, ReadingList};
//!
//! let db = Database::open_in_memory().unwrap();
//! let mut txn = db.begin();
//! txn.insert_list(ReadingList::new_local("Later")).unwrap();
//! assert!(txn.has_changes());
//! txn.save().unwrap();
//!
//! // The default list is created when the store is initialized.
//! assert_eq!(db.lists().len(), 2);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod config;
mod database;
mod error;
mod model;
mod snapshot;
mod transaction;
mod types;

pub use backend::{FileBackend, MemoryBackend, SnapshotBackend};
pub use config::StoreConfig;
pub use database::Database;
pub use error::{CoreError, CoreResult};
pub use model::{ReadingList, ReadingListEntry, RemoteEntry, RemoteList};
pub use snapshot::StoreState;
pub use transaction::Transaction;
pub use types::{LocalKey, RemoteId, Timestamp};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
