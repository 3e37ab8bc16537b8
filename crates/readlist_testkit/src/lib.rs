//! # Readlist Testkit
//!
//! Test utilities for the reading-list crates.
//!
//! This crate provides:
//! - Store fixtures backed by memory or a temporary directory
//! - Builders for remote wire records
//! - Property-based generators for remote data sets
//!
//! ## Usage
//!
//! ```rust,ignore
//! use readlist_testkit::prelude::*;
//!
//! #[test]
//! fn merges_lists() {
//!     let store = TestStore::memory();
//!     let lists = vec![default_remote_list(1, "Saved", "2020-01-01T00:00:00Z")];
//!     // ... run a merge against store.db
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
