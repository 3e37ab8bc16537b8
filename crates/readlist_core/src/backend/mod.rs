//! Snapshot backends.
//!
//! Backends are **opaque byte stores** holding the latest encoded snapshot.
//! The [`Database`](crate::Database) owns the format; backends only load and
//! replace the bytes.
//!
//! # Invariants
//!
//! - `load` returns exactly the bytes of the last successful `store`
//! - `store` replaces the snapshot atomically: a failed store leaves the
//!   previous snapshot intact
//! - Backends must be `Send + Sync`

mod file;
mod memory;

pub use file::FileBackend;
pub use memory::MemoryBackend;

use crate::error::CoreResult;

/// A backend holding the latest committed snapshot.
pub trait SnapshotBackend: Send + Sync {
    /// Loads the stored snapshot, or `None` for a new store.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be read.
    fn load(&self) -> CoreResult<Option<Vec<u8>>>;

    /// Replaces the stored snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be written durably.
    fn store(&self, data: &[u8]) -> CoreResult<()>;
}
