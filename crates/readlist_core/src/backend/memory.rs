//! In-memory snapshot backend for testing.

use super::SnapshotBackend;
use crate::error::{CoreError, CoreResult};
use parking_lot::RwLock;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// An in-memory snapshot backend.
///
/// Suitable for unit tests and ephemeral stores. Writes can be made to fail
/// on demand to exercise persistence errors.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    data: RwLock<Option<Vec<u8>>>,
    fail_writes: AtomicBool,
    writes: AtomicU64,
}

impl MemoryBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend holding an existing snapshot.
    #[must_use]
    pub fn with_data(data: Vec<u8>) -> Self {
        Self {
            data: RwLock::new(Some(data)),
            ..Self::default()
        }
    }

    /// Returns a copy of the stored snapshot.
    #[must_use]
    pub fn data(&self) -> Option<Vec<u8>> {
        self.data.read().clone()
    }

    /// Makes subsequent writes fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Returns the number of successful writes.
    #[must_use]
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }
}

impl SnapshotBackend for MemoryBackend {
    fn load(&self) -> CoreResult<Option<Vec<u8>>> {
        Ok(self.data.read().clone())
    }

    fn store(&self, data: &[u8]) -> CoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CoreError::Io(io::Error::new(
                io::ErrorKind::Other,
                "write rejected by memory backend",
            )));
        }
        *self.data.write() = Some(data.to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_and_load() {
        let backend = MemoryBackend::new();
        assert_eq!(backend.load().unwrap(), None);

        backend.store(b"snapshot").unwrap();
        assert_eq!(backend.load().unwrap(), Some(b"snapshot".to_vec()));
        assert_eq!(backend.write_count(), 1);
    }

    #[test]
    fn failing_writes_keep_previous_data() {
        let backend = MemoryBackend::with_data(b"old".to_vec());
        backend.set_fail_writes(true);

        assert!(backend.store(b"new").is_err());
        assert_eq!(backend.data(), Some(b"old".to_vec()));
        assert_eq!(backend.write_count(), 0);
    }
}
