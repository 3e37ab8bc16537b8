//! Persisted "last synced" watermark.

use readlist_core::{CoreResult, Timestamp, Transaction};
use tracing::{debug, warn};

/// Default store key holding the watermark.
pub const WATERMARK_KEY: &str = "reading-lists.last-sync";

/// Reads and writes the watermark inside a transaction.
///
/// The watermark is stored as an ISO-8601 string in the store's key-value
/// slot, so it is committed or discarded together with the data it gates.
#[derive(Debug, Clone)]
pub struct WatermarkStore {
    key: String,
}

impl WatermarkStore {
    /// Creates a watermark store using `key`.
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    /// Returns the store key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the stored watermark, or `None` if no sync has completed.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTimestamp` if the stored value does not parse.
    pub fn read(&self, txn: &Transaction<'_>) -> CoreResult<Option<Timestamp>> {
        txn.get_value(&self.key).map(Timestamp::parse).transpose()
    }

    /// Returns the stored watermark string verbatim.
    pub fn read_raw(&self, txn: &Transaction<'_>) -> Option<String> {
        txn.get_value(&self.key).map(str::to_owned)
    }

    /// Overwrites the watermark unconditionally.
    pub fn write(&self, txn: &mut Transaction<'_>, timestamp: Timestamp) {
        debug!(key = %self.key, watermark = %timestamp, "writing sync watermark");
        txn.set_value(self.key.clone(), timestamp.to_iso8601());
    }

    /// Moves the watermark forward to `since`.
    ///
    /// Leaves it untouched when `since` is the distant-past sentinel or
    /// earlier than the stored value. Returns the value written, if any.
    pub fn advance(&self, txn: &mut Transaction<'_>, since: Timestamp) -> Option<Timestamp> {
        if since.is_distant_past() {
            debug!("nothing observed; watermark unchanged");
            return None;
        }

        match self.read(txn) {
            Ok(Some(current)) if since < current => {
                debug!(%current, %since, "refusing to move watermark backwards");
                return None;
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "stored watermark unreadable; overwriting"),
        }

        self.write(txn, since);
        Some(since)
    }
}

impl Default for WatermarkStore {
    fn default() -> Self {
        Self::new(WATERMARK_KEY)
    }
}
