//! Configuration for the sync engine.

use crate::watermark::WATERMARK_KEY;

/// Configuration for sync passes.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Maximum number of per-list entry fetches in flight during a full
    /// sync. `None` runs one fetch per list at once.
    pub entry_fetch_concurrency: Option<usize>,
    /// Maximum number of lists or entries sent in one push.
    pub push_batch_size: usize,
    /// Store key holding the watermark.
    pub watermark_key: String,
}

impl SyncConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self {
            entry_fetch_concurrency: None,
            push_batch_size: 50,
            watermark_key: WATERMARK_KEY.to_string(),
        }
    }

    /// Caps concurrent entry fetches.
    pub fn with_entry_fetch_concurrency(mut self, limit: usize) -> Self {
        self.entry_fetch_concurrency = Some(limit.max(1));
        self
    }

    /// Sets the push batch size.
    pub fn with_push_batch_size(mut self, size: usize) -> Self {
        self.push_batch_size = size.max(1);
        self
    }

    /// Sets the watermark key.
    pub fn with_watermark_key(mut self, key: impl Into<String>) -> Self {
        self.watermark_key = key.into();
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_config_builder() {
        let config = SyncConfig::new()
            .with_entry_fetch_concurrency(4)
            .with_push_batch_size(10)
            .with_watermark_key("custom");

        assert_eq!(config.entry_fetch_concurrency, Some(4));
        assert_eq!(config.push_batch_size, 10);
        assert_eq!(config.watermark_key, "custom");
    }

    #[test]
    fn limits_are_at_least_one() {
        let config = SyncConfig::new()
            .with_entry_fetch_concurrency(0)
            .with_push_batch_size(0);
        assert_eq!(config.entry_fetch_concurrency, Some(1));
        assert_eq!(config.push_batch_size, 1);
    }

    #[test]
    fn defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.entry_fetch_concurrency, None);
        assert_eq!(config.watermark_key, WATERMARK_KEY);
    }
}
