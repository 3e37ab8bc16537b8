//! Store configuration.

/// Default name of the list created at store initialization.
pub const DEFAULT_LIST_NAME: &str = "Saved";

/// Configuration for opening a store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Name given to the default list when a store is first created.
    pub default_list_name: String,
    /// Create the store directory if it does not exist.
    pub create_if_missing: bool,
}

impl StoreConfig {
    /// Sets the default list name.
    #[must_use]
    pub fn with_default_list_name(mut self, name: impl Into<String>) -> Self {
        self.default_list_name = name.into();
        self
    }

    /// Sets whether a missing store directory is created.
    #[must_use]
    pub fn with_create_if_missing(mut self, create: bool) -> Self {
        self.create_if_missing = create;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            default_list_name: DEFAULT_LIST_NAME.to_string(),
            create_if_missing: true,
        }
    }
}
