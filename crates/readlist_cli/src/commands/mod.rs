//! CLI command implementations.

pub mod add;
pub mod init;
pub mod inspect;
pub mod sync;

use readlist_core::{CoreResult, Database, StoreConfig};
use std::path::Path;

/// Opens an existing store; never creates one.
pub(crate) fn open_store(path: &Path) -> CoreResult<Database> {
    Database::open_with_config(path, StoreConfig::default().with_create_if_missing(false))
}
