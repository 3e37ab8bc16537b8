//! Init command implementation.

use readlist_core::{Database, StoreConfig};
use std::path::Path;

/// Runs the init command.
pub fn run(path: &Path, default_list: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = StoreConfig::default()
        .with_default_list_name(default_list)
        .with_create_if_missing(true);
    let db = Database::open_with_config(path, config)?;

    let default = db
        .default_list()
        .ok_or("store opened without a default list")?;
    println!("Store ready at {}", path.display());
    println!("Default list: {} ({})", default.name, default.key);
    Ok(())
}
