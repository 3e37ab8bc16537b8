//! Sync command implementation.

use super::open_store;
use crate::file_remote::FileRemote;
use crate::ModeArg;
use readlist_sync_engine::{PassReport, PassStatus, SyncConfig, SyncCoordinator};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Runs the sync command.
///
/// The store stays locked for the whole pass, so two sync commands against
/// one store never overlap.
pub fn run(
    path: &Path,
    remote_path: &Path,
    mode: ModeArg,
    concurrency: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let report = sync_store(path, remote_path, mode, concurrency)?;
    print_report(&report);
    Ok(())
}

pub(crate) fn sync_store(
    path: &Path,
    remote_path: &Path,
    mode: ModeArg,
    concurrency: Option<usize>,
) -> Result<PassReport, Box<dyn std::error::Error>> {
    let store = Arc::new(open_store(path)?);
    let remote = Arc::new(FileRemote::open(remote_path)?);

    let mut config = SyncConfig::default();
    if let Some(limit) = concurrency {
        config = config.with_entry_fetch_concurrency(limit);
    }
    let coordinator = SyncCoordinator::with_shared_remote(config, Arc::clone(&remote), store);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let report = runtime.block_on(async {
        match mode {
            ModeArg::Auto => coordinator.sync().await,
            ModeArg::Full => coordinator.run_full_sync().await,
            ModeArg::Incremental => coordinator.run_incremental_sync().await,
        }
    })?;

    let remote_state = remote.snapshot();
    debug!(
        lists = remote_state.lists.len(),
        entries = remote_state.entries.len(),
        next_id = remote_state.next_id,
        "remote file after sync"
    );
    Ok(report)
}

fn print_report(report: &PassReport) {
    if report.status == PassStatus::Skipped {
        println!("{} sync skipped: store has never been synced", report.mode);
        return;
    }

    println!("{} sync finished in {:?}", report.mode, report.duration);
    println!(
        "  lists:   {} created, {} updated, {} unchanged",
        report.lists.created, report.lists.updated, report.lists.unchanged
    );
    println!(
        "  entries: {} created, {} updated, {} unchanged",
        report.entries.created, report.entries.updated, report.entries.unchanged
    );
    if report.pushed > 0 {
        println!("  pushed:  {}", report.pushed);
    }
    match report.watermark {
        Some(watermark) => println!("  watermark: {watermark}"),
        None => println!("  watermark: unchanged"),
    }
    if !report.committed {
        println!("  nothing saved");
    }
    for error in &report.errors {
        println!("  warning ({}): {error}", error.kind());
    }
}
