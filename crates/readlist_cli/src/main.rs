//! Readlist CLI
//!
//! Command-line tool for a local reading-list store.
//!
//! # Commands
//!
//! - `init` - Create a store with its default list
//! - `add-list` - Create a list pending upload
//! - `add-entry` - Save a page to a list
//! - `sync` - Reconcile the store with a JSON file remote
//! - `inspect` - Display lists, entries and the sync watermark

mod commands;
mod file_remote;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Local reading lists with full and incremental sync.
#[derive(Parser)]
#[command(name = "readlist")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the store directory
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Which sync pass to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Full if the store was never synced, incremental otherwise
    Auto,
    /// Fetch every list and entry
    Full,
    /// Fetch changes since the last sync
    Incremental,
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    /// Human-readable text
    Text,
    /// Pretty-printed JSON
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a store with its default list
    Init {
        /// Name of the default list
        #[arg(long, default_value = "Saved")]
        default_list: String,
    },

    /// Create a list pending upload
    AddList {
        /// List name
        name: String,

        /// Optional description
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Save a page to a list
    AddEntry {
        /// List name or local key
        list: String,

        /// Site the page belongs to, e.g. https://en.wikipedia.org
        project: String,

        /// Page title
        title: String,
    },

    /// Reconcile the store with a JSON file remote
    Sync {
        /// Remote data file
        #[arg(short, long)]
        remote: PathBuf,

        /// Which pass to run
        #[arg(short, long, value_enum, default_value = "auto")]
        mode: ModeArg,

        /// Maximum concurrent entry fetches during a full sync
        #[arg(short, long)]
        concurrency: Option<usize>,
    },

    /// Display lists, entries and the sync watermark
    Inspect {
        /// Show entries of each list
        #[arg(short, long)]
        entries: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: FormatArg,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Init { default_list } => {
            let path = cli.path.ok_or("Store path required for init")?;
            commands::init::run(&path, &default_list)?;
        }
        Commands::AddList { name, description } => {
            let path = cli.path.ok_or("Store path required for add-list")?;
            commands::add::run_list(&path, &name, description)?;
        }
        Commands::AddEntry {
            list,
            project,
            title,
        } => {
            let path = cli.path.ok_or("Store path required for add-entry")?;
            commands::add::run_entry(&path, &list, &project, &title)?;
        }
        Commands::Sync {
            remote,
            mode,
            concurrency,
        } => {
            let path = cli.path.ok_or("Store path required for sync")?;
            commands::sync::run(&path, &remote, mode, concurrency)?;
        }
        Commands::Inspect { entries, format } => {
            let path = cli.path.ok_or("Store path required for inspect")?;
            commands::inspect::run(&path, entries, format)?;
        }
        Commands::Version => {
            println!("Readlist CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("Readlist Core v{}", readlist_core::VERSION);
        }
    }

    Ok(())
}
