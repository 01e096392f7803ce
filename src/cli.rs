use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Reconcile a local game package library against the remote title catalog.
#[derive(Debug, Parser)]
#[command(name = "slm", version, about)]
pub struct Cli {
    /// Folder holding settings, the downloaded catalog and the parse cache.
    #[arg(long, global = true, value_name = "DIR")]
    pub base_dir: Option<PathBuf>,
    /// Log at debug level (`RUST_LOG` takes precedence).
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Download the title catalog (only what changed since last time).
    UpdateCatalog,
    /// Scan the library folders.
    Scan {
        /// Discard cached parse results and re-read every file.
        #[arg(long)]
        hard: bool,
    },
    /// Discard cached parse results.
    ClearCache,
    /// Print every owned title and every file that could not be attributed.
    Library,
    /// Print owned titles with DLC missing.
    MissingDlc,
    /// Print owned titles (and DLC) with newer updates available.
    MissingUpdates,
    /// Print catalog titles with nothing on disk.
    MissingGames,
    /// Move files to where the naming templates say they belong.
    Organize {
        /// Log every planned move and deletion without touching any file.
        #[arg(long)]
        dry_run: bool,
    },
}

impl Command {
    /// Whether the command reads the catalog.
    pub fn needs_catalog(&self) -> bool {
        matches!(self, Self::MissingDlc | Self::MissingUpdates | Self::MissingGames | Self::Organize { .. })
    }
}
