mod cli;
mod error;
mod files;

use crate::cli::{Cli, Command};
use crate::error::{ErrorKind, Result};
use crate::files::{DryRun, LocalFiles};
use clap::Parser;
use exn::ResultExt;
use serde::Serialize;
use slm_cache::{Database, Repository};
use slm_catalog::{CatalogFiles, HttpSource};
use slm_config::{SettingsFile, SettingsStore, default_base_folder};
use slm_core::progress::TracingReporter;
use slm_inventory::LocalScanner;
use slm_library::{Context, Engine, FileMover, FileRemover, ScanMode, join};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const CACHE_FILE_NAME: &str = "cache.db";

fn init_logging(verbose: bool) {
    let default = match verbose {
        true => "debug",
        false => "info",
    };
    let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    for directive in ["hyper=warn", "reqwest=warn", "sqlx=warn"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn print_json(value: &impl Serialize) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value).or_raise(|| ErrorKind::Output)?;
    writeln!(stdout).or_raise(|| ErrorKind::Output)?;
    Ok(())
}

async fn engine(base: PathBuf, dry_run: bool) -> Result<Engine> {
    tokio::fs::create_dir_all(&base).await.or_raise(|| ErrorKind::Startup)?;
    let settings = SettingsFile::in_folder(&base);
    let protected = settings
        .load()
        .map(|s| s.all_scan_folders())
        .or_raise(|| ErrorKind::Startup)?;
    let database = Database::connect(base.join(CACHE_FILE_NAME)).await.or_raise(|| ErrorKind::Startup)?;
    let scanner = LocalScanner::default().with_cache(Repository::from(&database));
    let source = HttpSource::new().or_raise(|| ErrorKind::Startup)?;
    let (mover, remover): (Arc<dyn FileMover>, Arc<dyn FileRemover>) = match dry_run {
        true => (Arc::new(DryRun), Arc::new(DryRun)),
        false => {
            let files = Arc::new(LocalFiles::new(protected));
            (files.clone(), files)
        },
    };
    Ok(Engine::new(Context {
        settings: Arc::new(settings),
        source: Arc::new(source),
        scanner: Arc::new(scanner),
        mover,
        remover,
        progress: Arc::new(TracingReporter),
        files: CatalogFiles::in_folder(&base),
    }))
}

/// Build whatever datasets `command` reads, the catalog and the inventory
/// side by side.
async fn load(engine: &Engine, command: &Command) -> Result<()> {
    let inventory = engine.spawn_rebuild_inventory(ScanMode::Normal);
    let catalog = engine.spawn_refresh_catalog();
    join(inventory).await.or_raise(|| ErrorKind::Command)?;
    match join(catalog).await {
        Ok(_) => Ok(()),
        Err(err) if command.needs_catalog() => Err(err).or_raise(|| ErrorKind::Command),
        // The library view only uses the catalog for names and icons.
        Err(err) => {
            tracing::warn!(error = ?err, "Catalog unavailable; continuing without it");
            Ok(())
        },
    }
}

async fn run(cli: Cli) -> Result<()> {
    let base = match cli.base_dir {
        Some(base) => base,
        None => default_base_folder().or_raise(|| ErrorKind::Startup)?,
    };
    let dry_run = matches!(cli.command, Command::Organize { dry_run: true });
    let engine = engine(base, dry_run).await?;

    match &cli.command {
        Command::UpdateCatalog => {
            let catalog = engine.refresh_catalog().await.or_raise(|| ErrorKind::Command)?;
            tracing::info!(titles = catalog.len(), "Catalog is up to date");
        },
        Command::Scan { hard } => {
            let mode = match hard {
                true => ScanMode::Hard,
                false => ScanMode::Normal,
            };
            let inventory = engine.rebuild_inventory(mode).await.or_raise(|| ErrorKind::Command)?;
            tracing::info!(
                titles = inventory.titles.len(),
                skipped = inventory.skipped.len(),
                files = inventory.num_files,
                "Scan complete"
            );
        },
        Command::ClearCache => {
            engine.clear_cache().await.or_raise(|| ErrorKind::Command)?;
        },
        Command::Library => {
            load(&engine, &cli.command).await?;
            print_json(&engine.library().await.or_raise(|| ErrorKind::Command)?)?;
        },
        Command::MissingDlc => {
            load(&engine, &cli.command).await?;
            print_json(&engine.missing_dlc().await.or_raise(|| ErrorKind::Command)?)?;
        },
        Command::MissingUpdates => {
            load(&engine, &cli.command).await?;
            print_json(&engine.missing_updates().await.or_raise(|| ErrorKind::Command)?)?;
        },
        Command::MissingGames => {
            load(&engine, &cli.command).await?;
            print_json(&engine.missing_games().await.or_raise(|| ErrorKind::Command)?)?;
        },
        Command::Organize { .. } => {
            load(&engine, &cli.command).await?;
            let report = join(engine.spawn_organize()).await.or_raise(|| ErrorKind::Command)?;
            print_json(&report)?;
        },
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(retryable = err.is_retryable(), "{err:?}");
            ExitCode::FAILURE
        },
    }
}
