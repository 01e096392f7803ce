use crate::error::{ErrorKind, Result};
use crate::organize::{FileMover, FileRemover, OrganizeReport, organize};
use crate::reconcile::{IncompleteTitle, MissingTitle, missing_dlc, missing_games, missing_updates};
use crate::state::SharedState;
use crate::view::{LocalLibrary, local_library};
use exn::ResultExt;
use slm_catalog::{Catalog, CatalogFiles, CatalogUrls, DocumentSource, Validators, refresh_catalog};
use slm_config::{Settings, SettingsStore};
use slm_core::{IgnoreSet, ProgressReporter};
use slm_inventory::{Inventory, Scanner, build_inventory};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::instrument;

/// Every collaborator the engine drives.
#[derive(Clone)]
pub struct Context {
    pub settings: Arc<dyn SettingsStore>,
    pub source: Arc<dyn DocumentSource>,
    pub scanner: Arc<dyn Scanner>,
    pub mover: Arc<dyn FileMover>,
    pub remover: Arc<dyn FileRemover>,
    pub progress: Arc<dyn ProgressReporter>,
    /// Where the downloaded catalog documents are kept.
    pub files: CatalogFiles,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScanMode {
    /// Reuse cached parse results for unchanged files.
    #[default]
    Normal,
    /// Clear the parse cache first, then re-parse every file.
    Hard,
}

struct Inner {
    context: Context,
    state: SharedState,
    /// Held for the whole of every scan and every cache clear.
    scan: Mutex<()>,
}

/// Cloneable handle over the shared datasets and every collaborator.
///
/// Each trigger is an `async fn`; the long-running ones also have a
/// `spawn_*` variant that runs on its own task. Dropping the returned
/// [`JoinHandle`] detaches the task: operations are never cancelled once
/// started. Settings are re-read at the start of every trigger.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<Inner>,
}

impl Engine {
    pub fn new(context: Context) -> Self {
        Self {
            inner: Arc::new(Inner {
                context,
                state: SharedState::new(),
                scan: Mutex::new(()),
            }),
        }
    }

    pub fn state(&self) -> &SharedState {
        &self.inner.state
    }

    fn context(&self) -> &Context {
        &self.inner.context
    }

    fn settings(&self) -> Result<Settings> {
        self.context().settings.load().or_raise(|| ErrorKind::Settings)
    }

    /// Bring the catalog up to date and swap it in.
    ///
    /// New cache validators are written back only when they differ from the
    /// stored ones, and before the catalog is swapped in. On any failure,
    /// saving included, the previous catalog stays in place.
    #[instrument(skip(self))]
    pub async fn refresh_catalog(&self) -> Result<Arc<Catalog>> {
        let context = self.context();
        let settings = self.settings()?;
        let urls = CatalogUrls {
            titles: settings.titles_json_url.clone(),
            versions: settings.versions_json_url.clone(),
        };
        let stored = Validators {
            titles: settings.titles_etag.clone(),
            versions: settings.versions_etag.clone(),
        };
        let (catalog, validators) =
            refresh_catalog(&*context.source, &urls, &context.files, &stored, &*context.progress)
                .await
                .or_raise(|| ErrorKind::Catalog)?;
        if validators != stored {
            // Re-read so edits made while downloading are not clobbered.
            let mut settings = self.settings()?;
            settings.titles_etag = validators.titles;
            settings.versions_etag = validators.versions;
            context.settings.save(&settings).or_raise(|| ErrorKind::Settings)?;
            tracing::debug!("Stored new cache validators");
        }
        let catalog = Arc::new(catalog);
        self.inner.state.replace_catalog(catalog.clone()).await;
        Ok(catalog)
    }

    /// Scan every configured folder and swap in the new inventory.
    ///
    /// Scans and cache clears never overlap: a clear requested mid-scan waits
    /// for the scan to finish, and a hard scan clears then scans in one go.
    #[instrument(skip(self))]
    pub async fn rebuild_inventory(&self, mode: ScanMode) -> Result<Arc<Inventory>> {
        let _scan = self.inner.scan.lock().await;
        if mode == ScanMode::Hard {
            self.clear_parse_cache().await?;
        }
        let context = self.context();
        let settings = self.settings()?;
        let folders = settings.all_scan_folders();
        let inventory = build_inventory(
            &*context.scanner,
            &folders,
            settings.scan_recursively,
            mode == ScanMode::Hard,
            &*context.progress,
        )
        .await;
        let inventory = Arc::new(inventory);
        self.inner.state.replace_inventory(inventory.clone()).await;
        Ok(inventory)
    }

    /// Discard the persisted parse cache, once no scan is running.
    #[instrument(skip(self))]
    pub async fn clear_cache(&self) -> Result<u64> {
        let _scan = self.inner.scan.lock().await;
        self.clear_parse_cache().await
    }

    /// Callers hold the scan lock. The state lock is held as well, so no
    /// inventory is swapped in while the cache is half cleared.
    async fn clear_parse_cache(&self) -> Result<u64> {
        let _state = self.inner.state.lock().await;
        let cleared = self.context().scanner.clear_cache().await.or_raise(|| ErrorKind::Cache)?;
        tracing::info!(cleared, "Parse cache cleared");
        Ok(cleared)
    }

    /// The per-title view of the inventory. Works without a catalog.
    pub async fn library(&self) -> Result<LocalLibrary> {
        let snapshot = self.inner.state.snapshot().await;
        let inventory = snapshot.inventory()?;
        Ok(local_library(&inventory, snapshot.catalog.as_deref()))
    }

    pub async fn missing_dlc(&self) -> Result<Vec<IncompleteTitle>> {
        let settings = self.settings()?;
        let (catalog, inventory) = self.inner.state.snapshot().await.both()?;
        let ignore: IgnoreSet = settings.ignore_dlc_title_ids.iter().collect();
        Ok(missing_dlc(&catalog, &inventory, &ignore))
    }

    pub async fn missing_updates(&self) -> Result<Vec<IncompleteTitle>> {
        let settings = self.settings()?;
        let (catalog, inventory) = self.inner.state.snapshot().await.both()?;
        let ignore: IgnoreSet = settings.ignore_update_title_ids.iter().collect();
        Ok(missing_updates(&catalog, &inventory, &ignore, settings.ignore_dlc_updates))
    }

    pub async fn missing_games(&self) -> Result<Vec<MissingTitle>> {
        let settings = self.settings()?;
        let (catalog, inventory) = self.inner.state.snapshot().await.both()?;
        let ignore: IgnoreSet = settings.ignore_game_title_ids.iter().collect();
        Ok(missing_games(&catalog, &inventory, &ignore, settings.hide_demo_games))
    }

    /// Organize the library described by the current snapshot. File
    /// operations run outside the state lock.
    #[instrument(skip(self))]
    pub async fn organize(&self) -> Result<OrganizeReport> {
        let context = self.context();
        let settings = self.settings()?;
        let (catalog, inventory) = self.inner.state.snapshot().await.both()?;
        organize(
            &catalog,
            &inventory,
            &settings.organize_options,
            settings.folder.as_deref(),
            &*context.mover,
            &*context.remover,
            &*context.progress,
        )
        .await
    }

    pub fn spawn_refresh_catalog(&self) -> JoinHandle<Result<Arc<Catalog>>> {
        let engine = self.clone();
        tokio::spawn(async move { engine.refresh_catalog().await })
    }

    pub fn spawn_rebuild_inventory(&self, mode: ScanMode) -> JoinHandle<Result<Arc<Inventory>>> {
        let engine = self.clone();
        tokio::spawn(async move { engine.rebuild_inventory(mode).await })
    }

    pub fn spawn_clear_cache(&self) -> JoinHandle<Result<u64>> {
        let engine = self.clone();
        tokio::spawn(async move { engine.clear_cache().await })
    }

    pub fn spawn_organize(&self) -> JoinHandle<Result<OrganizeReport>> {
        let engine = self.clone();
        tokio::spawn(async move { engine.organize().await })
    }
}

/// Await a spawned trigger, turning a panicked task into an error.
pub async fn join<T>(handle: JoinHandle<Result<T>>) -> Result<T> {
    handle.await.or_raise(|| ErrorKind::Task)?
}
