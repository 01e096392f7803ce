//! The lock-guarded pair of datasets every query reads from.

use crate::error::{Dataset, ErrorKind, Result};
use slm_catalog::Catalog;
use slm_inventory::Inventory;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

/// The most recent catalog and inventory, each either absent (never built)
/// or complete.
///
/// Datasets are immutable behind an [`Arc`]; a rebuild swaps in a whole new
/// one. Readers clone the `Arc`s under the lock and work on the snapshot
/// without holding it.
#[derive(Clone, Debug, Default)]
pub struct Snapshot {
    pub catalog: Option<Arc<Catalog>>,
    pub inventory: Option<Arc<Inventory>>,
}

impl Snapshot {
    pub fn catalog(&self) -> Result<Arc<Catalog>> {
        self.catalog.clone().ok_or_else(|| ErrorKind::NotLoaded(Dataset::Catalog).into())
    }

    pub fn inventory(&self) -> Result<Arc<Inventory>> {
        self.inventory.clone().ok_or_else(|| ErrorKind::NotLoaded(Dataset::Inventory).into())
    }

    /// Both datasets, inventory checked first.
    pub fn both(&self) -> Result<(Arc<Catalog>, Arc<Inventory>)> {
        let inventory = self.inventory()?;
        Ok((self.catalog()?, inventory))
    }
}

/// Single lock over both datasets.
#[derive(Debug, Default)]
pub struct SharedState {
    inner: Mutex<Snapshot>,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consistent view of both datasets at one instant.
    pub async fn snapshot(&self) -> Snapshot {
        self.inner.lock().await.clone()
    }

    /// Swap in a new catalog, returning the one it replaced.
    pub async fn replace_catalog(&self, catalog: Arc<Catalog>) -> Option<Arc<Catalog>> {
        self.inner.lock().await.catalog.replace(catalog)
    }

    /// Swap in a new inventory, returning the one it replaced.
    pub async fn replace_inventory(&self, inventory: Arc<Inventory>) -> Option<Arc<Inventory>> {
        self.inner.lock().await.inventory.replace(inventory)
    }

    /// Hold the lock across a multi-step critical section (the hard rescan's
    /// cache clear). Keep it short: every reader waits on it.
    pub async fn lock(&self) -> MutexGuard<'_, Snapshot> {
        self.inner.lock().await
    }
}
