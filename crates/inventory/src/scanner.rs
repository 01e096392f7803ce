use crate::error::Result;
use crate::models::DiscoveredFile;
use async_trait::async_trait;
use futures::Stream;
use slm_core::PackageInfo;
use std::path::Path;
use std::pin::Pin;

pub type DiscoveryStream<'a> = Pin<Box<dyn Stream<Item = Result<DiscoveredFile>> + Send + 'a>>;

/// Filesystem traversal and per-file introspection.
///
/// The inventory builder only decides what to do with the results; where
/// files come from and how their contents are read is up to the scanner.
#[async_trait]
pub trait Scanner: Send + Sync {
    /// Every file under `folder`, descending into subfolders when `recursive`.
    ///
    /// A folder that does not exist or cannot be read yields an error item
    /// (`FolderMissing` / `FolderUnreadable`) and the stream carries on with
    /// whatever else it can reach.
    fn discover<'a>(&'a self, folder: &'a Path, recursive: bool) -> DiscoveryStream<'a>;

    /// Read the packages contained in one discovered file.
    ///
    /// With `ignore_cache` a previously cached result must not be used.
    async fn inspect(&self, file: &DiscoveredFile, ignore_cache: bool) -> Result<Vec<PackageInfo>>;

    /// Drop all cached introspection results. Returns how many were dropped.
    async fn clear_cache(&self) -> Result<u64>;
}
