//! Local filesystem scanner.

use crate::error::{ErrorKind, Result};
use crate::introspect::{FileNameIntrospector, Introspector};
use crate::models::{DiscoveredFile, FileLocation};
use crate::scanner::{DiscoveryStream, Scanner};
use async_stream::stream;
use async_trait::async_trait;
use exn::ResultExt;
use slm_cache::{FileStamp, Repository};
use slm_core::PackageInfo;
use std::collections::HashSet;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use time::UtcDateTime;
use tokio::fs::{self, DirEntry};

/// Package formats we know how to introspect.
pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["nsp", "nsz", "xci", "xcz"];

enum WalkEntry {
    File(DiscoveredFile),
    Descend(PathBuf),
    Skip,
}

fn is_supported(location: &FileLocation) -> bool {
    location
        .extension()
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
}

fn modified(metadata: &Metadata) -> UtcDateTime {
    metadata.modified().map(UtcDateTime::from).unwrap_or(UtcDateTime::UNIX_EPOCH)
}

fn map_folder_error(err: std::io::Error, folder: &Path) -> ErrorKind {
    match err.kind() {
        std::io::ErrorKind::NotFound => ErrorKind::FolderMissing(folder.to_path_buf()),
        _ => ErrorKind::FolderUnreadable(folder.to_path_buf()),
    }
}

/// [`Scanner`] over the local filesystem.
///
/// Files with any extension are discovered (unsupported ones are rejected at
/// [`inspect`](Scanner::inspect) so they show up as skipped). A directory
/// named like a package (`Game.nsp/`) holding only numbered parts (`00`,
/// `01`, ...) is discovered as one split file.
///
/// Introspection results are cached in the optional [`Repository`], keyed by
/// path, size and modification time.
#[derive(Clone)]
pub struct LocalScanner {
    introspector: Arc<dyn Introspector>,
    cache: Option<Repository>,
}

impl Default for LocalScanner {
    fn default() -> Self {
        Self::new(Arc::new(FileNameIntrospector))
    }
}

impl LocalScanner {
    pub fn new(introspector: Arc<dyn Introspector>) -> Self {
        Self {
            introspector,
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: Repository) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Size and newest modification time of a split file's parts, or `None`
    /// if the directory is not a split file.
    async fn split_parts(dir: &Path) -> Option<(u64, UtcDateTime)> {
        let mut entries = fs::read_dir(dir).await.ok()?;
        let mut size = 0u64;
        let mut newest = UtcDateTime::UNIX_EPOCH;
        let mut parts = 0usize;
        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name();
            let is_part = name.to_str().is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()));
            let metadata = fs::metadata(entry.path()).await.ok()?;
            if !is_part || !metadata.is_file() {
                return None;
            }
            size += metadata.len();
            newest = newest.max(modified(&metadata));
            parts += 1;
        }
        (parts > 0).then_some((size, newest))
    }

    async fn process_entry(entry: DirEntry, recursive: bool) -> Result<WalkEntry> {
        let path = entry.path();
        // Follows symlinks; a dangling link fails here and is reported as an
        // unreadable file.
        let metadata = fs::metadata(&path)
            .await
            .or_raise(|| ErrorKind::FileUnreadable(path.clone()))?;
        let Some(location) = FileLocation::from_path(&path) else {
            return Ok(WalkEntry::Skip);
        };
        if metadata.is_dir() {
            if is_supported(&location)
                && let Some((size, modified)) = Self::split_parts(&path).await
            {
                return Ok(WalkEntry::File(DiscoveredFile {
                    location,
                    size,
                    modified,
                    split: true,
                }));
            }
            return Ok(match recursive {
                true => WalkEntry::Descend(path),
                false => WalkEntry::Skip,
            });
        }
        if metadata.is_file() {
            return Ok(WalkEntry::File(DiscoveredFile {
                location,
                size: metadata.len(),
                modified: modified(&metadata),
                split: false,
            }));
        }
        // Sockets, pipes and device nodes.
        Ok(WalkEntry::Skip)
    }

    async fn cached(&self, stamp: &FileStamp) -> Option<Vec<PackageInfo>> {
        let cache = self.cache.as_ref()?;
        match cache.get(stamp).await {
            Ok(hit) => hit,
            Err(err) => {
                tracing::warn!(path = %stamp.path.display(), error = ?err, "Parse cache lookup failed");
                None
            },
        }
    }

    async fn remember(&self, stamp: &FileStamp, packages: &[PackageInfo]) {
        if let Some(cache) = &self.cache
            && let Err(err) = cache.upsert(stamp, packages).await
        {
            tracing::warn!(path = %stamp.path.display(), error = ?err, "Could not cache parse result");
        }
    }
}

#[async_trait]
impl Scanner for LocalScanner {
    fn discover<'a>(&'a self, folder: &'a Path, recursive: bool) -> DiscoveryStream<'a> {
        let mut stack = vec![folder.to_path_buf()];
        // Canonical paths already walked; a symlinked folder pointing back up
        // the tree is entered once.
        let mut visited = HashSet::new();
        Box::pin(stream! {
            'dirs: while let Some(current) = stack.pop() {
                if let Ok(canonical) = fs::canonicalize(&current).await
                    && !visited.insert(canonical)
                {
                    continue 'dirs;
                }
                let mut entries = match fs::read_dir(&current).await {
                    Ok(entries) => entries,
                    Err(err) => {
                        yield Err(exn::Exn::from(map_folder_error(err, &current)));
                        continue 'dirs;
                    },
                };
                'entries: loop {
                    let entry = match entries.next_entry().await {
                        Ok(Some(entry)) => entry,
                        Ok(None) => break 'entries,
                        Err(err) => {
                            yield Err(exn::Exn::from(map_folder_error(err, &current)));
                            continue 'dirs;
                        },
                    };
                    match Self::process_entry(entry, recursive).await {
                        Ok(WalkEntry::File(file)) => yield Ok(file),
                        Ok(WalkEntry::Descend(dir)) => stack.push(dir),
                        Ok(WalkEntry::Skip) => {},
                        Err(err) => yield Err(err),
                    }
                }
            }
        })
    }

    async fn inspect(&self, file: &DiscoveredFile, ignore_cache: bool) -> Result<Vec<PackageInfo>> {
        if !is_supported(&file.location) {
            exn::bail!(ErrorKind::UnsupportedType);
        }
        let path = file.location.path();
        let stamp = FileStamp::new(path.clone(), file.size, file.modified);
        if !ignore_cache && let Some(packages) = self.cached(&stamp).await {
            tracing::trace!(path = %path.display(), "Parse cache hit");
            return Ok(packages);
        }
        let packages = self.introspector.introspect(&path, file).await?;
        self.remember(&stamp, &packages).await;
        Ok(packages)
    }

    async fn clear_cache(&self) -> Result<u64> {
        match &self.cache {
            Some(cache) => cache.clear().await.or_raise(|| ErrorKind::Cache),
            None => Ok(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::build_inventory;
    use crate::models::SkipReason;
    use futures::StreamExt;
    use slm_cache::Database;
    use slm_core::progress::Silent;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Counts how often a file was actually introspected.
    #[derive(Default)]
    struct Counting(AtomicUsize);

    #[async_trait]
    impl Introspector for Counting {
        async fn introspect(&self, path: &Path, file: &DiscoveredFile) -> Result<Vec<PackageInfo>> {
            self.0.fetch_add(1, Ordering::SeqCst);
            FileNameIntrospector.introspect(path, file).await
        }
    }

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"data").unwrap();
    }

    async fn discover_all(scanner: &LocalScanner, folder: &Path, recursive: bool) -> (Vec<DiscoveredFile>, usize) {
        let mut files = Vec::new();
        let mut errors = 0;
        let mut stream = scanner.discover(folder, recursive);
        while let Some(item) = stream.next().await {
            match item {
                Ok(file) => files.push(file),
                Err(_) => errors += 1,
            }
        }
        files.sort_by(|a, b| a.location.cmp(&b.location));
        (files, errors)
    }

    #[tokio::test]
    async fn test_discover_respects_recursion() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "A [0100000000010000][v0].nsp");
        touch(dir.path(), "nested/B [0100000000020000][v0].xci");
        let scanner = LocalScanner::default();
        let (flat, _) = discover_all(&scanner, dir.path(), false).await;
        assert_eq!(flat.len(), 1);
        let (deep, errors) = discover_all(&scanner, dir.path(), true).await;
        assert_eq!(deep.len(), 2);
        assert_eq!(errors, 0);
    }

    #[tokio::test]
    async fn test_split_directory_is_one_file() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "Big [0100000000010000][v0].xci/00");
        touch(dir.path(), "Big [0100000000010000][v0].xci/01");
        let (files, _) = discover_all(&LocalScanner::default(), dir.path(), false).await;
        assert_eq!(files.len(), 1);
        assert!(files[0].split);
        assert_eq!(files[0].size, 8);
    }

    #[tokio::test]
    async fn test_missing_folder_is_an_error_item() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("gone");
        let scanner = LocalScanner::default();
        let mut stream = scanner.discover(&missing, true);
        let err = stream.next().await.unwrap().unwrap_err();
        assert!(matches!(&*err, ErrorKind::FolderMissing(p) if p == &missing));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_unsupported_extension() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "notes.txt");
        let scanner = LocalScanner::default();
        let (files, _) = discover_all(&scanner, dir.path(), false).await;
        let err = scanner.inspect(&files[0], false).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnsupportedType));
    }

    #[tokio::test]
    async fn test_cache_is_used_unless_ignored() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "A [0100000000010000][v0].nsp");
        let db = Database::connect_in_memory().await.unwrap();
        let counting = Arc::new(Counting::default());
        let scanner = LocalScanner::new(counting.clone()).with_cache(Repository::from(&db));
        let (files, _) = discover_all(&scanner, dir.path(), false).await;

        scanner.inspect(&files[0], false).await.unwrap();
        scanner.inspect(&files[0], false).await.unwrap();
        assert_eq!(counting.0.load(Ordering::SeqCst), 1);

        scanner.inspect(&files[0], true).await.unwrap();
        assert_eq!(counting.0.load(Ordering::SeqCst), 2);

        assert_eq!(scanner.clear_cache().await.unwrap(), 1);
        scanner.inspect(&files[0], false).await.unwrap();
        assert_eq!(counting.0.load(Ordering::SeqCst), 3);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlinked_file_is_scanned() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "store/Game [0100000000010000][v0].nsp");
        let games = dir.path().join("games");
        std::fs::create_dir_all(&games).unwrap();
        std::os::unix::fs::symlink(
            dir.path().join("store/Game [0100000000010000][v0].nsp"),
            games.join("Game [0100000000010000][v0].nsp"),
        )
        .unwrap();
        let inventory = build_inventory(&LocalScanner::default(), &[games], false, false, &Silent).await;
        assert_eq!(inventory.num_files, 1);
        assert_eq!(inventory.titles.len(), 1);
        assert!(inventory.skipped.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_broken_symlink_is_skipped_with_reason() {
        let dir = TempDir::new().unwrap();
        let link = dir.path().join("Gone [0100000000010000][v0].nsp");
        std::os::unix::fs::symlink(dir.path().join("nowhere.nsp"), &link).unwrap();
        let inventory =
            build_inventory(&LocalScanner::default(), &[dir.path().to_path_buf()], false, false, &Silent).await;
        assert_eq!(inventory.num_files, 1);
        let location = FileLocation::from_path(&link).unwrap();
        assert!(matches!(inventory.skipped.get(&location), Some(SkipReason::Unreadable(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlinked_folder_loop_is_walked_once() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "A [0100000000010000][v0].nsp");
        std::os::unix::fs::symlink(dir.path(), dir.path().join("again")).unwrap();
        let (files, errors) = discover_all(&LocalScanner::default(), dir.path(), true).await;
        assert_eq!(files.len(), 1);
        assert_eq!(errors, 0);
    }
}
