use crate::error::ErrorKind;
use crate::models::{DiscoveredFile, FileLocation, GameFileGroup, Inventory, PackageFile, SkipReason};
use crate::scanner::Scanner;
use futures::StreamExt;
use slm_core::{PackageInfo, ProgressReporter, Steps};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use tracing::instrument;

/// Aggregation policy for an inventory: which group a package joins, which
/// duplicate wins, and what becomes a skip entry.
///
/// Every added file ends up either attributed to a title or skipped, never
/// both and never neither.
#[derive(Debug, Default)]
pub struct InventoryBuilder {
    titles: BTreeMap<slm_core::TitleKey, GameFileGroup>,
    skipped: BTreeMap<FileLocation, SkipReason>,
    displaced: Vec<(FileLocation, SkipReason)>,
    num_files: usize,
}

impl InventoryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attribute every package read from `file`. An empty package list skips it.
    pub fn add(&mut self, file: &DiscoveredFile, packages: Vec<PackageInfo>) {
        self.num_files += 1;
        if packages.is_empty() {
            self.skipped.insert(file.location.clone(), SkipReason::Empty);
            return;
        }
        let multi_content = packages.len() > 1;
        for info in packages {
            let group = self.titles.entry(info.title_id.key()).or_default();
            let package = PackageFile {
                location: file.location.clone(),
                info,
                size: file.size,
                split: file.split,
                multi_content,
            };
            if let Some((old, reason)) = group.attribute(package) {
                self.displaced.push((old.location, reason));
            }
        }
    }

    /// Record a discovered file that could not be attributed.
    pub fn skip_file(&mut self, location: FileLocation, reason: SkipReason) {
        self.num_files += 1;
        self.skipped.insert(location, reason);
    }

    /// Record a folder that could not be scanned. Folders are not files and
    /// do not count towards the file total.
    pub fn skip_folder(&mut self, location: FileLocation, reason: SkipReason) {
        self.skipped.insert(location, reason);
    }

    pub fn finish(mut self) -> Inventory {
        // A file displaced by a duplicate may still be attributed through
        // another of its contents; only truly orphaned files become skips.
        let attributed: BTreeSet<&FileLocation> = self
            .titles
            .values()
            .flat_map(GameFileGroup::files)
            .map(|f| &f.location)
            .collect();
        let displaced: Vec<_> = self
            .displaced
            .drain(..)
            .filter(|(location, _)| !attributed.contains(location))
            .collect();
        drop(attributed);
        for (location, reason) in displaced {
            self.skipped.entry(location).or_insert(reason);
        }
        Inventory {
            titles: self.titles,
            skipped: self.skipped,
            num_files: self.num_files,
        }
    }
}

fn skip_reason(kind: &ErrorKind) -> SkipReason {
    match kind {
        ErrorKind::UnsupportedType => SkipReason::UnsupportedType,
        ErrorKind::Unrecognised => SkipReason::Unrecognised,
        ErrorKind::FolderMissing(_) => SkipReason::FolderMissing,
        ErrorKind::FolderUnreadable(_) => SkipReason::FolderUnreadable,
        other => SkipReason::Unreadable(other.to_string()),
    }
}

/// Scan `folders` and group what was found by title.
///
/// Best-effort: a folder that is missing or unreadable becomes a skip entry
/// and the build carries on with the rest. Zero folders produce an empty
/// inventory. Progress counts one step per folder while discovering, then
/// one step per discovered file, plus a final step.
#[instrument(skip(scanner, folders, progress), fields(folders = folders.len()))]
pub async fn build_inventory(
    scanner: &dyn Scanner,
    folders: &[PathBuf],
    recursive: bool,
    ignore_cache: bool,
    progress: &dyn ProgressReporter,
) -> Inventory {
    let mut builder = InventoryBuilder::new();
    let mut seen = BTreeSet::new();
    let mut discovered = Vec::new();
    let mut steps = Steps::new(progress, folders.len() as u64 + 1);

    for folder in folders {
        let mut stream = scanner.discover(folder, recursive);
        while let Some(item) = stream.next().await {
            match item {
                Ok(file) => {
                    // Overlapping folders (`/a` and `/a/b`, recursively) list
                    // the same file twice.
                    if seen.insert(file.location.clone()) {
                        discovered.push(file);
                    }
                },
                Err(err) => {
                    let path = match &*err {
                        ErrorKind::FolderMissing(p) | ErrorKind::FolderUnreadable(p) | ErrorKind::FileUnreadable(p) => {
                            p.clone()
                        },
                        _ => folder.clone(),
                    };
                    tracing::warn!(path = %path.display(), error = %&*err, "Skipping during discovery");
                    if let Some(location) = FileLocation::from_path(&path) {
                        match &*err {
                            ErrorKind::FileUnreadable(_) => builder.skip_file(location, skip_reason(&err)),
                            _ => builder.skip_folder(location, skip_reason(&err)),
                        }
                    }
                },
            }
        }
        steps.advance(format!("Listed {}", folder.display()));
    }
    tracing::info!(files = discovered.len(), "Discovery complete");

    steps.grow(discovered.len() as u64);
    for file in &discovered {
        steps.advance(format!("Scanning {}", file.location.file_name.to_string_lossy()));
        match scanner.inspect(file, ignore_cache).await {
            Ok(packages) => builder.add(file, packages),
            Err(err) => {
                tracing::debug!(path = %file.location.path().display(), reason = %&*err, "Skipping file");
                builder.skip_file(file.location.clone(), skip_reason(&err));
            },
        }
    }

    let inventory = builder.finish();
    tracing::info!(
        titles = inventory.titles.len(),
        skipped = inventory.skipped.len(),
        files = inventory.num_files,
        "Inventory built"
    );
    steps.finish("Scan complete");
    inventory
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::introspect::FileNameIntrospector;
    use crate::scanner::DiscoveryStream;
    use async_trait::async_trait;
    use slm_core::progress::Silent;
    use slm_core::{Progress, TitleId};
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::Mutex;
    use time::UtcDateTime;

    /// Serves a fixed file list per folder and introspects by file name.
    #[derive(Default)]
    struct StubScanner {
        folders: HashMap<PathBuf, Vec<&'static str>>,
    }

    impl StubScanner {
        fn with(mut self, folder: &str, files: Vec<&'static str>) -> Self {
            self.folders.insert(PathBuf::from(folder), files);
            self
        }
    }

    #[async_trait]
    impl Scanner for StubScanner {
        fn discover<'a>(&'a self, folder: &'a Path, _recursive: bool) -> DiscoveryStream<'a> {
            let items: Vec<Result<DiscoveredFile>> = match self.folders.get(folder) {
                Some(files) => files
                    .iter()
                    .map(|name| {
                        Ok(DiscoveredFile {
                            location: FileLocation::new(folder, name),
                            size: 1,
                            modified: UtcDateTime::UNIX_EPOCH,
                            split: false,
                        })
                    })
                    .collect(),
                None => vec![Err(exn::Exn::from(ErrorKind::FolderMissing(folder.to_path_buf())))],
            };
            Box::pin(futures::stream::iter(items))
        }

        async fn inspect(&self, file: &DiscoveredFile, _ignore_cache: bool) -> Result<Vec<PackageInfo>> {
            if file.location.extension().as_deref() != Some("nsp") {
                exn::bail!(ErrorKind::UnsupportedType);
            }
            FileNameIntrospector::parse(&file.location.file_name.to_string_lossy())
        }

        async fn clear_cache(&self) -> Result<u64> {
            Ok(0)
        }
    }

    fn key(id: &str) -> slm_core::TitleKey {
        TitleId::parse(id).unwrap().key()
    }

    #[tokio::test]
    async fn test_zero_folders_is_empty() {
        let inventory = build_inventory(&StubScanner::default(), &[], true, false, &Silent).await;
        assert!(inventory.is_empty());
        assert_eq!(inventory.num_files, 0);
    }

    #[tokio::test]
    async fn test_groups_by_title_and_skips_the_rest() {
        let scanner = StubScanner::default().with(
            "/games",
            vec![
                "A [0100000000010000][v0].nsp",
                "A [0100000000010800][v196608].nsp",
                "A DLC [0100000000011001][v0].nsp",
                "B update [0100000000020800][v65536].nsp",
                "readme.txt",
                "mystery.nsp",
            ],
        );
        let inventory = build_inventory(&scanner, &[PathBuf::from("/games")], true, false, &Silent).await;
        assert_eq!(inventory.num_files, 6);

        let a = inventory.get(&key("0100000000010000")).unwrap();
        assert!(a.base_exists());
        assert_eq!(a.latest_update_revision(), 196608);
        assert_eq!(a.dlc.len(), 1);

        let b = inventory.get(&key("0100000000020000")).unwrap();
        assert!(!b.base_exists());

        assert_eq!(
            inventory.skipped.get(&FileLocation::new("/games", "readme.txt")),
            Some(&SkipReason::UnsupportedType)
        );
        assert_eq!(
            inventory.skipped.get(&FileLocation::new("/games", "mystery.nsp")),
            Some(&SkipReason::Unrecognised)
        );
    }

    #[tokio::test]
    async fn test_missing_folder_does_not_abort() {
        let scanner = StubScanner::default().with("/games", vec!["A [0100000000010000][v0].nsp"]);
        let folders = [PathBuf::from("/nowhere"), PathBuf::from("/games")];
        let inventory = build_inventory(&scanner, &folders, true, false, &Silent).await;
        assert!(inventory.contains(&key("0100000000010000")));
        assert_eq!(
            inventory.skipped.get(&FileLocation::new("/", "nowhere")),
            Some(&SkipReason::FolderMissing)
        );
        assert_eq!(inventory.num_files, 1);
    }

    #[tokio::test]
    async fn test_every_file_accounted_for_exactly_once() {
        let scanner = StubScanner::default().with(
            "/games",
            vec![
                "A [0100000000010000][v0].nsp",
                "A copy [0100000000010000][v0].nsp",
                "Bundle [0100000000020000][0100000000020800][v65536].nsp",
                "B patch [0100000000020800][v65536].nsp",
                "junk.bin",
            ],
        );
        let inventory = build_inventory(&scanner, &[PathBuf::from("/games")], true, false, &Silent).await;
        let attributed: BTreeSet<FileLocation> = inventory
            .titles
            .values()
            .flat_map(|g| g.files())
            .map(|f| f.location.clone())
            .collect();
        for location in inventory.skipped.keys() {
            assert!(!attributed.contains(location), "{location:?} is both attributed and skipped");
        }
        assert_eq!(attributed.len() + inventory.skipped.len(), inventory.num_files);
        // The bundle lost its update to the later patch file but still
        // provides the base game, so it is not a skip.
        let b = inventory.get(&key("0100000000020000")).unwrap();
        assert!(b.multi_content);
        assert_eq!(b.latest_update().unwrap().location.file_name, "B patch [0100000000020800][v65536].nsp");
    }

    #[tokio::test]
    async fn test_progress_covers_discovery_and_ends_on_total() {
        let scanner = StubScanner::default().with("/games", vec!["a.nsp", "b.nsp"]);
        let seen = Mutex::new(Vec::new());
        let reporter = |p: Progress| seen.lock().unwrap().push((p.current, p.total));
        build_inventory(&scanner, &[PathBuf::from("/games")], true, false, &reporter).await;
        assert_eq!(seen.into_inner().unwrap(), vec![(1, 2), (2, 4), (3, 4), (4, 4)]);
    }
}
