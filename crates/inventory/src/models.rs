use derive_more::Display;
use slm_core::{ContentType, PackageInfo, TitleId, TitleKey};
use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use time::UtcDateTime;

/// Where a scanned file lives: the folder it was found in and its name.
///
/// Joining the two always reconstructs the scanned path exactly.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileLocation {
    pub folder: PathBuf,
    pub file_name: OsString,
}

impl FileLocation {
    pub fn new(folder: impl Into<PathBuf>, file_name: impl Into<OsString>) -> Self {
        Self {
            folder: folder.into(),
            file_name: file_name.into(),
        }
    }

    /// Splits a path into folder and file name. Paths without a file name
    /// (`/`, `..`) have no location.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();
        let file_name = path.file_name()?;
        let folder = path.parent().unwrap_or_else(|| Path::new(""));
        Some(Self::new(folder, file_name))
    }

    pub fn path(&self) -> PathBuf {
        self.folder.join(&self.file_name)
    }

    /// Lowercased extension of the file name, if any.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.file_name)
            .extension()
            .and_then(OsStr::to_str)
            .map(str::to_ascii_lowercase)
    }
}

/// A file found during discovery, before introspection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiscoveredFile {
    pub location: FileLocation,
    /// Total size; for split files the sum of all parts.
    pub size: u64,
    /// Modification time; for split files the newest part.
    pub modified: UtcDateTime,
    /// One logical package stored as a directory of numbered parts.
    pub split: bool,
}

/// Why a discovered file (or folder) contributed nothing to the inventory.
#[derive(Clone, Debug, Display, PartialEq, Eq)]
pub enum SkipReason {
    #[display("folder does not exist")]
    FolderMissing,
    #[display("folder could not be read")]
    FolderUnreadable,
    #[display("file type is not supported")]
    UnsupportedType,
    #[display("no title id could be read from the file")]
    Unrecognised,
    #[display("file contains no packages")]
    Empty,
    #[display("failed to read file: {_0}")]
    Unreadable(String),
    #[display("duplicate base file for {_0}")]
    DuplicateBase(TitleId),
    #[display("duplicate update v{_1} for {_0}")]
    DuplicateUpdate(TitleId, u32),
    #[display("duplicate DLC file for {_0}")]
    DuplicateDlc(TitleId),
}

/// One piece of content attributed to a title, and the file it came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackageFile {
    pub location: FileLocation,
    pub info: PackageInfo,
    pub size: u64,
    pub split: bool,
    /// The file also carries content other than `info`.
    pub multi_content: bool,
}

/// Everything on disk for one title.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GameFileGroup {
    pub base: Option<PackageFile>,
    /// Updates keyed by revision; the last entry is the latest update.
    pub updates: BTreeMap<u32, PackageFile>,
    pub dlc: BTreeMap<TitleId, PackageFile>,
    pub multi_content: bool,
    pub split: bool,
}

impl GameFileGroup {
    pub fn base_exists(&self) -> bool {
        self.base.is_some()
    }

    /// Highest-revision update, if any.
    pub fn latest_update(&self) -> Option<&PackageFile> {
        self.updates.values().next_back()
    }

    /// Revision of the latest update; `0` without updates.
    pub fn latest_update_revision(&self) -> u32 {
        self.updates.keys().next_back().copied().unwrap_or(0)
    }

    /// Every file attributed to the title: base, then updates, then DLC.
    pub fn files(&self) -> impl Iterator<Item = &PackageFile> {
        self.base.iter().chain(self.updates.values()).chain(self.dlc.values())
    }

    /// Adds a file, returning whatever it displaced.
    pub(crate) fn attribute(&mut self, file: PackageFile) -> Option<(PackageFile, SkipReason)> {
        self.multi_content |= file.multi_content;
        self.split |= file.split;
        let id = file.info.title_id.clone();
        match id.content_type() {
            ContentType::Base => self.base.replace(file).map(|old| (old, SkipReason::DuplicateBase(id))),
            ContentType::Update => {
                let revision = file.info.version;
                self.updates
                    .insert(revision, file)
                    .map(|old| (old, SkipReason::DuplicateUpdate(id, revision)))
            },
            ContentType::Dlc => self
                .dlc
                .insert(id.clone(), file)
                .map(|old| (old, SkipReason::DuplicateDlc(id))),
        }
    }
}

/// The local library: every scanned file either attributed to a title or
/// recorded with the reason it was skipped.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Inventory {
    pub titles: BTreeMap<TitleKey, GameFileGroup>,
    pub skipped: BTreeMap<FileLocation, SkipReason>,
    /// Number of files discovered across all scanned folders.
    pub num_files: usize,
}

impl Inventory {
    pub fn get(&self, key: &TitleKey) -> Option<&GameFileGroup> {
        self.titles.get(key)
    }

    pub fn contains(&self, key: &TitleKey) -> bool {
        self.titles.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty() && self.skipped.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn file(id: &str, version: u32, name: &str) -> PackageFile {
        PackageFile {
            location: FileLocation::new("/games", name),
            info: PackageInfo::new(TitleId::parse(id).unwrap(), version),
            size: 1,
            split: false,
            multi_content: false,
        }
    }

    #[rstest]
    #[case("/games/Zelda [0100000000010000].nsp")]
    #[case("relative/dir/file.xci")]
    #[case("no-folder.nsz")]
    fn test_location_round_trip(#[case] path: &str) {
        let location = FileLocation::from_path(path).unwrap();
        assert_eq!(location.path(), PathBuf::from(path));
    }

    #[test]
    fn test_latest_update_is_highest_revision() {
        let mut group = GameFileGroup::default();
        for revision in [0, 3, 7, 2] {
            group.attribute(file("0100000000010800", revision, &format!("u{revision}.nsp")));
        }
        assert_eq!(group.latest_update_revision(), 7);
        assert_eq!(group.latest_update().unwrap().location.file_name, "u7.nsp");
        assert!(!group.base_exists());
    }

    #[test]
    fn test_later_duplicate_is_retained() {
        let mut group = GameFileGroup::default();
        assert!(group.attribute(file("0100000000010800", 65536, "first.nsp")).is_none());
        let (displaced, reason) = group.attribute(file("0100000000010800", 65536, "second.nsp")).unwrap();
        assert_eq!(displaced.location.file_name, "first.nsp");
        assert_eq!(reason.to_string(), "duplicate update v65536 for 0100000000010800");
        assert_eq!(group.latest_update().unwrap().location.file_name, "second.nsp");
    }
}
