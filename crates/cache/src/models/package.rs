use crate::error::{Error, ErrorKind};
use exn::{OptionExt, ResultExt};
use slm_core::PackageInfo;
use std::path::{Path, PathBuf};
use time::UtcDateTime;

/// Identity of a file on disk at the moment it was looked at.
///
/// A cached parse result belongs to a stamp, and is only handed back while
/// the file on disk still carries the same size and modification time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileStamp {
    pub path: PathBuf,
    pub size: u64,
    pub modified: UtcDateTime,
}

impl FileStamp {
    pub fn new(path: impl Into<PathBuf>, size: u64, modified: UtcDateTime) -> Self {
        Self {
            path: path.into(),
            size,
            modified,
        }
    }

    pub(crate) fn path_str(&self) -> Result<&str, Error> {
        path_str(&self.path)
    }
}

pub(crate) fn path_str(path: &Path) -> Result<&str, Error> {
    Ok(path.to_str().ok_or_raise(|| ErrorKind::InvalidData("path"))?)
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct PackageRow {
    pub(crate) path: String,
    pub(crate) file_size: i64,
    pub(crate) modified_at: i64,
    pub(crate) contents: String,
    pub(crate) scanned_at: i64,
}

impl PackageRow {
    pub(crate) fn new(stamp: &FileStamp, packages: &[PackageInfo]) -> Result<Self, Error> {
        Ok(Self {
            path: stamp.path_str()?.to_string(),
            file_size: i64::try_from(stamp.size).or_raise(|| ErrorKind::InvalidData("file size"))?,
            modified_at: stamp.modified.unix_timestamp(),
            contents: serde_json::to_string(packages).or_raise(|| ErrorKind::InvalidData("package contents"))?,
            scanned_at: UtcDateTime::now().unix_timestamp(),
        })
    }

    /// Whether this row was recorded for the same file state as `stamp`.
    ///
    /// Timestamps are stored with whole-second precision.
    pub(crate) fn matches(&self, stamp: &FileStamp) -> bool {
        i64::try_from(stamp.size).is_ok_and(|size| size == self.file_size)
            && self.modified_at == stamp.modified.unix_timestamp()
    }

    pub(crate) fn packages(&self) -> Result<Vec<PackageInfo>, Error> {
        serde_json::from_str(&self.contents).or_raise(|| ErrorKind::InvalidData("package contents"))
    }
}
