use crate::error::{ErrorKind, Result};
use crate::models::DiscoveredFile;
use async_trait::async_trait;
use regex::Regex;
use slm_core::{PackageInfo, TitleId};
use std::path::Path;
use std::sync::LazyLock;

static TITLE_ID_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[([0-9A-Fa-f]{16})\]").unwrap());
static VERSION_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[[vV](\d+)\]").unwrap());

/// Reads the packages contained in a single file.
///
/// Implementations that decode package containers plug in here; `path` is
/// the full path of the discovered file (a directory for split files).
#[async_trait]
pub trait Introspector: Send + Sync {
    async fn introspect(&self, path: &Path, file: &DiscoveredFile) -> Result<Vec<PackageInfo>>;
}

/// Reads package metadata from scene-style file names such as
/// `Some Game [0100ABCD12340000][v0].nsp`.
///
/// Every `[<16 hex digits>]` tag becomes one package; the first `[v<n>]` tag
/// is the revision of all of them (`0` when absent). The text before the
/// first tag is the display name.
#[derive(Clone, Copy, Debug, Default)]
pub struct FileNameIntrospector;

impl FileNameIntrospector {
    pub fn parse(file_name: &str) -> Result<Vec<PackageInfo>> {
        let version = VERSION_TAG
            .captures(file_name)
            .and_then(|c| c[1].parse::<u32>().ok())
            .unwrap_or(0);
        let name = file_name
            .split_once('[')
            .map(|(name, _)| name)
            .unwrap_or(file_name)
            .trim()
            .trim_end_matches(['-', '_'])
            .trim();
        let packages: Vec<PackageInfo> = TITLE_ID_TAG
            .captures_iter(file_name)
            .filter_map(|c| TitleId::parse(&c[1]).ok())
            .map(|id| {
                let package = PackageInfo::new(id, version);
                match name.is_empty() {
                    true => package,
                    false => package.with_name(name),
                }
            })
            .collect();
        if packages.is_empty() {
            exn::bail!(ErrorKind::Unrecognised);
        }
        Ok(packages)
    }
}

#[async_trait]
impl Introspector for FileNameIntrospector {
    async fn introspect(&self, _path: &Path, file: &DiscoveredFile) -> Result<Vec<PackageInfo>> {
        let name = file.location.file_name.to_string_lossy();
        Self::parse(&name)
    }
}
