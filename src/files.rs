//! File operations behind the organize ports.

use async_trait::async_trait;
use exn::ResultExt;
use slm_library::error::{ErrorKind, Result};
use slm_library::{FileMover, FileRemover, TitleMove};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Moves and deletes files on the local filesystem.
///
/// Never overwrites: a move onto an existing path fails the title. Folders
/// in `protected` (the scan folders) are never pruned, even when empty.
#[derive(Clone, Debug, Default)]
pub struct LocalFiles {
    protected: BTreeSet<PathBuf>,
}

impl LocalFiles {
    pub fn new(protected: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            protected: protected.into_iter().collect(),
        }
    }

    async fn move_one(from: &Path, to: &Path) -> Result<()> {
        let error = || ErrorKind::FileOperation(to.to_path_buf());
        if fs::try_exists(to).await.or_raise(error)? {
            tracing::warn!(from = %from.display(), to = %to.display(), "Destination already exists");
            exn::bail!(error());
        }
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent).await.or_raise(error)?;
        }
        fs::rename(from, to).await.or_raise(error)?;
        tracing::debug!(from = %from.display(), to = %to.display(), "Moved file");
        Ok(())
    }

    /// Remove `folder` if the moves left it empty.
    async fn prune(&self, folder: &Path) {
        if self.protected.contains(folder) {
            return;
        }
        let Ok(mut entries) = fs::read_dir(folder).await else {
            return;
        };
        if let Ok(None) = entries.next_entry().await
            && fs::remove_dir(folder).await.is_ok()
        {
            tracing::debug!(folder = %folder.display(), "Removed empty folder");
        }
    }
}

#[async_trait]
impl FileMover for LocalFiles {
    async fn move_title(&self, title: &TitleMove) -> Result<()> {
        for planned in &title.moves {
            Self::move_one(&planned.from, &planned.to).await?;
        }
        if title.prune_empty_folders {
            let sources: BTreeSet<&Path> = title.moves.iter().filter_map(|m| m.from.parent()).collect();
            for folder in sources {
                self.prune(folder).await;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl FileRemover for LocalFiles {
    async fn remove(&self, path: &Path) -> Result<()> {
        let error = || ErrorKind::FileOperation(path.to_path_buf());
        let metadata = fs::metadata(path).await.or_raise(error)?;
        // Split files are directories of parts.
        match metadata.is_dir() {
            true => fs::remove_dir_all(path).await.or_raise(error)?,
            false => fs::remove_file(path).await.or_raise(error)?,
        }
        Ok(())
    }
}

/// Logs what would happen instead of doing it.
#[derive(Clone, Copy, Debug, Default)]
pub struct DryRun;

#[async_trait]
impl FileMover for DryRun {
    async fn move_title(&self, title: &TitleMove) -> Result<()> {
        for planned in &title.moves {
            tracing::info!(
                from = %planned.from.display(),
                to = %planned.to.display(),
                "Skipping move during dry run"
            );
        }
        Ok(())
    }
}

#[async_trait]
impl FileRemover for DryRun {
    async fn remove(&self, path: &Path) -> Result<()> {
        tracing::info!(path = %path.display(), "Skipping delete during dry run");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slm_core::TitleId;
    use slm_library::PlannedMove;
    use tempfile::TempDir;

    fn title(moves: Vec<PlannedMove>, prune: bool) -> TitleMove {
        TitleMove {
            title_id: TitleId::parse("0100000000010000").unwrap(),
            name: "Game".to_string(),
            moves,
            prune_empty_folders: prune,
        }
    }

    #[tokio::test]
    async fn test_moves_and_prunes() {
        let dir = TempDir::new().unwrap();
        let from = dir.path().join("old/a.nsp");
        let to = dir.path().join("new/Game/a.nsp");
        std::fs::create_dir_all(from.parent().unwrap()).unwrap();
        std::fs::write(&from, b"x").unwrap();

        let files = LocalFiles::new([dir.path().to_path_buf()]);
        files
            .move_title(&title(vec![PlannedMove { from: from.clone(), to: to.clone() }], true))
            .await
            .unwrap();
        assert!(to.exists());
        assert!(!from.exists());
        assert!(!dir.path().join("old").exists());
        assert!(dir.path().exists());
    }

    #[tokio::test]
    async fn test_never_overwrites() {
        let dir = TempDir::new().unwrap();
        let from = dir.path().join("a.nsp");
        let to = dir.path().join("b.nsp");
        std::fs::write(&from, b"a").unwrap();
        std::fs::write(&to, b"b").unwrap();
        let err = LocalFiles::default()
            .move_title(&title(vec![PlannedMove { from: from.clone(), to: to.clone() }], false))
            .await
            .unwrap_err();
        assert!(matches!(&*err, ErrorKind::FileOperation(p) if p == &to));
        assert_eq!(std::fs::read(&to).unwrap(), b"b");
    }

    #[tokio::test]
    async fn test_removes_files_and_split_directories() {
        let dir = TempDir::new().unwrap();
        let single = dir.path().join("u.nsp");
        let split = dir.path().join("u.xci");
        std::fs::write(&single, b"x").unwrap();
        std::fs::create_dir_all(&split).unwrap();
        std::fs::write(split.join("00"), b"x").unwrap();
        LocalFiles::default().remove(&single).await.unwrap();
        LocalFiles::default().remove(&split).await.unwrap();
        assert!(!single.exists());
        assert!(!split.exists());
        assert!(LocalFiles::default().remove(&single).await.is_err());
    }

    #[tokio::test]
    async fn test_dry_run_touches_nothing() {
        let dir = TempDir::new().unwrap();
        let from = dir.path().join("a.nsp");
        std::fs::write(&from, b"x").unwrap();
        let to = dir.path().join("b.nsp");
        DryRun
            .move_title(&title(vec![PlannedMove { from: from.clone(), to: to.clone() }], true))
            .await
            .unwrap();
        DryRun.remove(&from).await.unwrap();
        assert!(from.exists());
        assert!(!to.exists());
    }
}
