use crate::error::Result;
use crate::organize::plan::TitleMove;
use async_trait::async_trait;
use std::path::Path;

/// Performs the moves planned for one title.
///
/// Implementations create missing destination folders, must not overwrite an
/// existing file, and prune source folders left empty when the move asks for
/// it. An error fails the whole title; moves already made stay made.
#[async_trait]
pub trait FileMover: Send + Sync {
    async fn move_title(&self, title: &TitleMove) -> Result<()>;
}

/// Deletes a single file (or split-file directory).
#[async_trait]
pub trait FileRemover: Send + Sync {
    async fn remove(&self, path: &Path) -> Result<()>;
}
