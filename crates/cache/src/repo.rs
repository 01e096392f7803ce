//! Read/write access to cached package metadata.

use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::models::{FileStamp, PackageRow};
use exn::ResultExt;
use slm_core::PackageInfo;
use sqlx::SqlitePool;

/// Repository for cached introspection results, one row per package file.
///
/// Rows are keyed by the file's full path. A lookup with a [`FileStamp`] only
/// hits when size and modification time both match the recorded row, so a
/// replaced or rewritten file is always parsed again.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl From<&Database> for Repository {
    fn from(db: &Database) -> Self {
        Self::new(db.pool().clone())
    }
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Cached packages for the file, if the recorded row is still fresh.
    ///
    /// A stale row is left in place; the caller re-parses the file and
    /// [`upsert`](Self::upsert)s over it.
    pub async fn get(&self, stamp: &FileStamp) -> Result<Option<Vec<PackageInfo>>> {
        let row: Option<PackageRow> = sqlx::query_as(include_str!("../queries/get_by_path.sql"))
            .bind(stamp.path_str()?)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        match row {
            Some(row) if row.matches(stamp) => row.packages().map(Some),
            Some(row) => {
                tracing::trace!(path = %row.path, "Cached row is stale");
                Ok(None)
            },
            None => Ok(None),
        }
    }

    /// Record the packages parsed from the file, replacing any previous row.
    pub async fn upsert(&self, stamp: &FileStamp, packages: &[PackageInfo]) -> Result<()> {
        let row = PackageRow::new(stamp, packages)?;
        sqlx::query(include_str!("../queries/upsert_package.sql"))
            .bind(row.path)
            .bind(row.file_size)
            .bind(row.modified_at)
            .bind(row.contents)
            .bind(row.scanned_at)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(())
    }

    /// Forget everything. Returns the number of rows removed.
    pub async fn clear(&self) -> Result<u64> {
        let result = sqlx::query(include_str!("../queries/clear.sql"))
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        tracing::debug!(rows = result.rows_affected(), "Cleared parse cache");
        Ok(result.rows_affected())
    }
}
