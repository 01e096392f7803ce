//! Inventory Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// An inventory error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for inventory operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("folder does not exist: {}", _0.display())]
    FolderMissing(#[error(not(source))] PathBuf),
    #[display("folder could not be read: {}", _0.display())]
    FolderUnreadable(#[error(not(source))] PathBuf),
    #[display("file could not be read: {}", _0.display())]
    FileUnreadable(#[error(not(source))] PathBuf),
    /// The file extension is not one of the package formats we understand.
    #[display("file type is not supported")]
    UnsupportedType,
    /// The file is a package, but no title id could be read from it.
    #[display("no title id could be read from the file")]
    Unrecognised,
    #[display("parse cache error")]
    Cache,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::FolderUnreadable(_) | Self::FileUnreadable(_) | Self::Cache)
    }
}
