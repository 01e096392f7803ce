//! Library Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A library error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// One of the two datasets held in [`SharedState`](crate::SharedState).
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
pub enum Dataset {
    #[display("title catalog")]
    Catalog,
    #[display("local inventory")]
    Inventory,
}

impl Dataset {
    fn hint(&self) -> &'static str {
        match self {
            Self::Catalog => "update the catalog first",
            Self::Inventory => "scan the library first",
        }
    }
}

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// A query ran before the dataset it needs was ever built. Distinct from
    /// an empty result.
    #[display("{_0} not loaded; {}", _0.hint())]
    NotLoaded(#[error(not(source))] Dataset),
    #[display("could not load or save settings")]
    Settings,
    #[display("catalog refresh failed")]
    Catalog,
    #[display("could not clear the parse cache")]
    Cache,
    /// An organize template does not compile or contains no substitution.
    #[display("invalid {_0} template")]
    Template(#[error(not(source))] &'static str),
    /// Organize needs a library folder to move files into.
    #[display("no library folder configured")]
    NoLibraryFolder,
    /// A generated path would leave the library folder.
    #[display("generated path escapes the library folder: {}", _0.display())]
    PathEscapes(#[error(not(source))] PathBuf),
    /// A file operation performed by a mover or remover failed.
    #[display("file operation failed: {}", _0.display())]
    FileOperation(#[error(not(source))] PathBuf),
    /// A background task panicked.
    #[display("background task failed")]
    Task,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Catalog | Self::Cache | Self::FileOperation(_))
    }
}
