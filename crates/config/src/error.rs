//! Configuration Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The settings sources could not be merged into a valid [`Settings`](crate::Settings).
    #[display("invalid settings")]
    Invalid,
    /// The settings file could not be written.
    #[display("could not write settings file: {}", _0.display())]
    Write(#[error(not(source))] PathBuf),
    /// No home directory to derive a default base folder from.
    #[display("could not determine a base folder for application data")]
    NoBaseFolder,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Write(_))
    }
}
