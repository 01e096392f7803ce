//! Catalog Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A catalog error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for catalog operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The request never produced a response (DNS, TLS, connection reset, timeout).
    #[display("could not reach {_0}")]
    Unreachable(#[error(not(source))] String),
    /// The server answered with something other than success or "not modified".
    #[display("{url} responded with status {status}")]
    Status {
        #[error(not(source))]
        url: String,
        status: u16,
    },
    /// The document body is not the JSON shape we expect.
    #[display("malformed catalog document: {_0}")]
    Malformed(#[error(not(source))] &'static str),
    /// The local copy of a document could not be read or written.
    #[display("could not access local catalog copy: {}", _0.display())]
    LocalCopy(#[error(not(source))] PathBuf),
    /// HTTP client construction failed.
    #[display("could not initialise HTTP client")]
    Client,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Unreachable(_) => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::Malformed(_) | Self::LocalCopy(_) | Self::Client => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(503, true)]
    #[case(429, true)]
    #[case(404, false)]
    #[case(403, false)]
    fn test_status_retryability(#[case] status: u16, #[case] expected: bool) {
        let kind = ErrorKind::Status {
            url: "https://example.invalid/titles.json".to_string(),
            status,
        };
        assert_eq!(kind.is_retryable(), expected);
    }
}
