//! SQLite cache of parsed package metadata.
//!
//! Introspecting a game package means reading (and possibly decrypting) its
//! headers, which is far too slow to repeat for an unchanged library on every
//! scan. This crate remembers the [`PackageInfo`](slm_core::PackageInfo)
//! list produced for each file path.
//!
//! The database is not the source of truth, the package files are. A cached
//! row is only returned while the file's size and modification time still
//! match; otherwise the file is treated as unseen. Deleting the database (or
//! calling [`Repository::clear`] for a hard rescan) just forces every file to
//! be parsed again.

mod db;
pub mod error;
mod models;
mod repo;

pub use crate::db::Database;
pub use crate::models::FileStamp;
pub use crate::repo::Repository;
