//! Shared vocabulary for the library manager.
//!
//! Everything that crosses a crate boundary lives here so that the catalog,
//! the inventory and the reconciliation code all compare the same normalized
//! values:
//!
//! - **[`TitleId`] / [`TitleKey`]**: identifiers are normalized exactly once
//!   by [`normalize_id`], when they enter the system. The [`TitleKey`] (first
//!   twelve hex digits) is shared by a base title, its update and its DLC, and
//!   is the join key between the remote catalog and the local inventory.
//! - **[`PackageInfo`]**: the metadata an introspector extracted from a
//!   single package (or one of several contents of a multi-content package).
//! - **[`IgnoreSet`]**: user-configured identifiers to suppress from results.
//! - **[`progress`]**: the reporting port used by long-running operations.

pub mod error;
mod ids;
mod ignore;
mod package;
pub mod progress;

pub use crate::ids::{ContentType, TitleId, TitleKey, normalize_id};
pub use crate::ignore::IgnoreSet;
pub use crate::package::PackageInfo;
pub use crate::progress::{Progress, ProgressReporter, Steps};
