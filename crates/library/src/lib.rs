//! Reconciliation & synchronization engine.
//!
//! Holds the two datasets (the remote [`Catalog`](slm_catalog::Catalog) and
//! the local [`Inventory`](slm_inventory::Inventory)) in a [`SharedState`],
//! and answers questions by comparing them:
//!
//! - **[`local_library`]**: one row per owned title, plus every file that
//!   didn't make it into a row and why.
//! - **[`missing_dlc`] / [`missing_updates`]**: owned titles that are behind
//!   the catalog.
//! - **[`missing_games`]**: catalog titles with nothing on disk.
//! - **[`organize`]**: moves files to where the naming templates say they
//!   belong.
//!
//! [`Engine`] ties it together: it owns the state and every collaborator,
//! and exposes each operation as an async trigger.

mod engine;
pub mod error;
pub mod organize;
mod reconcile;
mod state;
mod template;
mod view;

pub use crate::engine::{Context, Engine, ScanMode, join};
pub use crate::organize::{FileMover, FileRemover, MoveFailure, OrganizeReport, PlannedMove, TitleMove, organize};
pub use crate::reconcile::{IncompleteTitle, MissingDlc, MissingTitle, missing_dlc, missing_games, missing_updates};
pub use crate::state::{SharedState, Snapshot};
pub use crate::template::{NameGenerator, TemplateVars, validate_template};
pub use crate::view::{Issue, LibraryRow, LocalLibrary, local_library};
