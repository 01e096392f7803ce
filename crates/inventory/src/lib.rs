//! Local Inventory Builder.
//!
//! Turns the package files found in a set of folders into an [`Inventory`]:
//! one [`GameFileGroup`] per title (base game, updates by revision, DLC),
//! plus a [`SkipReason`] for every file or folder that could not be
//! attributed.
//!
//! Discovery and per-file introspection sit behind the [`Scanner`] port;
//! [`LocalScanner`] is the filesystem implementation, and reads package
//! contents through an [`Introspector`] with an optional parse cache.

mod build;
pub mod error;
mod introspect;
mod local;
mod models;
mod scanner;

pub use crate::build::{InventoryBuilder, build_inventory};
pub use crate::introspect::{FileNameIntrospector, Introspector};
pub use crate::local::{LocalScanner, SUPPORTED_EXTENSIONS};
pub use crate::models::{DiscoveredFile, FileLocation, GameFileGroup, Inventory, PackageFile, SkipReason};
pub use crate::scanner::{DiscoveryStream, Scanner};
