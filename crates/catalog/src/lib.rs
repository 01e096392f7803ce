//! Title Catalog Fetcher.
//!
//! Downloads the remote title list and version list, keeps a local copy of
//! each, and parses them into a [`Catalog`] grouped by
//! [`TitleKey`](slm_core::TitleKey).
//!
//! Downloads are conditional: the entity tag from the last successful
//! download is sent along, and a "not modified" answer reuses the local copy.
//! See [`refresh_catalog`].

pub mod error;
mod fetch;
mod models;
mod parse;
mod source;

pub use crate::fetch::{CatalogFiles, CatalogUrls, TITLES_FILE_NAME, VERSIONS_FILE_NAME, Validators, refresh_catalog};
pub use crate::models::{Catalog, CatalogTitle, TitleRecord};
#[cfg(feature = "mock")]
pub use crate::source::MockSource;
pub use crate::source::{Document, DocumentSource, HttpSource};
