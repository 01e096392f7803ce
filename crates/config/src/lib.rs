//! Settings for the library manager.
//!
//! Settings are layered with [figment]: built-in defaults, then the
//! `settings.json` file in the base folder, then `SLM_`-prefixed environment
//! variables (nested keys separated by `__`, e.g.
//! `SLM_ORGANIZE_OPTIONS__RENAME_FILES=true`).
//!
//! The engine never touches the file directly; it goes through the
//! [`SettingsStore`] port so that tests can swap in an in-memory store.

pub mod error;
mod settings;
mod store;

pub use crate::settings::{DEFAULT_TITLES_URL, DEFAULT_VERSIONS_URL, OrganizeOptions, Settings};
#[cfg(feature = "mock")]
pub use crate::store::MemorySettings;
pub use crate::store::{SETTINGS_FILE_NAME, SettingsFile, SettingsStore, default_base_folder};
