use crate::error::{ErrorKind, Result};
use crate::settings::Settings;
use directories::ProjectDirs;
use exn::{OptionExt, ResultExt};
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized};
use std::fs;
use std::path::{Path, PathBuf};

pub const SETTINGS_FILE_NAME: &str = "settings.json";
const ENV_PREFIX: &str = "SLM_";

/// Read/write port for [`Settings`].
///
/// The engine reads settings at the start of every operation (so edits made
/// while it is running are picked up) and writes them back only to persist
/// new cache validators.
pub trait SettingsStore: Send + Sync {
    fn load(&self) -> Result<Settings>;
    fn save(&self, settings: &Settings) -> Result<()>;
}

/// Default base folder for settings, downloaded catalog documents and the
/// parse cache.
pub fn default_base_folder() -> Result<PathBuf> {
    ProjectDirs::from("", "", "switch-library-manager")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_raise(|| ErrorKind::NoBaseFolder)
}

/// [`SettingsStore`] backed by a JSON file, layered with environment overrides.
#[derive(Clone, Debug)]
pub struct SettingsFile {
    path: PathBuf,
}

impl SettingsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The settings file inside a base folder.
    pub fn in_folder(base: impl AsRef<Path>) -> Self {
        Self::new(base.as_ref().join(SETTINGS_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn figment(&self) -> Figment {
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Json::file(&self.path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }
}

impl SettingsStore for SettingsFile {
    fn load(&self) -> Result<Settings> {
        let settings: Settings = self.figment().extract().or_raise(|| ErrorKind::Invalid)?;
        tracing::debug!(path = %self.path.display(), "Loaded settings");
        Ok(settings)
    }

    fn save(&self, settings: &Settings) -> Result<()> {
        let write_error = || ErrorKind::Write(self.path.clone());
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).or_raise(write_error)?;
        }
        let json = serde_json::to_string_pretty(settings).or_raise(write_error)?;
        // Write-then-rename, so a crash mid-write never leaves a truncated file.
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, json).or_raise(write_error)?;
        fs::rename(&staging, &self.path).or_raise(write_error)?;
        tracing::debug!(path = %self.path.display(), "Saved settings");
        Ok(())
    }
}

/// In-memory [`SettingsStore`] for tests, counting how often it was saved.
#[cfg(feature = "mock")]
#[derive(Debug, Default)]
pub struct MemorySettings {
    settings: std::sync::Mutex<Settings>,
    saves: std::sync::atomic::AtomicUsize,
}

#[cfg(feature = "mock")]
impl MemorySettings {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: std::sync::Mutex::new(settings),
            saves: Default::default(),
        }
    }

    pub fn saves(&self) -> usize {
        self.saves.load(std::sync::atomic::Ordering::SeqCst)
    }

    pub fn current(&self) -> Settings {
        self.settings.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[cfg(feature = "mock")]
impl SettingsStore for MemorySettings {
    fn load(&self) -> Result<Settings> {
        Ok(self.current())
    }

    fn save(&self, settings: &Settings) -> Result<()> {
        if let Ok(mut current) = self.settings.lock() {
            *current = settings.clone();
        }
        self.saves.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_loads_defaults() {
        let dir = TempDir::new().unwrap();
        let store = SettingsFile::in_folder(dir.path());
        let settings = store.load().unwrap();
        assert_eq!(settings.titles_etag, None);
        assert!(settings.scan_recursively);
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = SettingsFile::in_folder(dir.path().join("nested"));
        let settings = Settings {
            titles_etag: Some("\"abc\"".to_string()),
            ignore_dlc_title_ids: vec!["0100ABCD12341001".to_string()],
            ..Settings::default()
        };
        store.save(&settings).unwrap();
        assert!(store.path().exists());
        let loaded = store.load().unwrap();
        assert_eq!(loaded.titles_etag.as_deref(), Some("\"abc\""));
        assert_eq!(loaded.ignore_dlc_title_ids, vec!["0100ABCD12341001".to_string()]);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let store = SettingsFile::in_folder(dir.path());
        fs::write(store.path(), r#"{"scan_recursively": "definitely"}"#).unwrap();
        let err = store.load().unwrap_err();
        assert!(matches!(&*err, ErrorKind::Invalid));
    }
}
