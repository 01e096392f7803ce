use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_TITLES_URL: &str = "https://tinfoil.media/repo/db/titles.json";
pub const DEFAULT_VERSIONS_URL: &str = "https://tinfoil.media/repo/db/versions.json";

const DEFAULT_FOLDER_TEMPLATE: &str = "{{ name }} [{{ id }}]";
const DEFAULT_FILE_TEMPLATE: &str =
    "{{ name }}{% if dlc_name %} ({{ dlc_name }}){% endif %} [{{ id }}][v{{ version }}]";

/// Everything the engine reads from (and writes back to) the settings file.
///
/// Field names match the persisted JSON so that existing settings files keep
/// working. Every field has a default; a missing or partial file is fine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Cache validator (entity tag) of the last downloaded title list.
    pub titles_etag: Option<String>,
    /// Cache validator (entity tag) of the last downloaded version list.
    pub versions_etag: Option<String>,
    /// Primary library folder; also the root that organize moves files into.
    pub folder: Option<PathBuf>,
    /// Additional folders to scan.
    pub scan_folders: Vec<PathBuf>,
    pub scan_recursively: bool,
    pub organize_options: OrganizeOptions,
    /// Title ids (base or DLC) excluded from missing-update results.
    pub ignore_update_title_ids: Vec<String>,
    /// Title ids (base or DLC) excluded from missing-DLC results.
    pub ignore_dlc_title_ids: Vec<String>,
    /// Title ids excluded from missing-game results.
    pub ignore_game_title_ids: Vec<String>,
    /// Skip version checks on owned DLC when looking for missing updates.
    pub ignore_dlc_updates: bool,
    pub hide_demo_games: bool,
    pub titles_json_url: String,
    pub versions_json_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            titles_etag: None,
            versions_etag: None,
            folder: None,
            scan_folders: Vec::new(),
            scan_recursively: true,
            organize_options: OrganizeOptions::default(),
            ignore_update_title_ids: Vec::new(),
            ignore_dlc_title_ids: Vec::new(),
            ignore_game_title_ids: Vec::new(),
            ignore_dlc_updates: false,
            hide_demo_games: true,
            titles_json_url: DEFAULT_TITLES_URL.to_string(),
            versions_json_url: DEFAULT_VERSIONS_URL.to_string(),
        }
    }
}

impl Settings {
    /// Every folder to scan: the additional scan folders followed by the
    /// primary folder, without duplicates, in first-seen order.
    pub fn all_scan_folders(&self) -> Vec<PathBuf> {
        let mut folders: Vec<PathBuf> = Vec::with_capacity(self.scan_folders.len() + 1);
        for folder in self.scan_folders.iter().chain(self.folder.iter()) {
            if !folder.as_os_str().is_empty() && !folders.contains(folder) {
                folders.push(folder.clone());
            }
        }
        folders
    }
}

/// How the library should be laid out on disk by the organize operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizeOptions {
    /// Place every title's files in a folder named by `folder_name_template`.
    pub create_folder_per_game: bool,
    /// Rename every file according to `file_name_template`.
    pub rename_files: bool,
    /// Ask the file mover to prune folders left empty by a move.
    pub delete_empty_folders: bool,
    /// After moving, delete every update file except the latest revision.
    pub delete_old_update_files: bool,
    pub folder_name_template: String,
    pub file_name_template: String,
    /// Strip characters outside printable ASCII from generated names.
    pub switch_safe_file_names: bool,
}

impl Default for OrganizeOptions {
    fn default() -> Self {
        Self {
            create_folder_per_game: false,
            rename_files: false,
            delete_empty_folders: false,
            delete_old_update_files: false,
            folder_name_template: DEFAULT_FOLDER_TEMPLATE.to_string(),
            file_name_template: DEFAULT_FILE_TEMPLATE.to_string(),
            switch_safe_file_names: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"folder": "/games", "hide_demo_games": false}"#).unwrap();
        assert_eq!(settings.folder, Some(PathBuf::from("/games")));
        assert!(!settings.hide_demo_games);
        assert!(settings.scan_recursively);
        assert_eq!(settings.titles_json_url, DEFAULT_TITLES_URL);
        assert_eq!(settings.organize_options, OrganizeOptions::default());
    }

    #[test]
    fn test_scan_folders_are_deduplicated_in_order() {
        let settings = Settings {
            folder: Some(PathBuf::from("/a")),
            scan_folders: vec![PathBuf::from("/b"), PathBuf::from("/a"), PathBuf::from("/b"), PathBuf::new()],
            ..Settings::default()
        };
        assert_eq!(settings.all_scan_folders(), vec![PathBuf::from("/b"), PathBuf::from("/a")]);
    }

    #[test]
    fn test_no_folders_configured() {
        assert!(Settings::default().all_scan_folders().is_empty());
    }
}
