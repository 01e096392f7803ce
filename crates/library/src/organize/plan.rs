use crate::error::{ErrorKind, Result};
use crate::reconcile::title_name;
use crate::template::{NameGenerator, TemplateVars, validate_template};
use serde::Serialize;
use slm_catalog::CatalogTitle;
use slm_config::OrganizeOptions;
use slm_core::{ContentType, TitleId};
use slm_inventory::{GameFileGroup, PackageFile};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PlannedMove {
    pub from: PathBuf,
    pub to: PathBuf,
}

/// Every move for one title, handed to the [`FileMover`](super::FileMover)
/// in one call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TitleMove {
    pub title_id: TitleId,
    pub name: String,
    /// Files already in place are left out; may be empty.
    pub moves: Vec<PlannedMove>,
    /// Remove source folders the moves leave empty.
    pub prune_empty_folders: bool,
}

/// Resolves titles to destinations. Construction validates both templates,
/// so a [`Planner`] that exists can plan.
pub struct Planner {
    folder: NameGenerator,
    file: NameGenerator,
    options: OrganizeOptions,
    root: Option<PathBuf>,
}

impl Planner {
    /// Both templates are validated whatever the options, so a broken
    /// template is reported before it is first needed.
    pub fn new(options: &OrganizeOptions, root: Option<&Path>) -> Result<Self> {
        let safe = options.switch_safe_file_names;
        let folder = validate_template(&options.folder_name_template, "folder name", safe)?;
        let file = validate_template(&options.file_name_template, "file name", safe)?;
        if options.create_folder_per_game && root.is_none_or(|r| r.as_os_str().is_empty()) {
            exn::bail!(ErrorKind::NoLibraryFolder);
        }
        Ok(Self {
            folder,
            file,
            options: options.clone(),
            root: root.map(Path::to_path_buf),
        })
    }

    fn vars(&self, name: &str, file: &PackageFile, title: Option<&CatalogTitle>) -> TemplateVars {
        let mut vars = TemplateVars::new(name, file.info.title_id.as_str(), file.info.version);
        vars.display_version = file.info.display_version.clone();
        vars.region = title.and_then(|t| t.base.as_ref()).and_then(|b| b.region.clone());
        if file.info.title_id.content_type() == ContentType::Dlc {
            vars.dlc_name = title
                .and_then(|t| t.dlc.get(&file.info.title_id))
                .map(|d| d.name.clone())
                .or_else(|| file.info.name.clone());
        }
        vars
    }

    /// Plan the moves for a title whose base is on disk. Titles without a
    /// base are not organized and yield `None`.
    pub fn plan(&self, group: &GameFileGroup, title: Option<&CatalogTitle>) -> Result<Option<TitleMove>> {
        let Some(base) = &group.base else {
            return Ok(None);
        };
        let name = Some(title_name(group, title))
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| base.info.title_id.as_str().to_ascii_uppercase());
        let folder = match (&self.root, self.options.create_folder_per_game) {
            (Some(root), true) => Some(root.join(self.folder.generate(&self.vars(&name, base, title))?)),
            _ => None,
        };

        let mut seen = BTreeSet::new();
        let mut moves = Vec::new();
        // A multi-content file sits in several slots; it moves once, named
        // after the first (base before updates before DLC).
        for file in group.files() {
            if !seen.insert(&file.location) {
                continue;
            }
            let from = file.location.path();
            let directory = folder.clone().unwrap_or_else(|| file.location.folder.clone());
            let to = match self.options.rename_files {
                true => {
                    let ext = file.location.extension().unwrap_or_default();
                    directory.join(self.file.generate_with_ext(&self.vars(&name, file, title), ext)?)
                },
                false => directory.join(&file.location.file_name),
            };
            if to != from {
                moves.push(PlannedMove { from, to });
            }
        }

        Ok(Some(TitleMove {
            title_id: base.info.title_id.clone(),
            name,
            moves,
            prune_empty_folders: self.options.delete_empty_folders,
        }))
    }
}
