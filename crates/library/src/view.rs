//! The unified per-title view of the local library.

use crate::reconcile::title_name;
use serde::Serialize;
use slm_catalog::Catalog;
use slm_core::TitleId;
use slm_inventory::{GameFileGroup, Inventory};
use std::path::PathBuf;

const BASE_MISSING: &str = "base file is missing";

/// One owned title.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LibraryRow {
    /// Position in the view.
    pub id: usize,
    pub name: String,
    /// Display version of the latest update, else of the base package.
    pub version: Option<String>,
    pub title_id: TitleId,
    /// Path of the base package.
    pub path: PathBuf,
    pub icon: Option<String>,
    /// Revision of the latest update; `0` without updates.
    pub update: u32,
    pub region: Option<String>,
    /// Owned DLC.
    pub dlc: Vec<TitleId>,
    /// `split`, `multi-content`, or the file extension.
    #[serde(rename = "type")]
    pub kind: String,
}

/// A file that did not make it into a row, and why.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LocalLibrary {
    pub library_data: Vec<LibraryRow>,
    pub issues: Vec<Issue>,
    pub num_files: usize,
}

fn kind(group: &GameFileGroup) -> String {
    if group.split {
        return "split".to_string();
    }
    if group.multi_content {
        return "multi-content".to_string();
    }
    group
        .base
        .as_ref()
        .and_then(|b| b.location.extension())
        .unwrap_or_default()
}

/// Build the library view. The catalog is optional: without one, names come
/// from the packages themselves and icons and regions are empty.
pub fn local_library(inventory: &Inventory, catalog: Option<&Catalog>) -> LocalLibrary {
    let mut library = LocalLibrary {
        num_files: inventory.num_files,
        ..LocalLibrary::default()
    };
    for (key, group) in &inventory.titles {
        let Some(base) = &group.base else {
            for file in group.updates.values().chain(group.dlc.values()) {
                library.issues.push(Issue {
                    path: file.location.path(),
                    reason: BASE_MISSING.to_string(),
                });
            }
            continue;
        };
        let title = catalog.and_then(|c| c.get(key));
        let record = title.and_then(|t| t.base.as_ref());
        let version = group
            .latest_update()
            .and_then(|u| u.info.display_version.clone())
            .or_else(|| base.info.display_version.clone());
        library.library_data.push(LibraryRow {
            id: library.library_data.len(),
            name: title_name(group, title),
            version,
            title_id: base.info.title_id.clone(),
            path: base.location.path(),
            icon: record.and_then(|r| r.icon_url.clone()),
            update: group.latest_update_revision(),
            region: record.and_then(|r| r.region.clone()),
            dlc: group.dlc.keys().cloned().collect(),
            kind: kind(group),
        });
    }
    for (location, reason) in &inventory.skipped {
        library.issues.push(Issue {
            path: location.path(),
            reason: reason.to_string(),
        });
    }
    library
}
