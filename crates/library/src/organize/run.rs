use crate::error::Result;
use crate::organize::plan::{Planner, TitleMove};
use crate::organize::ports::{FileMover, FileRemover};
use crate::view::Issue;
use serde::Serialize;
use slm_catalog::Catalog;
use slm_config::OrganizeOptions;
use slm_core::{ProgressReporter, Steps, TitleId};
use slm_inventory::Inventory;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// A title whose files could not be (fully) moved.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MoveFailure {
    pub title_id: TitleId,
    pub name: String,
    pub reason: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct OrganizeReport {
    /// Titles whose moves all succeeded (including titles already in place).
    pub titles: usize,
    /// Files moved.
    pub moved: usize,
    pub failures: Vec<MoveFailure>,
    /// Superseded update files deleted.
    pub deleted: Vec<PathBuf>,
    pub delete_failures: Vec<Issue>,
}

/// Move every owned title's files into place, then (if configured) delete
/// every update file but the latest revision of each title.
///
/// Both templates are validated before anything moves; an invalid template
/// fails the call with nothing touched. After that the operation is
/// best-effort: a title that fails to plan or move is recorded and the rest
/// carry on, and deletion failures never undo a move.
#[instrument(skip_all, fields(titles = inventory.titles.len()))]
pub async fn organize(
    catalog: &Catalog,
    inventory: &Inventory,
    options: &OrganizeOptions,
    root: Option<&Path>,
    mover: &dyn FileMover,
    remover: &dyn FileRemover,
    progress: &dyn ProgressReporter,
) -> Result<OrganizeReport> {
    let planner = Planner::new(options, root)?;
    let owned = inventory.titles.values().filter(|g| g.base_exists()).count() as u64;
    let mut steps = Steps::new(progress, owned + u64::from(options.delete_old_update_files) + 1);
    let mut report = OrganizeReport::default();
    // Where each moved file ended up, for the deletion pass.
    let mut relocated: HashMap<PathBuf, PathBuf> = HashMap::new();

    for (key, group) in &inventory.titles {
        let title = catalog.get(key);
        let planned = match planner.plan(group, title) {
            Ok(Some(planned)) => planned,
            Ok(None) => continue,
            Err(err) => {
                let base = group.base.as_ref().map(|b| &b.info.title_id);
                tracing::warn!(key = %key, error = ?err, "Could not plan moves");
                steps.advance(format!("Skipping {key}"));
                if let Some(title_id) = base {
                    report.failures.push(MoveFailure {
                        title_id: title_id.clone(),
                        name: String::new(),
                        reason: (*err).to_string(),
                    });
                }
                continue;
            },
        };
        steps.advance(format!("Organizing {}", planned.name));
        if planned.moves.is_empty() {
            report.titles += 1;
            continue;
        }
        match mover.move_title(&planned).await {
            Ok(()) => {
                report.titles += 1;
                report.moved += planned.moves.len();
                relocated.extend(planned.moves.iter().map(|m| (m.from.clone(), m.to.clone())));
            },
            Err(err) => {
                tracing::warn!(title_id = %planned.title_id, error = ?err, "Could not move title");
                report.failures.push(failure(&planned, (*err).to_string()));
            },
        }
    }

    if options.delete_old_update_files {
        steps.advance("Deleting old updates");
        delete_old_updates(inventory, &relocated, remover, &mut report).await;
    }

    tracing::info!(
        titles = report.titles,
        moved = report.moved,
        failures = report.failures.len(),
        deleted = report.deleted.len(),
        "Organize complete"
    );
    steps.finish("Organize complete");
    Ok(report)
}

fn failure(planned: &TitleMove, reason: String) -> MoveFailure {
    MoveFailure {
        title_id: planned.title_id.clone(),
        name: planned.name.clone(),
        reason,
    }
}

async fn delete_old_updates(
    inventory: &Inventory,
    relocated: &HashMap<PathBuf, PathBuf>,
    remover: &dyn FileRemover,
    report: &mut OrganizeReport,
) {
    for group in inventory.titles.values() {
        let Some(latest) = group.updates.keys().next_back() else {
            continue;
        };
        for (_, update) in group.updates.range(..*latest) {
            // Other content lives in the same file.
            if update.multi_content {
                continue;
            }
            let original = update.location.path();
            let path = relocated.get(&original).cloned().unwrap_or(original);
            match remover.remove(&path).await {
                Ok(()) => {
                    tracing::debug!(path = %path.display(), "Deleted old update");
                    report.deleted.push(path);
                },
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = ?err, "Could not delete old update");
                    report.delete_failures.push(Issue {
                        path,
                        reason: (*err).to_string(),
                    });
                },
            }
        }
    }
}
