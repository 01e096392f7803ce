use crate::error::{ErrorKind, Result};
use crate::models::Catalog;
use crate::source::{Document, DocumentSource};
use exn::ResultExt;
use slm_core::{ProgressReporter, Steps};
use std::path::{Path, PathBuf};
use tracing::instrument;

pub const TITLES_FILE_NAME: &str = "titles.json";
pub const VERSIONS_FILE_NAME: &str = "versions.json";

/// Remote locations of the two catalog documents.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalogUrls {
    pub titles: String,
    pub versions: String,
}

/// Local copies of the two catalog documents.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalogFiles {
    pub titles: PathBuf,
    pub versions: PathBuf,
}

impl CatalogFiles {
    /// The well-known file names inside a base folder.
    pub fn in_folder(base: impl AsRef<Path>) -> Self {
        Self {
            titles: base.as_ref().join(TITLES_FILE_NAME),
            versions: base.as_ref().join(VERSIONS_FILE_NAME),
        }
    }
}

/// Cache validators (entity tags) for the two documents.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Validators {
    pub titles: Option<String>,
    pub versions: Option<String>,
}

struct Fetched {
    body: Vec<u8>,
    validator: Option<String>,
    /// `false` when the local copy was reused.
    changed: bool,
}

async fn local_copy_exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

async fn fetch_one(source: &dyn DocumentSource, url: &str, path: &Path, validator: Option<&str>) -> Result<Fetched> {
    // Without a local copy there is nothing a "not modified" answer could
    // point at, so never send the validator.
    let validator = match validator {
        Some(v) if local_copy_exists(path).await => Some(v),
        Some(_) => {
            tracing::debug!(path = %path.display(), "Local copy missing; fetching unconditionally");
            None
        },
        None => None,
    };
    match source.fetch(url, validator).await? {
        Document::NotModified => {
            let body = tokio::fs::read(path).await.or_raise(|| ErrorKind::LocalCopy(path.to_path_buf()))?;
            Ok(Fetched {
                body,
                validator: validator.map(str::to_string),
                changed: false,
            })
        },
        Document::Fetched { body, validator } => Ok(Fetched {
            body,
            validator,
            changed: true,
        }),
    }
}

/// Write-then-rename, so a crash mid-write never leaves a truncated document.
async fn persist(path: &Path, body: &[u8]) -> Result<()> {
    let error = || ErrorKind::LocalCopy(path.to_path_buf());
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.or_raise(error)?;
    }
    let staging = path.with_extension("json.tmp");
    tokio::fs::write(&staging, body).await.or_raise(error)?;
    tokio::fs::rename(&staging, path).await.or_raise(error)?;
    Ok(())
}

/// Bring both catalog documents up to date and parse them.
///
/// Each document is fetched conditionally with its stored validator; a "not
/// modified" answer reuses the local copy. Nothing is written to disk until
/// both fetches and the parse succeeded, so a failed refresh leaves the
/// local copies (and the caller's catalog) exactly as they were.
///
/// Returns the new catalog and the validators to persist.
#[instrument(skip_all, fields(titles = %urls.titles, versions = %urls.versions))]
pub async fn refresh_catalog(
    source: &dyn DocumentSource,
    urls: &CatalogUrls,
    files: &CatalogFiles,
    validators: &Validators,
    progress: &dyn ProgressReporter,
) -> Result<(Catalog, Validators)> {
    let mut steps = Steps::new(progress, 4);

    steps.advance("Downloading titles");
    let titles = fetch_one(source, &urls.titles, &files.titles, validators.titles.as_deref()).await?;

    steps.advance("Downloading versions");
    let versions = fetch_one(source, &urls.versions, &files.versions, validators.versions.as_deref()).await?;

    steps.advance("Processing catalog");
    let catalog = Catalog::from_documents(&titles.body, &versions.body)?;

    if titles.changed {
        persist(&files.titles, &titles.body).await?;
    }
    if versions.changed {
        persist(&files.versions, &versions.body).await?;
    }
    tracing::info!(
        titles = catalog.len(),
        titles_changed = titles.changed,
        versions_changed = versions.changed,
        "Catalog refreshed"
    );
    steps.finish("Finishing");

    Ok((
        catalog,
        Validators {
            titles: titles.validator,
            versions: versions.validator,
        },
    ))
}
