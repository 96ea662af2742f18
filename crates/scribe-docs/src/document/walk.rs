use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use super::{Document, DocumentLoader};
use crate::error::RetrievalError;

/// A file that matched a loader but could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    pub source: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct LoadOutcome {
    pub documents: Vec<Document>,
    pub skipped: Vec<SkippedFile>,
}

/// Recursively list files under `root` whose extension matches one of
/// `extensions` (case-insensitive), sorted by path.
///
/// # Errors
///
/// Returns [`RetrievalError::Load`] if `root` does not exist, is not a
/// directory, or cannot be read.
pub fn discover(root: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>, RetrievalError> {
    let load_err = |source| RetrievalError::Load {
        path: root.to_path_buf(),
        source,
    };
    let meta = std::fs::metadata(root).map_err(load_err)?;
    if !meta.is_dir() {
        return Err(load_err(std::io::Error::other("not a directory")));
    }
    std::fs::read_dir(root).map_err(load_err)?;

    let walker = ignore::WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(true)
        .sort_by_file_path(|a, b| a.cmp(b))
        .build();

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "skipping unreadable directory entry");
                continue;
            }
        };
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }
        let matches = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| extensions.iter().any(|want| ext.eq_ignore_ascii_case(want)));
        if matches {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// `path` relative to `root`, joined with `/` on every platform.
#[must_use]
pub fn relative_source(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn loader_for<'a>(
    loaders: &'a [Box<dyn DocumentLoader>],
    path: &Path,
) -> Option<&'a dyn DocumentLoader> {
    let ext = path.extension()?.to_str()?;
    loaders
        .iter()
        .find(|l| {
            l.supported_extensions()
                .iter()
                .any(|e| ext.eq_ignore_ascii_case(e))
        })
        .map(AsRef::as_ref)
}

/// Load every supported file under `root`. Files that fail to load are
/// logged and recorded in [`LoadOutcome::skipped`]; the rest are returned
/// in path order with `source` rewritten relative to `root`.
///
/// # Errors
///
/// Returns [`RetrievalError::Load`] only when `root` itself is unusable.
pub async fn load_directory(
    root: &Path,
    loaders: &[Box<dyn DocumentLoader>],
) -> Result<LoadOutcome, RetrievalError> {
    let extensions: Vec<&str> = loaders
        .iter()
        .flat_map(|l| l.supported_extensions().iter().copied())
        .collect();
    let files = discover(root, &extensions)?;
    debug!(root = %root.display(), files = files.len(), "discovered documents");

    let mut outcome = LoadOutcome::default();
    for path in files {
        let source = relative_source(root, &path);
        let Some(loader) = loader_for(loaders, &path) else {
            continue;
        };
        match loader.load(&path).await {
            Ok(docs) => {
                for mut doc in docs {
                    doc.metadata.source.clone_from(&source);
                    outcome.documents.push(doc);
                }
            }
            Err(e) => {
                warn!(source = %source, error = %e, "skipping document that failed to load");
                outcome.skipped.push(SkippedFile {
                    source,
                    reason: e.to_string(),
                });
            }
        }
    }
    Ok(outcome)
}
