pub mod manifest;

pub use manifest::{find_manifest, ManifestError, TreeManifest, MANIFEST_FILE};

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Where a declaration and its content live on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeLocation {
    pub source: PathBuf,
    pub content: PathBuf,
}

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error("no tree declaration given and no `source` entry in topictree.toml")]
    NoSource,
}

/// Resolves the declaration and content base for a CLI invocation.
///
/// Explicit arguments win over `topictree.toml`; without either, the content base is
/// `<source dir>/topics` when that directory exists, else the source's own directory.
pub fn locate(
    source: Option<&Path>,
    content: Option<&Path>,
    cwd: &Path,
) -> Result<TreeLocation, ProjectError> {
    let search_from = source
        .map(|source| cwd.join(source))
        .unwrap_or_else(|| cwd.to_path_buf());
    let manifest = match find_manifest(&search_from) {
        Some(path) => Some(TreeManifest::load(&path)?),
        None => None,
    };
    if let Some(manifest) = &manifest {
        debug!(path = %manifest.path.display(), "using manifest");
    }

    let source = match source {
        Some(source) => source.to_path_buf(),
        None => manifest
            .as_ref()
            .and_then(TreeManifest::source)
            .map(Path::to_path_buf)
            .ok_or(ProjectError::NoSource)?,
    };
    let content = match content {
        Some(content) => content.to_path_buf(),
        None => manifest
            .as_ref()
            .and_then(TreeManifest::content)
            .map(Path::to_path_buf)
            .unwrap_or_else(|| default_content_base(&source)),
    };
    Ok(TreeLocation { source, content })
}

fn default_content_base(source: &Path) -> PathBuf {
    let dir = source
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let topics = dir.join("topics");
    if topics.is_dir() {
        topics
    } else {
        dir
    }
}
