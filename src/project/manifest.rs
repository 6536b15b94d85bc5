use serde::Deserialize;
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;

pub const MANIFEST_FILE: &str = "topictree.toml";

/// Optional `topictree.toml` naming the declaration and the content directory.
#[derive(Debug, Clone)]
pub struct TreeManifest {
    root: PathBuf,
    source: Option<PathBuf>,
    content: Option<PathBuf>,
    pub path: PathBuf,
}

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("{}: {error}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        error: io::Error,
    },
    #[error("{}: {message}", path.display())]
    Parse { path: PathBuf, message: String },
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawManifest {
    tree: Option<RawTreeSection>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTreeSection {
    source: Option<String>,
    content: Option<String>,
}

impl TreeManifest {
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let text = fs::read_to_string(path).map_err(|error| ManifestError::Io {
            path: path.to_path_buf(),
            error,
        })?;
        let raw: RawManifest = toml::from_str(&text).map_err(|error| ManifestError::Parse {
            path: path.to_path_buf(),
            message: error.to_string(),
        })?;
        let root = path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));
        let section = raw.tree.unwrap_or(RawTreeSection {
            source: None,
            content: None,
        });
        Ok(Self {
            source: section.source.map(|rel| root.join(rel)),
            content: section.content.map(|rel| root.join(rel)),
            root,
            path: path.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Declaration path, resolved against the manifest's directory.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Content base, resolved against the manifest's directory.
    pub fn content(&self) -> Option<&Path> {
        self.content.as_deref()
    }
}

/// Walks from `start` (a file or directory) up through its ancestors looking for
/// `topictree.toml`.
pub fn find_manifest(start: &Path) -> Option<PathBuf> {
    let mut current = if start.is_dir() {
        start.to_path_buf()
    } else {
        start
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
    };
    loop {
        let candidate = current.join(MANIFEST_FILE);
        if candidate.is_file() {
            return Some(candidate);
        }
        if !current.pop() {
            break;
        }
    }
    None
}
