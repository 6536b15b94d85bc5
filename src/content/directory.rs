use super::{anchors::collect_anchors, ContentLookup};
use std::{
    fs, io,
    path::{Component, Path, PathBuf},
};
use tracing::debug;

const TOPIC_EXTENSIONS: &[&str] = &["md", "topic"];

/// Topic files stored under a base directory.
#[derive(Debug, Clone)]
pub struct DirectoryContent {
    base: PathBuf,
}

impl DirectoryContent {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Maps a reference onto the base directory. References that are absolute or climb out
    /// with `..` never resolve.
    pub fn resolve_path(&self, reference: &str) -> Option<PathBuf> {
        let relative = Path::new(reference);
        let contained = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir));
        if reference.is_empty() || !contained {
            return None;
        }
        Some(self.base.join(relative))
    }

    /// Every topic file under the base, as sorted `/`-separated relative paths.
    pub fn resources(&self) -> io::Result<Vec<String>> {
        let mut found = Vec::new();
        let mut pending = vec![self.base.clone()];
        while let Some(dir) = pending.pop() {
            for entry in fs::read_dir(&dir)? {
                let entry = entry?;
                let path = entry.path();
                let file_type = entry.file_type()?;
                if file_type.is_dir() {
                    pending.push(path);
                } else if file_type.is_file() && is_topic_file(&path) {
                    if let Ok(relative) = path.strip_prefix(&self.base) {
                        found.push(relative_string(relative));
                    }
                }
            }
        }
        found.sort();
        Ok(found)
    }
}

impl ContentLookup for DirectoryContent {
    fn resource_exists(&self, reference: &str) -> bool {
        self.resolve_path(reference)
            .is_some_and(|path| path.is_file())
    }

    fn fragment_exists(&self, reference: &str, fragment: &str) -> bool {
        let Some(path) = self.resolve_path(reference) else {
            return false;
        };
        match fs::read_to_string(&path) {
            Ok(text) => collect_anchors(&text).contains(fragment),
            Err(err) => {
                debug!(path = %path.display(), error = %err, "cannot read topic for anchors");
                false
            }
        }
    }
}

fn is_topic_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| TOPIC_EXTENSIONS.contains(&ext))
}

fn relative_string(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
