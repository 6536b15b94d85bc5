use crate::{
    content::DirectoryContent,
    diagnostics::{build_error_lines, emit_build_error},
    project::TreeLocation,
    tree::{resolve_tree, BuildError, Snapshot},
};
use std::{fs, io};

pub const EXIT_OK: u8 = 0;
pub const EXIT_INVALID: u8 = 1;
pub const EXIT_IO: u8 = 2;

/// A declaration read from disk together with its content collection.
#[derive(Debug, Clone)]
pub struct LoadedTree {
    pub location: TreeLocation,
    pub source: String,
    pub content: DirectoryContent,
}

impl LoadedTree {
    pub fn load(location: TreeLocation) -> io::Result<Self> {
        let source = fs::read_to_string(&location.source)?;
        let content = DirectoryContent::new(&location.content);
        Ok(Self {
            location,
            source,
            content,
        })
    }

    pub fn resolve(&self) -> Result<Snapshot, BuildError> {
        resolve_tree(&self.source, &self.content)
    }

    /// Prints every diagnostic of a failed build, one per line on stdout, and optionally the
    /// annotated reports on stderr.
    pub fn report(&self, error: &BuildError, fancy: bool) {
        for line in build_error_lines(error) {
            println!("{line}");
        }
        if fancy {
            emit_build_error(&self.location.source, &self.source, error);
        }
    }
}

/// `validate`: silent on success, one line per diagnostic on failure.
pub fn run_validate(tree: &LoadedTree, fancy: bool) -> u8 {
    match tree.resolve() {
        Ok(_) => EXIT_OK,
        Err(err) => {
            tree.report(&err, fancy);
            EXIT_INVALID
        }
    }
}
