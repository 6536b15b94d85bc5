//! Resolver for declarative topic trees: parses a nested `instance-profile` declaration,
//! validates it against a content collection and serves an immutable, navigable snapshot.

pub mod content;
pub mod diagnostics;
pub mod errors;
pub mod project;
pub mod span;
pub mod tools;
pub mod tree;

pub use content::{ContentLookup, DirectoryContent, InMemoryContent};
pub use errors::MalformedSource;
pub use tree::{resolve_tree, BuildError, DiagnosticBatch, Snapshot, SnapshotHolder, TopicNode};
