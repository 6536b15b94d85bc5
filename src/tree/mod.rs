//! Topic-tree resolution: parse a declaration, validate it against a content collection,
//! build an immutable snapshot and query it.

mod ident;
mod issues;
mod parser;
mod publish;
mod query;
mod raw;
mod snapshot;
mod validate;

pub use ident::{derive_identifier, FALLBACK_IDENTIFIER};
pub use issues::{
    AncestorPath, DiagnosticBatch, IssueKind, TreeIssue, CODE_CYCLIC_STRUCTURE,
    CODE_DUPLICATE_IDENTIFIER, CODE_DUPLICATE_REFERENCE, CODE_UNRESOLVED_FRAGMENT,
    CODE_UNRESOLVED_REFERENCE, CODE_UNRESOLVED_START_ENTRY,
};
pub use parser::parse_source;
pub use publish::SnapshotHolder;
pub use query::{NotFound, SiblingNavigation};
pub use raw::{InstanceProfile, RawNode, RawNodeId, RawTree};
pub use snapshot::{build_snapshot, links_from_depths, NodeId, Snapshot, TopicNode};
pub use validate::{validate_tree, ValidatedTree};

use crate::{content::ContentLookup, errors::MalformedSource};
use thiserror::Error;

pub const CODE_MALFORMED_SOURCE: &str = "MalformedSource";

/// Why a build produced no snapshot.
#[derive(Debug, Clone, Error)]
pub enum BuildError {
    #[error("malformed source: {0}")]
    Malformed(#[from] MalformedSource),
    #[error(transparent)]
    Rejected(#[from] DiagnosticBatch),
}

/// Parses, validates and indexes a declaration in one pass.
pub fn resolve_tree(source: &str, content: &dyn ContentLookup) -> Result<Snapshot, BuildError> {
    let raw = parse_source(source)?;
    let validated = validate_tree(raw, content)?;
    Ok(build_snapshot(validated))
}
