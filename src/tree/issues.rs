use crate::span::Span;
use std::fmt;
use thiserror::Error;

pub const CODE_DUPLICATE_IDENTIFIER: &str = "DuplicateIdentifier";
pub const CODE_DUPLICATE_REFERENCE: &str = "DuplicateReference";
pub const CODE_UNRESOLVED_REFERENCE: &str = "UnresolvedReference";
pub const CODE_UNRESOLVED_FRAGMENT: &str = "UnresolvedFragment";
pub const CODE_UNRESOLVED_START_ENTRY: &str = "UnresolvedStartEntry";
pub const CODE_CYCLIC_STRUCTURE: &str = "CyclicStructure";

/// Root-to-node chain of labels locating a declaration: the instance id followed by the
/// content reference of every entry down to the node itself.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AncestorPath(pub Vec<String>);

impl AncestorPath {
    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for AncestorPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(" > "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueKind {
    DuplicateIdentifier {
        identifier: String,
        first: AncestorPath,
    },
    DuplicateReference {
        reference: String,
        first: AncestorPath,
    },
    UnresolvedReference {
        reference: String,
    },
    UnresolvedFragment {
        reference: String,
        fragment: String,
    },
    UnresolvedStartEntry {
        reference: String,
    },
    CyclicStructure {
        node: usize,
    },
}

impl IssueKind {
    pub fn code(&self) -> &'static str {
        match self {
            IssueKind::DuplicateIdentifier { .. } => CODE_DUPLICATE_IDENTIFIER,
            IssueKind::DuplicateReference { .. } => CODE_DUPLICATE_REFERENCE,
            IssueKind::UnresolvedReference { .. } => CODE_UNRESOLVED_REFERENCE,
            IssueKind::UnresolvedFragment { .. } => CODE_UNRESOLVED_FRAGMENT,
            IssueKind::UnresolvedStartEntry { .. } => CODE_UNRESOLVED_START_ENTRY,
            IssueKind::CyclicStructure { .. } => CODE_CYCLIC_STRUCTURE,
        }
    }

    pub fn message(&self) -> String {
        match self {
            IssueKind::DuplicateIdentifier { identifier, first } => {
                format!("identifier `{identifier}` is already used by {first}")
            }
            IssueKind::DuplicateReference { reference, first } => {
                format!("`{reference}` is already placed in the tree at {first}")
            }
            IssueKind::UnresolvedReference { reference } => {
                format!("content `{reference}` does not exist")
            }
            IssueKind::UnresolvedFragment {
                reference,
                fragment,
            } => format!("anchor `#{fragment}` does not exist in `{reference}`"),
            IssueKind::UnresolvedStartEntry { reference } => format!(
                "start entry `{reference}` matches no tree entry, resource or anchor"
            ),
            IssueKind::CyclicStructure { node } => {
                format!("entry #{node} is reachable more than once")
            }
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            IssueKind::DuplicateIdentifier { .. } => "second use of this identifier",
            IssueKind::DuplicateReference { .. } => "second placement of this content",
            IssueKind::UnresolvedReference { .. } => "missing content",
            IssueKind::UnresolvedFragment { .. } => "missing anchor",
            IssueKind::UnresolvedStartEntry { .. } => "dangling start entry",
            IssueKind::CyclicStructure { .. } => "revisited here",
        }
    }
}

/// One validation failure, located by source span and ancestor chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeIssue {
    pub span: Option<Span>,
    pub path: AncestorPath,
    pub kind: IssueKind,
}

impl TreeIssue {
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn message(&self) -> String {
        self.kind.message()
    }
}

impl fmt::Display for TreeIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.code(), self.path, self.message())
    }
}

/// Every validation failure from one build attempt. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("tree rejected with {} validation issue(s)", .issues.len())]
pub struct DiagnosticBatch {
    issues: Vec<TreeIssue>,
}

impl DiagnosticBatch {
    /// Returns `None` for an empty issue list.
    pub fn new(issues: Vec<TreeIssue>) -> Option<Self> {
        if issues.is_empty() {
            None
        } else {
            Some(Self { issues })
        }
    }

    pub fn issues(&self) -> &[TreeIssue] {
        &self.issues
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn count(&self, code: &str) -> usize {
        self.issues.iter().filter(|issue| issue.code() == code).count()
    }
}

impl IntoIterator for DiagnosticBatch {
    type Item = TreeIssue;
    type IntoIter = std::vec::IntoIter<TreeIssue>;

    fn into_iter(self) -> Self::IntoIter {
        self.issues.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_one_line_per_issue() {
        let issue = TreeIssue {
            span: None,
            path: AncestorPath(vec!["sg".into(), "naming.md".into()]),
            kind: IssueKind::UnresolvedReference {
                reference: "naming.md".into(),
            },
        };
        assert_eq!(
            issue.to_string(),
            "UnresolvedReference: sg > naming.md: content `naming.md` does not exist"
        );
    }

    #[test]
    fn empty_batch_is_not_constructible() {
        assert!(DiagnosticBatch::new(Vec::new()).is_none());
    }
}
