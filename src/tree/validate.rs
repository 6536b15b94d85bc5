use crate::{
    content::ContentLookup,
    tree::{
        ident::derive_identifier,
        issues::{AncestorPath, DiagnosticBatch, IssueKind, TreeIssue},
        raw::{RawNodeId, RawTree},
    },
};
use std::collections::{hash_map::Entry, HashMap};
use tracing::debug;

/// A raw tree whose identifiers and references passed every check, plus the indices built
/// while checking.
#[derive(Debug, Clone)]
pub struct ValidatedTree {
    raw: RawTree,
    identifiers: Vec<String>,
    by_identifier: HashMap<String, RawNodeId>,
    by_reference: HashMap<String, RawNodeId>,
}

impl ValidatedTree {
    pub fn raw(&self) -> &RawTree {
        &self.raw
    }

    /// Resolved identifier (declared or derived) of a raw node.
    pub fn identifier(&self, id: RawNodeId) -> Option<&str> {
        self.identifiers.get(id).map(String::as_str)
    }

    pub fn node_for_identifier(&self, identifier: &str) -> Option<RawNodeId> {
        self.by_identifier.get(identifier).copied()
    }

    pub fn node_for_reference(&self, reference: &str) -> Option<RawNodeId> {
        self.by_reference.get(reference).copied()
    }

    pub(crate) fn into_parts(self) -> (RawTree, Vec<String>, HashMap<String, RawNodeId>) {
        (self.raw, self.identifiers, self.by_identifier)
    }
}

/// Checks identifiers, references, fragments and the start entry of a raw tree.
///
/// Every node is visited in pre-order and every problem is collected before returning, so one
/// pass reports the whole batch.
pub fn validate_tree(
    raw: RawTree,
    content: &dyn ContentLookup,
) -> Result<ValidatedTree, DiagnosticBatch> {
    let walk = Walk::run(&raw);
    let mut issues = walk.cycle_issues(&raw);

    let mut identifiers = vec![String::new(); raw.len()];
    let mut by_identifier: HashMap<String, RawNodeId> = HashMap::new();
    let mut by_reference: HashMap<String, RawNodeId> = HashMap::new();

    for &id in &walk.order {
        let node = &raw.nodes[id];
        let identifier = node
            .identifier
            .clone()
            .unwrap_or_else(|| derive_identifier(&node.reference));

        match by_identifier.entry(identifier.clone()) {
            Entry::Occupied(first) => issues.push(TreeIssue {
                span: Some(node.span),
                path: walk.ancestors(&raw, id),
                kind: IssueKind::DuplicateIdentifier {
                    identifier: identifier.clone(),
                    first: walk.ancestors(&raw, *first.get()),
                },
            }),
            Entry::Vacant(slot) => {
                slot.insert(id);
            }
        }
        identifiers[id] = identifier;

        match by_reference.entry(node.reference.clone()) {
            Entry::Occupied(first) => issues.push(TreeIssue {
                span: Some(node.span),
                path: walk.ancestors(&raw, id),
                kind: IssueKind::DuplicateReference {
                    reference: node.reference.clone(),
                    first: walk.ancestors(&raw, *first.get()),
                },
            }),
            Entry::Vacant(slot) => {
                slot.insert(id);
            }
        }

        if !content.resource_exists(&node.reference) {
            issues.push(TreeIssue {
                span: Some(node.span),
                path: walk.ancestors(&raw, id),
                kind: IssueKind::UnresolvedReference {
                    reference: node.reference.clone(),
                },
            });
        } else if let Some(fragment) = &node.fragment {
            if !content.fragment_exists(&node.reference, fragment) {
                issues.push(TreeIssue {
                    span: Some(node.span),
                    path: walk.ancestors(&raw, id),
                    kind: IssueKind::UnresolvedFragment {
                        reference: node.reference.clone(),
                        fragment: fragment.clone(),
                    },
                });
            }
        }
    }

    let (start, start_fragment) = split_start_entry(&raw.profile.start_page);
    let start_resolves = if content.resource_exists(start) {
        start_fragment.map_or(true, |fragment| content.fragment_exists(start, fragment))
    } else {
        by_reference.contains_key(start)
    };
    if !start_resolves {
        issues.push(TreeIssue {
            span: Some(raw.profile.span),
            path: AncestorPath(vec![raw.profile.id.clone()]),
            kind: IssueKind::UnresolvedStartEntry {
                reference: raw.profile.start_page.clone(),
            },
        });
    }

    debug!(
        instance = %raw.profile.id,
        nodes = walk.order.len(),
        issues = issues.len(),
        "validated tree"
    );

    match DiagnosticBatch::new(issues) {
        Some(batch) => Err(batch),
        None => Ok(ValidatedTree {
            raw,
            identifiers,
            by_identifier,
            by_reference,
        }),
    }
}

/// The reference part of a start entry, without any `#fragment`.
pub(crate) fn start_reference(start_page: &str) -> &str {
    split_start_entry(start_page).0
}

fn split_start_entry(start_page: &str) -> (&str, Option<&str>) {
    match start_page.split_once('#') {
        Some((reference, fragment)) => (reference, Some(fragment)),
        None => (start_page, None),
    }
}

/// Pre-order walk over the raw arena that tolerates revisits and dangling child indices
/// instead of looping on them.
struct Walk {
    order: Vec<RawNodeId>,
    parents: Vec<Option<RawNodeId>>,
    revisits: Vec<(RawNodeId, Option<RawNodeId>)>,
}

impl Walk {
    fn run(raw: &RawTree) -> Self {
        let count = raw.len();
        let mut visited = vec![false; count];
        let mut parents = vec![None; count];
        let mut order = Vec::with_capacity(count);
        let mut revisits = Vec::new();
        let mut stack: Vec<(RawNodeId, Option<RawNodeId>)> =
            raw.roots.iter().rev().map(|id| (*id, None)).collect();

        while let Some((id, parent)) = stack.pop() {
            if id >= count || visited[id] {
                revisits.push((id, parent));
                continue;
            }
            visited[id] = true;
            parents[id] = parent;
            order.push(id);
            for child in raw.nodes[id].children.iter().rev() {
                stack.push((*child, Some(id)));
            }
        }

        Self {
            order,
            parents,
            revisits,
        }
    }

    fn ancestors(&self, raw: &RawTree, id: RawNodeId) -> AncestorPath {
        let mut chain = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let Some(node) = raw.nodes.get(current) else {
                break;
            };
            chain.push(node.reference.clone());
            if chain.len() > raw.len() {
                break;
            }
            cursor = self.parents.get(current).copied().flatten();
        }
        chain.push(raw.profile.id.clone());
        chain.reverse();
        AncestorPath(chain)
    }

    fn cycle_issues(&self, raw: &RawTree) -> Vec<TreeIssue> {
        self.revisits
            .iter()
            .map(|&(node, parent)| TreeIssue {
                span: parent
                    .and_then(|parent| raw.nodes.get(parent))
                    .map(|parent| parent.span),
                path: match parent {
                    Some(parent) => self.ancestors(raw, parent),
                    None => AncestorPath(vec![raw.profile.id.clone()]),
                },
                kind: IssueKind::CyclicStructure { node },
            })
            .collect()
    }
}
