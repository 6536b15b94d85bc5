use crate::{
    span::Span,
    tree::{
        raw::{InstanceProfile, RawNodeId},
        validate::ValidatedTree,
    },
};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Position of a node in a snapshot. Nodes are stored in depth-first pre-order, so the id
/// is also the node's read-order position.
pub type NodeId = usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicNode {
    id: NodeId,
    identifier: String,
    reference: String,
    fragment: Option<String>,
    title: Option<String>,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
    depth: usize,
    span: Span,
}

impl TopicNode {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn content_reference(&self) -> &str {
        &self.reference
    }

    pub fn fragment_anchor(&self) -> Option<&str> {
        self.fragment.as_deref()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Top-level entries have depth 0.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Immutable, validated and indexed topic tree.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub(crate) profile: InstanceProfile,
    pub(crate) nodes: Vec<TopicNode>,
    pub(crate) roots: Vec<NodeId>,
    pub(crate) by_identifier: HashMap<String, NodeId>,
    pub(crate) references: BTreeSet<String>,
}

/// Builds the snapshot for a validated tree with an explicit stack, so authoring depth never
/// bounds call-stack use.
pub fn build_snapshot(tree: ValidatedTree) -> Snapshot {
    let (raw, mut identifiers, _) = tree.into_parts();
    let mut raw_nodes: Vec<_> = raw.nodes.into_iter().map(Some).collect();

    let mut nodes: Vec<TopicNode> = Vec::with_capacity(raw_nodes.len());
    let mut roots = Vec::new();
    let mut by_identifier = HashMap::with_capacity(raw_nodes.len());
    let mut references = BTreeSet::new();
    let mut stack: Vec<(RawNodeId, Option<NodeId>, usize)> =
        raw.roots.iter().rev().map(|id| (*id, None, 0)).collect();

    while let Some((raw_id, parent, depth)) = stack.pop() {
        let Some(raw_node) = raw_nodes.get_mut(raw_id).and_then(Option::take) else {
            continue;
        };
        let id = nodes.len();
        let identifier = std::mem::take(&mut identifiers[raw_id]);
        by_identifier.insert(identifier.clone(), id);
        references.insert(raw_node.reference.clone());
        match parent {
            Some(parent) => nodes[parent].children.push(id),
            None => roots.push(id),
        }
        for child in raw_node.children.iter().rev() {
            stack.push((*child, Some(id), depth + 1));
        }
        nodes.push(TopicNode {
            id,
            identifier,
            reference: raw_node.reference,
            fragment: raw_node.fragment,
            title: raw_node.title,
            children: Vec::with_capacity(raw_node.children.len()),
            parent,
            depth,
            span: raw_node.span,
        });
    }

    debug!(
        instance = %raw.profile.id,
        nodes = nodes.len(),
        roots = roots.len(),
        "built snapshot"
    );

    Snapshot {
        profile: raw.profile,
        nodes,
        roots,
        by_identifier,
        references,
    }
}

/// Rebuilds parent links from a pre-order depth sequence, as exported by
/// [`Snapshot::depths`]. Returns `None` when the sequence cannot describe a tree (it starts
/// below the top level or descends more than one level at once).
pub fn links_from_depths(depths: &[usize]) -> Option<Vec<Option<NodeId>>> {
    let mut parents = Vec::with_capacity(depths.len());
    let mut open: Vec<NodeId> = Vec::new();
    for (id, &depth) in depths.iter().enumerate() {
        if depth > open.len() {
            return None;
        }
        open.truncate(depth);
        parents.push(open.last().copied());
        open.push(id);
    }
    Some(parents)
}
