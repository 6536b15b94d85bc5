use crate::span::Span;

pub type RawNodeId = usize;

/// Root descriptor of one declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceProfile {
    pub id: String,
    pub name: String,
    pub start_page: String,
    pub span: Span,
}

/// One `toc-element` as declared, before identifiers are derived or references resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawNode {
    pub reference: String,
    pub fragment: Option<String>,
    pub identifier: Option<String>,
    pub title: Option<String>,
    pub children: Vec<RawNodeId>,
    pub span: Span,
}

impl RawNode {
    pub fn new(reference: impl Into<String>, span: Span) -> Self {
        Self {
            reference: reference.into(),
            fragment: None,
            identifier: None,
            title: None,
            children: Vec::new(),
            span,
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn with_fragment(mut self, fragment: impl Into<String>) -> Self {
        self.fragment = Some(fragment.into());
        self
    }

    /// `reference#fragment`, or just the reference.
    pub fn location(&self) -> String {
        match &self.fragment {
            Some(fragment) => format!("{}#{}", self.reference, fragment),
            None => self.reference.clone(),
        }
    }
}

/// Unvalidated tree shape. Nodes live in an arena; `roots` lists the top-level entries in
/// declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTree {
    pub profile: InstanceProfile,
    pub nodes: Vec<RawNode>,
    pub roots: Vec<RawNodeId>,
}

impl RawTree {
    pub fn new(profile: InstanceProfile) -> Self {
        Self {
            profile,
            nodes: Vec::new(),
            roots: Vec::new(),
        }
    }

    /// Appends `node` under `parent` (or at the top level) and returns its id.
    pub fn push(&mut self, parent: Option<RawNodeId>, node: RawNode) -> RawNodeId {
        let id = self.nodes.len();
        self.nodes.push(node);
        match parent.and_then(|parent| self.nodes.get_mut(parent)) {
            Some(parent) => parent.children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
