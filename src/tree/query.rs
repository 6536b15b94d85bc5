use crate::tree::{
    raw::InstanceProfile,
    snapshot::{NodeId, Snapshot, TopicNode},
    validate::start_reference,
};
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no topic with identifier `{identifier}`")]
pub struct NotFound {
    pub identifier: String,
}

/// Neighbours of a node in read order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SiblingNavigation<'a> {
    pub previous: Option<&'a TopicNode>,
    pub next: Option<&'a TopicNode>,
}

impl Snapshot {
    pub fn profile(&self) -> &InstanceProfile {
        &self.profile
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in depth-first pre-order.
    pub fn preorder(&self) -> &[TopicNode] {
        &self.nodes
    }

    pub fn roots(&self) -> impl Iterator<Item = &TopicNode> + '_ {
        self.roots.iter().map(|id| &self.nodes[*id])
    }

    pub fn node(&self, id: NodeId) -> Option<&TopicNode> {
        self.nodes.get(id)
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &str> + '_ {
        self.nodes.iter().map(TopicNode::identifier)
    }

    /// Depth of every node in pre-order; see [`crate::tree::links_from_depths`].
    pub fn depths(&self) -> Vec<usize> {
        self.nodes.iter().map(TopicNode::depth).collect()
    }

    /// The tree node the start entry points at, when it is not a standalone resource.
    pub fn start_node(&self) -> Option<&TopicNode> {
        let start = start_reference(&self.profile.start_page);
        self.nodes
            .iter()
            .find(|node| node.content_reference() == start)
    }

    pub fn lookup(&self, identifier: &str) -> Result<&TopicNode, NotFound> {
        self.by_identifier
            .get(identifier)
            .map(|id| &self.nodes[*id])
            .ok_or_else(|| NotFound {
                identifier: identifier.to_string(),
            })
    }

    /// Children in declaration order; empty for leaves.
    pub fn children_of(&self, identifier: &str) -> Result<Vec<&TopicNode>, NotFound> {
        let node = self.lookup(identifier)?;
        Ok(node.children().iter().map(|id| &self.nodes[*id]).collect())
    }

    /// Nodes from the top level down to `identifier`, inclusive.
    pub fn breadcrumb(&self, identifier: &str) -> Result<Vec<&TopicNode>, NotFound> {
        let node = self.lookup(identifier)?;
        let mut trail = Vec::with_capacity(node.depth() + 1);
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            trail.push(current);
            cursor = current.parent().map(|parent| &self.nodes[parent]);
        }
        trail.reverse();
        Ok(trail)
    }

    /// Previous and next nodes in the flattened read order.
    pub fn sibling_navigation(&self, identifier: &str) -> Result<SiblingNavigation<'_>, NotFound> {
        let id = self.lookup(identifier)?.id();
        Ok(SiblingNavigation {
            previous: id.checked_sub(1).and_then(|prev| self.nodes.get(prev)),
            next: self.nodes.get(id + 1),
        })
    }

    /// Resources of the content collection that no node references. The start entry counts
    /// as referenced. Advisory only; orphans never reject a build.
    pub fn orphan_resources<I, S>(&self, all_known_resources: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let start = start_reference(&self.profile.start_page);
        all_known_resources
            .into_iter()
            .filter(|resource| {
                let resource: &str = resource.as_ref();
                resource != start && !self.references.contains(resource)
            })
            .map(|resource| AsRef::<str>::as_ref(&resource).to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        content::InMemoryContent,
        tree::{resolve_tree, BuildError},
    };

    const SOURCE: &str = r#"<instance-profile id="sg" name="Style Guide" start-page="intro.md">
        <toc-element topic="basics.md" id="basics">
            <toc-element topic="naming.md" id="naming">
                <toc-element topic="naming-functions.md" id="functions"/>
                <toc-element topic="naming-types.md"/>
            </toc-element>
        </toc-element>
        <toc-element topic="errors.md"/>
    </instance-profile>"#;

    fn content() -> InMemoryContent {
        [
            "intro.md",
            "basics.md",
            "naming.md",
            "naming-functions.md",
            "naming-types.md",
            "errors.md",
        ]
        .into_iter()
        .fold(InMemoryContent::new(), |content, path| content.with_resource(path))
    }

    fn snapshot() -> Snapshot {
        resolve_tree(SOURCE, &content()).expect("valid tree")
    }

    fn identifiers(nodes: &[&TopicNode]) -> Vec<String> {
        nodes.iter().map(|node| node.identifier().to_string()).collect()
    }

    #[test]
    fn lookup_finds_declared_and_derived_identifiers() {
        let snapshot = snapshot();
        assert_eq!(
            snapshot.lookup("functions").expect("node").content_reference(),
            "naming-functions.md"
        );
        assert_eq!(snapshot.lookup("naming-types").expect("node").depth(), 2);
        assert_eq!(
            snapshot.lookup("missing"),
            Err(NotFound {
                identifier: "missing".into()
            })
        );
    }

    #[test]
    fn children_in_declaration_order() {
        let snapshot = snapshot();
        let children = snapshot.children_of("naming").expect("node");
        assert_eq!(identifiers(&children), ["functions", "naming-types"]);
        assert!(snapshot.children_of("errors").expect("leaf").is_empty());
        assert!(snapshot.children_of("nope").is_err());
    }

    #[test]
    fn breadcrumb_runs_from_root_to_node() {
        let snapshot = snapshot();
        let trail = snapshot.breadcrumb("functions").expect("node");
        assert_eq!(trail.len(), 3);
        assert_eq!(identifiers(&trail), ["basics", "naming", "functions"]);
        assert_eq!(identifiers(&snapshot.breadcrumb("errors").expect("node")), ["errors"]);
        assert!(snapshot.breadcrumb("nope").is_err());
    }

    #[test]
    fn sibling_navigation_follows_read_order() {
        let snapshot = snapshot();
        let first = snapshot.sibling_navigation("basics").expect("node");
        assert!(first.previous.is_none());
        assert_eq!(first.next.map(TopicNode::identifier), Some("naming"));

        let middle = snapshot.sibling_navigation("naming-types").expect("node");
        assert_eq!(middle.previous.map(TopicNode::identifier), Some("functions"));
        assert_eq!(middle.next.map(TopicNode::identifier), Some("errors"));

        let last = snapshot.sibling_navigation("errors").expect("node");
        assert!(last.next.is_none());
    }

    #[test]
    fn orphans_exclude_referenced_and_start_resources() {
        let snapshot = snapshot();
        let orphans = snapshot.orphan_resources([
            "intro.md",
            "basics.md",
            "drafts/unused.md",
            "errors.md",
            "legacy.md",
        ]);
        assert_eq!(
            orphans.into_iter().collect::<Vec<_>>(),
            ["drafts/unused.md", "legacy.md"]
        );
    }

    #[test]
    fn dot_segments_do_not_make_orphans() {
        let content = InMemoryContent::new()
            .with_resource("intro.md")
            .with_resource("guide/basics.md");
        let snapshot = resolve_tree(
            r#"<instance-profile id="sg" start-page="./intro.md"><toc-element topic="./guide//basics.md"/></instance-profile>"#,
            &content,
        )
        .expect("valid");
        assert!(snapshot.orphan_resources(content.resources()).is_empty());
        assert!(snapshot.start_node().is_none());
        assert_eq!(
            snapshot.lookup("guide-basics").expect("node").content_reference(),
            "guide/basics.md"
        );
    }

    #[test]
    fn start_node_is_absent_for_external_start_entries() {
        let snapshot = snapshot();
        assert!(snapshot.start_node().is_none());
        let inner = resolve_tree(
            r#"<instance-profile id="sg" start-page="basics.md"><toc-element topic="basics.md"/></instance-profile>"#,
            &content(),
        )
        .expect("valid");
        assert_eq!(inner.start_node().map(TopicNode::identifier), Some("basics"));
    }

    #[test]
    fn identifiers_are_pairwise_unique_and_references_single() {
        let snapshot = snapshot();
        let nodes = snapshot.preorder();
        for (i, a) in nodes.iter().enumerate() {
            for b in &nodes[i + 1..] {
                assert_ne!(a.identifier(), b.identifier());
                assert_ne!(a.content_reference(), b.content_reference());
            }
        }
    }

    #[test]
    fn identical_sources_give_identical_snapshots() {
        let first = snapshot();
        let second = snapshot();
        assert_eq!(
            first.identifiers().collect::<Vec<_>>(),
            second.identifiers().collect::<Vec<_>>()
        );
        assert_eq!(first.preorder(), second.preorder());
    }

    #[test]
    fn rejected_builds_carry_the_batch() {
        let err = resolve_tree(
            r#"<instance-profile id="sg" start-page="intro.md"><toc-element topic="ghost.md"/></instance-profile>"#,
            &content(),
        )
        .expect_err("ghost");
        assert!(matches!(err, BuildError::Rejected(ref batch) if batch.len() == 1));
    }
}
