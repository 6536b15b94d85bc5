use crate::tree::{NotFound, Snapshot, TopicNode};
use std::{collections::BTreeSet, fmt::Write};

/// Indented outline of the whole tree in read order.
pub fn render_outline(snapshot: &Snapshot) -> String {
    let profile = snapshot.profile();
    let mut out = String::new();
    let _ = writeln!(out, "{} ({})", profile.name, profile.id);
    let _ = writeln!(out, "start: {}", profile.start_page);
    for node in snapshot.preorder() {
        let indent = "  ".repeat(node.depth() + 1);
        let _ = write!(out, "{indent}- {} [{}]", node.identifier(), location(node));
        if let Some(title) = node.title() {
            let _ = write!(out, " \"{title}\"");
        }
        out.push('\n');
    }
    out
}

/// Breadcrumb, children and read-order neighbours of one topic.
pub fn render_topic(snapshot: &Snapshot, identifier: &str) -> Result<String, NotFound> {
    let node = snapshot.lookup(identifier)?;
    let trail = snapshot.breadcrumb(identifier)?;
    let children = snapshot.children_of(identifier)?;
    let siblings = snapshot.sibling_navigation(identifier)?;

    let mut out = String::new();
    let _ = writeln!(out, "== {} ({}) ==", node.identifier(), location(node));
    if let Some(title) = node.title() {
        let _ = writeln!(out, "title: {title}");
    }
    let path: Vec<_> = trail.iter().map(|node| node.identifier()).collect();
    let _ = writeln!(out, "breadcrumb: {}", path.join(" > "));
    if children.is_empty() {
        let _ = writeln!(out, "children: none");
    } else {
        let _ = writeln!(out, "children:");
        for child in children {
            let _ = writeln!(out, "  - {} [{}]", child.identifier(), location(child));
        }
    }
    let _ = writeln!(out, "previous: {}", neighbour(siblings.previous));
    let _ = writeln!(out, "next: {}", neighbour(siblings.next));
    Ok(out)
}

pub fn render_orphans(orphans: &BTreeSet<String>) -> String {
    orphans.iter().fold(String::new(), |mut out, orphan| {
        let _ = writeln!(out, "{orphan}");
        out
    })
}

fn location(node: &TopicNode) -> String {
    match node.fragment_anchor() {
        Some(fragment) => format!("{}#{}", node.content_reference(), fragment),
        None => node.content_reference().to_string(),
    }
}

fn neighbour(node: Option<&TopicNode>) -> String {
    node.map(|node| node.identifier().to_string())
        .unwrap_or_else(|| "none".to_string())
}
