use crate::{
    content::ContentLookup,
    tree::{resolve_tree, BuildError, Snapshot},
};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, RwLock,
};
use tracing::{info, warn};

/// Holds the currently published snapshot.
///
/// Readers take an `Arc` clone and keep querying it even after a newer snapshot is swapped
/// in. A rebuild publishes only when the whole pipeline succeeds.
#[derive(Debug, Default)]
pub struct SnapshotHolder {
    current: RwLock<Option<Arc<Snapshot>>>,
    generation: AtomicU64,
}

impl SnapshotHolder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        let holder = Self::new();
        holder.publish(snapshot);
        holder
    }

    pub fn current(&self) -> Option<Arc<Snapshot>> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Number of snapshots published so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn publish(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let snapshot = Arc::new(snapshot);
        let mut slot = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = Some(Arc::clone(&snapshot));
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        info!(
            instance = %snapshot.profile().id,
            nodes = snapshot.len(),
            generation,
            "published snapshot"
        );
        snapshot
    }

    /// Runs parse, validation and snapshot build over `source`; publishes on success and
    /// leaves the previous snapshot in place on failure.
    pub fn rebuild(
        &self,
        source: &str,
        content: &dyn ContentLookup,
    ) -> Result<Arc<Snapshot>, BuildError> {
        match resolve_tree(source, content) {
            Ok(snapshot) => Ok(self.publish(snapshot)),
            Err(err) => {
                warn!(
                    generation = self.generation(),
                    error = %err,
                    "rebuild rejected; keeping previous snapshot"
                );
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::InMemoryContent;

    const VALID: &str = r#"<instance-profile id="sg" start-page="a.md"><toc-element topic="a.md"/></instance-profile>"#;
    const GROWN: &str = r#"<instance-profile id="sg" start-page="a.md"><toc-element topic="a.md"/><toc-element topic="b.md"/></instance-profile>"#;
    const BROKEN: &str = r#"<instance-profile id="sg" start-page="a.md"><toc-element topic="a.md"/><toc-element topic="ghost.md"/></instance-profile>"#;

    fn content() -> InMemoryContent {
        InMemoryContent::new()
            .with_resource("a.md")
            .with_resource("b.md")
    }

    #[test]
    fn starts_empty() {
        let holder = SnapshotHolder::new();
        assert!(holder.current().is_none());
        assert_eq!(holder.generation(), 0);
    }

    #[test]
    fn rejected_rebuild_keeps_previous_snapshot() {
        let holder = SnapshotHolder::new();
        let first = holder.rebuild(VALID, &content()).expect("valid");

        let err = holder.rebuild(BROKEN, &content()).expect_err("ghost");
        assert!(matches!(err, BuildError::Rejected(ref batch) if batch.len() == 1));

        let current = holder.current().expect("still published");
        assert!(Arc::ptr_eq(&first, &current));
        assert_eq!(holder.generation(), 1);
    }

    #[test]
    fn malformed_rebuild_keeps_previous_snapshot() {
        let holder = SnapshotHolder::new();
        holder.rebuild(VALID, &content()).expect("valid");
        let err = holder.rebuild("<instance-profile", &content()).expect_err("malformed");
        assert!(matches!(err, BuildError::Malformed(_)));
        assert_eq!(holder.current().expect("published").len(), 1);
    }

    #[test]
    fn readers_keep_their_snapshot_across_swaps() {
        let holder = SnapshotHolder::new();
        holder.rebuild(VALID, &content()).expect("valid");
        let reader = holder.current().expect("published");

        holder.rebuild(GROWN, &content()).expect("valid");
        assert_eq!(reader.len(), 1);
        assert!(reader.lookup("a").is_ok());
        assert_eq!(holder.current().expect("published").len(), 2);
        assert_eq!(holder.generation(), 2);
    }
}
