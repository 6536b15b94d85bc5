use super::ContentLookup;
use std::collections::{BTreeMap, BTreeSet};

/// Content collection held in memory: resource path to the anchors it defines.
#[derive(Debug, Clone, Default)]
pub struct InMemoryContent {
    resources: BTreeMap<String, BTreeSet<String>>,
}

impl InMemoryContent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resource(mut self, reference: impl Into<String>) -> Self {
        self.insert(reference, std::iter::empty::<String>());
        self
    }

    pub fn with_anchors<I, S>(mut self, reference: impl Into<String>, anchors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert(reference, anchors);
        self
    }

    pub fn insert<I, S>(&mut self, reference: impl Into<String>, anchors: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.resources
            .entry(reference.into())
            .or_default()
            .extend(anchors.into_iter().map(Into::into));
    }

    pub fn remove(&mut self, reference: &str) -> bool {
        self.resources.remove(reference).is_some()
    }

    pub fn resources(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }
}

impl ContentLookup for InMemoryContent {
    fn resource_exists(&self, reference: &str) -> bool {
        self.resources.contains_key(reference)
    }

    fn fragment_exists(&self, reference: &str, fragment: &str) -> bool {
        self.resources
            .get(reference)
            .is_some_and(|anchors| anchors.contains(fragment))
    }
}
