mod anchors;
mod directory;
mod memory;

pub use anchors::{collect_anchors, heading_slug};
pub use directory::DirectoryContent;
pub use memory::InMemoryContent;

/// Resolves content references on behalf of the validator.
///
/// Lookups are synchronous; an asynchronous store can be wrapped behind this trait.
pub trait ContentLookup {
    /// Whether `reference` names an existing resource.
    fn resource_exists(&self, reference: &str) -> bool;

    /// Whether `fragment` is an addressable location inside `reference`.
    fn fragment_exists(&self, reference: &str, fragment: &str) -> bool;
}
