// Contract-First Design
// The page entity and the collaborator contracts the engine consumes:
// identifier generation, content templates and the persistence sink.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

use crate::types::{PageId, PageKind, PageName, ParentId, SortKey};
use crate::validation::PersistenceError;

/// A page in the workspace tree
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: PageId,
    pub name: PageName,
    #[serde(rename = "type")]
    pub kind: PageKind,
    pub sort: SortKey,
    pub parent: ParentId,
    pub document: PageDocument,
    pub created_at: DateTime<Utc>,
}

impl Page {
    /// Whether this page lives in the sibling group keyed by `parent`
    pub fn is_child_of(&self, parent: ParentId) -> bool {
        self.parent == parent
    }
}

/// Opaque content payload of a page
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageDocument {
    pub title: String,
    pub content: String,
}

impl PageDocument {
    /// Render a template into a document
    pub fn from_template(template: &dyn ContentTemplate) -> Self {
        let (title, content) = template.render();
        Self { title, content }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_empty() && self.content.is_empty()
    }
}

/// Source of initial page content
pub trait ContentTemplate: Send + Sync {
    /// Produce `(title, content)` for a new page
    ///
    /// # Postconditions
    /// - Deterministic for a given template value
    /// - Does not fail; an empty template renders two empty strings
    fn render(&self) -> (String, String);
}

/// Serializable template carried inside add-page payloads
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

impl Template {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }

    /// Capture any template as a plain value
    pub fn from_source(source: &dyn ContentTemplate) -> Self {
        let (title, content) = source.render();
        Self { title, content }
    }
}

impl ContentTemplate for Template {
    fn render(&self) -> (String, String) {
        (self.title.clone(), self.content.clone())
    }
}

/// Produces identifiers for new pages
pub trait IdGenerator: Send + Sync {
    /// Return a fresh identifier
    ///
    /// # Postconditions
    /// - Never fails
    /// - Never returns an id it returned before
    fn next_id(&self) -> PageId;
}

/// Random v4 UUIDs, the default generator
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn next_id(&self) -> PageId {
        PageId::new()
    }
}

/// Deterministic ids `...0001`, `...0002`, ... for reproducible runs
#[derive(Debug, Default)]
pub struct SequentialIdGenerator {
    counter: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> PageId {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        // n starts at 1, so the UUID is never nil
        PageId::from_uuid(Uuid::from_u128(u128::from(n))).unwrap_or_default()
    }
}

/// Durable store for newly created pages
#[async_trait]
pub trait PersistenceSink: Send + Sync {
    /// Store a newly created page
    ///
    /// # Preconditions
    /// - `page` is already committed to the in-memory snapshot
    ///
    /// # Postconditions
    /// - On `Ok`, the page is durable as far as this sink can promise
    /// - On `Err`, nothing is rolled back in the engine; the caller reports it
    /// - Any retry policy belongs to the implementation
    async fn add(&self, page: &Page) -> Result<(), PersistenceError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_sequential_ids_are_distinct_and_ordered() {
        let ids = SequentialIdGenerator::new();
        let generated: Vec<_> = (0..100).map(|_| ids.next_id()).collect();
        let unique: HashSet<_> = generated.iter().copied().collect();
        assert_eq!(unique.len(), 100);
        assert!(generated.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(generated[0].as_uuid(), Uuid::from_u128(1));
    }

    #[test]
    fn test_template_renders_into_document() {
        let template = Template::new("Welcome", "# Hello");
        let doc = PageDocument::from_template(&template);
        assert_eq!(doc.title, "Welcome");
        assert_eq!(doc.content, "# Hello");
        assert!(PageDocument::default().is_empty());
    }
}
