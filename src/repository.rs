// Page Tree Repository
// Immutable snapshots of the page collection, the copy-on-write draft used
// inside a transaction, and the read-side queries shared by both.

use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use crate::contracts::Page;
use crate::types::{PageId, ParentId};
use crate::validation::{self, PageTreeError};

/// Read-side queries over an ordered page collection
pub trait PageRepository {
    /// All pages in raw collection order
    fn pages(&self) -> &[Arc<Page>];

    /// The selected page id, if any
    fn selected_page(&self) -> Option<PageId>;

    fn find(&self, id: PageId) -> Option<&Page> {
        self.pages().iter().map(Arc::as_ref).find(|p| p.id == id)
    }

    fn index_of(&self, id: PageId) -> Option<usize> {
        self.pages().iter().position(|p| p.id == id)
    }

    fn contains(&self, id: PageId) -> bool {
        self.index_of(id).is_some()
    }

    /// Raw index of the selected page
    fn current_page_index(&self) -> Result<usize, PageTreeError> {
        let selected = self
            .selected_page()
            .ok_or_else(|| PageTreeError::not_found("selected page", "none"))?;
        self.index_of(selected)
            .ok_or_else(|| PageTreeError::not_found("selected page", selected))
    }

    /// The selected page
    fn current_page(&self) -> Result<&Page, PageTreeError> {
        let index = self.current_page_index()?;
        self.pages()
            .get(index)
            .map(Arc::as_ref)
            .ok_or_else(|| PageTreeError::not_found("page at index", index))
    }

    /// Sibling group under `parent`, ordered by ascending sort key
    fn siblings(&self, parent: ParentId) -> Vec<&Page> {
        let mut group: Vec<&Page> = self
            .pages()
            .iter()
            .map(Arc::as_ref)
            .filter(|p| p.is_child_of(parent))
            .collect();
        // Stable, so equal keys keep raw order
        group.sort_by_key(|p| p.sort);
        group
    }

    fn children_of(&self, id: PageId) -> Vec<&Page> {
        self.siblings(ParentId::Page(id))
    }

    /// Parent chain of `id`, nearest first
    fn ancestors(&self, id: PageId) -> Vec<PageId> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut cursor = self.find(id).and_then(|p| p.parent.page());
        while let Some(parent) = cursor {
            if !seen.insert(parent) {
                break;
            }
            chain.push(parent);
            cursor = self.find(parent).and_then(|p| p.parent.page());
        }
        chain
    }

    /// Whether `candidate` is `ancestor` or sits somewhere below it
    fn is_within(&self, candidate: PageId, ancestor: PageId) -> bool {
        candidate == ancestor || self.ancestors(candidate).contains(&ancestor)
    }

    /// Every page below `id`, breadth-first
    fn descendants(&self, id: PageId) -> Vec<PageId> {
        let mut found = Vec::new();
        let mut seen = HashSet::from([id]);
        let mut queue = VecDeque::from([id]);
        while let Some(next) = queue.pop_front() {
            for child in self.pages().iter().filter(|p| p.parent == ParentId::Page(next)) {
                if seen.insert(child.id) {
                    found.push(child.id);
                    queue.push_back(child.id);
                }
            }
        }
        found
    }
}

/// One immutable value of the whole page-tree state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pages: Vec<Arc<Page>>,
    selected_page: Option<PageId>,
}

impl Snapshot {
    /// An empty tree with nothing selected
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot from existing pages, checking every tree invariant
    pub fn from_pages(
        pages: Vec<Page>,
        selected_page: Option<PageId>,
    ) -> Result<Self, PageTreeError> {
        let draft = Draft {
            pages: pages.into_iter().map(Arc::new).collect(),
            selected_page,
        };
        draft.commit()
    }

    /// Start a transaction against this snapshot
    pub fn draft(&self) -> Draft {
        Draft {
            pages: self.pages.clone(),
            selected_page: self.selected_page,
        }
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Re-check invariants after deserializing from an untrusted source
    pub fn validate(&self) -> Result<(), PageTreeError> {
        validation::snapshot::validate(self)
    }
}

impl PageRepository for Snapshot {
    fn pages(&self) -> &[Arc<Page>] {
        &self.pages
    }

    fn selected_page(&self) -> Option<PageId> {
        self.selected_page
    }
}

/// Mutable working copy of a snapshot, alive for a single transaction
///
/// Pages are shared with the source snapshot until first written through
/// [`Draft::page_mut`], so untouched pages are never copied.
#[derive(Debug, Clone)]
pub struct Draft {
    pages: Vec<Arc<Page>>,
    selected_page: Option<PageId>,
}

impl Draft {
    /// Writable access to one page; clones it out of the shared snapshot on first write
    pub fn page_mut(&mut self, id: PageId) -> Result<&mut Page, PageTreeError> {
        self.pages
            .iter_mut()
            .find(|p| p.id == id)
            .map(Arc::make_mut)
            .ok_or_else(|| PageTreeError::not_found("page", id))
    }

    /// Append a page to the raw collection
    pub fn push(&mut self, page: Page) {
        self.pages.push(Arc::new(page));
    }

    /// Remove every page whose id is in `doomed`, returning how many went
    pub fn remove_all(&mut self, doomed: &HashSet<PageId>) -> usize {
        let before = self.pages.len();
        self.pages.retain(|p| !doomed.contains(&p.id));
        before - self.pages.len()
    }

    pub fn select(&mut self, page: Option<PageId>) {
        self.selected_page = page;
    }

    /// Finalize into a new snapshot, rejecting any invariant violation
    pub fn commit(self) -> Result<Snapshot, PageTreeError> {
        validation::snapshot::validate(&self)?;
        Ok(Snapshot {
            pages: self.pages,
            selected_page: self.selected_page,
        })
    }
}

impl PageRepository for Draft {
    fn pages(&self) -> &[Arc<Page>] {
        &self.pages
    }

    fn selected_page(&self) -> Option<PageId> {
        self.selected_page
    }
}
