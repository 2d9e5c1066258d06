// Validation Layer - Contract Enforcement
// Error taxonomy for the page-tree engine plus the invariant checks
// that every draft must pass before it becomes a snapshot.

use crate::repository::PageRepository;
use std::collections::HashMap;
use std::fmt;
use tracing::error;

/// Errors surfaced by the state engine
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PageTreeError {
    #[error("Not found: {what} ({id})")]
    NotFound { what: String, id: String },

    #[error("Invariant violated: {invariant} - {detail}")]
    InvariantViolation { invariant: String, detail: String },

    #[error("Invalid input: {field} - {reason}")]
    InvalidInput { field: String, reason: String },
}

impl PageTreeError {
    pub fn not_found(what: impl Into<String>, id: impl fmt::Display) -> Self {
        Self::NotFound {
            what: what.into(),
            id: id.to_string(),
        }
    }

    pub fn invariant(invariant: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::InvariantViolation {
            invariant: invariant.into(),
            detail: detail.into(),
        }
    }

    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, Self::InvariantViolation { .. })
    }
}

/// Failures reported by a persistence sink
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("Sink rejected page {page}: {reason}")]
    Rejected { page: String, reason: String },

    #[error("I/O failure while persisting: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize page: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Validation context for better error messages
#[derive(Clone)]
pub struct ValidationContext {
    operation: String,
    attributes: Vec<(String, String)>,
}

impl ValidationContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            attributes: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.attributes.push((key.into(), value.to_string()));
        self
    }

    /// Fail with an `InvariantViolation` naming `invariant` when `condition` is false
    pub fn check(&self, condition: bool, invariant: &str) -> Result<(), PageTreeError> {
        if condition {
            return Ok(());
        }
        let attrs = self
            .attributes
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(", ");
        error!(
            operation = %self.operation,
            attributes = %attrs,
            "Invariant check failed: {}", invariant
        );
        Err(PageTreeError::invariant(
            invariant,
            format!("operation: {}, {}", self.operation, attrs),
        ))
    }
}

/// Whole-tree invariant checks run at the transaction boundary
pub mod snapshot {
    use super::*;
    use crate::types::{PageId, ParentId, SortKey};
    use std::collections::HashSet;

    /// Check every tree invariant against `repo`
    pub fn validate(repo: &impl PageRepository) -> Result<(), PageTreeError> {
        validate_unique_ids(repo)?;
        validate_sibling_sorts(repo)?;
        validate_forest(repo)?;
        validate_selection(repo)
    }

    pub fn validate_unique_ids(repo: &impl PageRepository) -> Result<(), PageTreeError> {
        let mut seen = HashSet::with_capacity(repo.pages().len());
        for page in repo.pages() {
            if !seen.insert(page.id) {
                return ValidationContext::new("validate_unique_ids")
                    .with_attribute("page", page.id)
                    .check(false, "page ids must be unique");
            }
        }
        Ok(())
    }

    pub fn validate_sibling_sorts(repo: &impl PageRepository) -> Result<(), PageTreeError> {
        let mut seen: HashMap<ParentId, HashSet<SortKey>> = HashMap::new();
        for page in repo.pages() {
            if !seen.entry(page.parent).or_default().insert(page.sort) {
                return ValidationContext::new("validate_sibling_sorts")
                    .with_attribute("page", page.id)
                    .with_attribute("parent", page.parent)
                    .with_attribute("sort", page.sort)
                    .check(false, "sort keys must be unique within a sibling group");
            }
        }
        Ok(())
    }

    /// Every parent exists and following parent links never revisits a page
    pub fn validate_forest(repo: &impl PageRepository) -> Result<(), PageTreeError> {
        let parents: HashMap<PageId, ParentId> =
            repo.pages().iter().map(|p| (p.id, p.parent)).collect();

        for page in repo.pages() {
            match page.parent {
                ParentId::Page(parent) if !parents.contains_key(&parent) => {
                    return ValidationContext::new("validate_forest")
                        .with_attribute("page", page.id)
                        .with_attribute("parent", parent)
                        .check(false, "parent must reference an existing page");
                }
                _ => {}
            }
        }

        // Pages already proven to reach the root
        let mut grounded: HashSet<PageId> = HashSet::with_capacity(parents.len());
        for page in repo.pages() {
            let mut path = HashSet::new();
            let mut cursor = page.id;
            loop {
                if grounded.contains(&cursor) {
                    break;
                }
                if !path.insert(cursor) {
                    return ValidationContext::new("validate_forest")
                        .with_attribute("page", page.id)
                        .with_attribute("revisited", cursor)
                        .check(false, "parent links must not form a cycle");
                }
                match parents.get(&cursor).and_then(ParentId::page) {
                    Some(next) => cursor = next,
                    None => break,
                }
            }
            grounded.extend(path);
        }
        Ok(())
    }

    pub fn validate_selection(repo: &impl PageRepository) -> Result<(), PageTreeError> {
        match repo.selected_page() {
            Some(selected) if !repo.contains(selected) => {
                ValidationContext::new("validate_selection")
                    .with_attribute("selected", selected)
                    .check(false, "selected page must exist")
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::PageBuilder;
    use crate::repository::Snapshot;
    use crate::types::ParentId;

    #[test]
    fn test_duplicate_sort_in_group_is_rejected() -> anyhow::Result<()> {
        let a = PageBuilder::new().name("A")?.sort(1).build();
        let b = PageBuilder::new().name("B")?.sort(1).build();
        let err = Snapshot::from_pages(vec![a, b], None).unwrap_err();
        assert!(err.is_invariant_violation());
        Ok(())
    }

    #[test]
    fn test_failure_detail_names_offending_page() -> anyhow::Result<()> {
        let a = PageBuilder::new().name("A")?.sort(7).build();
        let b = PageBuilder::new().name("B")?.sort(7).build();
        let offender = b.id;
        match Snapshot::from_pages(vec![a, b], None).unwrap_err() {
            PageTreeError::InvariantViolation { invariant, detail } => {
                assert!(invariant.contains("sort keys"));
                assert!(detail.contains("operation: validate_sibling_sorts"));
                assert!(detail.contains(&format!("page={offender}")));
                assert!(detail.contains("sort=7"));
            }
            other => panic!("unexpected error: {other}"),
        }
        Ok(())
    }

    #[test]
    fn test_same_sort_in_different_groups_is_fine() -> anyhow::Result<()> {
        let a = PageBuilder::new().name("A")?.sort(1).build();
        let b = PageBuilder::new()
            .name("B")?
            .sort(1)
            .parent(ParentId::Page(a.id))
            .build();
        assert!(Snapshot::from_pages(vec![a, b], None).is_ok());
        Ok(())
    }

    #[test]
    fn test_cycle_and_dangling_parent_are_rejected() -> anyhow::Result<()> {
        let mut a = PageBuilder::new().name("A")?.sort(1).build();
        let b = PageBuilder::new()
            .name("B")?
            .sort(1)
            .parent(ParentId::Page(a.id))
            .build();
        a.parent = ParentId::Page(b.id);
        let err = Snapshot::from_pages(vec![a, b], None).unwrap_err();
        assert!(err.to_string().contains("cycle"));

        let orphan = PageBuilder::new()
            .name("Orphan")?
            .parent(ParentId::Page(crate::types::PageId::new()))
            .build();
        let err = Snapshot::from_pages(vec![orphan], None).unwrap_err();
        assert!(err.to_string().contains("existing page"));
        Ok(())
    }

    #[test]
    fn test_dangling_selection_is_rejected() -> anyhow::Result<()> {
        let a = PageBuilder::new().name("A")?.build();
        let err = Snapshot::from_pages(vec![a], Some(crate::types::PageId::new())).unwrap_err();
        assert!(err.is_invariant_violation());
        Ok(())
    }
}
