// Validated Types - Page Tree Component Library
// Strongly-typed wrappers that enforce invariants at construction time.
// These types cannot be built from invalid data, so the engine never has to re-check them.

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Ordering key of a page inside its sibling group
pub type SortKey = i64;

/// Reserved token for the root sentinel in textual form
pub const ROOT_TOKEN: &str = "root";

/// Reserved token for "the currently selected page" in add-page payloads
pub const CURRENT_TOKEN: &str = "current";

/// A page ID that is guaranteed to be valid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Uuid", into = "Uuid")]
pub struct PageId {
    inner: Uuid,
}

impl Default for PageId {
    fn default() -> Self {
        Self::new()
    }
}

impl PageId {
    /// Create a new random page ID
    pub fn new() -> Self {
        Self {
            inner: Uuid::new_v4(),
        }
    }

    /// Create from existing UUID with validation
    pub fn from_uuid(id: Uuid) -> Result<Self> {
        ensure!(!id.is_nil(), "Page ID cannot be nil UUID");
        Ok(Self { inner: id })
    }

    /// Parse from string
    pub fn parse(s: &str) -> Result<Self> {
        let uuid = Uuid::parse_str(s)?;
        Self::from_uuid(uuid)
    }

    /// Get the inner UUID
    pub fn as_uuid(&self) -> Uuid {
        self.inner
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl FromStr for PageId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<Uuid> for PageId {
    type Error = anyhow::Error;

    fn try_from(id: Uuid) -> Result<Self> {
        Self::from_uuid(id)
    }
}

impl From<PageId> for Uuid {
    fn from(id: PageId) -> Self {
        id.inner
    }
}

/// The `parent` of a page: either the root sentinel or another page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ParentId {
    /// Top-level placement
    Root,
    /// Nested under the given page
    Page(PageId),
}

impl ParentId {
    pub fn is_root(&self) -> bool {
        matches!(self, ParentId::Root)
    }

    /// The parent page, if this is not the root sentinel
    pub fn page(&self) -> Option<PageId> {
        match self {
            ParentId::Root => None,
            ParentId::Page(id) => Some(*id),
        }
    }
}

impl From<PageId> for ParentId {
    fn from(id: PageId) -> Self {
        ParentId::Page(id)
    }
}

impl fmt::Display for ParentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParentId::Root => f.write_str(ROOT_TOKEN),
            ParentId::Page(id) => write!(f, "{id}"),
        }
    }
}

impl FromStr for ParentId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s == ROOT_TOKEN {
            return Ok(ParentId::Root);
        }
        Ok(ParentId::Page(PageId::parse(s)?))
    }
}

impl TryFrom<String> for ParentId {
    type Error = anyhow::Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<ParentId> for String {
    fn from(parent: ParentId) -> Self {
        parent.to_string()
    }
}

/// Symbolic parent accepted by add-page: "current", "root" or an explicit id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ParentSelector {
    /// Resolves to the selected page
    Current,
    /// Resolves to the root sentinel
    Root,
    /// Resolves to the given page, which must exist
    Page(PageId),
}

impl fmt::Display for ParentSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParentSelector::Current => f.write_str(CURRENT_TOKEN),
            ParentSelector::Root => f.write_str(ROOT_TOKEN),
            ParentSelector::Page(id) => write!(f, "{id}"),
        }
    }
}

impl FromStr for ParentSelector {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            CURRENT_TOKEN => Ok(ParentSelector::Current),
            ROOT_TOKEN => Ok(ParentSelector::Root),
            other => Ok(ParentSelector::Page(PageId::parse(other)?)),
        }
    }
}

impl TryFrom<String> for ParentSelector {
    type Error = anyhow::Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<ParentSelector> for String {
    fn from(selector: ParentSelector) -> Self {
        selector.to_string()
    }
}

impl From<ParentId> for ParentSelector {
    fn from(parent: ParentId) -> Self {
        match parent {
            ParentId::Root => ParentSelector::Root,
            ParentId::Page(id) => ParentSelector::Page(id),
        }
    }
}

/// A trimmed, non-empty page name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PageName {
    inner: String,
}

impl PageName {
    /// Create a new validated name
    ///
    /// # Invariants
    /// - Non-empty after trimming
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let trimmed = name.trim();

        ensure!(!trimmed.is_empty(), "Page name cannot be empty");

        Ok(Self {
            inner: trimmed.to_string(),
        })
    }

    /// Placeholder name for pages built without one
    pub fn untitled() -> Self {
        Self {
            inner: "Untitled".to_string(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.inner
    }
}

impl fmt::Display for PageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl TryFrom<String> for PageName {
    type Error = anyhow::Error;

    fn try_from(s: String) -> Result<Self> {
        Self::new(s)
    }
}

impl From<PageName> for String {
    fn from(name: PageName) -> Self {
        name.inner
    }
}

/// Content kind carried by a page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PageKind {
    #[default]
    Document,
}
