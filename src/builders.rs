// Builder Patterns - Component Library
// Fluent builders for pages and engine configuration, with sensible
// defaults and validation at each step.

use crate::config::EngineConfig;
use crate::contracts::{ContentTemplate, Page, PageDocument};
use crate::pure::FIRST_SORT_KEY;
use crate::types::*;
use anyhow::Result;
use chrono::{DateTime, Utc};

/// Fluent builder for creating Pages
pub struct PageBuilder {
    id: Option<PageId>,
    name: Option<PageName>,
    kind: PageKind,
    sort: SortKey,
    parent: ParentId,
    document: PageDocument,
    created_at: Option<DateTime<Utc>>,
}

impl PageBuilder {
    /// Create a new page builder
    pub fn new() -> Self {
        Self {
            id: None,
            name: None,
            kind: PageKind::default(),
            sort: FIRST_SORT_KEY,
            parent: ParentId::Root,
            document: PageDocument::default(),
            created_at: None,
        }
    }

    /// Set the page ID
    /// If not specified, a new UUID will be generated automatically
    pub fn id(mut self, id: PageId) -> Self {
        self.id = Some(id);
        self
    }

    /// Set the page name
    pub fn name(mut self, name: impl Into<String>) -> Result<Self> {
        self.name = Some(PageName::new(name)?);
        Ok(self)
    }

    pub fn kind(mut self, kind: PageKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn sort(mut self, sort: SortKey) -> Self {
        self.sort = sort;
        self
    }

    pub fn parent(mut self, parent: impl Into<ParentId>) -> Self {
        self.parent = parent.into();
        self
    }

    pub fn document(mut self, document: PageDocument) -> Self {
        self.document = document;
        self
    }

    /// Render the initial document from a template
    pub fn template(mut self, template: &dyn ContentTemplate) -> Self {
        self.document = PageDocument::from_template(template);
        self
    }

    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Build the page
    pub fn build(self) -> Page {
        Page {
            id: self.id.unwrap_or_default(),
            name: self.name.unwrap_or_else(PageName::untitled),
            kind: self.kind,
            sort: self.sort,
            parent: self.parent,
            document: self.document,
            created_at: self.created_at.unwrap_or_else(Utc::now),
        }
    }
}

impl Default for PageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Fluent builder for the engine configuration
pub struct EngineConfigBuilder {
    big_step: Option<SortKey>,
    default_name_prefix: Option<String>,
    copy_suffix: Option<String>,
}

impl EngineConfigBuilder {
    pub fn new() -> Self {
        Self {
            big_step: None,
            default_name_prefix: None,
            copy_suffix: None,
        }
    }

    /// Spacing used when sort keys are respaced
    pub fn big_step(mut self, step: SortKey) -> Self {
        self.big_step = Some(step);
        self
    }

    pub fn default_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.default_name_prefix = Some(prefix.into());
        self
    }

    pub fn copy_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.copy_suffix = Some(suffix.into());
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<EngineConfig> {
        let defaults = EngineConfig::default();
        let config = EngineConfig {
            big_step: self.big_step.unwrap_or(defaults.big_step),
            default_name_prefix: self
                .default_name_prefix
                .unwrap_or(defaults.default_name_prefix),
            copy_suffix: self.copy_suffix.unwrap_or(defaults.copy_suffix),
        };
        config.validate()?;
        Ok(config)
    }
}

impl Default for EngineConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
