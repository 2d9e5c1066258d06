// Transactional State Reducer
// The only mutator of application state. Each action runs against a single
// copy-on-write draft of the input snapshot; the draft is validated and frozen
// into a new snapshot, or discarded with the error. The input is never touched.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use crate::config::EngineConfig;
use crate::contracts::{IdGenerator, Page, PageDocument, Template};
use crate::pure::{allocate_sort_key, plan_move, MovePlan, MoveRequest};
use crate::repository::{PageRepository, Snapshot};
use crate::types::{PageId, PageKind, PageName, ParentId, ParentSelector};
use crate::validation::PageTreeError;
use chrono::Utc;

/// Every action the engine understands
///
/// JSON form is tagged by `"type"`; kinds this build does not know
/// deserialize to [`PageAction::Unrecognized`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum PageAction {
    SelectPage {
        page: PageId,
    },
    AddPage {
        name: String,
        parent: ParentSelector,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        initial: Option<Template>,
    },
    RenameCurrentPage {
        name: String,
    },
    DuplicateCurrentPage,
    DeleteCurrentPage,
    #[serde(rename_all = "camelCase")]
    MovePage {
        origin_order: usize,
        target_order: usize,
        origin_parent: ParentId,
        target_parent: ParentId,
    },
    /// Fallback for unknown kinds; reduces to the input snapshot
    #[serde(other)]
    Unrecognized,
}

impl PageAction {
    /// Kebab-case kind name
    pub fn kind(&self) -> &'static str {
        match self {
            PageAction::SelectPage { .. } => "select-page",
            PageAction::AddPage { .. } => "add-page",
            PageAction::RenameCurrentPage { .. } => "rename-current-page",
            PageAction::DuplicateCurrentPage => "duplicate-current-page",
            PageAction::DeleteCurrentPage => "delete-current-page",
            PageAction::MovePage { .. } => "move-page",
            PageAction::Unrecognized => "unrecognized",
        }
    }

    pub fn add_page(name: impl Into<String>, parent: ParentSelector) -> Self {
        PageAction::AddPage {
            name: name.into(),
            parent,
            initial: None,
        }
    }

    pub fn rename(name: impl Into<String>) -> Self {
        PageAction::RenameCurrentPage { name: name.into() }
    }
}

/// Collaborators a transaction may consult
#[derive(Clone, Copy)]
pub struct ReducerEnv<'a> {
    pub config: &'a EngineConfig,
    pub ids: &'a dyn IdGenerator,
}

/// A committed transaction
#[derive(Debug, Clone)]
pub struct Transition {
    /// The snapshot that replaces application state
    pub snapshot: Arc<Snapshot>,
    /// Pages created by this transaction, to hand to the persistence sink
    pub created: Vec<Page>,
    /// The plan applied by a move, if this was one
    pub move_plan: Option<MovePlan>,
}

impl Transition {
    fn unchanged(state: &Arc<Snapshot>) -> Self {
        Self::committed(Arc::clone(state))
    }

    fn committed(snapshot: Arc<Snapshot>) -> Self {
        Self {
            snapshot,
            created: Vec::new(),
            move_plan: None,
        }
    }
}

/// Apply one action to `state`
///
/// On error the caller keeps `state`; nothing from the failed draft escapes.
pub fn reduce(
    state: &Arc<Snapshot>,
    action: &PageAction,
    env: &ReducerEnv<'_>,
) -> Result<Transition, PageTreeError> {
    debug!(action = action.kind(), pages = state.len(), "Reducing action");
    match action {
        PageAction::SelectPage { page } => select_page(state, *page),
        PageAction::AddPage {
            name,
            parent,
            initial,
        } => add_page(state, name, *parent, initial.as_ref(), env),
        PageAction::RenameCurrentPage { name } => rename_current_page(state, name, env),
        PageAction::DuplicateCurrentPage => duplicate_current_page(state, env),
        PageAction::DeleteCurrentPage => delete_current_page(state),
        PageAction::MovePage {
            origin_order,
            target_order,
            origin_parent,
            target_parent,
        } => move_page(
            state,
            *origin_order,
            *target_order,
            *origin_parent,
            *target_parent,
            env,
        ),
        PageAction::Unrecognized => Ok(Transition::unchanged(state)),
    }
}

fn select_page(state: &Arc<Snapshot>, page: PageId) -> Result<Transition, PageTreeError> {
    if !state.contains(page) {
        return Err(PageTreeError::not_found("page to select", page));
    }
    let mut draft = state.draft();
    draft.select(Some(page));
    Ok(Transition::committed(Arc::new(draft.commit()?)))
}

fn add_page(
    state: &Arc<Snapshot>,
    name: &str,
    parent: ParentSelector,
    initial: Option<&Template>,
    env: &ReducerEnv<'_>,
) -> Result<Transition, PageTreeError> {
    let parent = resolve_parent(&**state, parent)?;
    let siblings = state.siblings(parent);
    let sort = allocate_sort_key(siblings.iter().map(|p| p.sort))?;
    let name = normalize_name(name, siblings.len(), env.config)?;

    let page = Page {
        id: fresh_id(&**state, env)?,
        name,
        kind: PageKind::Document,
        sort,
        parent,
        document: initial
            .map(|t| PageDocument::from_template(t))
            .unwrap_or_default(),
        created_at: Utc::now(),
    };

    let mut draft = state.draft();
    draft.push(page.clone());
    draft.select(Some(page.id));
    let snapshot = Arc::new(draft.commit()?);
    Ok(Transition {
        snapshot,
        created: vec![page],
        move_plan: None,
    })
}

fn rename_current_page(
    state: &Arc<Snapshot>,
    name: &str,
    env: &ReducerEnv<'_>,
) -> Result<Transition, PageTreeError> {
    let current = state.current_page()?;
    let group_size = state.siblings(current.parent).len();
    let name = normalize_name(name, group_size, env.config)?;
    let id = current.id;

    let mut draft = state.draft();
    draft.page_mut(id)?.name = name;
    Ok(Transition::committed(Arc::new(draft.commit()?)))
}

fn duplicate_current_page(
    state: &Arc<Snapshot>,
    env: &ReducerEnv<'_>,
) -> Result<Transition, PageTreeError> {
    let current = state.current_page()?;
    let sort = allocate_sort_key(state.siblings(current.parent).iter().map(|p| p.sort))?;
    let name = PageName::new(format!("{}{}", current.name, env.config.copy_suffix))
        .map_err(|e| PageTreeError::invalid_input("name", e.to_string()))?;

    let copy = Page {
        id: fresh_id(&**state, env)?,
        name,
        sort,
        created_at: Utc::now(),
        ..current.clone()
    };

    let mut draft = state.draft();
    draft.push(copy.clone());
    draft.select(Some(copy.id));
    let snapshot = Arc::new(draft.commit()?);
    Ok(Transition {
        snapshot,
        created: vec![copy],
        move_plan: None,
    })
}

/// Removes the selected page together with everything below it
fn delete_current_page(state: &Arc<Snapshot>) -> Result<Transition, PageTreeError> {
    let index = state.current_page_index()?;
    let current = state.current_page()?.id;

    let mut doomed: HashSet<PageId> = state.descendants(current).into_iter().collect();
    doomed.insert(current);

    let survivors: Vec<(usize, PageId)> = state
        .pages()
        .iter()
        .enumerate()
        .filter(|(_, p)| !doomed.contains(&p.id))
        .map(|(i, p)| (i, p.id))
        .collect();

    let next_selected = survivors
        .iter()
        .rev()
        .find(|(i, _)| *i < index)
        .or_else(|| survivors.first())
        .map(|(_, id)| *id)
        .ok_or_else(|| PageTreeError::not_found("page to select after delete", current))?;

    let mut draft = state.draft();
    let removed = draft.remove_all(&doomed);
    draft.select(Some(next_selected));
    debug!(page = %current, removed, "Deleted page subtree");
    Ok(Transition::committed(Arc::new(draft.commit()?)))
}

fn move_page(
    state: &Arc<Snapshot>,
    origin_order: usize,
    target_order: usize,
    origin_parent: ParentId,
    target_parent: ParentId,
    env: &ReducerEnv<'_>,
) -> Result<Transition, PageTreeError> {
    let current = state.current_page()?;

    if origin_parent != current.parent {
        return Err(PageTreeError::invariant(
            "move origin must hold the moving page",
            format!(
                "page {} lives under {}, not {}",
                current.id, current.parent, origin_parent
            ),
        ));
    }
    if let ParentId::Page(target) = target_parent {
        if !state.contains(target) {
            return Err(PageTreeError::not_found("target parent", target));
        }
        if state.is_within(target, current.id) {
            return Err(PageTreeError::invariant(
                "parent links must not form a cycle",
                format!("page {} cannot move under {}", current.id, target),
            ));
        }
    }

    let origin = state.siblings(origin_parent);
    let target = state.siblings(target_parent);
    let plan = plan_move(
        &MoveRequest {
            page: current,
            origin: &origin,
            origin_index: origin_order,
            target_parent,
            target: &target,
            target_index: target_order,
        },
        env.config.big_step,
    )?;

    if plan.is_noop(current) {
        return Ok(Transition {
            move_plan: Some(plan),
            ..Transition::unchanged(state)
        });
    }

    let mut draft = state.draft();
    {
        let page = draft.page_mut(plan.page)?;
        page.parent = plan.parent;
        page.sort = plan.sort;
    }
    for update in &plan.updates {
        draft.page_mut(update.id)?.sort = update.sort;
    }
    let snapshot = Arc::new(draft.commit()?);
    Ok(Transition {
        snapshot,
        created: Vec::new(),
        move_plan: Some(plan),
    })
}

fn resolve_parent(
    state: &impl PageRepository,
    selector: ParentSelector,
) -> Result<ParentId, PageTreeError> {
    match selector {
        ParentSelector::Root => Ok(ParentId::Root),
        ParentSelector::Current => Ok(ParentId::Page(state.current_page()?.id)),
        ParentSelector::Page(id) if state.contains(id) => Ok(ParentId::Page(id)),
        ParentSelector::Page(id) => Err(PageTreeError::not_found("parent page", id)),
    }
}

/// Blank names become `<prefix> <group_size + 1>`
fn normalize_name(
    raw: &str,
    group_size: usize,
    config: &EngineConfig,
) -> Result<PageName, PageTreeError> {
    let candidate = if raw.trim().is_empty() {
        config.default_page_name(group_size)
    } else {
        raw.to_string()
    };
    PageName::new(candidate).map_err(|e| PageTreeError::invalid_input("name", e.to_string()))
}

fn fresh_id(state: &impl PageRepository, env: &ReducerEnv<'_>) -> Result<PageId, PageTreeError> {
    let id = env.ids.next_id();
    if state.contains(id) {
        return Err(PageTreeError::invariant(
            "page ids must be unique",
            format!("identifier generator returned existing id {id}"),
        ));
    }
    Ok(id)
}
