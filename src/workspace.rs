// Workspace - Application State Holder
// Owns the current snapshot, admits one transaction at a time, swaps in the
// reducer's result and hands created pages to the persistence sink after the
// swap. Readers clone the Arc and never see a half-applied transaction.

use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::contracts::{IdGenerator, PersistenceSink, UuidIdGenerator};
use crate::observability::*;
use crate::reducer::{reduce, PageAction, ReducerEnv, Transition};
use crate::repository::{PageRepository, Snapshot};
use crate::validation::{PageTreeError, PersistenceError};

/// Result of a dispatch followed by persistence of the created pages
#[derive(Debug)]
pub struct Committed {
    pub transition: Transition,
    /// Sink failures; they never roll back `transition`
    pub persistence_failures: Vec<PersistenceError>,
}

/// The single mutable reference to application state
pub struct Workspace {
    state: RwLock<Arc<Snapshot>>,
    writer: Mutex<()>,
    config: EngineConfig,
    ids: Arc<dyn IdGenerator>,
    sink: Option<Arc<dyn PersistenceSink>>,
}

impl Workspace {
    /// Empty workspace with random ids and no sink
    pub fn new(config: EngineConfig) -> Self {
        Self::with_snapshot(config, Snapshot::new())
    }

    /// Start from an existing, already-validated snapshot
    pub fn with_snapshot(config: EngineConfig, snapshot: Snapshot) -> Self {
        Self {
            state: RwLock::new(Arc::new(snapshot)),
            writer: Mutex::new(()),
            config,
            ids: Arc::new(UuidIdGenerator),
            sink: None,
        }
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn PersistenceSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// The current snapshot
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.state.read())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run one transaction and swap in its snapshot
    ///
    /// On error the current snapshot is left exactly as it was.
    /// Created pages are not persisted here; see [`Workspace::dispatch_and_persist`].
    pub fn dispatch(&self, action: &PageAction) -> Result<Transition, PageTreeError> {
        let _writer = self.writer.lock();
        let current = self.snapshot();

        let mut ctx = OperationContext::new(action.kind());
        ctx.add_attribute("pages", current.len().to_string());

        let env = ReducerEnv {
            config: &self.config,
            ids: self.ids.as_ref(),
        };
        let result = reduce(&current, action, &env);

        match &result {
            Ok(transition) => {
                *self.state.write() = Arc::clone(&transition.snapshot);
                let op = describe(action, &current, transition);
                log_operation::<PageTreeError>(&ctx, &op, &Ok(()));
                if let Some(plan) = transition.move_plan.as_ref().filter(|p| p.rebalanced()) {
                    record_metric(MetricType::Counter {
                        name: "moves.rebalanced",
                        value: plan.updates.len() as u64,
                    });
                }
            }
            Err(e) => {
                let op = Operation::Passthrough {
                    kind: action.kind().to_string(),
                };
                log_operation(&ctx, &op, &Err(e.clone()));
            }
        }
        result
    }

    /// Dispatch, then persist every created page
    ///
    /// The new snapshot is already visible to readers while the sink runs.
    /// Sink failures are logged and returned beside the transition.
    pub async fn dispatch_and_persist(
        &self,
        action: &PageAction,
    ) -> Result<Committed, PageTreeError> {
        let transition = self.dispatch(action)?;
        let mut persistence_failures = Vec::new();

        if let Some(sink) = &self.sink {
            for page in &transition.created {
                if let Err(e) = sink.add(page).await {
                    warn!(page = %page.id, error = %e, "Failed to persist page; keeping in-memory commit");
                    persistence_failures.push(e);
                }
            }
        } else if !transition.created.is_empty() {
            info!(
                created = transition.created.len(),
                "No persistence sink configured; pages kept in memory only"
            );
        }

        Ok(Committed {
            transition,
            persistence_failures,
        })
    }
}

/// Structured description of a committed action
fn describe(action: &PageAction, before: &Snapshot, transition: &Transition) -> Operation {
    let after = transition.snapshot.as_ref();
    match action {
        PageAction::SelectPage { page } => Operation::PageSelect {
            page: page.as_uuid(),
        },
        PageAction::AddPage { .. } => match transition.created.first() {
            Some(page) => Operation::PageAdd {
                page: page.id.as_uuid(),
                sort: page.sort,
            },
            None => Operation::Passthrough {
                kind: action.kind().to_string(),
            },
        },
        PageAction::RenameCurrentPage { .. } => Operation::PageRename {
            page: selected_uuid(after),
        },
        PageAction::DuplicateCurrentPage => Operation::PageDuplicate {
            source: selected_uuid(before),
            copy: selected_uuid(after),
        },
        PageAction::DeleteCurrentPage => Operation::PageDelete {
            page: selected_uuid(before),
            remaining: after.len(),
        },
        PageAction::MovePage { .. } => match &transition.move_plan {
            Some(plan) => Operation::PageMove {
                page: plan.page.as_uuid(),
                sort: plan.sort,
                neighbor_updates: plan.updates.len(),
            },
            None => Operation::Passthrough {
                kind: action.kind().to_string(),
            },
        },
        PageAction::Unrecognized => Operation::Passthrough {
            kind: action.kind().to_string(),
        },
    }
}

fn selected_uuid(snapshot: &Snapshot) -> Option<Uuid> {
    snapshot.selected_page().map(|id| id.as_uuid())
}
