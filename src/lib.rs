// Pagetree - Ordered page-tree state engine
// Root library module

pub mod builders;
pub mod config;
pub mod contracts;
pub mod file_sink;
pub mod memory_sink;
pub mod observability;
pub mod pure;
pub mod reducer;
pub mod repository;
pub mod types;
pub mod validation;
pub mod workspace;
pub mod wrappers;

// Re-export key types
pub use observability::{
    get_metrics, init_logging, init_logging_with_level, log_operation, record_metric,
    with_trace_id, MetricType, Operation, OperationContext,
};

pub use contracts::{
    ContentTemplate, IdGenerator, Page, PageDocument, PersistenceSink, SequentialIdGenerator,
    Template, UuidIdGenerator,
};

// Re-export validated types
pub use types::{PageId, PageKind, PageName, ParentId, ParentSelector, SortKey};

pub use validation::{PageTreeError, PersistenceError};

// Re-export builders
pub use builders::{EngineConfigBuilder, PageBuilder};

pub use config::EngineConfig;

// Re-export pure functions
pub use pure::{allocate_sort_key, plan_move, MovePlan, MoveRequest, SortUpdate, DEFAULT_BIG_STEP};

pub use reducer::{reduce, PageAction, ReducerEnv, Transition};
pub use repository::{Draft, PageRepository, Snapshot};
pub use workspace::{Committed, Workspace};

// Re-export sinks
pub use file_sink::{create_file_sink, JsonLinesSink};
pub use memory_sink::MemorySink;
pub use wrappers::TracedSink;
