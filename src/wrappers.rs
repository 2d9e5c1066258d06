// Wrapper Components
// Persistence sink wrappers that add tracing and timing around any sink.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::contracts::{Page, PersistenceSink};
use crate::observability::*;
use crate::validation::PersistenceError;

/// Sink wrapper that adds automatic tracing to every write
pub struct TracedSink<S: PersistenceSink> {
    inner: S,
    trace_id: Uuid,
    operation_count: Arc<Mutex<u64>>,
}

impl<S: PersistenceSink> TracedSink<S> {
    /// Wrap a sink implementation with tracing
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            trace_id: Uuid::new_v4(),
            operation_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Get the current trace ID
    pub fn trace_id(&self) -> Uuid {
        self.trace_id
    }

    /// Get the number of writes attempted
    pub async fn operation_count(&self) -> u64 {
        *self.operation_count.lock().await
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn increment_op_count(&self) {
        let mut count = self.operation_count.lock().await;
        *count += 1;
    }
}

#[async_trait]
impl<S: PersistenceSink> PersistenceSink for TracedSink<S> {
    async fn add(&self, page: &Page) -> Result<(), PersistenceError> {
        self.increment_op_count().await;

        let start = Instant::now();
        info!("[{}] Persisting page: {}", self.trace_id, page.id);

        let result = self.inner.add(page).await;

        let duration = start.elapsed();
        record_metric(MetricType::Histogram {
            name: "sink.add.duration",
            value: duration.as_micros() as f64,
            unit: "us",
        });

        let mut ctx = OperationContext::new("sink.add");
        ctx.add_attribute("page", page.id.to_string());
        ctx.add_attribute("parent", page.parent.to_string());
        log_operation(
            &ctx,
            &Operation::Persist {
                page: page.id.as_uuid(),
            },
            &result,
        );

        result
    }
}
