// In-memory Persistence Sink
// Keeps persisted pages in a Vec; used by tests and the replay CLI.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::contracts::{Page, PersistenceSink};
use crate::validation::PersistenceError;

/// Sink that records pages in memory and can be told to fail
#[derive(Clone, Default)]
pub struct MemorySink {
    pages: Arc<Mutex<Vec<Page>>>,
    fail_next: Arc<Mutex<bool>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pages stored so far, in arrival order
    pub async fn pages(&self) -> Vec<Page> {
        self.pages.lock().await.clone()
    }

    /// Make the next `add` fail with a rejection
    pub async fn fail_next(&self) {
        *self.fail_next.lock().await = true;
    }
}

#[async_trait]
impl PersistenceSink for MemorySink {
    async fn add(&self, page: &Page) -> Result<(), PersistenceError> {
        {
            let mut fail = self.fail_next.lock().await;
            if *fail {
                *fail = false;
                return Err(PersistenceError::Rejected {
                    page: page.id.to_string(),
                    reason: "simulated failure".to_string(),
                });
            }
        }
        self.pages.lock().await.push(page.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::PageBuilder;

    #[test]
    fn test_fail_next_only_fails_once() {
        let sink = MemorySink::new();
        let page = PageBuilder::new().build();

        tokio_test::block_on(async {
            sink.fail_next().await;
            assert!(matches!(
                sink.add(&page).await,
                Err(PersistenceError::Rejected { .. })
            ));
            assert!(sink.add(&page).await.is_ok());
            assert_eq!(sink.pages().await, vec![page.clone()]);
        });
    }

    #[test]
    fn test_clones_share_storage() {
        let sink = MemorySink::new();
        let observer = sink.clone();
        let page = PageBuilder::new().build();

        tokio_test::block_on(sink.add(&page)).unwrap();
        assert_eq!(tokio_test::block_on(observer.pages()).len(), 1);
    }
}
