//! Control surface: pool and store operations that act as one unit

use std::sync::Arc;

use tracing::info;

use crate::queue::{
    EnqueueError, EnqueueMode, EnqueueReport, Enqueuer, PoolView, QueueError, QueueStatus,
    QueueStore,
};
use crate::worker::ProcessingPool;

/// Which terminal items `clear` removes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClearSelection {
    pub completed: bool,
    pub failed: bool,
}

impl ClearSelection {
    pub fn all() -> Self {
        Self {
            completed: true,
            failed: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.completed && !self.failed
    }
}

/// Result of a control operation; `changed == false` means it was a no-op
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlOutcome {
    pub changed: bool,
    pub message: String,
}

impl ControlOutcome {
    fn new(changed: bool, message: impl Into<String>) -> Self {
        Self {
            changed,
            message: message.into(),
        }
    }
}

/// Handle bundling the queue store, worker pool and enqueuer
pub struct QueueController {
    store: Arc<QueueStore>,
    pool: Arc<ProcessingPool>,
    enqueuer: Enqueuer,
    recent_limit: usize,
}

impl QueueController {
    pub fn new(
        store: Arc<QueueStore>,
        pool: Arc<ProcessingPool>,
        enqueuer: Enqueuer,
        recent_limit: usize,
    ) -> Self {
        Self {
            store,
            pool,
            enqueuer,
            recent_limit,
        }
    }

    pub fn store(&self) -> &Arc<QueueStore> {
        &self.store
    }

    pub fn pool(&self) -> &Arc<ProcessingPool> {
        &self.pool
    }

    pub async fn enqueue(&self, mode: EnqueueMode) -> Result<EnqueueReport, EnqueueError> {
        self.enqueuer.enqueue(mode).await
    }

    pub async fn start(&self) -> ControlOutcome {
        // A test-mode purge must not interleave with workers coming up
        let _enqueue = self.enqueuer.exclusive().await;
        if self.pool.start().await {
            ControlOutcome::new(
                true,
                format!("Processing started with {} workers", self.pool.concurrency()),
            )
        } else {
            ControlOutcome::new(false, "Processing is already running")
        }
    }

    pub async fn stop(&self) -> ControlOutcome {
        if self.pool.stop().await {
            ControlOutcome::new(true, "Processing stopped; in-flight documents will finish")
        } else {
            ControlOutcome::new(false, "Processing is not running")
        }
    }

    pub async fn pause(&self) -> ControlOutcome {
        if self.pool.pause().await {
            ControlOutcome::new(true, "Processing paused")
        } else {
            ControlOutcome::new(false, "Processing is not running")
        }
    }

    pub async fn resume(&self) -> ControlOutcome {
        let _enqueue = self.enqueuer.exclusive().await;
        if self.pool.resume().await {
            ControlOutcome::new(true, "Processing resumed")
        } else {
            ControlOutcome::new(false, "Processing is already running")
        }
    }

    /// Zero the counters and requeue orphaned `processing` items
    pub async fn reset(&self) -> Result<ControlOutcome, QueueError> {
        self.pool.reset_counters();
        let requeued = self.store.requeue_orphans().await?;
        if requeued > 0 {
            self.pool.notify_work();
        }
        info!(requeued, "Queue reset");

        Ok(ControlOutcome::new(
            requeued > 0,
            format!("Counters reset; {} orphaned documents requeued", requeued),
        ))
    }

    pub async fn clear(&self, selection: ClearSelection) -> Result<usize, QueueError> {
        self.store.clear(selection.completed, selection.failed).await
    }

    pub async fn retry_failed(&self) -> Result<usize, QueueError> {
        let requeued = self.store.retry_failed().await?;
        if requeued > 0 {
            self.pool.notify_work();
        }
        info!(requeued, "Failed documents requeued");
        Ok(requeued)
    }

    pub fn status(&self) -> Result<QueueStatus, QueueError> {
        let items = self.store.items()?;
        Ok(QueueStatus::from_items(
            &items,
            self.recent_limit,
            PoolView {
                is_running: self.pool.is_running(),
                is_paused: self.pool.is_paused(),
                concurrency: self.pool.concurrency(),
                counters: self.pool.counters(),
            },
        ))
    }

    /// Stop the pool and wait for workers, then flush the store
    pub async fn shutdown(&self) -> Result<(), QueueError> {
        self.pool.shutdown().await;
        self.store.persist()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogStore;
    use crate::extract::{ExtractError, ExtractionRequest, Extractor};
    use crate::queue::{ItemStatus, NewItem};
    use crate::worker::PoolConfig;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::path::PathBuf;
    use std::time::Duration;
    use tempfile::TempDir;

    struct Echo;

    #[async_trait]
    impl Extractor for Echo {
        async fn extract(&self, request: &ExtractionRequest) -> Result<Value, ExtractError> {
            Ok(Value::String(request.filename.clone()))
        }
    }

    fn controller(temp: &TempDir) -> QueueController {
        let store = Arc::new(QueueStore::open(temp.path().join("queue")).unwrap());
        let catalog = CatalogStore::open(temp.path().join("catalog")).unwrap();
        let pool = Arc::new(ProcessingPool::new(
            store.clone(),
            Arc::new(Echo),
            PoolConfig {
                concurrency: 2,
                idle_backoff: Duration::from_millis(20),
                processed_folder: None,
            },
        ));
        let enqueuer = Enqueuer::new(store.clone(), catalog, pool.clone(), 3, 10);
        QueueController::new(store, pool, enqueuer, 5)
    }

    async fn add_items(controller: &QueueController, count: usize) {
        let items = (0..count)
            .map(|n| NewItem {
                contract_notice_id: "N-1".into(),
                document_url: format!("https://sam.gov/{}.pdf", n),
                filename: format!("{}.pdf", n),
                local_file_path: Some(PathBuf::from("/docs/x.pdf")),
                max_retries: 3,
            })
            .collect();
        controller.store().enqueue(items, None).await.unwrap();
    }

    #[tokio::test]
    async fn test_control_noops_are_success() {
        let temp = TempDir::new().unwrap();
        let controller = controller(&temp);

        assert!(!controller.stop().await.changed);
        assert!(!controller.pause().await.changed);
        assert!(!controller.reset().await.unwrap().changed);
        assert_eq!(controller.retry_failed().await.unwrap(), 0);
        assert_eq!(controller.clear(ClearSelection::all()).await.unwrap(), 0);

        assert!(controller.start().await.changed);
        assert!(!controller.start().await.changed);
        controller.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_reset_requeues_orphans_and_zeroes_counters() {
        let temp = TempDir::new().unwrap();
        {
            let controller = controller(&temp);
            add_items(&controller, 3).await;
            controller.store().claim_next().await.unwrap();
            controller.store().claim_next().await.unwrap();
            controller.store().persist().unwrap();
        }

        let controller = controller(&temp);
        let before = controller.status().unwrap();
        assert_eq!(before.processing, 2);

        let outcome = controller.reset().await.unwrap();
        assert!(outcome.changed);

        let after = controller.status().unwrap();
        assert_eq!(after.processing, 0);
        assert_eq!(after.queued, 3);
        assert_eq!(after.counters.processed, 0);
        assert!(
            controller
                .store()
                .items()
                .unwrap()
                .iter()
                .all(|i| i.retry_count == 0 && i.status == ItemStatus::Queued)
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_status_reports_pool_state() {
        let temp = TempDir::new().unwrap();
        let controller = controller(&temp);
        add_items(&controller, 4).await;

        controller.start().await;
        for _ in 0..200 {
            if controller.status().unwrap().completed == 4 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let status = controller.status().unwrap();
        assert!(status.is_processing);
        assert_eq!(status.completed, 4);
        assert_eq!(status.recent_documents.len(), 4);
        assert_eq!(status.completion_rate, 1.0);
        assert_eq!(status.counters.succeeded, 4);

        controller.pause().await;
        let status = controller.status().unwrap();
        assert!(!status.is_processing);
        assert!(status.is_paused);

        controller.shutdown().await.unwrap();
    }
}
