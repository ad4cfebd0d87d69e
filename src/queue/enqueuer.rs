use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use super::item::NewItem;
use super::store::{QueueError, QueueStore};
use crate::catalog::{CatalogError, CatalogStore};
use crate::worker::ProcessingPool;

#[derive(Debug, Error)]
pub enum EnqueueError {
    #[error("Test-mode enqueue is not allowed while processing is running")]
    PoolRunning,

    #[error("Test-mode enqueue is not allowed while {0} documents are still being extracted")]
    ClaimsInFlight(usize),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// How an enqueue should treat the existing queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueMode {
    /// Every downloaded document not already represented
    Full,
    /// A bounded, cost-limited subset, optionally on a purged queue
    Test {
        limit: Option<usize>,
        clear_existing: bool,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnqueueReport {
    pub queued_count: usize,
    /// Items removed first because of `clear_existing`
    pub purged_count: usize,
}

/// Enqueuer turns download records into queue items
///
/// Flow:
/// 1. Serialize against other enqueues (and pool starts)
/// 2. For test mode, refuse while the pool runs or still holds claims,
///    then optionally purge
/// 3. Hand the catalog's download records to the store, which skips
///    documents already represented
/// 4. Wake idle workers if anything was added
pub struct Enqueuer {
    store: Arc<QueueStore>,
    catalog: CatalogStore,
    pool: Arc<ProcessingPool>,
    max_retries: u32,
    default_test_limit: usize,
    lock: Mutex<()>,
}

impl Enqueuer {
    pub fn new(
        store: Arc<QueueStore>,
        catalog: CatalogStore,
        pool: Arc<ProcessingPool>,
        max_retries: u32,
        default_test_limit: usize,
    ) -> Self {
        Self {
            store,
            catalog,
            pool,
            max_retries,
            default_test_limit,
            lock: Mutex::new(()),
        }
    }

    /// Hold off enqueues while the caller changes pool state
    pub async fn exclusive(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().await
    }

    pub async fn enqueue(&self, mode: EnqueueMode) -> Result<EnqueueReport, EnqueueError> {
        let _guard = self.lock.lock().await;

        let (limit, clear_existing) = match mode {
            EnqueueMode::Full => (None, false),
            EnqueueMode::Test {
                limit,
                clear_existing,
            } => {
                if self.pool.is_running() {
                    return Err(EnqueueError::PoolRunning);
                }
                // A stopped pool may still be draining extractions
                let in_flight = self.store.live_claims().await;
                if in_flight > 0 {
                    return Err(EnqueueError::ClaimsInFlight(in_flight));
                }
                (Some(limit.unwrap_or(self.default_test_limit)), clear_existing)
            }
        };

        let purged_count = if clear_existing {
            self.store.purge_all().await?
        } else {
            0
        };

        let mut records = self.catalog.downloads()?;
        records.sort_by(|a, b| {
            a.downloaded_at
                .cmp(&b.downloaded_at)
                .then_with(|| a.document_url.cmp(&b.document_url))
        });

        let candidates = records
            .into_iter()
            .map(|record| NewItem {
                contract_notice_id: record.contract_notice_id,
                document_url: record.document_url,
                filename: record.filename,
                local_file_path: Some(record.local_path),
                max_retries: self.max_retries,
            })
            .collect::<Vec<_>>();
        debug!(candidates = candidates.len(), ?limit, "Enqueue candidates collected");

        let created = self.store.enqueue(candidates, limit).await?;
        if !created.is_empty() {
            self.pool.notify_work();
        }

        info!(
            queued = created.len(),
            purged = purged_count,
            test_mode = matches!(mode, EnqueueMode::Test { .. }),
            "Documents enqueued"
        );

        Ok(EnqueueReport {
            queued_count: created.len(),
            purged_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::DownloadRecord;
    use crate::extract::{ExtractError, ExtractionRequest, Extractor};
    use crate::worker::PoolConfig;
    use async_trait::async_trait;
    use chrono::Utc;
    use serde_json::Value;
    use std::path::PathBuf;
    use std::time::Duration;
    use tempfile::TempDir;

    struct NeverCalled;

    #[async_trait]
    impl Extractor for NeverCalled {
        async fn extract(&self, _request: &ExtractionRequest) -> Result<Value, ExtractError> {
            Err(ExtractError::NotConfigured("test".into()))
        }
    }

    struct Fixture {
        enqueuer: Enqueuer,
        store: Arc<QueueStore>,
        pool: Arc<ProcessingPool>,
        _temp: TempDir,
    }

    fn fixture(downloads: usize) -> Fixture {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(QueueStore::open(temp.path().join("queue")).unwrap());
        let catalog = CatalogStore::open(temp.path().join("catalog")).unwrap();

        for n in 0..downloads {
            catalog
                .record_download(&DownloadRecord {
                    document_url: format!("https://sam.gov/{}.pdf", n),
                    contract_notice_id: format!("N-{}", n % 4),
                    filename: format!("N_{}.pdf", n),
                    extension: ".pdf".into(),
                    size_bytes: 10,
                    local_path: PathBuf::from(format!("/docs/N_{}.pdf", n)),
                    modified_at: Utc::now(),
                    downloaded_at: Utc::now(),
                    description: None,
                })
                .unwrap();
        }

        let pool = Arc::new(ProcessingPool::new(
            store.clone(),
            Arc::new(NeverCalled),
            PoolConfig {
                concurrency: 1,
                idle_backoff: Duration::from_millis(20),
                processed_folder: None,
            },
        ));
        let enqueuer = Enqueuer::new(store.clone(), catalog, pool.clone(), 2, 10);

        Fixture {
            enqueuer,
            store,
            pool,
            _temp: temp,
        }
    }

    #[tokio::test]
    async fn test_full_enqueue_is_idempotent() {
        let f = fixture(5);

        let first = f.enqueuer.enqueue(EnqueueMode::Full).await.unwrap();
        assert_eq!(first.queued_count, 5);

        let second = f.enqueuer.enqueue(EnqueueMode::Full).await.unwrap();
        assert_eq!(second.queued_count, 0);
        assert_eq!(f.store.items().unwrap().len(), 5);

        let item = f.store.get(1).unwrap().unwrap();
        assert_eq!(item.max_retries, 2);
        assert!(item.local_file_path.is_some());
    }

    #[tokio::test]
    async fn test_test_mode_uses_default_limit() {
        let f = fixture(25);

        let report = f
            .enqueuer
            .enqueue(EnqueueMode::Test {
                limit: None,
                clear_existing: false,
            })
            .await
            .unwrap();
        assert_eq!(report.queued_count, 10);

        let report = f
            .enqueuer
            .enqueue(EnqueueMode::Test {
                limit: Some(3),
                clear_existing: false,
            })
            .await
            .unwrap();
        assert_eq!(report.queued_count, 3);
        assert_eq!(f.store.items().unwrap().len(), 13);
    }

    #[tokio::test]
    async fn test_test_mode_clear_existing_purges_first() {
        let f = fixture(6);
        f.enqueuer.enqueue(EnqueueMode::Full).await.unwrap();

        let report = f
            .enqueuer
            .enqueue(EnqueueMode::Test {
                limit: Some(2),
                clear_existing: true,
            })
            .await
            .unwrap();

        assert_eq!(report.purged_count, 6);
        assert_eq!(report.queued_count, 2);
        assert_eq!(f.store.items().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_test_mode_rejected_while_running() {
        let f = fixture(3);
        f.pool.start().await;

        let result = f
            .enqueuer
            .enqueue(EnqueueMode::Test {
                limit: Some(1),
                clear_existing: true,
            })
            .await;
        assert!(matches!(result, Err(EnqueueError::PoolRunning)));

        // Full mode is still allowed
        assert!(f.enqueuer.enqueue(EnqueueMode::Full).await.is_ok());
        f.pool.shutdown().await;
    }

    struct SlowExtractor;

    #[async_trait]
    impl Extractor for SlowExtractor {
        async fn extract(&self, request: &ExtractionRequest) -> Result<Value, ExtractError> {
            tokio::time::sleep(Duration::from_millis(300)).await;
            Ok(Value::String(request.filename.clone()))
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_test_mode_rejected_while_stopped_pool_drains() {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(QueueStore::open(temp.path().join("queue")).unwrap());
        let catalog = CatalogStore::open(temp.path().join("catalog")).unwrap();
        let pool = Arc::new(ProcessingPool::new(
            store.clone(),
            Arc::new(SlowExtractor),
            PoolConfig {
                concurrency: 1,
                idle_backoff: Duration::from_millis(20),
                processed_folder: None,
            },
        ));
        let enqueuer = Enqueuer::new(store.clone(), catalog, pool.clone(), 2, 10);

        store
            .enqueue(
                vec![NewItem {
                    contract_notice_id: "N-1".into(),
                    document_url: "https://sam.gov/slow.pdf".into(),
                    filename: "slow.pdf".into(),
                    local_file_path: Some(PathBuf::from("/docs/slow.pdf")),
                    max_retries: 2,
                }],
                None,
            )
            .await
            .unwrap();

        pool.start().await;
        for _ in 0..100 {
            if store.live_claims().await > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        pool.stop().await;
        assert!(!pool.is_running());

        let result = enqueuer
            .enqueue(EnqueueMode::Test {
                limit: None,
                clear_existing: true,
            })
            .await;
        assert!(matches!(result, Err(EnqueueError::ClaimsInFlight(1))));

        pool.shutdown().await;
        let item = store.get(1).unwrap().unwrap();
        assert_eq!(item.status, crate::queue::ItemStatus::Completed);
        assert_eq!(pool.counters().succeeded, 1);

        // Drained: the purge goes through now
        let report = enqueuer
            .enqueue(EnqueueMode::Test {
                limit: None,
                clear_existing: true,
            })
            .await
            .unwrap();
        assert_eq!(report.purged_count, 1);
    }
}
