//! Extraction worker pool
//!
//! `concurrency` tokio tasks each run a claim → extract → record loop against
//! the queue store. A pool-wide semaphore caps in-flight extractions, and a
//! generation counter retires the workers of a previous `start` even if the
//! pool is restarted before they notice the stop.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::{Mutex, Notify, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::archive::ProcessedArchive;
use crate::extract::{ExtractionRequest, Extractor};
use crate::observability::{CountersSnapshot, PoolCounters};
use crate::queue::{FailOutcome, QueueItem, QueueStore};

/// Pool sizing and pacing
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub concurrency: usize,
    /// Upper bound on how long an idle worker sleeps before polling again
    pub idle_backoff: Duration,
    /// Archive folder for processed documents, if any
    pub processed_folder: Option<PathBuf>,
}

impl From<&crate::config::Config> for PoolConfig {
    fn from(config: &crate::config::Config) -> Self {
        Self {
            concurrency: config.worker.concurrency,
            idle_backoff: config.queue.idle_backoff.as_duration(),
            processed_folder: config.worker.processed_folder.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolPhase {
    Stopped,
    Running,
    Paused,
}

/// State shared with worker tasks
struct PoolInner {
    store: Arc<QueueStore>,
    extractor: Arc<dyn Extractor>,
    archive: Option<ProcessedArchive>,
    counters: PoolCounters,
    idle_backoff: Duration,
    generation: AtomicU64,
    running: AtomicBool,
    paused: AtomicBool,
    slots: Semaphore,
    notify: Notify,
}

impl PoolInner {
    fn is_current(&self, generation: u64) -> bool {
        self.running.load(Ordering::SeqCst) && self.generation.load(Ordering::SeqCst) == generation
    }
}

/// Bounded pool of extraction workers over one queue store
pub struct ProcessingPool {
    inner: Arc<PoolInner>,
    concurrency: usize,
    workers: Mutex<JoinSet<()>>,
}

impl ProcessingPool {
    pub fn new(store: Arc<QueueStore>, extractor: Arc<dyn Extractor>, config: PoolConfig) -> Self {
        let concurrency = config.concurrency.max(1);

        Self {
            inner: Arc::new(PoolInner {
                store,
                extractor,
                archive: config.processed_folder.map(ProcessedArchive::new),
                counters: PoolCounters::new(),
                idle_backoff: config.idle_backoff,
                generation: AtomicU64::new(0),
                running: AtomicBool::new(false),
                paused: AtomicBool::new(false),
                slots: Semaphore::new(concurrency),
                notify: Notify::new(),
            }),
            concurrency,
            workers: Mutex::new(JoinSet::new()),
        }
    }

    /// Begin dispatching. Returns `false` if the pool was already running.
    pub async fn start(&self) -> bool {
        let mut workers = self.workers.lock().await;

        if self.inner.running.load(Ordering::SeqCst) {
            return false;
        }

        // Reap workers of earlier generations that have already exited
        while workers.try_join_next().is_some() {}

        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.paused.store(false, Ordering::SeqCst);
        self.inner.running.store(true, Ordering::SeqCst);

        for worker_id in 0..self.concurrency {
            let inner = self.inner.clone();
            workers.spawn(worker_loop(inner, worker_id, generation));
        }

        info!(generation, concurrency = self.concurrency, "Worker pool started");
        true
    }

    /// Stop issuing claims; in-flight extractions finish on their own.
    /// Returns `false` if the pool was already stopped.
    pub async fn stop(&self) -> bool {
        self.halt(false).await
    }

    /// Like `stop`, but status reports the pool as paused
    pub async fn pause(&self) -> bool {
        self.halt(true).await
    }

    /// Restart a paused (or stopped) pool
    pub async fn resume(&self) -> bool {
        self.start().await
    }

    async fn halt(&self, paused: bool) -> bool {
        let _workers = self.workers.lock().await;

        let was_running = self.inner.running.swap(false, Ordering::SeqCst);
        if was_running {
            self.inner.generation.fetch_add(1, Ordering::SeqCst);
            self.inner.paused.store(paused, Ordering::SeqCst);
            self.inner.notify.notify_waiters();
            info!(paused, "Worker pool halted");
        } else if !paused {
            // stop on a paused pool leaves it plainly stopped
            self.inner.paused.store(false, Ordering::SeqCst);
        }
        was_running
    }

    /// Stop and wait for every worker task to exit
    pub async fn shutdown(&self) {
        self.halt(false).await;

        let mut workers = self.workers.lock().await;
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "Worker task ended abnormally");
            }
        }
        info!("Worker pool shut down");
    }

    /// Wake idle workers, e.g. after an enqueue
    pub fn notify_work(&self) {
        self.inner.notify.notify_waiters();
    }

    pub fn reset_counters(&self) {
        self.inner.counters.reset();
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    pub fn is_paused(&self) -> bool {
        self.inner.paused.load(Ordering::SeqCst)
    }

    pub fn phase(&self) -> PoolPhase {
        if self.is_running() {
            PoolPhase::Running
        } else if self.is_paused() {
            PoolPhase::Paused
        } else {
            PoolPhase::Stopped
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn counters(&self) -> CountersSnapshot {
        self.inner.counters.snapshot()
    }

    pub fn store(&self) -> &Arc<QueueStore> {
        &self.inner.store
    }
}

async fn worker_loop(inner: Arc<PoolInner>, worker_id: usize, generation: u64) {
    debug!(worker_id, generation, "Worker started");

    while inner.is_current(generation) {
        let permit = match tokio::time::timeout(inner.idle_backoff, inner.slots.acquire()).await {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => break,
            // Slots busy with older generations; re-check whether we're still wanted
            Err(_) => continue,
        };

        if !inner.is_current(generation) {
            break;
        }

        let item = match inner.store.claim_next().await {
            Ok(Some(item)) => item,
            Ok(None) => {
                drop(permit);
                wait_for_work(&inner).await;
                continue;
            }
            Err(e) => {
                error!(worker_id, error = %e, "Failed to claim item");
                drop(permit);
                tokio::time::sleep(inner.idle_backoff).await;
                continue;
            }
        };

        if !inner.is_current(generation) {
            hand_back_stale(&inner, worker_id, item.id).await;
            break;
        }

        process_item(&inner, worker_id, item).await;
        drop(permit);
    }

    debug!(worker_id, generation, "Worker exiting");
}

/// The pool was stopped while we were claiming: return the item to `queued`
/// without charging a retry
async fn hand_back_stale(inner: &PoolInner, worker_id: usize, item_id: u64) {
    match inner.store.release(item_id).await {
        Ok(_) => debug!(worker_id, item_id, "Released stale claim"),
        Err(e) => error!(worker_id, item_id, error = %e, "Failed to release item"),
    }
}

async fn wait_for_work(inner: &PoolInner) {
    let notified = inner.notify.notified();
    let _ = tokio::time::timeout(inner.idle_backoff, notified).await;
}

async fn process_item(inner: &PoolInner, worker_id: usize, item: QueueItem) {
    let item_id = item.id;

    let Some(path) = item.local_file_path.clone() else {
        record_failure(inner, worker_id, item_id, "Document has no local file".to_string(), false).await;
        return;
    };

    let request = ExtractionRequest {
        path,
        filename: item.filename.clone(),
        contract_notice_id: item.contract_notice_id.clone(),
    };

    info!(worker_id, item_id, filename = %item.filename, attempt = item.retry_count + 1, "Extracting document");

    let started = Instant::now();
    match inner.extractor.extract(&request).await {
        Ok(data) => {
            let elapsed = started.elapsed();
            let saved = archive_document(inner, worker_id, &item, &request.path, &data).await;
            record_success(inner, worker_id, item_id, data, elapsed, saved).await;
        }
        Err(e) => {
            let retryable = e.is_retryable();
            record_failure(inner, worker_id, item_id, e.to_string(), retryable).await;
        }
    }
}

/// Archive a processed document. Failures are logged and never fail the item.
async fn archive_document(
    inner: &PoolInner,
    worker_id: usize,
    item: &QueueItem,
    source: &Path,
    data: &serde_json::Value,
) -> Option<PathBuf> {
    let archive = inner.archive.as_ref()?;
    match archive.archive(source, &item.filename, data).await {
        Ok(saved) => Some(saved),
        Err(e) => {
            warn!(worker_id, item_id = item.id, error = %e, "Failed to archive processed document");
            None
        }
    }
}

async fn record_success(
    inner: &PoolInner,
    worker_id: usize,
    item_id: u64,
    data: serde_json::Value,
    elapsed: Duration,
    saved: Option<PathBuf>,
) {
    match inner.store.complete(item_id, data, elapsed, saved).await {
        Ok(_) => {
            inner.counters.item_succeeded();
            info!(worker_id, item_id, elapsed_ms = elapsed.as_millis() as u64, "Document processed");
        }
        Err(e) => error!(worker_id, item_id, error = %e, "Failed to record completion"),
    }
}

async fn record_failure(inner: &PoolInner, worker_id: usize, item_id: u64, message: String, retryable: bool) {
    match inner.store.fail(item_id, message.clone(), retryable).await {
        Ok(FailOutcome::Requeued(item)) => {
            inner.counters.item_failed();
            warn!(worker_id, item_id, retry_count = item.retry_count, error = %message, "Extraction failed, requeued");
            inner.notify.notify_waiters();
        }
        Ok(FailOutcome::Failed(item)) => {
            inner.counters.item_failed();
            warn!(worker_id, item_id, retry_count = item.retry_count, retryable, error = %message, "Extraction failed permanently");
        }
        Err(e) => error!(worker_id, item_id, error = %e, "Failed to record failure"),
    }
}
