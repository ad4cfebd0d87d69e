use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use fjall::{Batch, Config, Keyspace, PartitionCreateOptions, PartitionHandle};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::item::{ItemStatus, NewItem, QueueItem};

const NEXT_SEQ_KEY: &[u8] = b"next_seq";
const FIRST_ID: u64 = 1;

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Fjall error: {0}")]
    Fjall(#[from] fjall::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Item not found: id={0}")]
    ItemNotFound(u64),

    #[error("Item {id} is {actual}, expected {expected}")]
    InvalidTransition {
        id: u64,
        actual: ItemStatus,
        expected: ItemStatus,
    },

    #[error("Item {0} is not claimed by this process")]
    NotClaimed(u64),

    #[error("Corrupt key in partition {0}")]
    InvalidKey(&'static str),
}

pub type Result<T> = std::result::Result<T, QueueError>;

/// Result of recording a failed extraction attempt
#[derive(Debug, Clone, PartialEq)]
pub enum FailOutcome {
    /// Back in `queued` with the incremented retry count
    Requeued(QueueItem),
    /// Terminal `failed`
    Failed(QueueItem),
}

impl FailOutcome {
    pub fn item(&self) -> &QueueItem {
        match self {
            FailOutcome::Requeued(item) | FailOutcome::Failed(item) => item,
        }
    }
}

/// Mutable state guarded by the store's mutation lock
struct MutationState {
    next_seq: u64,
    /// Items currently held by a worker of this process
    claimed: HashSet<u64>,
}

/// Give up this process's claim on `id` whether or not the commit landed.
/// A failed commit leaves the item `processing` but unclaimed, so `reset`
/// can still recover it.
fn settle_claim(
    state: &mut MutationState,
    id: u64,
    committed: std::result::Result<(), fjall::Error>,
) -> Result<()> {
    state.claimed.remove(&id);
    committed.map_err(QueueError::from)
}

/// QueueStore is the durable record of every queue item's lifecycle
///
/// Architecture:
/// - `items` partition: u64 (big-endian) → QueueItem (JSON)
/// - `pending` partition: u64 (big-endian) → () index of `queued` items, FIFO by id
/// - `metadata` partition: "next_seq" → u64
///
/// Every mutation runs under one async mutex and commits through a fjall
/// write batch, so the pending index never diverges from item status.
/// Reads go straight to the partitions.
pub struct QueueStore {
    keyspace: Keyspace,
    items: PartitionHandle,
    pending: PartitionHandle,
    metadata: PartitionHandle,
    state: Mutex<MutationState>,
}

impl QueueStore {
    /// Open or create a QueueStore at the specified path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        info!("Opening queue store at: {}", path.as_ref().display());

        let keyspace = Config::new(path).open()?;

        let items = keyspace.open_partition("items", PartitionCreateOptions::default())?;
        let pending = keyspace.open_partition("pending", PartitionCreateOptions::default())?;
        let metadata = keyspace.open_partition("metadata", PartitionCreateOptions::default())?;

        let next_seq = match metadata.get(NEXT_SEQ_KEY)? {
            Some(bytes) => decode_id(&bytes).ok_or(QueueError::InvalidKey("metadata"))?,
            None => FIRST_ID,
        };

        info!(next_seq, "Queue store opened");

        Ok(Self {
            keyspace,
            items,
            pending,
            metadata,
            state: Mutex::new(MutationState {
                next_seq,
                claimed: HashSet::new(),
            }),
        })
    }

    /// Create queue items for documents not already represented.
    ///
    /// A document (notice id + URL) is represented by any item that is not
    /// `failed`. At most `limit` items are created when a limit is given.
    pub async fn enqueue(&self, new_items: Vec<NewItem>, limit: Option<usize>) -> Result<Vec<QueueItem>> {
        let mut state = self.state.lock().await;

        let mut represented: HashSet<(String, String)> = self
            .items()?
            .into_iter()
            .filter(|item| item.blocks_reenqueue())
            .map(|item| {
                let (notice_id, url) = item.document_key();
                (notice_id.to_string(), url.to_string())
            })
            .collect();

        let limit = limit.unwrap_or(usize::MAX);
        let now = Utc::now();
        let mut batch = self.keyspace.batch();
        let mut created = Vec::new();
        let mut next_seq = state.next_seq;

        for new_item in new_items {
            if created.len() >= limit {
                break;
            }
            let key = (new_item.contract_notice_id.clone(), new_item.document_url.clone());
            if !represented.insert(key) {
                continue;
            }

            let item = new_item.into_item(next_seq, now);
            next_seq += 1;
            self.stage_item(&mut batch, &item)?;
            created.push(item);
        }

        if created.is_empty() {
            return Ok(created);
        }

        batch.insert(&self.metadata, NEXT_SEQ_KEY.to_vec(), next_seq.to_be_bytes().to_vec());
        batch.commit()?;
        state.next_seq = next_seq;

        debug!(count = created.len(), next_seq, "Items enqueued");
        Ok(created)
    }

    /// Retrieve an item by id
    pub fn get(&self, id: u64) -> Result<Option<QueueItem>> {
        match self.items.get(id.to_be_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// All items ordered by id
    pub fn items(&self) -> Result<Vec<QueueItem>> {
        let mut results = Vec::new();
        for entry in self.items.iter() {
            let (_, value) = entry?;
            results.push(serde_json::from_slice(&value)?);
        }
        Ok(results)
    }

    /// Atomically claim the oldest `queued` item for this process
    pub async fn claim_next(&self) -> Result<Option<QueueItem>> {
        let mut state = self.state.lock().await;

        loop {
            let Some(entry) = self.pending.iter().next() else {
                return Ok(None);
            };
            let (key, _) = entry?;
            let id = decode_id(&key).ok_or(QueueError::InvalidKey("pending"))?;

            let mut item = match self.get(id)? {
                Some(item) if item.status == ItemStatus::Queued => item,
                _ => {
                    // Stale index entry; drop it and look further
                    self.pending.remove(key)?;
                    continue;
                }
            };

            let now = Utc::now();
            item.status = ItemStatus::Processing;
            item.started_at.get_or_insert(now);
            item.updated_at = now;

            let mut batch = self.keyspace.batch();
            self.stage_item(&mut batch, &item)?;
            batch.commit()?;

            state.claimed.insert(id);
            debug!(item_id = id, "Item claimed");
            return Ok(Some(item));
        }
    }

    /// Record a successful extraction for a claimed item, with the path of
    /// its archived copy when one was written
    pub async fn complete(
        &self,
        id: u64,
        data: Value,
        elapsed: Duration,
        saved_file_path: Option<PathBuf>,
    ) -> Result<QueueItem> {
        let mut state = self.state.lock().await;
        let mut item = self.claimed_item(&state, id)?;

        let now = Utc::now();
        item.status = ItemStatus::Completed;
        item.processed_data = Some(data);
        item.error_message = None;
        item.processing_time_ms = Some(elapsed.as_millis() as u64);
        item.saved_file_path = saved_file_path;
        item.completed_at = Some(now);
        item.failed_at = None;
        item.updated_at = now;

        let mut batch = self.keyspace.batch();
        self.stage_item(&mut batch, &item)?;
        settle_claim(&mut state, id, batch.commit())?;
        Ok(item)
    }

    /// Record a failed extraction for a claimed item.
    ///
    /// Retryable failures requeue the item while `retry_count < max_retries`;
    /// everything else fails it terminally.
    pub async fn fail(&self, id: u64, message: String, retryable: bool) -> Result<FailOutcome> {
        let mut state = self.state.lock().await;
        let mut item = self.claimed_item(&state, id)?;

        let now = Utc::now();
        item.error_message = Some(message);
        item.updated_at = now;

        let requeue = retryable && item.retry_count < item.max_retries;
        if requeue {
            item.retry_count += 1;
            item.status = ItemStatus::Queued;
        } else {
            item.status = ItemStatus::Failed;
            item.failed_at = Some(now);
        }

        let mut batch = self.keyspace.batch();
        self.stage_item(&mut batch, &item)?;
        settle_claim(&mut state, id, batch.commit())?;

        Ok(if requeue {
            FailOutcome::Requeued(item)
        } else {
            FailOutcome::Failed(item)
        })
    }

    /// Return a claimed item to `queued` without counting an attempt
    pub async fn release(&self, id: u64) -> Result<QueueItem> {
        let mut state = self.state.lock().await;
        let mut item = self.claimed_item(&state, id)?;

        item.status = ItemStatus::Queued;
        item.updated_at = Utc::now();

        let mut batch = self.keyspace.batch();
        self.stage_item(&mut batch, &item)?;
        settle_claim(&mut state, id, batch.commit())?;
        debug!(item_id = id, "Item released");
        Ok(item)
    }

    /// Requeue every `processing` item that no worker of this process holds.
    /// `retry_count` is left unchanged.
    pub async fn requeue_orphans(&self) -> Result<usize> {
        let state = self.state.lock().await;

        let orphans: Vec<QueueItem> = self
            .items()?
            .into_iter()
            .filter(|item| item.status == ItemStatus::Processing && !state.claimed.contains(&item.id))
            .collect();

        self.transition_all(orphans, |item, now| {
            item.status = ItemStatus::Queued;
            item.updated_at = now;
        })
    }

    /// Move failed items that still have retries left back to `queued`
    pub async fn retry_failed(&self) -> Result<usize> {
        let _state = self.state.lock().await;

        let retryable: Vec<QueueItem> = self
            .items()?
            .into_iter()
            .filter(|item| item.status == ItemStatus::Failed && item.retry_count < item.max_retries)
            .collect();

        self.transition_all(retryable, |item, now| {
            item.status = ItemStatus::Queued;
            item.failed_at = None;
            item.updated_at = now;
        })
    }

    /// Remove terminal items in the selected states; `queued` and
    /// `processing` items are never removed
    pub async fn clear(&self, completed: bool, failed: bool) -> Result<usize> {
        let _state = self.state.lock().await;

        let mut batch = self.keyspace.batch();
        let mut removed = 0;

        for item in self.items()? {
            let selected = match item.status {
                ItemStatus::Completed => completed,
                ItemStatus::Failed => failed,
                ItemStatus::Queued | ItemStatus::Processing => false,
            };
            if selected {
                batch.remove(&self.items, item.id.to_be_bytes().to_vec());
                removed += 1;
            }
        }

        if removed > 0 {
            batch.commit()?;
            info!(removed, completed, failed, "Cleared terminal items");
        }
        Ok(removed)
    }

    /// Remove every item regardless of state
    pub async fn purge_all(&self) -> Result<usize> {
        let mut state = self.state.lock().await;

        let mut batch = self.keyspace.batch();
        let mut removed = 0;

        for entry in self.items.iter() {
            let (key, _) = entry?;
            batch.remove(&self.items, key.to_vec());
            removed += 1;
        }
        for entry in self.pending.iter() {
            let (key, _) = entry?;
            batch.remove(&self.pending, key.to_vec());
        }

        batch.commit()?;
        state.claimed.clear();

        info!(removed, "Purged queue");
        Ok(removed)
    }

    /// Number of items this process currently holds
    pub async fn live_claims(&self) -> usize {
        self.state.lock().await.claimed.len()
    }

    /// Flush all writes to disk
    pub fn persist(&self) -> Result<()> {
        self.keyspace.persist(fjall::PersistMode::SyncAll)?;
        Ok(())
    }

    /// Health check - verify database is accessible
    pub fn health_check(&self) -> Result<()> {
        let _ = self.metadata.get(NEXT_SEQ_KEY)?;
        Ok(())
    }

    fn claimed_item(&self, state: &MutationState, id: u64) -> Result<QueueItem> {
        let item = self.get(id)?.ok_or(QueueError::ItemNotFound(id))?;
        if item.status != ItemStatus::Processing {
            return Err(QueueError::InvalidTransition {
                id,
                actual: item.status,
                expected: ItemStatus::Processing,
            });
        }
        if !state.claimed.contains(&id) {
            return Err(QueueError::NotClaimed(id));
        }
        Ok(item)
    }

    fn transition_all<F>(&self, items: Vec<QueueItem>, mut apply: F) -> Result<usize>
    where
        F: FnMut(&mut QueueItem, chrono::DateTime<Utc>),
    {
        if items.is_empty() {
            return Ok(0);
        }

        let now = Utc::now();
        let mut batch = self.keyspace.batch();
        let count = items.len();

        for mut item in items {
            apply(&mut item, now);
            self.stage_item(&mut batch, &item)?;
        }

        batch.commit()?;
        Ok(count)
    }

    /// Write the item record and keep the pending index in step with it
    fn stage_item(&self, batch: &mut Batch, item: &QueueItem) -> Result<()> {
        let key = item.id.to_be_bytes().to_vec();
        batch.insert(&self.items, key.clone(), serde_json::to_vec(item)?);
        if item.status == ItemStatus::Queued {
            batch.insert(&self.pending, key, Vec::new());
        } else {
            batch.remove(&self.pending, key);
        }
        Ok(())
    }
}

fn decode_id(bytes: &[u8]) -> Option<u64> {
    let array: [u8; 8] = bytes.try_into().ok()?;
    Some(u64::from_be_bytes(array))
}
