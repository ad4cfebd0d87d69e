//! Offline commands that work directly on the data directory.
//! Run them only while the server is stopped; Fjall holds a lock on the
//! keyspace.

use tracing::info;

use docqueue::config::Config;
use docqueue::queue::{PoolView, QueueStatus, QueueStore};

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub fn status(config: &Config) -> Result<(), AnyError> {
    let store = QueueStore::open(config.server.queue_path())?;
    let items = store.items()?;
    let status = QueueStatus::from_items(&items, config.queue.recent_limit, PoolView::default());

    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

pub async fn reset(config: &Config) -> Result<(), AnyError> {
    let store = QueueStore::open(config.server.queue_path())?;
    // No live claims exist in this process, so every `processing` item is orphaned
    let requeued = store.requeue_orphans().await?;
    store.persist()?;

    info!(requeued, "Orphaned items requeued");
    println!("Requeued {} orphaned documents", requeued);
    Ok(())
}

pub fn show_config(config: &Config) -> Result<(), AnyError> {
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}
