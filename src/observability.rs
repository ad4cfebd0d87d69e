//! Tracing setup and processing counters

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::EnvFilter;

/// Install the fmt subscriber; `RUST_LOG` overrides the `info` default
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // A second init (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Extraction counters for one worker pool, monotonic until `reset`
#[derive(Debug, Default)]
pub struct PoolCounters {
    processed: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
}

impl PoolCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn item_succeeded(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
        self.succeeded.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "succeeded", "Counter incremented");
    }

    /// Every failed attempt counts, including ones that get requeued
    pub fn item_failed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
        self.failed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "failed", "Counter incremented");
    }

    pub fn reset(&self) {
        self.processed.store(0, Ordering::Relaxed);
        self.succeeded.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CountersSnapshot {
        CountersSnapshot {
            processed: self.processed.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CountersSnapshot {
    pub processed: u64,
    pub succeeded: u64,
    pub failed: u64,
}
