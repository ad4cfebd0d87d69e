//! Extraction worker pool
//!
//! Workers pull `queued` items from the queue store, hand each document to
//! the configured [`Extractor`](crate::extract::Extractor) and record the
//! outcome, applying the retry policy. Successful documents are optionally
//! copied into a processed archive.

mod archive;
mod pool;

pub use archive::{ArchiveError, ProcessedArchive};
pub use pool::{PoolConfig, PoolPhase, ProcessingPool};
