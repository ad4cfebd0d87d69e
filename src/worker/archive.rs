//! Copies of successfully extracted documents
//!
//! Each archived document lands next to a `{ts}_{stem}_metadata.json` file
//! holding the extraction response, so the folder can be inspected without
//! the queue store.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::storage::{ArtifactStore, StorageError};

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Failed to encode archive metadata: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Serialize)]
struct ArchiveMetadata<'a> {
    original_filename: &'a str,
    processed_at: DateTime<Utc>,
    extraction_response: &'a Value,
    original_path: &'a Path,
}

/// Folder receiving processed documents
#[derive(Debug, Clone)]
pub struct ProcessedArchive {
    folder: PathBuf,
}

impl ProcessedArchive {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
        }
    }

    /// Copy `source` into the archive with its extraction response.
    /// Returns the path of the archived copy.
    pub async fn archive(
        &self,
        source: &Path,
        filename: &str,
        response: &Value,
    ) -> Result<PathBuf, ArchiveError> {
        let contents = tokio::fs::read(source)
            .await
            .map_err(|source_err| ArchiveError::Read {
                path: source.to_path_buf(),
                source: source_err,
            })?;

        let store = ArtifactStore::local(&self.folder)?;
        let processed_at = Utc::now();
        let stamp = processed_at.format("%Y%m%d_%H%M%S").to_string();

        // Keys are flat; drop any directory part of the name
        let name = Path::new(filename)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(filename);
        let stem = Path::new(name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(name);

        let prefix = unused_prefix(&store, &stamp, name).await?;
        let copy = store
            .put(&format!("{prefix}_{name}"), Bytes::from(contents))
            .await?;

        let metadata = ArchiveMetadata {
            original_filename: name,
            processed_at,
            extraction_response: response,
            original_path: source,
        };
        store
            .put(
                &format!("{prefix}_{stem}_metadata.json"),
                Bytes::from(serde_json::to_vec_pretty(&metadata)?),
            )
            .await?;

        debug!(key = %copy.key, size = copy.size, "Archived processed document");
        Ok(copy.local_path)
    }
}

/// `stamp`, or `stamp_N` when a document of the same name was archived in
/// the same second
async fn unused_prefix(store: &ArtifactStore, stamp: &str, name: &str) -> Result<String, ArchiveError> {
    let mut prefix = stamp.to_string();
    let mut n = 1;
    while store.exists(&format!("{prefix}_{name}")).await? {
        prefix = format!("{stamp}_{n}");
        n += 1;
    }
    Ok(prefix)
}
