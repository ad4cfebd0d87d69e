//! Artifact storage for downloaded documents
//! Uses the object_store crate over the local filesystem

use chrono::{DateTime, Utc};
use object_store::{ObjectStore, local::LocalFileSystem, path::Path as StoragePath};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to prepare storage folder {path}: {source}")]
    Folder {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Object store error: {0}")]
    ObjectStoreError(#[from] object_store::Error),
}

/// Storage result type
pub type Result<T> = std::result::Result<T, StorageError>;

/// Metadata of a stored artifact
#[derive(Debug, Clone)]
pub struct ArtifactMetadata {
    pub key: String,
    pub size: u64,
    pub modified_at: DateTime<Utc>,
    pub local_path: PathBuf,
}

/// Filesystem-backed artifact store rooted at one folder
#[derive(Clone)]
pub struct ArtifactStore {
    store: Arc<dyn ObjectStore>,
    root: PathBuf,
}

impl ArtifactStore {
    /// Open (creating if needed) a local folder as artifact storage
    pub fn local(folder: impl AsRef<Path>) -> Result<Self> {
        let folder = folder.as_ref();
        std::fs::create_dir_all(folder).map_err(|source| StorageError::Folder {
            path: folder.to_path_buf(),
            source,
        })?;
        let root = std::fs::canonicalize(folder).map_err(|source| StorageError::Folder {
            path: folder.to_path_buf(),
            source,
        })?;

        let store = LocalFileSystem::new_with_prefix(&root)?;

        Ok(Self {
            store: Arc::new(store),
            root,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute filesystem path an artifact key maps to
    pub fn local_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    /// Write bytes under `key`, returning the stored metadata
    pub async fn put(&self, key: &str, data: bytes::Bytes) -> Result<ArtifactMetadata> {
        let path = StoragePath::from(key);
        let size = data.len();

        self.store.put(&path, data.into()).await?;
        tracing::debug!(key, size, "Stored artifact");

        self.head(key).await
    }

    /// Size and modification time of a stored artifact
    pub async fn head(&self, key: &str) -> Result<ArtifactMetadata> {
        let path = StoragePath::from(key);

        let meta = match self.store.head(&path).await {
            Ok(meta) => meta,
            Err(object_store::Error::NotFound { .. }) => {
                return Err(StorageError::NotFound(key.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        Ok(ArtifactMetadata {
            key: key.to_string(),
            size: meta.size as u64,
            modified_at: meta.last_modified,
            local_path: self.local_path(key),
        })
    }

    /// Check if key exists
    pub async fn exists(&self, key: &str) -> Result<bool> {
        match self.head(key).await {
            Ok(_) => Ok(true),
            Err(StorageError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
