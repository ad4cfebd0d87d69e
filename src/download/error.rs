use thiserror::Error;

use super::http::FetchError;
use crate::catalog::CatalogError;
use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Contract not found: {0}")]
    UnknownContract(String),

    #[error("Download cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, DownloadError>;
