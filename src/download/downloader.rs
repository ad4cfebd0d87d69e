//! Batch downloader: catalog contracts -> files in artifact storage

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::error::{DownloadError, Result};
use super::http::HttpClient;
use super::naming::{detect_extension, stored_filename};
use crate::catalog::{CatalogStore, DownloadRecord};
use crate::discovery::{DocumentCandidate, discover};
use crate::storage::ArtifactStore;

/// Options for one download batch
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    pub limit: usize,
    pub concurrency: usize,
    pub target_folder: PathBuf,
    pub contract_id: Option<String>,
}

/// Outcome of one download batch
#[derive(Debug, Clone, Serialize)]
pub struct DownloadSummary {
    pub batch_id: Uuid,
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Candidates already downloaded and still present in storage
    pub skipped: usize,
    pub target_folder: PathBuf,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<FailedDownload>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedDownload {
    pub url: String,
    pub error: String,
}

/// Fetches discovered documents under bounded concurrency.
///
/// Batches are serialized: a second `download_all` waits for the first, so a
/// URL is never fetched twice by overlapping batches.
pub struct Downloader {
    catalog: CatalogStore,
    client: Arc<HttpClient>,
    batch_lock: Mutex<()>,
}

impl Downloader {
    pub fn new(catalog: CatalogStore, client: HttpClient) -> Self {
        Self {
            catalog,
            client: Arc::new(client),
            batch_lock: Mutex::new(()),
        }
    }

    /// Download up to `limit` not-yet-downloaded candidates.
    ///
    /// Per-document failures are counted and logged; only catalog or storage
    /// setup problems fail the whole batch.
    pub async fn download_all(&self, options: DownloadOptions) -> Result<DownloadSummary> {
        let _batch = self.batch_lock.lock().await;
        let batch_id = Uuid::now_v7();

        let storage = ArtifactStore::local(&options.target_folder)?;
        let (pending, skipped) = self.pending_candidates(options.contract_id.as_deref()).await?;

        let selected: Vec<DocumentCandidate> = pending.into_iter().take(options.limit).collect();
        let attempted = selected.len();

        info!(
            %batch_id,
            attempted,
            skipped,
            concurrency = options.concurrency,
            folder = %storage.root().display(),
            "Starting download batch"
        );

        let semaphore = Arc::new(Semaphore::new(options.concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for candidate in selected {
            let semaphore = semaphore.clone();
            let client = self.client.clone();
            let catalog = self.catalog.clone();
            let storage = storage.clone();

            tasks.spawn(async move {
                let url = candidate.url.clone();
                let outcome = match semaphore.acquire_owned().await {
                    Ok(_permit) => download_one(&client, &catalog, &storage, candidate).await,
                    Err(_) => Err(DownloadError::Cancelled),
                };
                (url, outcome)
            });
        }

        let mut succeeded = 0;
        let mut failures = Vec::new();

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(record))) => {
                    succeeded += 1;
                    debug!(%batch_id, filename = %record.filename, "Document stored");
                }
                Ok((url, Err(e))) => {
                    warn!(%batch_id, url = %url, error = %e, "Document download failed");
                    failures.push(FailedDownload {
                        url,
                        error: e.to_string(),
                    });
                }
                Err(e) => {
                    warn!(%batch_id, error = %e, "Download task aborted");
                    failures.push(FailedDownload {
                        url: String::new(),
                        error: e.to_string(),
                    });
                }
            }
        }

        if let Err(e) = self.catalog.persist() {
            warn!(%batch_id, error = %e, "Failed to persist catalog after batch");
        }

        let failed = failures.len();
        info!(%batch_id, attempted, succeeded, failed, skipped, "Download batch finished");

        Ok(DownloadSummary {
            batch_id,
            attempted,
            succeeded,
            failed,
            skipped,
            target_folder: storage.root().to_path_buf(),
            failures,
        })
    }

    /// Candidates in notice-id order that still need fetching, plus the
    /// number skipped as already downloaded
    async fn pending_candidates(
        &self,
        contract_id: Option<&str>,
    ) -> Result<(Vec<DocumentCandidate>, usize)> {
        let contracts = match contract_id {
            Some(id) => {
                let contract = self
                    .catalog
                    .get_contract(id)?
                    .ok_or_else(|| DownloadError::UnknownContract(id.to_string()))?;
                vec![contract]
            }
            None => self.catalog.contracts()?,
        };

        let mut seen = HashSet::new();
        let mut pending = Vec::new();
        let mut skipped = 0;

        for contract in &contracts {
            for candidate in discover(contract) {
                if !seen.insert(candidate.url.clone()) {
                    continue;
                }
                if self.is_downloaded(&candidate.url).await? {
                    skipped += 1;
                    continue;
                }
                pending.push(candidate);
            }
        }

        Ok((pending, skipped))
    }

    /// A URL counts as downloaded only while its artifact still exists
    pub async fn is_downloaded(&self, url: &str) -> Result<bool> {
        match self.catalog.get_download(url)? {
            Some(record) => Ok(tokio::fs::try_exists(&record.local_path)
                .await
                .unwrap_or(false)),
            None => Ok(false),
        }
    }
}

async fn download_one(
    client: &HttpClient,
    catalog: &CatalogStore,
    storage: &ArtifactStore,
    candidate: DocumentCandidate,
) -> Result<DownloadRecord> {
    let fetched = client.fetch(&candidate.url).await?;

    let extension = detect_extension(
        &fetched.body,
        fetched.content_type.as_deref(),
        fetched.content_disposition.as_deref(),
        &candidate.url,
    );
    let filename = stored_filename(&candidate.contract_notice_id, &candidate.url, &extension);

    let stored = storage.put(&filename, fetched.body).await?;

    let record = DownloadRecord {
        document_url: candidate.url,
        contract_notice_id: candidate.contract_notice_id,
        filename,
        extension,
        size_bytes: stored.size,
        local_path: stored.local_path,
        modified_at: stored.modified_at,
        downloaded_at: Utc::now(),
        description: candidate.description,
    };
    catalog.record_download(&record)?;

    Ok(record)
}
