use std::path::Path;

use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle};
use tracing::{debug, info};

use super::error::Result;
use super::partitions::{decode_contract_key, encode_contract_key, encode_download_key};
use super::records::{ContractRecord, DownloadRecord};

/// Fjall-backed catalog of contract records and download records
#[derive(Clone)]
pub struct CatalogStore {
    keyspace: Keyspace,
    contracts: PartitionHandle,
    downloads: PartitionHandle,
}

impl CatalogStore {
    /// Open or create a catalog at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening catalog at: {}", path.display());

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let keyspace = Config::new(path).open()?;
        let contracts = keyspace.open_partition("contracts", PartitionCreateOptions::default())?;
        let downloads = keyspace.open_partition("downloads", PartitionCreateOptions::default())?;

        Ok(Self {
            keyspace,
            contracts,
            downloads,
        })
    }

    /// Store or replace a contract record
    pub fn upsert_contract(&self, contract: &ContractRecord) -> Result<()> {
        let key = encode_contract_key(&contract.notice_id);
        let value = serde_json::to_vec(contract)?;
        self.contracts.insert(key, value)?;
        debug!(notice_id = %contract.notice_id, "Upserted contract");
        Ok(())
    }

    pub fn get_contract(&self, notice_id: &str) -> Result<Option<ContractRecord>> {
        match self.contracts.get(encode_contract_key(notice_id))? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    /// All contracts in notice-id order
    pub fn contracts(&self) -> Result<Vec<ContractRecord>> {
        let mut results = Vec::new();
        for item in self.contracts.iter() {
            let (key, value) = item?;
            if decode_contract_key(&key).is_none() {
                continue;
            }
            results.push(serde_json::from_slice(&value)?);
        }
        Ok(results)
    }

    /// Record a completed download, replacing any earlier record for the URL
    pub fn record_download(&self, record: &DownloadRecord) -> Result<()> {
        let key = encode_download_key(&record.document_url);
        let value = serde_json::to_vec(record)?;
        self.downloads.insert(key, value)?;
        debug!(url = %record.document_url, "Recorded download");
        Ok(())
    }

    pub fn get_download(&self, document_url: &str) -> Result<Option<DownloadRecord>> {
        match self.downloads.get(encode_download_key(document_url))? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    /// Every download record, ordered by URL
    pub fn downloads(&self) -> Result<Vec<DownloadRecord>> {
        let mut results = Vec::new();
        for item in self.downloads.iter() {
            let (_, value) = item?;
            results.push(serde_json::from_slice(&value)?);
        }
        Ok(results)
    }

    /// Download records belonging to one contract
    pub fn downloads_for(&self, notice_id: &str) -> Result<Vec<DownloadRecord>> {
        Ok(self
            .downloads()?
            .into_iter()
            .filter(|record| record.contract_notice_id == notice_id)
            .collect())
    }

    /// Persist all pending writes to disk
    pub fn persist(&self) -> Result<()> {
        self.keyspace.persist(fjall::PersistMode::SyncAll)?;
        Ok(())
    }

    pub fn stats(&self) -> Result<CatalogStats> {
        let mut contract_count = 0;
        let mut download_count = 0;

        for item in self.contracts.iter() {
            item?;
            contract_count += 1;
        }

        for item in self.downloads.iter() {
            item?;
            download_count += 1;
        }

        Ok(CatalogStats {
            contract_count,
            download_count,
        })
    }
}

#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct CatalogStats {
    pub contract_count: usize,
    pub download_count: usize,
}
