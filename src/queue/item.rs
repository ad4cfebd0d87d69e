use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Lifecycle state of a queue item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Queued => "queued",
            ItemStatus::Processing => "processing",
            ItemStatus::Completed => "completed",
            ItemStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ItemStatus::Completed | ItemStatus::Failed)
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "queued" => Ok(ItemStatus::Queued),
            "processing" => Ok(ItemStatus::Processing),
            "completed" => Ok(ItemStatus::Completed),
            "failed" => Ok(ItemStatus::Failed),
            other => Err(format!("unknown status '{}'", other)),
        }
    }
}

/// One document's unit of work through extraction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueueItem {
    pub id: u64,
    pub contract_notice_id: String,
    pub document_url: String,
    pub filename: String,
    pub local_file_path: Option<PathBuf>,
    /// Archived copy written after a successful extraction
    #[serde(default)]
    pub saved_file_path: Option<PathBuf>,
    pub status: ItemStatus,
    pub retry_count: u32,
    pub max_retries: u32,
    pub processed_data: Option<Value>,
    pub error_message: Option<String>,
    pub processing_time_ms: Option<u64>,
    pub queued_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl QueueItem {
    /// Identity used to decide whether a document is already queued
    pub fn document_key(&self) -> (&str, &str) {
        (&self.contract_notice_id, &self.document_url)
    }

    /// Whether this item keeps its document from being enqueued again
    pub fn blocks_reenqueue(&self) -> bool {
        !matches!(self.status, ItemStatus::Failed)
    }
}

/// Input for creating a queue item
#[derive(Debug, Clone)]
pub struct NewItem {
    pub contract_notice_id: String,
    pub document_url: String,
    pub filename: String,
    pub local_file_path: Option<PathBuf>,
    pub max_retries: u32,
}

impl NewItem {
    pub(crate) fn into_item(self, id: u64, now: DateTime<Utc>) -> QueueItem {
        QueueItem {
            id,
            contract_notice_id: self.contract_notice_id,
            document_url: self.document_url,
            filename: self.filename,
            local_file_path: self.local_file_path,
            saved_file_path: None,
            status: ItemStatus::Queued,
            retry_count: 0,
            max_retries: self.max_retries,
            processed_data: None,
            error_message: None,
            processing_time_ms: None,
            queued_at: now,
            started_at: None,
            completed_at: None,
            failed_at: None,
            updated_at: now,
        }
    }
}
