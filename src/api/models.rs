//! Request and response bodies for the queue control API.
//!
//! Every response carries `success`. Errors use [`ErrorResponse`]:
//!
//! ```json
//! { "success": false, "code": "POOL_RUNNING", "message": "..." }
//! ```
//!
//! Request bodies are optional on the POST endpoints; an empty body means
//! "all defaults".

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::catalog::ContractRecord;
use crate::discovery::DocumentCandidate;
use crate::download::DownloadSummary;
use crate::queue::{QueueItem, QueueStatus};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EnqueueRequest {
    pub test_mode: bool,
    pub test_limit: Option<usize>,
    pub clear_existing: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EnqueueResponse {
    pub success: bool,
    pub queued_count: usize,
    #[serde(default)]
    pub purged_count: usize,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct QueueStatusResponse {
    pub success: bool,
    pub queue_status: QueueStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ControlResponse {
    pub success: bool,
    pub message: String,
    /// false when the operation was a no-op
    pub changed: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RetryFailedResponse {
    pub success: bool,
    pub requeued_count: usize,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ClearRequest {
    pub clear_completed: bool,
    pub clear_failed: bool,
    pub clear_all: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClearResponse {
    pub success: bool,
    pub removed_count: usize,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DownloadAllRequest {
    pub limit: Option<usize>,
    pub download_folder: Option<String>,
    pub concurrency: Option<usize>,
    pub contract_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DownloadAllResponse {
    pub success: bool,
    pub summary: DownloadSummary,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ImportContractsRequest {
    pub contracts: Vec<ContractRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ImportContractsResponse {
    pub success: bool,
    pub imported_count: usize,
}

#[derive(Debug, Serialize)]
pub struct ContractDocument {
    #[serde(flatten)]
    pub candidate: DocumentCandidate,
    pub is_downloaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_filename: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ContractDocumentsResponse {
    pub success: bool,
    pub notice_id: String,
    pub documents: Vec<ContractDocument>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ItemsQuery {
    pub status: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ItemsResponse {
    pub success: bool,
    pub count: usize,
    pub items: Vec<QueueItem>,
}

#[derive(Debug, Serialize)]
pub struct ItemResponse {
    pub success: bool,
    pub item: QueueItem,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub components: HashMap<String, String>,
    pub version: String,
}
