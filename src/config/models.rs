use crate::humanize::{ByteSize, HumanDuration};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub download: DownloadConfig,
    #[serde(default)]
    pub extractor: ExtractorConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    /// Root directory for the queue and catalog keyspaces
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl ServerConfig {
    pub fn queue_path(&self) -> PathBuf {
        self.data_dir.join("queue")
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.data_dir.join("catalog")
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            data_dir: default_data_dir(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

/// Queue item policy
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueueConfig {
    /// Retries granted to each item at enqueue time
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Default item cap for test-mode enqueues
    #[serde(default = "default_test_limit")]
    pub test_limit: usize,
    /// Number of recent completions reported by the status endpoint
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,
    /// How long an idle worker waits before polling the store again
    #[serde(default = "default_idle_backoff")]
    pub idle_backoff: HumanDuration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            test_limit: default_test_limit(),
            recent_limit: default_recent_limit(),
            idle_backoff: default_idle_backoff(),
        }
    }
}

fn default_max_retries() -> u32 {
    3
}

fn default_test_limit() -> usize {
    10
}

fn default_recent_limit() -> usize {
    10
}

fn default_idle_backoff() -> HumanDuration {
    HumanDuration::from_secs(1)
}

/// Extraction worker pool
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkerConfig {
    /// Maximum simultaneous extraction calls
    #[serde(default = "default_worker_concurrency")]
    pub concurrency: usize,
    /// Start the pool as soon as the server is up
    #[serde(default)]
    pub autostart: bool,
    /// Where successfully extracted documents are copied; unset disables it
    #[serde(default)]
    pub processed_folder: Option<PathBuf>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_worker_concurrency(),
            autostart: false,
            processed_folder: None,
        }
    }
}

fn default_worker_concurrency() -> usize {
    5
}

/// Document downloads
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DownloadConfig {
    #[serde(default = "default_download_folder")]
    pub folder: PathBuf,
    #[serde(default = "default_download_concurrency")]
    pub concurrency: usize,
    /// Default batch size for download-all
    #[serde(default = "default_download_limit")]
    pub limit: usize,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: HumanDuration,
    #[serde(default = "default_request_timeout")]
    pub request_timeout: HumanDuration,
    /// HTTP attempts per document, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base delay for exponential backoff between attempts
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff: HumanDuration,
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: ByteSize,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            folder: default_download_folder(),
            concurrency: default_download_concurrency(),
            limit: default_download_limit(),
            connect_timeout: default_connect_timeout(),
            request_timeout: default_request_timeout(),
            max_attempts: default_max_attempts(),
            retry_backoff: default_retry_backoff(),
            max_file_bytes: default_max_file_bytes(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_download_folder() -> PathBuf {
    PathBuf::from("queue_documents")
}

fn default_download_concurrency() -> usize {
    4
}

fn default_download_limit() -> usize {
    50
}

fn default_connect_timeout() -> HumanDuration {
    HumanDuration::from_secs(10)
}

fn default_request_timeout() -> HumanDuration {
    HumanDuration::from_secs(30)
}

fn default_max_attempts() -> u32 {
    2
}

fn default_retry_backoff() -> HumanDuration {
    HumanDuration::from_secs(1)
}

fn default_max_file_bytes() -> ByteSize {
    ByteSize(10 * 1024 * 1024) // 10 MB
}

fn default_user_agent() -> String {
    concat!("docqueue/", env!("CARGO_PKG_VERSION")).to_string()
}

/// External extraction service
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExtractorConfig {
    /// Endpoint receiving the multipart document upload
    pub endpoint: Option<String>,
    #[serde(default = "default_extractor_timeout")]
    pub request_timeout: HumanDuration,
    /// Bearer token (loaded from environment, not from config file)
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            request_timeout: default_extractor_timeout(),
            api_key: None,
        }
    }
}

fn default_extractor_timeout() -> HumanDuration {
    HumanDuration::from_secs(180)
}
