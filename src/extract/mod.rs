//! Extraction capability: local document -> structured JSON
//!
//! The worker pool only sees the [`Extractor`] trait. [`HttpExtractor`] posts
//! the file as multipart form data to the external extraction service.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, multipart};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::config::ExtractorConfig;

/// Form field carrying the document bytes
const DOCUMENT_FIELD: &str = "document";
const MAX_ERROR_BODY: usize = 500;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Document file not found: {0}")]
    MissingFile(PathBuf),

    #[error("Failed to read document: {0}")]
    Io(#[from] std::io::Error),

    #[error("Request timeout after {0:?}")]
    Timeout(Duration),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("API Error: {status} - {body}")]
    Status { status: StatusCode, body: String },

    #[error("Invalid extraction response: {0}")]
    InvalidResponse(String),

    #[error("Extractor not configured: {0}")]
    NotConfigured(String),
}

impl ExtractError {
    /// Retryable errors send the item back to `queued`; the rest fail it
    /// immediately
    pub fn is_retryable(&self) -> bool {
        match self {
            ExtractError::Timeout(_) | ExtractError::Connection(_) => true,
            ExtractError::Status { status, .. } => {
                status.is_server_error()
                    || *status == StatusCode::REQUEST_TIMEOUT
                    || *status == StatusCode::TOO_MANY_REQUESTS
            }
            ExtractError::MissingFile(_)
            | ExtractError::Io(_)
            | ExtractError::InvalidResponse(_)
            | ExtractError::NotConfigured(_) => false,
        }
    }
}

/// What the extractor is asked to process
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    pub path: PathBuf,
    pub filename: String,
    pub contract_notice_id: String,
}

#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, request: &ExtractionRequest) -> Result<Value, ExtractError>;
}

/// Extractor backed by the external HTTP service
pub struct HttpExtractor {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl HttpExtractor {
    pub fn new(config: &ExtractorConfig) -> Result<Self, ExtractError> {
        let endpoint = config
            .endpoint
            .clone()
            .ok_or_else(|| ExtractError::NotConfigured("extractor.endpoint is not set".into()))?;
        let timeout = config.request_timeout.as_duration();

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExtractError::NotConfigured(e.to_string()))?;

        Ok(Self {
            client,
            endpoint,
            api_key: config.api_key.clone(),
            timeout,
        })
    }
}

#[async_trait]
impl Extractor for HttpExtractor {
    async fn extract(&self, request: &ExtractionRequest) -> Result<Value, ExtractError> {
        if !tokio::fs::try_exists(&request.path).await.unwrap_or(false) {
            return Err(ExtractError::MissingFile(request.path.clone()));
        }
        let data = tokio::fs::read(&request.path).await?;

        let part = multipart::Part::bytes(data)
            .file_name(request.filename.clone())
            .mime_str("application/octet-stream")
            .map_err(|e| ExtractError::InvalidResponse(e.to_string()))?;
        let form = multipart::Form::new().part(DOCUMENT_FIELD, part);

        let mut builder = self.client.post(&self.endpoint).multipart(form);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        debug!(
            filename = %request.filename,
            notice_id = %request.contract_notice_id,
            "Sending document for extraction"
        );

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ExtractError::Timeout(self.timeout)
            } else {
                ExtractError::Connection(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            return Err(ExtractError::Status { status, body });
        }

        response.json::<Value>().await.map_err(|e| {
            if e.is_timeout() {
                ExtractError::Timeout(self.timeout)
            } else {
                ExtractError::InvalidResponse(e.to_string())
            }
        })
    }
}
