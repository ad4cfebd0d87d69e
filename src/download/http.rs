//! HTTP client for fetching contract documents

use bytes::{Bytes, BytesMut};
use reqwest::{Client, StatusCode, header};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::DownloadConfig;

/// Upper bound on the pause between fetch attempts
const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("HTTP {status}")]
    Status { status: StatusCode },

    #[error("Request timed out")]
    Timeout,

    #[error("Too many redirects")]
    TooManyRedirects,

    #[error("Response exceeds {limit} bytes")]
    TooLarge { limit: u64 },

    #[error("Failed after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: String },
}

impl FetchError {
    /// Whether another attempt could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::RequestFailed(_) | FetchError::Timeout => true,
            FetchError::Status { status } => {
                status.is_server_error()
                    || *status == StatusCode::REQUEST_TIMEOUT
                    || *status == StatusCode::TOO_MANY_REQUESTS
            }
            FetchError::TooManyRedirects
            | FetchError::TooLarge { .. }
            | FetchError::Exhausted { .. } => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_attempts: u32,
    pub retry_backoff: Duration,
    pub max_body_bytes: u64,
    pub user_agent: String,
}

impl From<&DownloadConfig> for HttpConfig {
    fn from(config: &DownloadConfig) -> Self {
        Self {
            connect_timeout: config.connect_timeout.as_duration(),
            request_timeout: config.request_timeout.as_duration(),
            max_attempts: config.max_attempts,
            retry_backoff: config.retry_backoff.as_duration(),
            max_body_bytes: config.max_file_bytes.as_u64(),
            user_agent: config.user_agent.clone(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self::from(&DownloadConfig::default())
    }
}

/// Body plus the headers used to name the file
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    pub body: Bytes,
    pub content_type: Option<String>,
    pub content_disposition: Option<String>,
}

/// HTTP document fetcher
pub struct HttpClient {
    client: Client,
    config: HttpConfig,
}

impl HttpClient {
    pub fn new(config: HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| FetchError::RequestFailed(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Fetch a document, retrying transient failures with exponential backoff
    pub async fn fetch(&self, url: &str) -> Result<FetchedDocument> {
        let mut attempts = 0;

        loop {
            attempts += 1;

            match self.fetch_once(url).await {
                Ok(document) => {
                    if attempts > 1 {
                        debug!(url, attempts, "Fetch succeeded after retry");
                    }
                    return Ok(document);
                }
                Err(e) if !e.is_retryable() => {
                    warn!(url, attempts, error = %e, "Fetch failed permanently");
                    return Err(e);
                }
                Err(e) => {
                    if attempts >= self.config.max_attempts {
                        warn!(url, attempts, error = %e, "Fetch failed after retries");
                        return Err(FetchError::Exhausted {
                            attempts,
                            last_error: e.to_string(),
                        });
                    }

                    warn!(url, attempts, error = %e, "Fetch failed, retrying");

                    tokio::time::sleep(retry_delay(self.config.retry_backoff, attempts)).await;
                }
            }
        }
    }

    async fn fetch_once(&self, url: &str) -> Result<FetchedDocument> {
        debug!(url, "Starting fetch");

        let mut response = self.client.get(url).send().await.map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { status });
        }

        let limit = self.config.max_body_bytes;
        if response.content_length().is_some_and(|len| len > limit) {
            return Err(FetchError::TooLarge { limit });
        }

        let content_type = header_string(&response, header::CONTENT_TYPE);
        let content_disposition = header_string(&response, header::CONTENT_DISPOSITION);

        // Content-Length may be absent or wrong, so enforce the limit while streaming
        let mut body = BytesMut::new();
        while let Some(chunk) = response.chunk().await.map_err(map_reqwest_error)? {
            if body.len() as u64 + chunk.len() as u64 > limit {
                return Err(FetchError::TooLarge { limit });
            }
            body.extend_from_slice(&chunk);
        }

        debug!(url, size = body.len(), "Fetch completed");

        Ok(FetchedDocument {
            body: body.freeze(),
            content_type,
            content_disposition,
        })
    }
}

fn map_reqwest_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else if e.is_redirect() {
        FetchError::TooManyRedirects
    } else {
        FetchError::RequestFailed(e.to_string())
    }
}

fn header_string(response: &reqwest::Response, name: header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

/// Exponential backoff after the `attempts`-th failure, capped at
/// `MAX_RETRY_DELAY`.
fn retry_delay(base: Duration, attempts: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempts.saturating_sub(1));
    base.saturating_mul(factor).min(MAX_RETRY_DELAY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_delay_doubles_then_caps() {
        let base = Duration::from_secs(1);
        assert_eq!(retry_delay(base, 1), Duration::from_secs(1));
        assert_eq!(retry_delay(base, 2), Duration::from_secs(2));
        assert_eq!(retry_delay(base, 4), Duration::from_secs(8));
        assert_eq!(retry_delay(base, 40), MAX_RETRY_DELAY);
        assert_eq!(retry_delay(base, u32::MAX), MAX_RETRY_DELAY);
    }

    #[test]
    fn test_http_config_from_defaults() {
        let config = HttpConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.max_attempts, 2);
        assert_eq!(config.max_body_bytes, 10 * 1024 * 1024);
        assert!(config.user_agent.starts_with("docqueue/"));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(FetchError::Timeout.is_retryable());
        assert!(
            FetchError::Status {
                status: StatusCode::BAD_GATEWAY
            }
            .is_retryable()
        );
        assert!(
            FetchError::Status {
                status: StatusCode::TOO_MANY_REQUESTS
            }
            .is_retryable()
        );
        assert!(
            !FetchError::Status {
                status: StatusCode::NOT_FOUND
            }
            .is_retryable()
        );
        assert!(!FetchError::TooLarge { limit: 10 }.is_retryable());
    }
}
