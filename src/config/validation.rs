use super::models::Config;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} must be at least 1")]
    ZeroValue { field: &'static str },

    #[error("{field} must be a positive duration")]
    ZeroDuration { field: &'static str },

    #[error("download.max_file_bytes must be positive")]
    InvalidMaxFileBytes,

    #[error("Invalid extractor endpoint '{endpoint}', expected an http:// or https:// URL")]
    InvalidExtractorEndpoint { endpoint: String },

    #[error("download.max_attempts must be at most {max}, got {value}")]
    TooManyAttempts { value: u32, max: u32 },

    #[error("download.user_agent must not be empty")]
    EmptyUserAgent,
}

/// Fetch attempts per document beyond this are refused
pub const MAX_DOWNLOAD_ATTEMPTS: u32 = 10;

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_queue(config)?;
    validate_worker(config)?;
    validate_download(config)?;
    validate_extractor(config)?;
    Ok(())
}

fn non_zero(value: usize, field: &'static str) -> Result<(), ValidationError> {
    if value == 0 {
        return Err(ValidationError::ZeroValue { field });
    }
    Ok(())
}

fn validate_queue(config: &Config) -> Result<(), ValidationError> {
    non_zero(config.queue.test_limit, "queue.test_limit")?;
    non_zero(config.queue.recent_limit, "queue.recent_limit")?;

    if config.queue.idle_backoff.is_zero() {
        return Err(ValidationError::ZeroDuration {
            field: "queue.idle_backoff",
        });
    }

    Ok(())
}

fn validate_worker(config: &Config) -> Result<(), ValidationError> {
    non_zero(config.worker.concurrency, "worker.concurrency")
}

fn validate_download(config: &Config) -> Result<(), ValidationError> {
    let download = &config.download;

    non_zero(download.concurrency, "download.concurrency")?;
    non_zero(download.limit, "download.limit")?;
    non_zero(download.max_attempts as usize, "download.max_attempts")?;
    if download.max_attempts > MAX_DOWNLOAD_ATTEMPTS {
        return Err(ValidationError::TooManyAttempts {
            value: download.max_attempts,
            max: MAX_DOWNLOAD_ATTEMPTS,
        });
    }

    if download.connect_timeout.is_zero() {
        return Err(ValidationError::ZeroDuration {
            field: "download.connect_timeout",
        });
    }
    if download.request_timeout.is_zero() {
        return Err(ValidationError::ZeroDuration {
            field: "download.request_timeout",
        });
    }

    if download.max_file_bytes.as_u64() == 0 {
        return Err(ValidationError::InvalidMaxFileBytes);
    }

    if download.user_agent.trim().is_empty() {
        return Err(ValidationError::EmptyUserAgent);
    }

    Ok(())
}

fn validate_extractor(config: &Config) -> Result<(), ValidationError> {
    if let Some(endpoint) = &config.extractor.endpoint {
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(ValidationError::InvalidExtractorEndpoint {
                endpoint: endpoint.clone(),
            });
        }
    }

    if config.extractor.request_timeout.is_zero() {
        return Err(ValidationError::ZeroDuration {
            field: "extractor.request_timeout",
        });
    }

    Ok(())
}
