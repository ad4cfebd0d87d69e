use axum::{Json, http::StatusCode, response::IntoResponse};
use thiserror::Error;

use super::models::ErrorResponse;
use super::validation::RequestValidationError;
use crate::catalog::CatalogError;
use crate::download::DownloadError;
use crate::queue::{EnqueueError, QueueError};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("payload invalid: {0}")]
    InvalidPayload(String),
    #[error("payload too large: {0} bytes")]
    PayloadTooLarge(usize),
    #[error("resource not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    PoolRunning(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::PoolRunning(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidPayload(_) => "INVALID_PAYLOAD",
            ApiError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::PoolRunning(_) => "POOL_RUNNING",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "Request failed");
        }

        let body = ErrorResponse {
            success: false,
            code: self.code(),
            message: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(value: serde_json::Error) -> Self {
        ApiError::InvalidPayload(value.to_string())
    }
}

impl From<RequestValidationError> for ApiError {
    fn from(value: RequestValidationError) -> Self {
        ApiError::InvalidPayload(value.to_string())
    }
}

impl From<QueueError> for ApiError {
    fn from(value: QueueError) -> Self {
        match value {
            QueueError::ItemNotFound(id) => ApiError::NotFound(format!("queue item {id}")),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(value: CatalogError) -> Self {
        match value {
            CatalogError::ContractNotFound(id) => ApiError::NotFound(format!("contract {id}")),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<EnqueueError> for ApiError {
    fn from(value: EnqueueError) -> Self {
        match value {
            EnqueueError::PoolRunning => {
                ApiError::PoolRunning(EnqueueError::PoolRunning.to_string())
            }
            EnqueueError::ClaimsInFlight(n) => {
                ApiError::PoolRunning(EnqueueError::ClaimsInFlight(n).to_string())
            }
            EnqueueError::Queue(e) => e.into(),
            EnqueueError::Catalog(e) => e.into(),
        }
    }
}

impl From<DownloadError> for ApiError {
    fn from(value: DownloadError) -> Self {
        match value {
            DownloadError::UnknownContract(id) => ApiError::NotFound(format!("contract {id}")),
            DownloadError::Catalog(e) => e.into(),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::from(EnqueueError::PoolRunning).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(EnqueueError::ClaimsInFlight(2)).code(),
            "POOL_RUNNING"
        );
        assert_eq!(
            ApiError::from(QueueError::ItemNotFound(4)).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(DownloadError::UnknownContract("N-1".into())).code(),
            "NOT_FOUND"
        );
        assert_eq!(ApiError::InvalidPayload("x".into()).code(), "INVALID_PAYLOAD");
    }
}
