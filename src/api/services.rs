use std::collections::HashMap;
use std::path::PathBuf;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;
use tracing::info;

use super::{
    error::ApiError,
    models::{
        ClearRequest, ClearResponse, ContractDocument, ContractDocumentsResponse, ControlResponse,
        DownloadAllRequest, DownloadAllResponse, EnqueueRequest, EnqueueResponse, HealthResponse,
        ImportContractsRequest, ImportContractsResponse, ItemResponse, ItemsQuery, ItemsResponse,
        QueueStatusResponse, RetryFailedResponse,
    },
    state::AppState,
    validation::{
        MAX_BATCH_LIMIT, MAX_DOWNLOAD_CONCURRENCY, MAX_ITEMS_LIMIT, RequestValidationError,
        validate_contracts, validate_folder, validate_range,
    },
};
use crate::control::{ClearSelection, ControlOutcome};
use crate::discovery::discover;
use crate::download::DownloadOptions;
use crate::queue::{EnqueueMode, ItemStatus};

const MAX_PAYLOAD_SIZE: usize = 5 * 1024 * 1024; // 5MB
const DEFAULT_ITEMS_LIMIT: usize = 100;

/// Reads request body and validates size
///
/// Decompression is handled by RequestDecompressionLayer, so the bytes here
/// are already plain JSON.
async fn read_body(body: axum::body::Body) -> Result<Vec<u8>, ApiError> {
    let data = body
        .collect()
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?
        .to_bytes()
        .to_vec();

    super::utils::validate_body_size(&data, MAX_PAYLOAD_SIZE)?;

    Ok(data)
}

/// Decodes an optional JSON body. A blank body yields `T::default()`; a
/// non-blank one must be sent as application/json.
async fn read_json<T: DeserializeOwned + Default>(
    headers: &HeaderMap,
    body: axum::body::Body,
) -> Result<T, ApiError> {
    let data = read_body(body).await?;
    if super::utils::is_blank(&data) {
        return Ok(T::default());
    }

    let content_type = headers
        .get(axum::http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::InvalidPayload("missing Content-Type header".into()))?;
    super::utils::parse_content_type(content_type)?;

    Ok(serde_json::from_slice(&data)?)
}

fn control_response(outcome: ControlOutcome) -> Json<ControlResponse> {
    Json(ControlResponse {
        success: true,
        message: outcome.message,
        changed: outcome.changed,
    })
}

/// Turn downloaded documents into queue items (POST /api/queue/enqueue)
///
/// Test mode is refused with 409 while the pool is running.
pub async fn enqueue_documents(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Body,
) -> Result<impl IntoResponse, ApiError> {
    let request: EnqueueRequest = read_json(&headers, body).await?;
    validate_range(request.test_limit, "test_limit", MAX_BATCH_LIMIT)?;

    let mode = if request.test_mode {
        EnqueueMode::Test {
            limit: request.test_limit,
            clear_existing: request.clear_existing,
        }
    } else {
        EnqueueMode::Full
    };

    let report = state.controller.enqueue(mode).await?;

    let message = if request.test_mode {
        format!("Queued {} documents in test mode", report.queued_count)
    } else {
        format!("Queued {} documents", report.queued_count)
    };

    Ok(Json(EnqueueResponse {
        success: true,
        queued_count: report.queued_count,
        purged_count: report.purged_count,
        message,
    }))
}

/// Aggregate queue status (GET /api/queue/status)
pub async fn queue_status(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let queue_status = state.controller.status()?;
    Ok(Json(QueueStatusResponse {
        success: true,
        queue_status,
    }))
}

pub async fn start_processing(State(state): State<AppState>) -> impl IntoResponse {
    control_response(state.controller.start().await)
}

pub async fn stop_processing(State(state): State<AppState>) -> impl IntoResponse {
    control_response(state.controller.stop().await)
}

pub async fn pause_processing(State(state): State<AppState>) -> impl IntoResponse {
    control_response(state.controller.pause().await)
}

pub async fn resume_processing(State(state): State<AppState>) -> impl IntoResponse {
    control_response(state.controller.resume().await)
}

/// Zero counters and requeue orphaned items (POST /api/queue/reset)
pub async fn reset_queue(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let outcome = state.controller.reset().await?;
    Ok(control_response(outcome))
}

pub async fn retry_failed(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let requeued_count = state.controller.retry_failed().await?;
    Ok(Json(RetryFailedResponse {
        success: true,
        requeued_count,
    }))
}

/// Remove terminal items (POST /api/queue/clear)
///
/// `clear_all` implies both flags; a request with no flag set is a 400.
pub async fn clear_queue(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Body,
) -> Result<impl IntoResponse, ApiError> {
    let request: ClearRequest = read_json(&headers, body).await?;

    let selection = if request.clear_all {
        ClearSelection::all()
    } else {
        ClearSelection {
            completed: request.clear_completed,
            failed: request.clear_failed,
        }
    };

    if selection.is_empty() {
        return Err(RequestValidationError::NothingToClear.into());
    }

    let removed_count = state.controller.clear(selection).await?;
    Ok(Json(ClearResponse {
        success: true,
        removed_count,
    }))
}

/// Fetch pending documents into local storage (POST /api/documents/download-all)
///
/// Omitted fields fall back to the `[download]` config section.
pub async fn download_all(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Body,
) -> Result<impl IntoResponse, ApiError> {
    let request: DownloadAllRequest = read_json(&headers, body).await?;
    validate_range(request.limit, "limit", MAX_BATCH_LIMIT)?;
    validate_range(request.concurrency, "concurrency", MAX_DOWNLOAD_CONCURRENCY)?;

    let target_folder = match request.download_folder.as_deref() {
        Some(folder) => {
            validate_folder(folder)?;
            PathBuf::from(folder.trim())
        }
        None => state.config.download.folder.clone(),
    };

    let defaults = &state.config.download;
    let options = DownloadOptions {
        limit: request.limit.unwrap_or(defaults.limit),
        concurrency: request.concurrency.unwrap_or(defaults.concurrency),
        target_folder,
        contract_id: request.contract_id.filter(|id| !id.trim().is_empty()),
    };

    let summary = state.downloader.download_all(options).await?;
    Ok(Json(DownloadAllResponse {
        success: true,
        summary,
    }))
}

/// Upsert contract records into the catalog (POST /api/contracts)
pub async fn import_contracts(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Body,
) -> Result<impl IntoResponse, ApiError> {
    let request: ImportContractsRequest = read_json(&headers, body).await?;
    validate_contracts(&request.contracts)?;

    for contract in &request.contracts {
        let mut contract = contract.clone();
        contract.notice_id = contract.notice_id.trim().to_string();
        state.catalog.upsert_contract(&contract)?;
    }
    state.catalog.persist()?;

    let imported_count = request.contracts.len();
    info!(imported_count, "Contracts imported");

    Ok((
        StatusCode::OK,
        Json(ImportContractsResponse {
            success: true,
            imported_count,
        }),
    ))
}

/// Discovered documents for one contract (GET /api/contracts/{notice_id}/documents)
pub async fn contract_documents(
    State(state): State<AppState>,
    Path(notice_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let contract = state
        .catalog
        .get_contract(&notice_id)?
        .ok_or_else(|| ApiError::NotFound(format!("contract {notice_id}")))?;

    let mut documents = Vec::new();
    for candidate in discover(&contract) {
        let is_downloaded = state.downloader.is_downloaded(&candidate.url).await?;
        let local_filename = if is_downloaded {
            state
                .catalog
                .get_download(&candidate.url)?
                .map(|record| record.filename)
        } else {
            None
        };

        documents.push(ContractDocument {
            candidate,
            is_downloaded,
            local_filename,
        });
    }

    Ok(Json(ContractDocumentsResponse {
        success: true,
        notice_id,
        documents,
    }))
}

/// List queue items, optionally filtered by status (GET /api/queue/items)
pub async fn list_items(
    State(state): State<AppState>,
    Query(query): Query<ItemsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    validate_range(query.limit, "limit", MAX_ITEMS_LIMIT)?;

    let status = query
        .status
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(str::parse::<ItemStatus>)
        .transpose()
        .map_err(ApiError::InvalidPayload)?;

    let items: Vec<_> = state
        .controller
        .store()
        .items()?
        .into_iter()
        .filter(|item| status.is_none_or(|s| item.status == s))
        .take(query.limit.unwrap_or(DEFAULT_ITEMS_LIMIT))
        .collect();

    Ok(Json(ItemsResponse {
        success: true,
        count: items.len(),
        items,
    }))
}

pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<impl IntoResponse, ApiError> {
    let item = state
        .controller
        .store()
        .get(id)?
        .ok_or_else(|| ApiError::NotFound(format!("queue item {id}")))?;

    Ok(Json(ItemResponse {
        success: true,
        item,
    }))
}

/// Health check endpoint (GET /health)
///
/// Checks both Fjall keyspaces and reports the worker pool phase.
/// Returns 503 Service Unavailable if any store check fails.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let mut components = HashMap::new();

    components.insert("api".to_string(), "healthy".to_string());

    let queue = match state.controller.store().health_check() {
        Ok(()) => "healthy".to_string(),
        Err(e) => format!("unhealthy: {e}"),
    };
    components.insert("queue_store".to_string(), queue);

    let catalog = match state.catalog.stats() {
        Ok(_) => "healthy".to_string(),
        Err(e) => format!("unhealthy: {e}"),
    };
    components.insert("catalog".to_string(), catalog);

    components.insert(
        "worker_pool".to_string(),
        format!("{:?}", state.controller.pool().phase()).to_lowercase(),
    );

    let all_healthy = components
        .values()
        .all(|status| !status.starts_with("unhealthy"));
    let (overall_status, status_code) = if all_healthy {
        ("healthy", StatusCode::OK)
    } else {
        ("unhealthy", StatusCode::SERVICE_UNAVAILABLE)
    };

    let response = HealthResponse {
        status: overall_status.to_string(),
        components,
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    (status_code, Json(response))
}
