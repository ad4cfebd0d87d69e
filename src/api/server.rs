use std::sync::Arc;

use axum::{Router, routing::get, routing::post};
use tokio::net::TcpListener;
use tower_http::decompression::RequestDecompressionLayer;
use tracing::{info, warn};

use super::{
    services::{
        clear_queue, contract_documents, download_all, enqueue_documents, get_item, health,
        import_contracts, list_items, pause_processing, queue_status, reset_queue,
        resume_processing, retry_failed, start_processing, stop_processing,
    },
    state::AppState,
};
use crate::catalog::CatalogStore;
use crate::config::Config;
use crate::control::QueueController;
use crate::download::{Downloader, HttpClient, HttpConfig};
use crate::extract::{Extractor, HttpExtractor};
use crate::queue::{Enqueuer, QueueStore};
use crate::worker::{PoolConfig, ProcessingPool};

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/queue/enqueue", post(enqueue_documents))
        .route("/api/queue/status", get(queue_status))
        .route("/api/queue/start", post(start_processing))
        .route("/api/queue/stop", post(stop_processing))
        .route("/api/queue/pause", post(pause_processing))
        .route("/api/queue/resume", post(resume_processing))
        .route("/api/queue/reset", post(reset_queue))
        .route("/api/queue/retry-failed", post(retry_failed))
        .route("/api/queue/clear", post(clear_queue))
        .route("/api/queue/items", get(list_items))
        .route("/api/queue/items/{id}", get(get_item))
        .route("/api/documents/download-all", post(download_all))
        .route("/api/contracts", post(import_contracts))
        .route("/api/contracts/{notice_id}/documents", get(contract_documents))
        .route("/health", get(health))
        .with_state(state)
        // Transparently decompress gzip request bodies
        .layer(RequestDecompressionLayer::new())
}

/// Open both stores and wire pool, enqueuer, controller and downloader
/// around the given extractor
pub fn build_state(config: Config, extractor: Arc<dyn Extractor>) -> Result<AppState, AnyError> {
    info!(path = %config.server.queue_path().display(), "Opening queue store");
    let store = Arc::new(
        QueueStore::open(config.server.queue_path())
            .map_err(|e| format!("Failed to open queue store: {}", e))?,
    );

    info!(path = %config.server.catalog_path().display(), "Opening catalog");
    let catalog = CatalogStore::open(config.server.catalog_path())
        .map_err(|e| format!("Failed to open catalog: {}", e))?;

    let pool = Arc::new(ProcessingPool::new(
        store.clone(),
        extractor,
        PoolConfig::from(&config),
    ));

    let enqueuer = Enqueuer::new(
        store.clone(),
        catalog.clone(),
        pool.clone(),
        config.queue.max_retries,
        config.queue.test_limit,
    );

    let controller = Arc::new(QueueController::new(
        store,
        pool,
        enqueuer,
        config.queue.recent_limit,
    ));

    let client = HttpClient::new(HttpConfig::from(&config.download))
        .map_err(|e| format!("Failed to build download client: {}", e))?;
    let downloader = Downloader::new(catalog.clone(), client);

    Ok(AppState::new(config, controller, catalog, downloader))
}

pub async fn run(config: Config) -> Result<(), AnyError> {
    let extractor = HttpExtractor::new(&config.extractor)
        .map_err(|e| format!("Failed to configure extractor: {}", e))?;

    let address = config.server.bind_addr;
    let autostart = config.worker.autostart;
    let state = build_state(config, Arc::new(extractor))?;
    let controller = state.controller.clone();

    if autostart {
        let outcome = controller.start().await;
        info!(message = %outcome.message, "Autostart");
    }

    let app = build_router(state);

    let listener = TcpListener::bind(address).await?;
    info!(%address, "docqueue API listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Waiting for workers to finish");
    if let Err(e) = controller.shutdown().await {
        warn!(error = %e, "Failed to persist queue store on shutdown");
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
