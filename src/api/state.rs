use std::sync::Arc;

use crate::catalog::CatalogStore;
use crate::config::Config;
use crate::control::QueueController;
use crate::download::Downloader;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub controller: Arc<QueueController>,
    pub catalog: CatalogStore,
    pub downloader: Arc<Downloader>,
}

impl AppState {
    pub fn new(
        config: Config,
        controller: Arc<QueueController>,
        catalog: CatalogStore,
        downloader: Downloader,
    ) -> Self {
        Self {
            config: Arc::new(config),
            controller,
            catalog,
            downloader: Arc::new(downloader),
        }
    }
}
