use std::sync::Arc;

use crate::config::AppConfig;
use crate::storage::{
    BlobStore, InMemoryStatisticsStore, InMemoryTemplateStore, LocalBlobStore, TemplateStore,
};
use crate::templates::service::TemplateService;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub templates: TemplateService,
}

impl AppState {
    /// State backed by the local blob directory and in-memory metadata.
    pub fn new(config: AppConfig) -> Self {
        let blobs: Arc<dyn BlobStore> = Arc::new(LocalBlobStore::new(config.storage_dir.clone()));
        let store: Arc<dyn TemplateStore> = Arc::new(InMemoryTemplateStore::new());
        Self::new_with_storage(config, blobs, store)
    }

    pub fn new_with_storage(
        config: AppConfig,
        blobs: Arc<dyn BlobStore>,
        store: Arc<dyn TemplateStore>,
    ) -> Self {
        Self {
            config,
            templates: TemplateService::new(blobs, store, Arc::new(InMemoryStatisticsStore::new())),
        }
    }
}
