//! Small HTTP service that accepts image uploads, assigns each one an
//! identifier, and serves status and content back by that identifier.

pub mod config;
pub mod errors;
pub mod registry;
pub mod routes;
pub mod service;
pub mod storage;

use config::{AppConfig, StorageType};
use errors::ApiError;
use service::UploadService;
use std::sync::Arc;
use storage::{InMemoryStorage, LocalFileStorage, Storage};

pub fn build_storage(config: &AppConfig) -> Result<Arc<dyn Storage>, ApiError> {
    let storage: Arc<dyn Storage> = match config.storage_type {
        StorageType::Memory => Arc::new(InMemoryStorage::new()),
        StorageType::Local => Arc::new(LocalFileStorage::new(config.storage_path.clone())?),
    };
    Ok(storage)
}

/// Wires storage, service and routes together from `config`.
pub fn app(config: &AppConfig) -> Result<axum::Router, ApiError> {
    let service = Arc::new(UploadService::new(build_storage(config)?));
    Ok(routes::router(service, config.max_upload_bytes))
}
