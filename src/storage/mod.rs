mod in_memory;
mod local_fs;

pub use in_memory::InMemoryStorage;
pub use local_fs::LocalFileStorage;

use crate::errors::ApiError;
use async_trait::async_trait;
use axum::body::{Body, Bytes};

/// Bytes ready to be sent back to a client.
pub struct StoredFile {
    pub body: Body,
    pub len: u64,
}

#[async_trait]
pub trait Storage: Send + Sync + 'static {
    /// Stores `bytes` under `key`, replacing anything already there.
    async fn write(&self, key: &str, bytes: Bytes) -> Result<(), ApiError>;
    /// Opens `key` for reading. A missing key is [`ApiError::NotFoundOnDisk`].
    async fn open(&self, key: &str) -> Result<StoredFile, ApiError>;
    async fn exists(&self, key: &str) -> Result<bool, ApiError>;
}

/// Name under which an upload's bytes are stored: `<id>_<filename>`.
pub fn storage_key(id: &str, filename: &str) -> String {
    format!("{id}_{filename}")
}

/// Rejects filenames that could escape the storage root once joined onto it.
pub fn validate_filename(filename: &str) -> Result<(), ApiError> {
    let unsafe_name = filename.is_empty()
        || filename == "."
        || filename == ".."
        || filename.contains(['/', '\\', '\0']);

    if unsafe_name {
        return Err(ApiError::BadRequest(format!(
            "Invalid filename: {filename:?}"
        )));
    }
    Ok(())
}
