use super::*;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone, Default)]
pub struct InMemoryStorage {
    files: Arc<RwLock<HashMap<String, Bytes>>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops the bytes for `key`, leaving any registry entry orphaned.
    pub async fn remove(&self, key: &str) -> Option<Bytes> {
        self.files.write().await.remove(key)
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn write(&self, key: &str, bytes: Bytes) -> Result<(), ApiError> {
        self.files.write().await.insert(key.to_string(), bytes);
        Ok(())
    }

    async fn open(&self, key: &str) -> Result<StoredFile, ApiError> {
        self.files
            .read()
            .await
            .get(key)
            .map(|bytes| StoredFile {
                len: bytes.len() as u64,
                body: Body::from(bytes.clone()),
            })
            .ok_or(ApiError::NotFoundOnDisk)
    }

    async fn exists(&self, key: &str) -> Result<bool, ApiError> {
        Ok(self.files.read().await.contains_key(key))
    }
}
