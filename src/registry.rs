use mime::Mime;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Uploaded,
}

#[derive(Debug, Clone)]
pub struct UploadRecord {
    pub id: String,
    /// Client-supplied name, stored verbatim.
    pub filename: String,
    pub content_type: Mime,
    pub status: UploadStatus,
}

/// In-process index of upload records keyed by identifier.
///
/// Records are only inserted after their bytes are in storage and are never
/// mutated or removed afterwards. Contents do not survive a restart.
#[derive(Clone, Default)]
pub struct Registry {
    records: Arc<RwLock<HashMap<String, UploadRecord>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, record: UploadRecord) {
        self.records.write().await.insert(record.id.clone(), record);
    }

    pub async fn get(&self, id: &str) -> Option<UploadRecord> {
        self.records.read().await.get(id).cloned()
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    #[cfg(test)]
    pub(crate) async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}
