use crate::errors::ApiError;
use crate::registry::{Registry, UploadRecord, UploadStatus};
use crate::storage::{Storage, StoredFile, storage_key, validate_filename};
use axum::body::Bytes;
use mime::Mime;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// A single file as received from the client.
#[derive(Debug)]
pub struct Upload {
    pub filename: String,
    /// Content type exactly as the client declared it.
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadReceipt {
    pub file_id: String,
    pub filename: String,
}

/// Accepts image uploads and answers status and retrieval lookups.
///
/// Owns the registry and the byte storage backend; handlers reach it through a
/// shared `Arc<UploadService>`.
pub struct UploadService {
    registry: Registry,
    storage: Arc<dyn Storage>,
}

impl UploadService {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            registry: Registry::new(),
            storage,
        }
    }

    pub async fn upload(&self, upload: Upload) -> Result<UploadReceipt, ApiError> {
        // Prefix match on the raw header, before parsing normalises case.
        let content_type: Mime = match upload.content_type.as_deref() {
            Some(ct) if ct.starts_with("image/") => {
                ct.parse().unwrap_or(mime::APPLICATION_OCTET_STREAM)
            }
            _ => {
                return Err(ApiError::BadRequest(
                    "Only image files are allowed.".to_string(),
                ));
            }
        };
        validate_filename(&upload.filename)?;

        let file_id = Uuid::new_v4().to_string();
        let key = storage_key(&file_id, &upload.filename);
        let len = upload.bytes.len();

        self.storage.write(&key, upload.bytes).await?;

        self.registry
            .insert(UploadRecord {
                id: file_id.clone(),
                filename: upload.filename.clone(),
                content_type,
                status: UploadStatus::Uploaded,
            })
            .await;

        tracing::info!(%file_id, filename = %upload.filename, len, "upload accepted");

        Ok(UploadReceipt {
            file_id,
            filename: upload.filename,
        })
    }

    /// Registry lookup only; the backing bytes are not checked.
    pub async fn status(&self, file_id: &str) -> Result<UploadRecord, ApiError> {
        tracing::debug!(%file_id, "status lookup");
        self.registry.get(file_id).await.ok_or(ApiError::NotFound)
    }

    pub async fn retrieve(&self, file_id: &str) -> Result<(UploadRecord, StoredFile), ApiError> {
        let record = self.registry.get(file_id).await.ok_or(ApiError::NotFound)?;
        let key = storage_key(&record.id, &record.filename);

        if !self.storage.exists(&key).await? {
            tracing::warn!(%file_id, %key, "registry entry has no stored bytes");
            return Err(ApiError::NotFoundOnDisk);
        }

        let file = self.storage.open(&key).await?;
        Ok((record, file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{InMemoryStorage, LocalFileStorage};
    use async_trait::async_trait;
    use std::collections::HashSet;
    use tempfile::TempDir;

    fn png(filename: &str, bytes: &'static [u8]) -> Upload {
        Upload {
            filename: filename.to_string(),
            content_type: Some("image/png".to_string()),
            bytes: Bytes::from_static(bytes),
        }
    }

    async fn body_of(file: StoredFile) -> Vec<u8> {
        axum::body::to_bytes(file.body, usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    #[tokio::test]
    async fn upload_status_retrieve() {
        let dir = TempDir::new().unwrap();
        let storage = LocalFileStorage::new(dir.path().to_path_buf()).unwrap();
        let service = UploadService::new(Arc::new(storage));

        let receipt = service.upload(png("cat.png", b"0123456789")).await.unwrap();
        assert_eq!(receipt.filename, "cat.png");
        assert_eq!(receipt.file_id.len(), 36);
        assert!(
            dir.path()
                .join(format!("{}_cat.png", receipt.file_id))
                .is_file()
        );

        let record = service.status(&receipt.file_id).await.unwrap();
        assert_eq!(record.filename, "cat.png");
        assert_eq!(record.status, UploadStatus::Uploaded);

        let (record, file) = service.retrieve(&receipt.file_id).await.unwrap();
        assert_eq!(record.content_type, mime::IMAGE_PNG);
        assert_eq!(body_of(file).await, b"0123456789");
    }

    #[tokio::test]
    async fn identifiers_are_unique() {
        let service = UploadService::new(Arc::new(InMemoryStorage::new()));

        let mut ids = HashSet::new();
        for _ in 0..100 {
            let receipt = service.upload(png("same.png", b"x")).await.unwrap();
            assert!(ids.insert(receipt.file_id));
        }
        assert_eq!(service.registry.len().await, 100);
    }

    #[tokio::test]
    async fn non_image_is_rejected_without_side_effects() {
        let dir = TempDir::new().unwrap();
        let storage = LocalFileStorage::new(dir.path().to_path_buf()).unwrap();
        let service = UploadService::new(Arc::new(storage));

        for content_type in [
            Some("text/plain"),
            Some("application/octet-stream"),
            Some("IMAGE/PNG"),
            Some("image"),
            None,
        ] {
            let result = service
                .upload(Upload {
                    filename: "notes.txt".to_string(),
                    content_type: content_type.map(str::to_string),
                    bytes: Bytes::from_static(b"hello"),
                })
                .await;
            assert!(matches!(result, Err(ApiError::BadRequest(_))));
        }

        assert!(service.registry.is_empty().await);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    /// Storage whose writes always fail, as a full disk would.
    struct FailingStorage;

    #[async_trait]
    impl Storage for FailingStorage {
        async fn write(&self, _key: &str, _bytes: Bytes) -> Result<(), ApiError> {
            Err(ApiError::Internal)
        }

        async fn open(&self, _key: &str) -> Result<StoredFile, ApiError> {
            Err(ApiError::NotFoundOnDisk)
        }

        async fn exists(&self, _key: &str) -> Result<bool, ApiError> {
            Ok(false)
        }
    }

    #[tokio::test]
    async fn failed_write_registers_nothing() {
        let service = UploadService::new(Arc::new(FailingStorage));

        let result = service.upload(png("cat.png", b"0123456789")).await;

        assert!(matches!(result, Err(ApiError::Internal)));
        assert!(service.registry.is_empty().await);
    }

    #[tokio::test]
    async fn unusual_image_subtypes_are_accepted() {
        let service = UploadService::new(Arc::new(InMemoryStorage::new()));

        for content_type in ["image/svg+xml", "image/x-custom; q=1", "image/"] {
            let receipt = service
                .upload(Upload {
                    filename: "pic.img".to_string(),
                    content_type: Some(content_type.to_string()),
                    bytes: Bytes::from_static(b"x"),
                })
                .await
                .unwrap();
            assert!(service.status(&receipt.file_id).await.is_ok(), "{content_type}");
        }
    }

    #[tokio::test]
    async fn dotted_filename_is_kept_verbatim() {
        let service = UploadService::new(Arc::new(InMemoryStorage::new()));

        let receipt = service
            .upload(png("holiday..final.png", b"x"))
            .await
            .unwrap();

        assert_eq!(receipt.filename, "holiday..final.png");
        let record = service.status(&receipt.file_id).await.unwrap();
        assert_eq!(record.filename, "holiday..final.png");
    }

    #[tokio::test]
    async fn traversal_filename_is_rejected() {
        let service = UploadService::new(Arc::new(InMemoryStorage::new()));

        let result = service.upload(png("../../escape.png", b"x")).await;

        assert!(matches!(result, Err(ApiError::BadRequest(_))));
        assert!(service.registry.is_empty().await);
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let service = UploadService::new(Arc::new(InMemoryStorage::new()));

        assert!(matches!(
            service.status("does-not-exist").await,
            Err(ApiError::NotFound)
        ));
        assert!(matches!(
            service.retrieve("does-not-exist").await,
            Err(ApiError::NotFound)
        ));
    }

    #[tokio::test]
    async fn orphaned_record_is_not_found_on_disk() {
        let storage = InMemoryStorage::new();
        let service = UploadService::new(Arc::new(storage.clone()));

        let receipt = service.upload(png("cat.png", b"meow")).await.unwrap();
        storage
            .remove(&storage_key(&receipt.file_id, "cat.png"))
            .await
            .unwrap();

        // Status still answers from the registry alone.
        assert!(service.status(&receipt.file_id).await.is_ok());
        assert!(matches!(
            service.retrieve(&receipt.file_id).await,
            Err(ApiError::NotFoundOnDisk)
        ));
    }
}
