use super::*;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;

/// Flat directory of upload bytes, one file per key.
pub struct LocalFileStorage {
    storage_path: PathBuf,
}

impl LocalFileStorage {
    pub fn new(storage_path: PathBuf) -> Result<Self, ApiError> {
        if !storage_path.exists() {
            std::fs::create_dir_all(&storage_path)
                .map_err(|e| ApiError::io("create storage root", e))?;
        }
        Ok(Self { storage_path })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.storage_path.join(key)
    }

    async fn write_part(part_path: &Path, bytes: &[u8]) -> std::io::Result<()> {
        let mut file = fs::File::create(part_path).await?;
        file.write_all(bytes).await?;
        file.sync_all().await
    }
}

#[async_trait]
impl Storage for LocalFileStorage {
    async fn write(&self, key: &str, bytes: Bytes) -> Result<(), ApiError> {
        let file_path = self.path_for(key);
        let part_path = self.path_for(&format!("{key}.part"));

        // Only complete files ever appear under the final name.
        if let Err(e) = Self::write_part(&part_path, &bytes).await {
            let _ = fs::remove_file(&part_path).await;
            return Err(ApiError::io("write upload", e));
        }

        if let Err(e) = fs::rename(&part_path, &file_path).await {
            let _ = fs::remove_file(&part_path).await;
            return Err(ApiError::io("rename upload into place", e));
        }

        tracing::debug!(path = %file_path.display(), len = bytes.len(), "stored upload");
        Ok(())
    }

    async fn open(&self, key: &str) -> Result<StoredFile, ApiError> {
        let file_path = self.path_for(key);

        let file = match fs::File::open(&file_path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(ApiError::NotFoundOnDisk),
            Err(e) => return Err(ApiError::io("open upload", e)),
        };

        let len = file
            .metadata()
            .await
            .map_err(|e| ApiError::io("stat upload", e))?
            .len();

        Ok(StoredFile {
            body: Body::from_stream(ReaderStream::new(file)),
            len,
        })
    }

    async fn exists(&self, key: &str) -> Result<bool, ApiError> {
        fs::try_exists(self.path_for(key))
            .await
            .map_err(|e| ApiError::io("check upload", e))
    }
}
