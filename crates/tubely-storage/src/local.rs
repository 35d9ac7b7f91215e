use crate::traits::{Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::time::Instant;
use tokio::fs;
use tokio::io::{AsyncRead, AsyncWriteExt};

const STAGING_SUFFIX: &str = ".partial";

/// Filesystem-backed `Storage`.
///
/// Used for the thumbnail assets directory, and in place of S3 for the video
/// store during local development. Objects are written under a staging name
/// and renamed into place, so a served key never exposes a half-written file.
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// Open (and create if missing) a store rooted at `base_path`.
    ///
    /// `base_url` is the public prefix the directory is served under, e.g.
    /// `http://localhost:8091/assets`.
    pub async fn new(base_path: impl Into<PathBuf>, base_url: String) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Cannot create storage root {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(Self {
            base_path,
            base_url,
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Resolve a key under the root. Keys may not be empty, absolute, or contain `..`.
    fn resolve(&self, storage_key: &str) -> StorageResult<PathBuf> {
        if storage_key.is_empty() || storage_key.starts_with('/') || storage_key.contains("..") {
            return Err(StorageError::InvalidKey(format!(
                "key not allowed in local storage: {:?}",
                storage_key
            )));
        }

        let path = self.base_path.join(storage_key);
        if !path.starts_with(&self.base_path) {
            return Err(StorageError::InvalidKey(format!(
                "key escapes storage root: {:?}",
                storage_key
            )));
        }
        Ok(path)
    }

    /// Copy `reader` to a staging file next to `path`, then rename it over `path`.
    async fn write_object<R>(&self, path: &Path, reader: &mut R) -> StorageResult<u64>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut staging = path.as_os_str().to_owned();
        staging.push(STAGING_SUFFIX);
        let staging = PathBuf::from(staging);

        let written = async {
            let mut file = fs::File::create(&staging).await?;
            let n = tokio::io::copy(reader, &mut file).await?;
            file.flush().await?;
            file.sync_all().await?;
            fs::rename(&staging, path).await?;
            Ok::<u64, std::io::Error>(n)
        }
        .await;

        written.map_err(|e| {
            if let Err(cleanup) = std::fs::remove_file(&staging) {
                if cleanup.kind() != ErrorKind::NotFound {
                    tracing::warn!(
                        path = %staging.display(),
                        error = %cleanup,
                        "Failed to remove staging file"
                    );
                }
            }
            StorageError::UploadFailed(format!("writing {}: {}", path.display(), e))
        })
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn upload_with_key(
        &self,
        storage_key: &str,
        data: Vec<u8>,
        _content_type: &str,
    ) -> StorageResult<String> {
        let path = self.resolve(storage_key)?;
        let start = Instant::now();

        let size = self.write_object(&path, &mut data.as_slice()).await?;

        tracing::info!(
            key = %storage_key,
            size_bytes = size,
            duration_ms = start.elapsed().as_millis(),
            "Stored object on local disk"
        );
        Ok(self.public_url(storage_key))
    }

    async fn upload_stream_with_key(
        &self,
        storage_key: &str,
        _content_type: &str,
        content_length: Option<u64>,
        mut reader: Pin<Box<dyn AsyncRead + Send + Unpin>>,
    ) -> StorageResult<String> {
        let path = self.resolve(storage_key)?;
        let start = Instant::now();

        let size = self.write_object(&path, &mut reader).await?;
        if let Some(expected) = content_length {
            if expected != size {
                tracing::warn!(
                    key = %storage_key,
                    expected,
                    size,
                    "Stream length differs from declared length"
                );
            }
        }

        tracing::info!(
            key = %storage_key,
            size_bytes = size,
            duration_ms = start.elapsed().as_millis(),
            "Streamed object to local disk"
        );
        Ok(self.public_url(storage_key))
    }

    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        let path = self.resolve(storage_key)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::NotFound(storage_key.to_string()))
            }
            Err(e) => Err(StorageError::DownloadFailed(format!(
                "reading {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        let path = self.resolve(storage_key)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(key = %storage_key, "Deleted object from local disk");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::DeleteFailed(format!(
                "removing {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        let path = self.resolve(storage_key)?;
        Ok(fs::try_exists(&path).await?)
    }

    fn public_url(&self, storage_key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), storage_key)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

#[cfg(all(test, feature = "storage-local"))]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const BASE_URL: &str = "http://localhost:8091/assets";

    #[tokio::test]
    async fn test_local_storage_upload_download() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), BASE_URL.to_string())
            .await
            .unwrap();

        let data = b"\x89PNG test data".to_vec();
        let url = storage
            .upload_with_key("thumb.png", data.clone(), "image/png")
            .await
            .unwrap();

        assert_eq!(url, "http://localhost:8091/assets/thumb.png");
        assert_eq!(storage.download("thumb.png").await.unwrap(), data);
    }

    #[tokio::test]
    async fn test_creates_missing_base_directory() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("assets").join("nested");
        let storage = LocalStorage::new(&nested, BASE_URL.to_string())
            .await
            .unwrap();
        assert!(nested.is_dir());
        assert_eq!(storage.base_path(), nested.as_path());
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), BASE_URL.to_string())
            .await
            .unwrap();

        let result = storage.download("../../../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage.delete("../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage.exists("/etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_local_storage_delete_nonexistent() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), BASE_URL.to_string())
            .await
            .unwrap();

        assert!(storage.delete("landscape/missing.mp4").await.is_ok());
    }

    #[tokio::test]
    async fn test_local_storage_stream_upload_creates_prefix_dir() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), format!("{}/", BASE_URL))
            .await
            .unwrap();

        let data = b"stream test data".to_vec();
        let reader = Box::pin(std::io::Cursor::new(data.clone()))
            as Pin<Box<dyn AsyncRead + Send + Unpin>>;

        let url = storage
            .upload_stream_with_key(
                "landscape/abc.mp4",
                "video/mp4",
                Some(data.len() as u64),
                reader,
            )
            .await
            .unwrap();

        assert_eq!(url, "http://localhost:8091/assets/landscape/abc.mp4");
        assert!(storage.exists("landscape/abc.mp4").await.unwrap());
        assert_eq!(storage.download("landscape/abc.mp4").await.unwrap(), data);
    }

    #[tokio::test]
    async fn test_upload_leaves_no_staging_file() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), BASE_URL.to_string())
            .await
            .unwrap();

        storage
            .upload_with_key("thumb.jpeg", b"jpeg".to_vec(), "image/jpeg")
            .await
            .unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["thumb.jpeg".to_string()]);
    }

    #[tokio::test]
    async fn test_download_missing_is_not_found() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), BASE_URL.to_string())
            .await
            .unwrap();

        let result = storage.download("missing.png").await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }
}
