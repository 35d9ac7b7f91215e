use anyhow::Context;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tubely_core::Video;
use tubely_processing::VideoRepository;
use uuid::Uuid;

/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

/// Guess a declared content type from a file extension, for when none is given.
pub fn guess_content_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "mp4" | "m4v" => Some("video/mp4"),
        "mov" => Some("video/quicktime"),
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}

/// Video records kept as `{id}.json` files in one directory.
pub struct JsonFileVideoRepository {
    dir: PathBuf,
}

impl JsonFileVideoRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn record_path(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    /// Write a new record, failing if one with the same id exists.
    pub async fn create_video(&self, video: &Video) -> anyhow::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;

        let path = self.record_path(video.id);
        if tokio::fs::try_exists(&path).await? {
            anyhow::bail!("Record {} already exists", video.id);
        }
        self.write(&path, video).await?;
        Ok(path)
    }

    async fn write(&self, path: &Path, video: &Video) -> anyhow::Result<()> {
        let json = serde_json::to_vec_pretty(video).context("Serialize video record")?;
        // Write beside the target then rename, so readers never see a torn record.
        let staging = path.with_extension("json.tmp");
        tokio::fs::write(&staging, json)
            .await
            .with_context(|| format!("Failed to write {}", staging.display()))?;
        tokio::fs::rename(&staging, path)
            .await
            .with_context(|| format!("Failed to replace {}", path.display()))?;
        Ok(())
    }
}

#[async_trait]
impl VideoRepository for JsonFileVideoRepository {
    async fn get_video(&self, id: Uuid) -> anyhow::Result<Option<Video>> {
        let path = self.record_path(id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()))
            }
        };
        let video = serde_json::from_slice(&bytes)
            .with_context(|| format!("Malformed video record {}", path.display()))?;
        Ok(Some(video))
    }

    async fn update_video(&self, video: &Video) -> anyhow::Result<()> {
        let path = self.record_path(video.id);
        if !tokio::fs::try_exists(&path).await? {
            anyhow::bail!("Record {} does not exist", video.id);
        }
        self.write(&path, video).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn guess_content_type_by_extension() {
        assert_eq!(guess_content_type(Path::new("clip.MP4")), Some("video/mp4"));
        assert_eq!(guess_content_type(Path::new("thumb.jpeg")), Some("image/jpeg"));
        assert_eq!(guess_content_type(Path::new("thumb.png")), Some("image/png"));
        assert_eq!(guess_content_type(Path::new("notes.txt")), None);
        assert_eq!(guess_content_type(Path::new("README")), None);
    }

    #[tokio::test]
    async fn repository_round_trip() {
        let dir = tempdir().unwrap();
        let repo = JsonFileVideoRepository::new(dir.path().join("records"));

        let mut video = Video::new(Uuid::new_v4(), "Title", "Description");
        let path = repo.create_video(&video).await.unwrap();
        assert!(path.ends_with(format!("{}.json", video.id)));

        video.set_video_url("https://cdn.example.com/landscape/abc.mp4".to_string());
        repo.update_video(&video).await.unwrap();

        let loaded = repo.get_video(video.id).await.unwrap().unwrap();
        assert_eq!(loaded, video);
    }

    #[tokio::test]
    async fn missing_record_is_none() {
        let dir = tempdir().unwrap();
        let repo = JsonFileVideoRepository::new(dir.path());
        assert!(repo.get_video(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_requires_existing_record() {
        let dir = tempdir().unwrap();
        let repo = JsonFileVideoRepository::new(dir.path());
        let video = Video::new(Uuid::new_v4(), "Title", "");
        assert!(repo.update_video(&video).await.is_err());
    }

    #[tokio::test]
    async fn create_rejects_duplicates() {
        let dir = tempdir().unwrap();
        let repo = JsonFileVideoRepository::new(dir.path());
        let video = Video::new(Uuid::new_v4(), "Title", "");
        repo.create_video(&video).await.unwrap();
        assert!(repo.create_video(&video).await.is_err());
    }

    #[tokio::test]
    async fn malformed_record_is_an_error() {
        let dir = tempdir().unwrap();
        let repo = JsonFileVideoRepository::new(dir.path());
        let id = Uuid::new_v4();
        std::fs::write(dir.path().join(format!("{}.json", id)), b"not json").unwrap();
        assert!(repo.get_video(id).await.is_err());
    }
}
