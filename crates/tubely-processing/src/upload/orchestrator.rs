//! Video and thumbnail ingestion: buffer → probe → classify → remux → key → upload → record.
//!
//! Each request runs strictly in sequence; every stage needs the artifact the
//! previous one produced. Temporary files are held in `TempArtifact` guards, so
//! they are removed on success, on every error return, and when the request
//! future is dropped mid-flight.

use std::io::SeekFrom;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use uuid::Uuid;

use tubely_core::validation::ensure_allowed_content_type;
use tubely_core::{Config, IngestError, Video};
use tubely_storage::{AssetKey, Storage};

use crate::artifact::TempArtifact;
use crate::video::{classify, fast_start_output_path, FastStartRemuxer, MediaProber, VideoRepository};

const UPLOAD_TEMP_PREFIX: &str = "tubely-upload-";

/// Settings the orchestrator needs, taken from `Config` at construction.
#[derive(Clone, Debug)]
pub struct IngestConfig {
    pub temp_dir: PathBuf,
    pub max_video_size_bytes: u64,
    pub max_thumbnail_size_bytes: u64,
    pub video_allowed_content_types: Vec<String>,
    pub thumbnail_allowed_content_types: Vec<String>,
}

impl IngestConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            temp_dir: config
                .upload_temp_dir
                .clone()
                .unwrap_or_else(std::env::temp_dir),
            max_video_size_bytes: config.max_video_size_bytes as u64,
            max_thumbnail_size_bytes: config.max_thumbnail_size_bytes as u64,
            video_allowed_content_types: config.video_allowed_content_types.clone(),
            thumbnail_allowed_content_types: config.thumbnail_allowed_content_types.clone(),
        }
    }
}

/// Locally buffered copy of an upload, rewound to the start.
///
/// `_file` is declared first so the handle closes before the artifact is removed.
struct BufferedUpload {
    _file: tokio::fs::File,
    artifact: TempArtifact,
    size: u64,
}

impl BufferedUpload {
    /// Close the handle and hand back the artifact.
    fn into_artifact(self) -> TempArtifact {
        let BufferedUpload {
            _file: file,
            artifact,
            ..
        } = self;
        drop(file);
        artifact
    }
}

/// Remove an artifact at the end of a successful request.
///
/// The request has already succeeded, so a failure is logged and left behind.
fn discard(artifact: TempArtifact) {
    let path = artifact.path().to_path_buf();
    if let Err(e) = artifact.remove() {
        tracing::warn!(
            path = %path.display(),
            error = %e,
            "Failed to remove temporary artifact"
        );
    }
}

/// Sequences ingestion and owns every temporary artifact it creates.
pub struct UploadOrchestrator {
    config: IngestConfig,
    prober: Arc<dyn MediaProber>,
    remuxer: Arc<dyn FastStartRemuxer>,
    video_storage: Arc<dyn Storage>,
    asset_storage: Arc<dyn Storage>,
    videos: Arc<dyn VideoRepository>,
}

impl UploadOrchestrator {
    pub fn new(
        config: IngestConfig,
        prober: Arc<dyn MediaProber>,
        remuxer: Arc<dyn FastStartRemuxer>,
        video_storage: Arc<dyn Storage>,
        asset_storage: Arc<dyn Storage>,
        videos: Arc<dyn VideoRepository>,
    ) -> Self {
        Self {
            config,
            prober,
            remuxer,
            video_storage,
            asset_storage,
            videos,
        }
    }

    /// Ingest a video upload and set the record's video URL.
    ///
    /// On success the returned record carries the public URL of the optimized
    /// file. If the metadata update fails after the upload succeeded, the
    /// uploaded object stays in place and `MetadataUpdate` is returned.
    pub async fn ingest_video<R>(
        &self,
        video_id: Uuid,
        content_type: &str,
        reader: R,
    ) -> Result<Video, IngestError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let media_type =
            ensure_allowed_content_type(content_type, &self.config.video_allowed_content_types)?;
        let mut video = self.load_video(video_id).await?;

        tracing::info!(video_id = %video_id, content_type = %media_type, "Starting video ingestion");

        let source = self
            .buffer_upload(reader, &media_type, self.config.max_video_size_bytes)
            .await?;

        let streams = self
            .prober
            .probe(source.artifact.path())
            .await
            .map_err(|e| IngestError::Probe(format!("{:#}", e)))?;
        let stream = streams
            .first()
            .ok_or_else(|| IngestError::Probe("no streams reported".to_string()))?;
        let aspect = classify(stream.width, stream.height);

        tracing::info!(
            video_id = %video_id,
            width = stream.width,
            height = stream.height,
            aspect = %aspect,
            "Video probed"
        );

        let optimized = TempArtifact::new(fast_start_output_path(source.artifact.path()));
        self.remuxer
            .remux(source.artifact.path(), optimized.path())
            .await
            .map_err(|e| IngestError::Remux(format!("{:#}", e)))?;

        let file = tokio::fs::File::open(optimized.path()).await?;
        let optimized_size = file.metadata().await?.len();

        let key = AssetKey::generate(Some(aspect.folder()), &media_type)
            .map_err(|e| IngestError::KeyDerivation(e.to_string()))?
            .to_string();

        let url = self
            .video_storage
            .upload_stream_with_key(&key, &media_type, Some(optimized_size), Box::pin(file))
            .await
            .map_err(|e| IngestError::Upload(e.to_string()))?;

        tracing::info!(
            video_id = %video_id,
            key = %key,
            source_bytes = source.size,
            size_bytes = optimized_size,
            "Optimized video uploaded"
        );

        video.set_video_url(url);
        if let Err(e) = self.videos.update_video(&video).await {
            tracing::warn!(
                video_id = %video_id,
                key = %key,
                error = %e,
                "Video uploaded but record update failed; object left in place"
            );
            return Err(IngestError::MetadataUpdate(format!("{:#}", e)));
        }

        discard(optimized);
        discard(source.into_artifact());

        Ok(video)
    }

    /// Store a thumbnail in the local assets directory and set the record's thumbnail URL.
    pub async fn ingest_thumbnail<R>(
        &self,
        video_id: Uuid,
        content_type: &str,
        reader: R,
    ) -> Result<Video, IngestError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let media_type = ensure_allowed_content_type(
            content_type,
            &self.config.thumbnail_allowed_content_types,
        )?;
        let mut video = self.load_video(video_id).await?;

        let limit = self.config.max_thumbnail_size_bytes;
        let mut data = Vec::new();
        reader.take(limit + 1).read_to_end(&mut data).await?;
        if data.len() as u64 > limit {
            return Err(IngestError::PayloadTooLarge {
                size: data.len() as u64,
                limit,
            });
        }

        let key = AssetKey::generate(None, &media_type)
            .map_err(|e| IngestError::KeyDerivation(e.to_string()))?
            .to_string();

        let url = self
            .asset_storage
            .upload_with_key(&key, data, &media_type)
            .await
            .map_err(|e| IngestError::Upload(e.to_string()))?;

        tracing::info!(video_id = %video_id, key = %key, "Thumbnail stored");

        video.set_thumbnail_url(url);
        self.videos
            .update_video(&video)
            .await
            .map_err(|e| IngestError::MetadataUpdate(format!("{:#}", e)))?;

        Ok(video)
    }

    async fn load_video(&self, video_id: Uuid) -> Result<Video, IngestError> {
        self.videos
            .get_video(video_id)
            .await
            .map_err(|e| IngestError::MetadataLookup(format!("{:#}", e)))?
            .ok_or_else(|| IngestError::VideoNotFound(video_id.to_string()))
    }

    /// Copy the upload into a fresh temp file, capped at `limit` bytes.
    async fn buffer_upload<R>(
        &self,
        reader: R,
        media_type: &str,
        limit: u64,
    ) -> Result<BufferedUpload, IngestError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let suffix = tubely_storage::media_type_extension(media_type);
        let (artifact, file) =
            TempArtifact::create_in(&self.config.temp_dir, UPLOAD_TEMP_PREFIX, &suffix)?;
        let mut file = tokio::fs::File::from_std(file);

        let size = tokio::io::copy(&mut reader.take(limit + 1), &mut file).await?;
        if size > limit {
            return Err(IngestError::PayloadTooLarge { size, limit });
        }

        file.flush().await?;
        file.sync_all().await?;
        file.seek(SeekFrom::Start(0)).await?;

        Ok(BufferedUpload {
            _file: file,
            artifact,
            size,
        })
    }
}
