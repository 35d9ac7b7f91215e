#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::io::AsyncRead;
use tubely_core::Video;
use tubely_processing::{
    FastStartRemuxer, IngestConfig, MediaProber, MediaStream, UploadOrchestrator, VideoRepository,
};
use tubely_storage::{LocalStorage, Storage, StorageBackend, StorageError, StorageResult};
use uuid::Uuid;

pub const VIDEO_BASE_URL: &str = "https://cdn.test.example";
pub const ASSETS_BASE_URL: &str = "http://localhost:8091/assets";

/// Prober returning a fixed stream list.
pub struct FakeProber {
    streams: Vec<MediaStream>,
    fail: bool,
    pub calls: AtomicUsize,
}

impl FakeProber {
    pub fn with_geometry(width: u32, height: u32) -> Self {
        Self::with_streams(vec![MediaStream { width, height }])
    }

    pub fn with_streams(streams: Vec<MediaStream>) -> Self {
        Self {
            streams,
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            streams: Vec::new(),
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl MediaProber for FakeProber {
    async fn probe(&self, path: &Path) -> Result<Vec<MediaStream>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !path.exists() {
            return Err(anyhow!("input missing: {}", path.display()));
        }
        if self.fail {
            return Err(anyhow!("moov atom not found"));
        }
        Ok(self.streams.clone())
    }
}

/// Remuxer that copies input to output, or writes a partial output and fails.
pub struct FakeRemuxer {
    fail: bool,
    pub calls: AtomicUsize,
}

impl FakeRemuxer {
    pub fn copying() -> Self {
        Self {
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl FastStartRemuxer for FakeRemuxer {
    async fn remux(&self, input: &Path, output: &Path) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            tokio::fs::write(output, b"partial").await?;
            return Err(anyhow!("ffmpeg exited with exit status: 1"));
        }
        tokio::fs::copy(input, output).await?;
        Ok(())
    }
}

/// Storage sink that rejects every write.
pub struct FailingStorage {
    pub calls: AtomicUsize,
}

impl FailingStorage {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Storage for FailingStorage {
    async fn upload_with_key(
        &self,
        _storage_key: &str,
        _data: Vec<u8>,
        _content_type: &str,
    ) -> StorageResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(StorageError::UploadFailed("connection reset".to_string()))
    }

    async fn upload_stream_with_key(
        &self,
        _storage_key: &str,
        _content_type: &str,
        _content_length: Option<u64>,
        _reader: Pin<Box<dyn AsyncRead + Send + Unpin>>,
    ) -> StorageResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(StorageError::UploadFailed("connection reset".to_string()))
    }

    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        Err(StorageError::NotFound(storage_key.to_string()))
    }

    async fn delete(&self, _storage_key: &str) -> StorageResult<()> {
        Ok(())
    }

    async fn exists(&self, _storage_key: &str) -> StorageResult<bool> {
        Ok(false)
    }

    fn public_url(&self, storage_key: &str) -> String {
        format!("{}/{}", VIDEO_BASE_URL, storage_key)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}

/// Local storage that, once an object is stored, replaces every remux output in
/// `temp_dir` with a non-empty directory so the file can no longer be removed.
pub struct OutputPinningStorage {
    inner: LocalStorage,
    temp_dir: PathBuf,
}

impl OutputPinningStorage {
    fn pin_outputs(&self) -> std::io::Result<()> {
        for entry in std::fs::read_dir(&self.temp_dir)? {
            let path = entry?.path();
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            if name.ends_with(".processing.mp4") && path.is_file() {
                std::fs::remove_file(&path)?;
                std::fs::create_dir(&path)?;
                std::fs::write(path.join("pinned"), b"x")?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Storage for OutputPinningStorage {
    async fn upload_with_key(
        &self,
        storage_key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<String> {
        self.inner
            .upload_with_key(storage_key, data, content_type)
            .await
    }

    async fn upload_stream_with_key(
        &self,
        storage_key: &str,
        content_type: &str,
        content_length: Option<u64>,
        reader: Pin<Box<dyn AsyncRead + Send + Unpin>>,
    ) -> StorageResult<String> {
        let url = self
            .inner
            .upload_stream_with_key(storage_key, content_type, content_length, reader)
            .await?;
        self.pin_outputs()?;
        Ok(url)
    }

    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        self.inner.download(storage_key).await
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        self.inner.delete(storage_key).await
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        self.inner.exists(storage_key).await
    }

    fn public_url(&self, storage_key: &str) -> String {
        self.inner.public_url(storage_key)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

/// In-memory record store.
#[derive(Default)]
pub struct InMemoryVideos {
    videos: Mutex<HashMap<Uuid, Video>>,
    fail_updates: AtomicBool,
    fail_lookups: AtomicBool,
}

impl InMemoryVideos {
    pub fn insert(&self, video: Video) {
        self.videos.lock().unwrap().insert(video.id, video);
    }

    pub fn get(&self, id: Uuid) -> Option<Video> {
        self.videos.lock().unwrap().get(&id).cloned()
    }

    pub fn fail_updates(&self) {
        self.fail_updates.store(true, Ordering::SeqCst);
    }

    pub fn fail_lookups(&self) {
        self.fail_lookups.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl VideoRepository for InMemoryVideos {
    async fn get_video(&self, id: Uuid) -> Result<Option<Video>> {
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(anyhow!("database unavailable"));
        }
        Ok(self.get(id))
    }

    async fn update_video(&self, video: &Video) -> Result<()> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(anyhow!("database unavailable"));
        }
        self.videos.lock().unwrap().insert(video.id, video.clone());
        Ok(())
    }
}

/// Orchestrator wired to fakes, with its temp dir and sinks under one root.
pub struct TestHarness {
    pub orchestrator: UploadOrchestrator,
    pub prober: Arc<FakeProber>,
    pub remuxer: Arc<FakeRemuxer>,
    pub videos: Arc<InMemoryVideos>,
    pub video: Video,
    pub root: TempDir,
}

impl TestHarness {
    pub fn temp_dir(&self) -> std::path::PathBuf {
        self.root.path().join("tmp")
    }

    pub fn video_dir(&self) -> std::path::PathBuf {
        self.root.path().join("videos")
    }

    pub fn assets_dir(&self) -> std::path::PathBuf {
        self.root.path().join("assets")
    }

    /// Names of files left in the temp dir.
    pub fn leftover_temp_files(&self) -> Vec<String> {
        std::fs::read_dir(self.temp_dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }
}

pub struct HarnessBuilder {
    prober: FakeProber,
    remuxer: FakeRemuxer,
    failing_storage: bool,
    pin_remux_output: bool,
    max_video_size_bytes: u64,
    max_thumbnail_size_bytes: u64,
}

impl HarnessBuilder {
    pub fn new() -> Self {
        Self {
            prober: FakeProber::with_geometry(1920, 1080),
            remuxer: FakeRemuxer::copying(),
            failing_storage: false,
            pin_remux_output: false,
            max_video_size_bytes: 1024 * 1024,
            max_thumbnail_size_bytes: 1024,
        }
    }

    pub fn prober(mut self, prober: FakeProber) -> Self {
        self.prober = prober;
        self
    }

    pub fn remuxer(mut self, remuxer: FakeRemuxer) -> Self {
        self.remuxer = remuxer;
        self
    }

    pub fn failing_storage(mut self) -> Self {
        self.failing_storage = true;
        self
    }

    /// Make the remux output impossible to delete once the upload completes.
    pub fn pin_remux_output(mut self) -> Self {
        self.pin_remux_output = true;
        self
    }

    pub fn max_video_size_bytes(mut self, limit: u64) -> Self {
        self.max_video_size_bytes = limit;
        self
    }

    pub fn max_thumbnail_size_bytes(mut self, limit: u64) -> Self {
        self.max_thumbnail_size_bytes = limit;
        self
    }

    pub async fn build(self) -> TestHarness {
        let root = tempfile::tempdir().unwrap();
        let temp_dir = root.path().join("tmp");
        std::fs::create_dir_all(&temp_dir).unwrap();

        let local_videos =
            LocalStorage::new(root.path().join("videos"), VIDEO_BASE_URL.to_string())
                .await
                .unwrap();
        let video_storage: Arc<dyn Storage> = if self.failing_storage {
            Arc::new(FailingStorage::new())
        } else if self.pin_remux_output {
            Arc::new(OutputPinningStorage {
                inner: local_videos,
                temp_dir: temp_dir.clone(),
            })
        } else {
            Arc::new(local_videos)
        };
        let asset_storage: Arc<dyn Storage> = Arc::new(
            LocalStorage::new(root.path().join("assets"), ASSETS_BASE_URL.to_string())
                .await
                .unwrap(),
        );

        let videos = Arc::new(InMemoryVideos::default());
        let video = Video::new(Uuid::new_v4(), "Boot camp", "Learn Rust");
        videos.insert(video.clone());

        let prober = Arc::new(self.prober);
        let remuxer = Arc::new(self.remuxer);

        let config = IngestConfig {
            temp_dir,
            max_video_size_bytes: self.max_video_size_bytes,
            max_thumbnail_size_bytes: self.max_thumbnail_size_bytes,
            video_allowed_content_types: vec!["video/mp4".to_string()],
            thumbnail_allowed_content_types: vec![
                "image/jpeg".to_string(),
                "image/png".to_string(),
            ],
        };

        let orchestrator = UploadOrchestrator::new(
            config,
            prober.clone(),
            remuxer.clone(),
            video_storage,
            asset_storage,
            videos.clone(),
        );

        TestHarness {
            orchestrator,
            prober,
            remuxer,
            videos,
            video,
            root,
        }
    }
}

/// Relative paths of every file under `dir`.
pub fn files_under(dir: &Path) -> Vec<String> {
    let mut out = Vec::new();
    collect(dir, dir, &mut out);
    out.sort();
    out
}

fn collect(root: &Path, dir: &Path, out: &mut Vec<String>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries {
        let path = entry.unwrap().path();
        if path.is_dir() {
            collect(root, &path, out);
        } else {
            out.push(
                path.strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .into_owned(),
            );
        }
    }
}
