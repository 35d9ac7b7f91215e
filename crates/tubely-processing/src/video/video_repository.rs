//! Abstraction over the video metadata store.
//!
//! Record CRUD belongs to the caller. Ingestion reads a record by id and writes
//! back its thumbnail or video URL.

use async_trait::async_trait;
use tubely_core::Video;
use uuid::Uuid;

#[async_trait]
pub trait VideoRepository: Send + Sync {
    /// Fetch a video record, `None` if no such id.
    async fn get_video(&self, id: Uuid) -> anyhow::Result<Option<Video>>;

    /// Persist an updated record.
    async fn update_video(&self, video: &Video) -> anyhow::Result<()>;
}
