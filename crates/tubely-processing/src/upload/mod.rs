//! Upload orchestration for videos and thumbnails.

mod orchestrator;

pub use orchestrator::{IngestConfig, UploadOrchestrator};
