//! Tubely Media Processing Library
//!
//! Video ingestion: buffer the upload, probe its geometry, classify the aspect
//! ratio, remux for fast start, derive a storage key, upload, and record the URL.
//! Thumbnails skip the probe and remux stages and land in the local assets store.

pub mod artifact;
pub mod upload;
pub mod video;

// Re-export commonly used types
pub use artifact::TempArtifact;
pub use upload::{IngestConfig, UploadOrchestrator};
pub use video::{
    classify, fast_start_output_path, parse_probe_output, AspectClass, FastStartRemuxer,
    FfmpegRemuxer, FfprobeProber, MediaProber, MediaStream, VideoRepository,
};
