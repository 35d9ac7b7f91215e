//! Video processing module

pub mod aspect;
pub mod prober;
pub mod remux;
pub mod video_repository;

pub use aspect::{classify, AspectClass};
pub use prober::{parse_probe_output, FfprobeProber, MediaProber, MediaStream};
pub use remux::{fast_start_output_path, FastStartRemuxer, FfmpegRemuxer};
pub use video_repository::VideoRepository;
