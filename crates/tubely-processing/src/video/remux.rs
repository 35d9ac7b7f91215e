//! Fast-start remuxing: move the MP4 index to the front without re-encoding.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tubely_core::validation::validate_tool_path;

/// Rewrites a container so playback can start before the download completes.
#[async_trait]
pub trait FastStartRemuxer: Send + Sync {
    /// Stream-copy `input` into `output` with fast-start metadata placement.
    ///
    /// The caller owns `output` and removes it whether or not this succeeds.
    async fn remux(&self, input: &Path, output: &Path) -> Result<()>;
}

/// Output path for a fast-start copy of `input`.
///
/// Same directory and base name, with `.processing` inserted before the
/// extension: `/tmp/upload-x.mp4` becomes `/tmp/upload-x.processing.mp4`.
/// Inputs without an extension get `.mp4`, matching the muxer used.
pub fn fast_start_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = input
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "mp4".to_string());

    input.with_file_name(format!("{}.processing.{}", stem, extension))
}

/// `FastStartRemuxer` backed by the ffmpeg binary.
pub struct FfmpegRemuxer {
    ffmpeg_path: String,
}

impl FfmpegRemuxer {
    pub fn new(ffmpeg_path: String) -> Result<Self> {
        validate_tool_path(&ffmpeg_path).map_err(|e| anyhow!("Invalid ffmpeg_path: {}", e))?;
        Ok(Self { ffmpeg_path })
    }
}

#[async_trait]
impl FastStartRemuxer for FfmpegRemuxer {
    #[tracing::instrument(skip(self), fields(
        process.executable.path = %self.ffmpeg_path,
        ffmpeg.operation = "faststart"
    ))]
    async fn remux(&self, input: &Path, output: &Path) -> Result<()> {
        let start = std::time::Instant::now();

        let result = Command::new(&self.ffmpeg_path)
            .arg("-y")
            .arg("-i")
            .arg(input)
            .args(["-c", "copy", "-movflags", "faststart", "-f", "mp4"])
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .context("Failed to execute ffmpeg")?;

        if !result.status.success() {
            return Err(anyhow!(
                "ffmpeg exited with {}: {}",
                result.status,
                String::from_utf8_lossy(&result.stderr).trim()
            ));
        }

        tracing::info!(
            duration_ms = start.elapsed().as_millis(),
            output = %output.display(),
            "Fast-start remux completed"
        );

        Ok(())
    }
}
