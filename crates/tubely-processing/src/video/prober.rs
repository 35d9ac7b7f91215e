//! Media prober - stream geometry extraction via ffprobe

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tubely_core::validation::validate_tool_path;

/// One stream entry as reported by the prober.
///
/// Streams without geometry (audio, data) decode with zero width and height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct MediaStream {
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<MediaStream>,
}

/// Extracts stream geometry from a local media file.
#[async_trait]
pub trait MediaProber: Send + Sync {
    /// Probe `path` and return its streams in reported order.
    async fn probe(&self, path: &Path) -> Result<Vec<MediaStream>>;
}

/// Decode ffprobe's `-print_format json -show_streams` output.
pub fn parse_probe_output(stdout: &[u8]) -> Result<Vec<MediaStream>> {
    let output: ProbeOutput =
        serde_json::from_slice(stdout).context("Failed to parse ffprobe output")?;
    Ok(output.streams)
}

/// `MediaProber` backed by the ffprobe binary.
pub struct FfprobeProber {
    ffprobe_path: String,
}

impl FfprobeProber {
    pub fn new(ffprobe_path: String) -> Result<Self> {
        validate_tool_path(&ffprobe_path)
            .map_err(|e| anyhow!("Invalid ffprobe_path: {}", e))?;
        Ok(Self { ffprobe_path })
    }

    /// ffprobe invocation for `path`. Every stream is reported, in container order.
    fn command(&self, path: &Path) -> Command {
        let mut cmd = Command::new(&self.ffprobe_path);
        cmd.args(["-v", "error", "-print_format", "json", "-show_streams"])
            .arg(path)
            .stdin(Stdio::null());
        cmd
    }
}

#[async_trait]
impl MediaProber for FfprobeProber {
    #[tracing::instrument(skip(self), fields(
        process.executable.path = %self.ffprobe_path,
        ffmpeg.operation = "probe"
    ))]
    async fn probe(&self, path: &Path) -> Result<Vec<MediaStream>> {
        let start = std::time::Instant::now();

        let output = self
            .command(path)
            .output()
            .await
            .context("Failed to execute ffprobe")?;

        if !output.status.success() {
            return Err(anyhow!(
                "ffprobe exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }

        let streams = parse_probe_output(&output.stdout)?;

        tracing::info!(
            duration_ms = start.elapsed().as_millis(),
            stream_count = streams.len(),
            "Video probe completed"
        );

        Ok(streams)
    }
}
