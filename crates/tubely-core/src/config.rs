//! Configuration module
//!
//! Process-wide settings for storage, the external media tools, and upload limits.
//! The struct is built once at startup and passed by reference to whatever needs it.

use std::env;
use std::path::PathBuf;

use crate::storage_types::StorageBackend;

const SERVER_PORT: u16 = 8091;
const MAX_VIDEO_SIZE_MB: usize = 1024;
const MAX_THUMBNAIL_SIZE_MB: usize = 10;

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    // Video store
    pub storage_backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO etc.)
    pub aws_region: Option<String>,
    /// CDN distribution base. When set, public video URLs are `{base}/{key}`.
    pub s3_cf_distribution: Option<String>,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    // Locally served thumbnail assets
    pub assets_root: PathBuf,
    pub assets_base_url: String,
    // External tools
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    // Upload handling
    pub upload_temp_dir: Option<PathBuf>,
    pub max_video_size_bytes: usize,
    pub max_thumbnail_size_bytes: usize,
    pub video_allowed_content_types: Vec<String>,
    pub thumbnail_allowed_content_types: Vec<String>,
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse a megabyte limit from `raw` (or `default_mb` when unset) into bytes.
fn size_limit_bytes(
    name: &str,
    raw: Option<String>,
    default_mb: usize,
) -> Result<usize, anyhow::Error> {
    let mb = match raw {
        Some(value) => value
            .trim()
            .parse::<usize>()
            .map_err(|_| anyhow::anyhow!("{} must be a valid number", name))?,
        None => default_mb,
    };
    mb.checked_mul(1024 * 1024)
        .ok_or_else(|| anyhow::anyhow!("{} is too large", name))
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let server_port: u16 = env::var("PORT")
            .unwrap_or_else(|_| SERVER_PORT.to_string())
            .parse()
            .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?;

        let storage_backend = match env::var("STORAGE_BACKEND") {
            Ok(value) => value.parse()?,
            Err(_) => StorageBackend::S3,
        };

        let config = Config {
            server_port,
            storage_backend,
            s3_bucket: env::var("S3_BUCKET").ok(),
            s3_region: env::var("S3_REGION").ok(),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            aws_region: env::var("AWS_REGION").ok(),
            s3_cf_distribution: env::var("S3_CF_DISTRIBUTION")
                .ok()
                .filter(|s| !s.is_empty()),
            local_storage_path: env::var("LOCAL_STORAGE_PATH").ok(),
            local_storage_base_url: env::var("LOCAL_STORAGE_BASE_URL").ok(),
            assets_root: env::var("ASSETS_ROOT")
                .unwrap_or_else(|_| "./assets".to_string())
                .into(),
            assets_base_url: env::var("ASSETS_BASE_URL")
                .unwrap_or_else(|_| format!("http://localhost:{}/assets", server_port)),
            ffmpeg_path: env::var("FFMPEG_PATH").unwrap_or_else(|_| "ffmpeg".to_string()),
            ffprobe_path: env::var("FFPROBE_PATH").unwrap_or_else(|_| "ffprobe".to_string()),
            upload_temp_dir: env::var("UPLOAD_TEMP_DIR").ok().map(PathBuf::from),
            max_video_size_bytes: size_limit_bytes(
                "MAX_VIDEO_SIZE_MB",
                env::var("MAX_VIDEO_SIZE_MB").ok(),
                MAX_VIDEO_SIZE_MB,
            )?,
            max_thumbnail_size_bytes: size_limit_bytes(
                "MAX_THUMBNAIL_SIZE_MB",
                env::var("MAX_THUMBNAIL_SIZE_MB").ok(),
                MAX_THUMBNAIL_SIZE_MB,
            )?,
            video_allowed_content_types: split_list(
                &env::var("VIDEO_ALLOWED_CONTENT_TYPES").unwrap_or_else(|_| "video/mp4".to_string()),
            ),
            thumbnail_allowed_content_types: split_list(
                &env::var("THUMBNAIL_ALLOWED_CONTENT_TYPES")
                    .unwrap_or_else(|_| "image/jpeg,image/png".to_string()),
            ),
        };

        config.validate()?;
        Ok(config)
    }

    /// S3 region, falling back to `AWS_REGION`.
    pub fn s3_region(&self) -> Option<&str> {
        self.s3_region.as_deref().or(self.aws_region.as_deref())
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        match self.storage_backend {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set when using S3 storage backend"
                    ));
                }
                if self.s3_region().is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when using S3 storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
                if self.local_storage_base_url.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_BASE_URL must be set when using local storage backend"
                    ));
                }
            }
        }

        if self.max_video_size_bytes == 0 || self.max_thumbnail_size_bytes == 0 {
            return Err(anyhow::anyhow!("Upload size limits must be greater than zero"));
        }

        crate::validation::validate_tool_path(&self.ffmpeg_path)
            .map_err(|e| anyhow::anyhow!("Invalid FFMPEG_PATH: {}", e))?;
        crate::validation::validate_tool_path(&self.ffprobe_path)
            .map_err(|e| anyhow::anyhow!("Invalid FFPROBE_PATH: {}", e))?;

        Ok(())
    }
}
