//! Tubely CLI - runs one video or thumbnail ingestion per invocation.
//!
//! Storage and tool paths come from the environment (see `Config::from_env`).
//! Video records live as JSON files under `--records-dir`.

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tubely_cli::{guess_content_type, init_tracing, JsonFileVideoRepository};
use tubely_core::{Config, ErrorMetadata, IngestError, LogLevel, Video};
use tubely_processing::{FfmpegRemuxer, FfprobeProber, IngestConfig, UploadOrchestrator};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "tubely", about = "Video ingestion pipeline")]
struct Cli {
    /// Directory holding `{id}.json` video records
    #[arg(long, global = true, default_value = "./records")]
    records_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty video record
    CreateVideo {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Owning user; random if omitted
        #[arg(long)]
        user_id: Option<Uuid>,
    },
    /// Probe, optimize and upload a video file
    UploadVideo {
        /// Path to the video file
        file: PathBuf,
        #[arg(long)]
        video_id: Uuid,
        /// Declared content type; guessed from the extension if omitted
        #[arg(long)]
        content_type: Option<String>,
    },
    /// Store a thumbnail image in the assets directory
    UploadThumbnail {
        /// Path to the image file
        file: PathBuf,
        #[arg(long)]
        video_id: Uuid,
        /// Declared content type; guessed from the extension if omitted
        #[arg(long)]
        content_type: Option<String>,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

fn declared_content_type(file: &Path, explicit: Option<String>) -> anyhow::Result<String> {
    match explicit {
        Some(ct) => Ok(ct),
        None => guess_content_type(file)
            .map(String::from)
            .with_context(|| {
                format!(
                    "Cannot guess content type of {}; pass --content-type",
                    file.display()
                )
            }),
    }
}

async fn build_orchestrator(
    records: Arc<JsonFileVideoRepository>,
) -> anyhow::Result<UploadOrchestrator> {
    let config = Config::from_env().context("Failed to load configuration")?;

    let video_storage = tubely_storage::create_storage(&config)
        .await
        .context("Failed to initialize video storage")?;
    let asset_storage = tubely_storage::create_asset_storage(&config)
        .await
        .context("Failed to initialize assets directory")?;

    tracing::debug!(
        backend = %video_storage.backend_type(),
        assets_root = %config.assets_root.display(),
        "Storage initialized"
    );

    let prober = FfprobeProber::new(config.ffprobe_path.clone())?;
    let remuxer = FfmpegRemuxer::new(config.ffmpeg_path.clone())?;

    Ok(UploadOrchestrator::new(
        IngestConfig::from_config(&config),
        Arc::new(prober),
        Arc::new(remuxer),
        video_storage,
        asset_storage,
        records,
    ))
}

fn report(result: Result<Video, IngestError>) -> anyhow::Result<Video> {
    result.map_err(|e| {
        let details = e.detailed_message();
        match e.log_level() {
            LogLevel::Debug => {
                tracing::debug!(stage = e.stage(), error = %details, "Ingestion rejected")
            }
            LogLevel::Warn => {
                tracing::warn!(stage = e.stage(), error = %details, "Ingestion failed")
            }
            LogLevel::Error => {
                tracing::error!(stage = e.stage(), error = %details, "Ingestion failed")
            }
        }
        anyhow::anyhow!("{} ({})", e.client_message(), e.error_code())
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let records = Arc::new(JsonFileVideoRepository::new(&cli.records_dir));

    match cli.command {
        Commands::CreateVideo {
            title,
            description,
            user_id,
        } => {
            let video = Video::new(user_id.unwrap_or_else(Uuid::new_v4), title, description);
            records.create_video(&video).await?;
            print_json(&video)?;
        }
        Commands::UploadVideo {
            file,
            video_id,
            content_type,
        } => {
            let content_type = declared_content_type(&file, content_type)?;
            let orchestrator = build_orchestrator(records).await?;
            let reader = tokio::fs::File::open(&file)
                .await
                .with_context(|| format!("Failed to open {}", file.display()))?;
            let video = report(orchestrator.ingest_video(video_id, &content_type, reader).await)?;
            print_json(&video)?;
        }
        Commands::UploadThumbnail {
            file,
            video_id,
            content_type,
        } => {
            let content_type = declared_content_type(&file, content_type)?;
            let orchestrator = build_orchestrator(records).await?;
            let reader = tokio::fs::File::open(&file)
                .await
                .with_context(|| format!("Failed to open {}", file.display()))?;
            let video =
                report(orchestrator.ingest_thumbnail(video_id, &content_type, reader).await)?;
            print_json(&video)?;
        }
    }

    Ok(())
}
