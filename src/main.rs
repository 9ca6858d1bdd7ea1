use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use stt_gateway::pipeline::Pipeline;
use stt_gateway::recognizer::SpeechModel;
use stt_gateway::server::{self, AppState};
use stt_gateway::transcode::FfmpegTranscoder;
use tracing::info;

#[derive(Parser)]
#[command(name = "stt-gateway")]
#[command(about = "HTTP speech-to-text service: ffmpeg transcode, Vosk recognition")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Args {
    /// Speech model directory (download from https://alphacephei.com/vosk/models)
    #[arg(
        long,
        env = "MODEL_PATH",
        default_value = "models/vosk-model-small-en-us-0.15"
    )]
    model_path: PathBuf,

    /// Listen port
    #[arg(long, env = "PORT", default_value = "5000")]
    port: u16,

    /// Listen host
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Directory for uploaded and converted temp files
    #[arg(long, env = "UPLOAD_DIR", default_value = "uploads")]
    upload_dir: PathBuf,

    /// Transcoder binary
    #[arg(long, default_value = "ffmpeg")]
    ffmpeg: String,

    /// Log filter, overridden by RUST_LOG
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| args.log_level.clone()))
        .with_target(false)
        .init();

    info!("Starting stt-gateway v{}", stt_gateway::VERSION);
    info!("Configuration:");
    info!("  Model path: {}", args.model_path.display());
    info!("  Upload dir: {}", args.upload_dir.display());
    info!("  Transcoder: {}", args.ffmpeg);
    info!("  Listen: {}:{}", args.host, args.port);

    // The model loads once, before the listener binds. No endpoint is
    // reachable without it.
    let model = load_model(&args.model_path)?;

    tokio::fs::create_dir_all(&args.upload_dir)
        .await
        .with_context(|| {
            format!(
                "failed to create upload directory {}",
                args.upload_dir.display()
            )
        })?;

    let pipeline = Pipeline::new(
        Arc::new(FfmpegTranscoder::with_command(&args.ffmpeg)),
        model,
    );
    let state = AppState {
        pipeline: Arc::new(pipeline),
        spool_dir: args.upload_dir.clone(),
        model_loaded: true,
    };

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .context("failed to parse listen address")?;

    server::serve(state, addr).await
}

/// Load the acoustic model, refusing startup when it cannot be loaded.
fn load_model(path: &Path) -> Result<Arc<dyn SpeechModel>> {
    anyhow::ensure!(
        path.exists(),
        "model not found at {}; download one from https://alphacephei.com/vosk/models",
        path.display()
    );

    #[cfg(feature = "vosk")]
    {
        let model = stt_gateway::recognizer::vosk::VoskModel::load(path)
            .context("failed to load speech model")?;
        info!("speech model loaded");
        Ok(Arc::new(model))
    }

    #[cfg(not(feature = "vosk"))]
    {
        anyhow::bail!("built without a speech engine; rebuild with --features vosk")
    }
}
