//! HTTP request boundary.
//!
//! Thin by design: it saves the upload to the spool directory, hands the
//! path to the pipeline, and serializes the outcome. All real control flow
//! lives in [`crate::pipeline`].

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::pipeline::Pipeline;
use crate::protocol::{
    FailureResponse, HealthResponse, MissingAudioResponse, TranscriptionResponse,
};

/// Maximum accepted upload size in bytes (50 MB).
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Per-process state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    /// Directory uploads are spooled into; must exist.
    pub spool_dir: PathBuf,
    /// Reported by the health endpoint. True once startup succeeded.
    pub model_loaded: bool,
}

pub fn router(state: AppState) -> Router {
    // The browser frontend posts from a different origin.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/speech-to-text", post(speech_to_text))
        .route("/api/health", get(health))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .with_state(state)
}

/// Bind and serve until the process is signalled to stop.
pub async fn serve(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(
        address = %listener.local_addr().context("failed to read local listener address")?,
        "listening"
    );

    axum::serve(listener, router(state).into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        if let Ok(mut stream) = signal::unix::signal(signal::unix::SignalKind::terminate()) {
            stream.recv().await;
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C signal"),
        _ = terminate => info!("received TERM signal"),
    }
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::new(state.model_loaded))
}

async fn speech_to_text(State(state): State<AppState>, multipart: Multipart) -> Response {
    let upload = match spool_upload(&state.spool_dir, multipart).await {
        Ok(Some(path)) => path,
        Ok(None) => {
            return (StatusCode::BAD_REQUEST, Json(MissingAudioResponse::new())).into_response();
        }
        Err(err) => {
            warn!(error = %err, "failed to spool upload");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(FailureResponse::new("upload_failure", err.to_string())),
            )
                .into_response();
        }
    };

    match state.pipeline.run(&upload).await {
        Ok(result) => {
            Json(TranscriptionResponse::new(result.transcript, result.confidence)).into_response()
        }
        Err(err) => {
            error!(error = %err, kind = err.kind(), "transcription request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(FailureResponse::new(err.kind(), err.to_string())),
            )
                .into_response()
        }
    }
}

/// Write the form's audio file part to a fresh path in the spool
/// directory. Returns `None` when the form carries no file part, which the
/// caller answers with 400 before the transcoder or recognizer is ever
/// touched.
async fn spool_upload(
    spool_dir: &Path,
    mut multipart: Multipart,
) -> anyhow::Result<Option<PathBuf>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .context("failed to read multipart body")?
    {
        let is_file = field.file_name().is_some() || field.name() == Some("audio");
        if !is_file {
            continue;
        }

        let original_name = field.file_name().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .context("failed to read audio file part")?;

        let path = spool_dir.join(Uuid::new_v4().to_string());
        tokio::fs::write(&path, &bytes)
            .await
            .with_context(|| format!("failed to spool upload to {}", path.display()))?;

        info!(
            upload = %path.display(),
            original = original_name.as_deref().unwrap_or("<unnamed>"),
            bytes = bytes.len(),
            "upload received"
        );
        return Ok(Some(path));
    }

    Ok(None)
}
