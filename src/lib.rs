//! stt-gateway - an HTTP speech-to-text service
//!
//! This crate exposes one endpoint that accepts an uploaded audio file,
//! normalizes it to 16 kHz mono PCM through an external transcoding
//! process, streams the result through a speech recognizer in fixed-size
//! chunks, and returns the aggregated transcript with a confidence score.
//! It features:
//!
//! - An axum request boundary (`POST /api/speech-to-text`, `GET /api/health`)
//! - Per-request invocation of an external transcoder, awaited without
//!   blocking concurrent requests
//! - Per-request recognizer sessions over one shared, read-only model
//! - Unconditional temp-file cleanup and session disposal on every exit
//!   path, success or failure
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use stt_gateway::pipeline::Pipeline;
//! use stt_gateway::transcode::FfmpegTranscoder;
//!
//! # async fn run(model: Arc<dyn stt_gateway::recognizer::SpeechModel>) -> anyhow::Result<()> {
//! let pipeline = Pipeline::new(Arc::new(FfmpegTranscoder::new()), model);
//! let result = pipeline.run(std::path::Path::new("/tmp/upload")).await?;
//! println!("{} ({:?})", result.transcript, result.confidence);
//! # Ok(())
//! # }
//! ```

pub mod pipeline;
pub mod protocol;
pub mod recognizer;
pub mod server;
pub mod transcode;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types for convenience
pub use pipeline::{Pipeline, PipelineError, Transcription};
pub use protocol::{HealthResponse, TranscriptionResponse};
pub use recognizer::{RecognizerSession, SpeechModel};
pub use transcode::{FfmpegTranscoder, Transcoder};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
