//! The audio ingestion and transcription pipeline.
//!
//! Orchestrates one request end to end: transcode the upload, read the
//! converted PCM, feed it through a recognizer session in fixed-size
//! chunks, aggregate the segments, and clean up. Failure from any stage
//! still deletes both temp files and disposes the session.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio::task;
use tracing::{debug, warn};

use crate::recognizer::{RecognitionError, SpeechModel, DEFAULT_CHUNK_SIZE, SAMPLE_RATE};
use crate::transcode::{TranscodeError, Transcoder};

/// Where a request currently sits. Every non-terminal stage has a failure
/// edge; `Completed` and failure are terminal, with no automatic retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Transcoding,
    Transcoded,
    Recognizing,
    Completed,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Transcoding => "transcoding",
            Self::Transcoded => "transcoded",
            Self::Recognizing => "recognizing",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Failure of one request, tagged by the stage that produced it.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The request carried no audio file part. Client error; neither the
    /// transcoder nor the recognizer was invoked.
    #[error("no audio file provided")]
    NoAudioProvided,
    #[error("transcoding failed: {0}")]
    Transcode(#[from] TranscodeError),
    #[error("recognition failed: {0}")]
    Recognition(#[from] RecognitionError),
}

impl PipelineError {
    /// Machine-readable kind for the HTTP error body.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoAudioProvided => "no_audio_provided",
            Self::Transcode(_) => "transcode_failure",
            Self::Recognition(_) => "recognition_failure",
        }
    }
}

/// A finished transcription: segments trimmed and joined with single
/// spaces, in the order the audio was fed. Immutable once returned.
#[derive(Debug, Clone, PartialEq)]
pub struct Transcription {
    pub transcript: String,
    pub confidence: Option<f32>,
}

/// Runs uploads through transcode and recognition. One instance serves all
/// requests; each call to [`Pipeline::run`] is an independent unit of work.
pub struct Pipeline {
    transcoder: Arc<dyn Transcoder>,
    model: Arc<dyn SpeechModel>,
    chunk_size: usize,
}

impl Pipeline {
    pub fn new(transcoder: Arc<dyn Transcoder>, model: Arc<dyn SpeechModel>) -> Self {
        Self {
            transcoder,
            model,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Override the feed slice size. Zero is clamped to one byte.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Run the uploaded file at `upload` end to end.
    ///
    /// The upload and any converted file are removed before this returns,
    /// on success and on every failure path.
    pub async fn run(&self, upload: &Path) -> Result<Transcription, PipelineError> {
        debug!(stage = %Stage::Received, upload = %upload.display());
        let converted = converted_path(upload);

        let result = self.run_stages(upload, &converted).await;

        remove_quietly(upload).await;
        remove_quietly(&converted).await;
        result
    }

    async fn run_stages(
        &self,
        upload: &Path,
        converted: &Path,
    ) -> Result<Transcription, PipelineError> {
        debug!(stage = %Stage::Transcoding, input = %upload.display());
        self.transcoder.convert(upload, converted).await?;
        debug!(stage = %Stage::Transcoded, output = %converted.display());

        let audio = tokio::fs::read(converted)
            .await
            .map_err(RecognitionError::from)?;

        debug!(stage = %Stage::Recognizing, bytes = audio.len());
        let model = Arc::clone(&self.model);
        let chunk_size = self.chunk_size;
        let outcome = task::spawn_blocking(move || recognize(&*model, &audio, chunk_size))
            .await
            .map_err(|e| RecognitionError::Decode(format!("recognition task failed: {e}")))??;

        debug!(
            stage = %Stage::Completed,
            transcript_len = outcome.transcript.len(),
            confidence = ?outcome.confidence,
        );
        Ok(outcome)
    }
}

/// Feed the converted audio through one recognizer session in fixed-size
/// chunks, collecting each completed segment plus the final flush.
///
/// Decoding is CPU-bound, so this runs under `spawn_blocking`. The session
/// is dropped on every path out of this function, which is what releases
/// its native resources.
fn recognize(
    model: &dyn SpeechModel,
    audio: &[u8],
    chunk_size: usize,
) -> Result<Transcription, RecognitionError> {
    let mut session = model.open_session(SAMPLE_RATE)?;
    let mut segments: Vec<String> = Vec::new();

    for chunk in audio.chunks(chunk_size) {
        if session.feed(chunk)? {
            let segment = session.segment_result()?;
            let text = segment.text.trim();
            if !text.is_empty() {
                segments.push(text.to_string());
            }
        }
    }

    let last = session.final_result()?;
    let text = last.text.trim();
    if !text.is_empty() {
        segments.push(text.to_string());
    }

    Ok(Transcription {
        transcript: segments.join(" "),
        confidence: last.confidence,
    })
}

/// The converted file lands next to the upload and is named from it, so
/// concurrent requests can never collide as long as upload paths are
/// unique.
pub fn converted_path(upload: &Path) -> PathBuf {
    let mut os = upload.as_os_str().to_os_string();
    os.push("_converted.wav");
    PathBuf::from(os)
}

/// Best-effort removal. A missing file is fine (the transcoder may have
/// failed before creating it); anything else is logged and swallowed so
/// cleanup never masks the pipeline result.
async fn remove_quietly(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "removed temp file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "failed to remove temp file"),
    }
}
