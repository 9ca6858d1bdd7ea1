use serde::{Deserialize, Serialize};

/// Body of a successful transcription response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionResponse {
    /// Always true; pipeline completion is success, speech presence is not.
    pub success: bool,
    /// Decoded words joined by single spaces. May be empty.
    pub transcript: String,
    /// Decoder confidence in [0, 1], or null when unavailable.
    pub confidence: Option<f32>,
}

impl TranscriptionResponse {
    /// Create a success body from a finished transcription.
    pub fn new(transcript: String, confidence: Option<f32>) -> Self {
        Self {
            success: true,
            transcript,
            confidence,
        }
    }
}

/// Body returned with status 400 when the form carries no audio file part.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissingAudioResponse {
    pub error: String,
}

impl MissingAudioResponse {
    pub fn new() -> Self {
        Self {
            error: "No audio file provided".to_string(),
        }
    }
}

impl Default for MissingAudioResponse {
    fn default() -> Self {
        Self::new()
    }
}

/// Body returned with status 500 for any mid-pipeline failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureResponse {
    /// Always false.
    pub success: bool,
    /// Machine-readable failure kind, e.g. `transcode_failure`.
    pub error: String,
    /// Human-readable detail.
    pub message: String,
}

impl FailureResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            message: message.into(),
        }
    }
}

/// Health report. The endpoint reports state and never fails.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(rename = "modelLoaded")]
    pub model_loaded: bool,
}

impl HealthResponse {
    pub fn new(model_loaded: bool) -> Self {
        Self {
            status: "ok".to_string(),
            model_loaded,
        }
    }
}
