//! Vosk-backed implementation of the recognizer seam.
//!
//! Links `libvosk`, so the whole module sits behind the `vosk` cargo
//! feature. Everything above the [`SpeechModel`] trait builds and tests
//! without it.

use std::path::Path;

use vosk::{CompleteResult, DecodingState, Model, Recognizer};

use super::{RecognitionError, RecognizerSession, SegmentResult, SpeechModel};

/// Process-wide handle to a loaded Vosk model.
pub struct VoskModel {
    model: Model,
}

impl VoskModel {
    /// Load the model from `path`. Blocking; meant to run once at startup,
    /// before the listener binds.
    pub fn load(path: &Path) -> Result<Self, RecognitionError> {
        // The decoder is chatty on stderr at its default log level.
        vosk::set_log_level(vosk::LogLevel::Warn);

        let model = Model::new(path.to_string_lossy())
            .ok_or_else(|| RecognitionError::ModelLoad(path.display().to_string()))?;
        Ok(Self { model })
    }
}

impl SpeechModel for VoskModel {
    fn open_session(
        &self,
        sample_rate: u32,
    ) -> Result<Box<dyn RecognizerSession>, RecognitionError> {
        let mut recognizer = Recognizer::new(&self.model, sample_rate as f32)
            .ok_or(RecognitionError::SessionOpen)?;
        // Per-word results carry the confidences we aggregate from.
        recognizer.set_words(true);
        Ok(Box::new(VoskSession { recognizer }))
    }
}

struct VoskSession {
    recognizer: Recognizer,
}

impl RecognizerSession for VoskSession {
    fn feed(&mut self, chunk: &[u8]) -> Result<bool, RecognitionError> {
        // The transcoder emits little-endian signed 16-bit PCM. A trailing
        // odd byte can only come from a truncated file; drop it.
        let samples: Vec<i16> = chunk
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();

        match self.recognizer.accept_waveform(&samples) {
            Ok(DecodingState::Finalized) => Ok(true),
            Ok(_) => Ok(false),
            Err(e) => Err(RecognitionError::Decode(e.to_string())),
        }
    }

    fn segment_result(&mut self) -> Result<SegmentResult, RecognitionError> {
        Ok(from_complete(self.recognizer.result()))
    }

    fn final_result(&mut self) -> Result<SegmentResult, RecognitionError> {
        Ok(from_complete(self.recognizer.final_result()))
    }
}

fn from_complete(result: CompleteResult<'_>) -> SegmentResult {
    match result {
        CompleteResult::Single(single) => SegmentResult {
            text: single.text.to_string(),
            confidence: mean_confidence(single.result.iter().map(|word| word.conf)),
        },
        // Only produced when alternatives are requested; take the best one.
        CompleteResult::Multiple(multiple) => SegmentResult {
            text: multiple
                .alternatives
                .first()
                .map(|alt| alt.text.to_string())
                .unwrap_or_default(),
            confidence: None,
        },
    }
}

fn mean_confidence(confidences: impl Iterator<Item = f32>) -> Option<f32> {
    let (sum, count) = confidences.fold((0.0f32, 0usize), |(sum, count), conf| {
        (sum + conf, count + 1)
    });
    if count == 0 {
        None
    } else {
        Some(sum / count as f32)
    }
}
