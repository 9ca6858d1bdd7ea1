use thiserror::Error;

#[cfg(feature = "vosk")]
pub mod vosk;
#[cfg(feature = "vosk")]
pub use self::vosk::VoskModel;

/// Sample rate the transcoder normalizes to and every session decodes at.
pub const SAMPLE_RATE: u32 = 16_000;

/// Default size of the slices fed to a session, in bytes. Feeding in
/// bounded chunks lets the decoder surface utterance boundaries
/// incrementally instead of at end-of-stream only.
pub const DEFAULT_CHUNK_SIZE: usize = 4000;

/// Failure inside the recognition stage.
#[derive(Debug, Error)]
pub enum RecognitionError {
    /// The model directory was missing or unreadable. Startup only.
    #[error("failed to load speech model from {0}")]
    ModelLoad(String),
    /// The decoder could not open a session over the loaded model.
    #[error("failed to open a recognizer session")]
    SessionOpen,
    /// The decoder rejected audio mid-stream.
    #[error("decoder error: {0}")]
    Decode(String),
    /// Reading the converted audio from disk failed.
    #[error("failed to read converted audio: {0}")]
    Io(#[from] std::io::Error),
}

/// Text decoded for one completed utterance, plus the decoder's confidence
/// in it when one is available.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentResult {
    pub text: String,
    pub confidence: Option<f32>,
}

/// One in-flight decoding pass over the shared model.
///
/// A session is exclusively owned by the request that opened it. Chunks
/// must arrive in original byte order with no gaps or overlaps; the
/// decoder does not detect violations, it just decodes garbage. Native
/// resources are released on drop, which runs on every exit path.
pub trait RecognizerSession: Send {
    /// Advance the decoder with the next slice of little-endian 16-bit
    /// mono PCM. Returns true when an utterance boundary was completed
    /// within this chunk.
    fn feed(&mut self, chunk: &[u8]) -> Result<bool, RecognitionError>;

    /// Text completed since the previous boundary. Valid after `feed`
    /// reported a boundary, or at end-of-stream.
    fn segment_result(&mut self) -> Result<SegmentResult, RecognitionError>;

    /// Flush any buffered audio and return the last completed text plus an
    /// overall confidence. Call exactly once, after the final chunk.
    fn final_result(&mut self) -> Result<SegmentResult, RecognitionError>;
}

/// A loaded acoustic model: created once at startup, immutable, shared
/// read-only by all concurrent requests.
pub trait SpeechModel: Send + Sync {
    /// Open a fresh decoding session bound to this model.
    fn open_session(
        &self,
        sample_rate: u32,
    ) -> Result<Box<dyn RecognizerSession>, RecognitionError>;
}
