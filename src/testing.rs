//! Test doubles for the transcoder and recognizer seams, shared by the
//! pipeline and server test modules.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::recognizer::{RecognitionError, RecognizerSession, SegmentResult, SpeechModel};
use crate::transcode::{TranscodeError, Transcoder};

enum TranscodeBehavior {
    /// Copy the input file to the output path.
    Copy,
    /// Report success without touching the filesystem.
    Noop,
    /// Fail as if the binary could not be launched.
    FailLaunch,
}

/// Spy transcoder with scripted behavior and a call counter.
pub struct FakeTranscoder {
    behavior: TranscodeBehavior,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl FakeTranscoder {
    pub fn copying() -> Self {
        Self::with_behavior(TranscodeBehavior::Copy)
    }

    pub fn noop() -> Self {
        Self::with_behavior(TranscodeBehavior::Noop)
    }

    pub fn failing() -> Self {
        Self::with_behavior(TranscodeBehavior::FailLaunch)
    }

    fn with_behavior(behavior: TranscodeBehavior) -> Self {
        Self {
            behavior,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Sleep before acting, to widen the window in concurrency tests.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transcoder for FakeTranscoder {
    async fn convert(&self, input: &Path, output: &Path) -> Result<(), TranscodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.behavior {
            TranscodeBehavior::Copy => tokio::fs::copy(input, output)
                .await
                .map(|_| ())
                .map_err(|e| TranscodeError::Launch {
                    command: "fake-transcoder".to_string(),
                    source: e,
                }),
            TranscodeBehavior::Noop => Ok(()),
            TranscodeBehavior::FailLaunch => Err(TranscodeError::Launch {
                command: "fake-transcoder".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such binary"),
            }),
        }
    }
}

/// Scripted session behavior handed out by [`FakeModel`].
#[derive(Clone, Default)]
pub struct SessionScript {
    /// `feed` reports an utterance boundary every N chunks.
    pub boundary_every: Option<usize>,
    /// `feed` fails on the Nth chunk, 1-based.
    pub fail_feed_at: Option<usize>,
    /// Text returned for every completed segment.
    pub segment_text: String,
    /// Text returned by `final_result`; ignored when `echo` is set.
    pub final_text: String,
    /// Confidence attached to the final result.
    pub confidence: Option<f32>,
    /// `final_result` returns all bytes fed so far, as UTF-8 text.
    pub echo: bool,
}

/// Fake model that counts opened sessions and session disposals.
pub struct FakeModel {
    script: SessionScript,
    opened: AtomicUsize,
    disposed: Arc<AtomicUsize>,
}

impl FakeModel {
    pub fn new(script: SessionScript) -> Self {
        Self {
            script,
            opened: AtomicUsize::new(0),
            disposed: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn disposed(&self) -> usize {
        self.disposed.load(Ordering::SeqCst)
    }
}

impl SpeechModel for FakeModel {
    fn open_session(
        &self,
        _sample_rate: u32,
    ) -> Result<Box<dyn RecognizerSession>, RecognitionError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            script: self.script.clone(),
            feeds: 0,
            buffer: Vec::new(),
            disposed: Arc::clone(&self.disposed),
        }))
    }
}

struct FakeSession {
    script: SessionScript,
    feeds: usize,
    buffer: Vec<u8>,
    disposed: Arc<AtomicUsize>,
}

impl RecognizerSession for FakeSession {
    fn feed(&mut self, chunk: &[u8]) -> Result<bool, RecognitionError> {
        self.feeds += 1;
        if self.script.fail_feed_at == Some(self.feeds) {
            return Err(RecognitionError::Decode("injected feed failure".to_string()));
        }
        self.buffer.extend_from_slice(chunk);
        Ok(matches!(self.script.boundary_every, Some(n) if n > 0 && self.feeds % n == 0))
    }

    fn segment_result(&mut self) -> Result<SegmentResult, RecognitionError> {
        Ok(SegmentResult {
            text: self.script.segment_text.clone(),
            confidence: None,
        })
    }

    fn final_result(&mut self) -> Result<SegmentResult, RecognitionError> {
        let text = if self.script.echo {
            String::from_utf8_lossy(&self.buffer).into_owned()
        } else {
            self.script.final_text.clone()
        };
        Ok(SegmentResult {
            text,
            confidence: self.script.confidence,
        })
    }
}

impl Drop for FakeSession {
    fn drop(&mut self) {
        self.disposed.fetch_add(1, Ordering::SeqCst);
    }
}
