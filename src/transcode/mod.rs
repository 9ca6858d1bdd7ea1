use std::path::Path;
use std::process::{ExitStatus, Stdio};

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::debug;

/// Failure of one conversion attempt.
#[derive(Debug, Error)]
pub enum TranscodeError {
    /// The converter could not be run at all: binary missing, permission
    /// denied, or the wait on the child failed.
    #[error("failed to run {command}: {source}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },
    /// The converter ran but reported failure. The output file must not be
    /// trusted on this path.
    #[error("{command} exited with {status}")]
    Exit { command: String, status: ExitStatus },
}

/// Converts an uploaded audio file into the canonical PCM format the
/// recognizer expects. Success means exit status 0 and a trustworthy file
/// at the output path; nothing else does.
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn convert(&self, input: &Path, output: &Path) -> Result<(), TranscodeError>;
}

/// Invokes the external `ffmpeg` binary to resample to 16 kHz, downmix to
/// mono, and write a WAV container, overwriting the destination.
pub struct FfmpegTranscoder {
    command: String,
}

impl FfmpegTranscoder {
    pub fn new() -> Self {
        Self::with_command("ffmpeg")
    }

    /// Use a different converter binary, e.g. from configuration or tests.
    pub fn with_command(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn convert(&self, input: &Path, output: &Path) -> Result<(), TranscodeError> {
        let mut cmd = Command::new(&self.command);
        cmd.arg("-i")
            .arg(input)
            .arg("-ar")
            .arg("16000")
            .arg("-ac")
            .arg("1")
            .arg("-f")
            .arg("wav")
            .arg("-y")
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let launch = |source: std::io::Error| TranscodeError::Launch {
            command: self.command.clone(),
            source,
        };

        let mut child = cmd.spawn().map_err(launch)?;
        debug!(
            command = %self.command,
            pid = ?child.id(),
            input = %input.display(),
            "transcoder spawned"
        );

        // Diagnostic output only: forwarded to the log, never parsed.
        let stderr_task = child.stderr.take().map(|stderr| {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!("transcoder stderr: {}", line);
                }
            })
        });

        let status = child.wait().await.map_err(launch)?;
        if let Some(task) = stderr_task {
            let _ = task.await;
        }

        if status.success() {
            Ok(())
        } else {
            Err(TranscodeError::Exit {
                command: self.command.clone(),
                status,
            })
        }
    }
}
