//! Audio transcoding via an ffmpeg subprocess

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::{Error, Result};

/// Converts an audio file from one container/codec to another
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Transcode `input` into `output`; the output format follows its extension
    ///
    /// # Errors
    ///
    /// Returns error if the input is missing or the conversion fails
    async fn transcode(&self, input: &Path, output: &Path) -> Result<()>;

    /// Transcoder name for logging
    fn name(&self) -> &'static str;
}

/// Transcoder backed by the `ffmpeg` binary
pub struct FfmpegTranscoder {
    program: PathBuf,
}

impl FfmpegTranscoder {
    /// Spawn `program` without checking that it exists
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Resolve an explicit binary, or look `ffmpeg` up on `PATH`
    ///
    /// Returns `None` when the binary cannot be found or is not executable.
    #[must_use]
    pub fn locate(explicit: Option<PathBuf>) -> Option<Self> {
        let wanted = explicit.unwrap_or_else(|| PathBuf::from("ffmpeg"));

        match which::which(&wanted) {
            Ok(program) => {
                tracing::debug!(path = %program.display(), "found ffmpeg");
                Some(Self { program })
            }
            Err(e) => {
                tracing::warn!(program = %wanted.display(), error = %e, "ffmpeg not found");
                None
            }
        }
    }

    /// Path of the binary that will be spawned
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(&self, input: &Path, output: &Path) -> Result<()> {
        if !input.exists() {
            return Err(Error::Transcode(format!(
                "input file not found: {}",
                input.display()
            )));
        }

        let result = Command::new(&self.program)
            .arg("-y")
            .args(["-loglevel", "error"])
            .arg("-i")
            .arg(input)
            .arg("-vn")
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                Error::Transcode(format!(
                    "failed to spawn {}: {e}",
                    self.program.display()
                ))
            })?;

        if !result.status.success() {
            let code = result.status.code().unwrap_or(-1);
            let stderr = String::from_utf8_lossy(&result.stderr);
            tracing::error!(
                input = %input.display(),
                code,
                stderr = %stderr.trim(),
                "ffmpeg failed"
            );
            return Err(Error::Transcode(format!(
                "ffmpeg exited with code {code}: {}",
                stderr.trim()
            )));
        }

        tracing::info!(
            input = %input.display(),
            output = %output.display(),
            "converted audio"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "ffmpeg"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_program_is_kept() {
        let transcoder = FfmpegTranscoder::new("/opt/ffmpeg/bin/ffmpeg");
        assert_eq!(transcoder.program(), Path::new("/opt/ffmpeg/bin/ffmpeg"));
        assert_eq!(transcoder.name(), "ffmpeg");
    }

    #[test]
    fn test_locate_missing_binary_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(FfmpegTranscoder::locate(Some(dir.path().join("no-such-ffmpeg"))).is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_locate_explicit_executable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let program = dir.path().join("ffmpeg");
        std::fs::write(&program, "#!/bin/sh\nexit 0\n").unwrap();
        std::fs::set_permissions(&program, std::fs::Permissions::from_mode(0o755)).unwrap();

        let transcoder = FfmpegTranscoder::locate(Some(program.clone())).unwrap();
        assert_eq!(transcoder.program().file_name(), program.file_name());
    }

    #[tokio::test]
    async fn test_missing_input_fails() {
        let dir = tempfile::tempdir().unwrap();
        let transcoder = FfmpegTranscoder::new("ffmpeg");

        let err = transcoder
            .transcode(&dir.path().join("absent.oga"), &dir.path().join("absent.mp3"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Transcode(_)));
    }

    #[tokio::test]
    async fn test_missing_binary_fails() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("clip.oga");
        std::fs::write(&input, b"OggS").unwrap();

        let transcoder = FfmpegTranscoder::new(dir.path().join("no-such-ffmpeg-binary"));
        let err = transcoder
            .transcode(&input, &dir.path().join("clip.mp3"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Transcode(_)));
        assert!(input.exists());
    }
}
