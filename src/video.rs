//! Still-image video composition around a rendered mix.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{MixtapeError, Result};

/// Produces a video file from a still image and an audio track.
pub trait VideoComposer: Send + Sync + 'static {
    fn compose(
        &self,
        image: &Path,
        audio: &Path,
        output: &Path,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Composes videos by shelling out to ffmpeg.
#[derive(Debug, Clone)]
pub struct FfmpegComposer {
    program: PathBuf,
}

impl Default for FfmpegComposer {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl FfmpegComposer {
    /// Compose with the ffmpeg executable at `program`.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Arguments for looping `image` over the full length of `audio`.
    pub fn build_args(image: &Path, audio: &Path, output: &Path) -> Vec<String> {
        let mut args: Vec<String> = ["-y", "-v", "error", "-loop", "1", "-i"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        args.push(image.to_string_lossy().into_owned());
        args.push("-i".into());
        args.push(audio.to_string_lossy().into_owned());
        args.extend(
            [
                "-c:v",
                "libx264",
                "-tune",
                "stillimage",
                "-c:a",
                "aac",
                "-b:a",
                "192k",
                "-pix_fmt",
                "yuv420p",
                "-shortest",
            ]
            .iter()
            .map(|s| s.to_string()),
        );
        args.push(output.to_string_lossy().into_owned());
        args
    }
}

impl VideoComposer for FfmpegComposer {
    async fn compose(&self, image: &Path, audio: &Path, output: &Path) -> Result<()> {
        let args = Self::build_args(image, audio, output);
        debug!(program = %self.program.display(), ?args, "running ffmpeg");

        let result = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| MixtapeError::Compose {
                message: format!("failed to start {}: {e}", self.program.display()),
                stderr: None,
            })?;

        if !result.status.success() {
            let _ = tokio::fs::remove_file(output).await;
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(MixtapeError::Compose {
                message: format!("ffmpeg exited with {}", result.status),
                stderr: Some(tail(&stderr, 20)),
            });
        }

        info!(output = %output.display(), "video written");
        Ok(())
    }
}

/// Last `lines` lines of a process's stderr.
fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.lines().collect();
    all[all.len().saturating_sub(lines)..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_loop_image_over_audio() {
        let args = FfmpegComposer::build_args(
            Path::new("cover.jpg"),
            Path::new("out/mixtape.wav"),
            Path::new("out/mixtape.mp4"),
        );
        let joined = args.join(" ");
        assert!(joined.starts_with("-y -v error -loop 1 -i cover.jpg -i out/mixtape.wav"));
        assert!(joined.contains("-tune stillimage"));
        assert!(joined.contains("-shortest"));
        assert_eq!(args.last().unwrap(), "out/mixtape.mp4");
    }

    #[test]
    fn tail_keeps_last_lines() {
        assert_eq!(tail("a\nb\nc\n", 2), "b\nc");
        assert_eq!(tail("only", 5), "only");
    }

    #[tokio::test]
    async fn missing_binary_is_a_compose_error() {
        let composer = FfmpegComposer::new("/nonexistent/ffmpeg-binary");
        let dir = tempfile::tempdir().unwrap();
        let err = composer
            .compose(
                &dir.path().join("a.png"),
                &dir.path().join("a.wav"),
                &dir.path().join("a.mp4"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, MixtapeError::Compose { .. }));
        assert!(err.to_string().contains("failed to start"));
    }
}
