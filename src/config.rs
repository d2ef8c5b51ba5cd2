//! Runtime configuration loaded from `mixtape.toml`.
//!
//! Every field has a default, so a missing file or a partial file is fine.
//! `MIXTAPE_UPLOAD_ROOT`, `MIXTAPE_OUTPUT_DIR` and `MIXTAPE_FFMPEG` override
//! the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::audio::FadeCurve;
use crate::error::{MixtapeError, Result};

/// Configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "mixtape.toml";

/// Settings shared by the CLI and the job runner.
#[derive(Debug, Clone, Deserialize)]
pub struct MixtapeConfig {
    /// Folder holding one sub-folder of uploaded tracks per job prefix.
    #[serde(default = "default_upload_root")]
    pub upload_root: PathBuf,

    /// Where mixes and videos are written.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Crossfade length used when a request does not name one.
    #[serde(default = "default_transition_ms")]
    pub transition_ms: u64,

    /// Longest crossfade a request may ask for.
    #[serde(default = "default_max_transition_ms")]
    pub max_transition_ms: u64,

    /// Gain shape used across each crossfade.
    #[serde(default)]
    pub fade_curve: FadeCurve,

    /// Lowercase extensions (without the dot) treated as audio tracks.
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,

    /// Jobs allowed to run at once; further jobs wait in `pending`.
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,

    /// ffmpeg executable used for video jobs.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,
}

fn default_upload_root() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_transition_ms() -> u64 {
    10_000
}

fn default_max_transition_ms() -> u64 {
    120_000
}

fn default_allowed_extensions() -> Vec<String> {
    ["mp3", "wav", "flac", "ogg", "m4a", "aac"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_max_concurrent_jobs() -> usize {
    4
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

impl Default for MixtapeConfig {
    fn default() -> Self {
        Self {
            upload_root: default_upload_root(),
            output_dir: default_output_dir(),
            transition_ms: default_transition_ms(),
            max_transition_ms: default_max_transition_ms(),
            fade_curve: FadeCurve::default(),
            allowed_extensions: default_allowed_extensions(),
            max_concurrent_jobs: default_max_concurrent_jobs(),
            ffmpeg_path: default_ffmpeg_path(),
        }
    }
}

impl MixtapeConfig {
    /// Load `mixtape.toml` from the working directory, falling back to defaults.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(DEFAULT_CONFIG_FILE))
    }

    /// Load and validate the file at `path`, then apply environment overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<MixtapeConfig>(&contents)?
        } else {
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(root) = var("MIXTAPE_UPLOAD_ROOT")
            && !root.is_empty()
        {
            self.upload_root = root.into();
        }
        if let Some(dir) = var("MIXTAPE_OUTPUT_DIR")
            && !dir.is_empty()
        {
            self.output_dir = dir.into();
        }
        if let Some(ffmpeg) = var("MIXTAPE_FFMPEG")
            && !ffmpeg.is_empty()
        {
            self.ffmpeg_path = ffmpeg.into();
        }
    }

    fn validate(&self) -> Result<()> {
        if self.max_concurrent_jobs == 0 {
            return Err(MixtapeError::InvalidRequest(
                "max_concurrent_jobs must be at least 1".into(),
            ));
        }
        if self.allowed_extensions.is_empty() {
            return Err(MixtapeError::InvalidRequest(
                "allowed_extensions must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Default crossfade length.
    pub fn transition(&self) -> Duration {
        Duration::from_millis(self.transition_ms)
    }

    /// Longest crossfade a request may ask for.
    pub fn max_transition(&self) -> Duration {
        Duration::from_millis(self.max_transition_ms)
    }
}
