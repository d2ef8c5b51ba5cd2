//! Error type shared by the library, and the kinds callers branch on.
//!
//! Every failure maps to an [`ErrorKind`]: bad input, a missing or failed
//! upstream resource, an unknown job id, or an internal fault.

use std::path::PathBuf;

use thiserror::Error;

use crate::jobs::{JobId, JobStatus};

pub type Result<T, E = MixtapeError> = std::result::Result<T, E>;

/// Everything that can go wrong while mixing, composing or tracking jobs.
#[derive(Debug, Error)]
pub enum MixtapeError {
    #[error("No audio files found in {0}")]
    NoTracks(PathBuf),

    #[error("Upload folder not found: {0}")]
    MissingFolder(PathBuf),

    #[error("Unsupported audio extension `{extension}` for {path}")]
    UnsupportedExtension { path: PathBuf, extension: String },

    #[error("Failed to decode track {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("Transition of {requested_ms}ms exceeds the maximum of {max_ms}ms")]
    TransitionTooLong { requested_ms: u64, max_ms: u64 },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Required file not found: {0}")]
    MissingResource(PathBuf),

    #[error("Video composition failed: {message}")]
    Compose {
        message: String,
        stderr: Option<String>,
    },

    #[error("Job not found: {0}")]
    JobNotFound(JobId),

    #[error("Invalid job transition: {from} -> {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Coarse classification of a failure, used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// Bad or undecodable input (tracks, durations, names).
    Input,
    /// An upstream artifact the job depends on is missing or its producer failed.
    Resource,
    /// Query for an identifier that was never issued.
    UnknownJob,
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Input => write!(f, "Input"),
            ErrorKind::Resource => write!(f, "Resource"),
            ErrorKind::UnknownJob => write!(f, "UnknownJob"),
            ErrorKind::Internal => write!(f, "Internal"),
        }
    }
}

impl MixtapeError {
    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            MixtapeError::NoTracks(_)
            | MixtapeError::MissingFolder(_)
            | MixtapeError::UnsupportedExtension { .. }
            | MixtapeError::Decode { .. }
            | MixtapeError::TransitionTooLong { .. }
            | MixtapeError::InvalidRequest(_)
            | MixtapeError::Toml(_) => ErrorKind::Input,
            MixtapeError::MissingResource(_) | MixtapeError::Compose { .. } => ErrorKind::Resource,
            MixtapeError::JobNotFound(_) => ErrorKind::UnknownJob,
            MixtapeError::InvalidTransition { .. }
            | MixtapeError::Internal(_)
            | MixtapeError::Io(_)
            | MixtapeError::Wav(_) => ErrorKind::Internal,
        }
    }

    /// Decode failure for `path`.
    pub fn decode(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        Self::Decode {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Message stored on a failed job: the error itself plus the ffmpeg stderr
    /// tail when one was captured.
    pub fn report(&self) -> String {
        match self {
            MixtapeError::Compose {
                stderr: Some(stderr),
                ..
            } if !stderr.trim().is_empty() => format!("{self}\n{}", stderr.trim_end()),
            _ => self.to_string(),
        }
    }
}
