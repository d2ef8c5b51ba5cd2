//! Crossfaded mixtape rendering with asynchronous job tracking.
//!
//! [`jobs::JobRunner`] accepts mix and video requests, runs each one in the
//! background and records its progress in a [`jobs::JobStore`] that callers
//! poll. [`audio::AudioMixer`] does the actual crossfade rendering.

pub mod audio;
pub mod cli;
pub mod config;
pub mod description;
pub mod error;
pub mod jobs;
pub mod logging;
pub mod sources;
pub mod ui;
pub mod video;

pub use error::{ErrorKind, MixtapeError, Result};
