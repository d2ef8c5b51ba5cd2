//! Audio side of the crate: decoding, timeline planning and crossfade
//! rendering.
//!
//! [`AudioMixer`] is the entry point; [`MixPlan`] exposes the timeline it
//! renders so callers can describe a mix without decoding it.

pub mod decode;
mod fade;
mod mixer;
mod plan;

pub use decode::{SUPPORTED_EXTENSIONS, TrackInfo, is_supported_extension};
pub use fade::FadeCurve;
pub use mixer::{AudioMixer, MixReport};
pub use plan::{MixPlan, PlannedTrack};
