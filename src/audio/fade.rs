//! Fade curves and the in-place crossfade of two interleaved buffers.

use std::f32::consts::FRAC_PI_2;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Gain shape applied across a crossfade window.
///
/// With `t = k / len` for frame `k` of a `len`-frame window:
/// - `Linear`: out = 1 - t, in = t
/// - `EqualPower`: out = cos(t * pi/2), in = sin(t * pi/2)
///
/// Both start with the outgoing track at full gain and the incoming track
/// silent, and are monotonic over the window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FadeCurve {
    Linear,
    #[default]
    EqualPower,
}

impl FadeCurve {
    /// `(outgoing, incoming)` gains for frame `position` of a `len`-frame window.
    pub fn gains(self, position: u64, len: u64) -> (f32, f32) {
        if len == 0 {
            return (0.0, 1.0);
        }
        let t = (position.min(len) as f64 / len as f64) as f32;
        match self {
            FadeCurve::Linear => (1.0 - t, t),
            FadeCurve::EqualPower => ((t * FRAC_PI_2).cos(), (t * FRAC_PI_2).sin()),
        }
    }

    /// Mix `head` into `tail` in place, fading `tail` out and `head` in.
    /// Both slices are interleaved with `channels` channels and must be the
    /// same length.
    pub fn crossfade(self, tail: &mut [f32], head: &[f32], channels: u16) {
        debug_assert_eq!(tail.len(), head.len());
        let channels = channels.max(1) as usize;
        let len = (tail.len() / channels) as u64;
        for (k, (out_frame, in_frame)) in tail
            .chunks_exact_mut(channels)
            .zip(head.chunks_exact(channels))
            .enumerate()
        {
            let (g_out, g_in) = self.gains(k as u64, len);
            for (o, i) in out_frame.iter_mut().zip(in_frame) {
                *o = *o * g_out + *i * g_in;
            }
        }
    }
}

impl fmt::Display for FadeCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FadeCurve::Linear => write!(f, "linear"),
            FadeCurve::EqualPower => write!(f, "equal_power"),
        }
    }
}

impl FromStr for FadeCurve {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "linear" => Ok(FadeCurve::Linear),
            "equal_power" => Ok(FadeCurve::EqualPower),
            other => Err(format!("unknown fade curve `{other}`")),
        }
    }
}
