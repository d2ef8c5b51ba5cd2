//! Crossfade mixer: decodes an ordered track list and renders one WAV file.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::decode::{self, DecodedTrack};
use super::fade::FadeCurve;
use super::plan::{MixPlan, duration_of};
use crate::error::{MixtapeError, Result};

/// Summary of a rendered mix.
#[derive(Debug, Clone, Serialize)]
pub struct MixReport {
    /// Final path of the written WAV.
    pub output: PathBuf,
    /// Channel count of the output.
    pub channels: u16,
    /// Timeline the mix was rendered from.
    pub plan: MixPlan,
}

impl MixReport {
    /// Running time of the rendered mix.
    pub fn duration(&self) -> Duration {
        self.plan.duration()
    }
}

/// Renders ordered tracks into one crossfaded WAV file.
#[derive(Debug, Clone, Copy, Default)]
pub struct AudioMixer {
    curve: FadeCurve,
}

impl AudioMixer {
    /// A mixer that crossfades with `curve`.
    pub fn new(curve: FadeCurve) -> Self {
        Self { curve }
    }

    /// Fade curve applied at every track boundary.
    pub fn curve(&self) -> FadeCurve {
        self.curve
    }

    /// Mix `tracks` in order into a 16-bit WAV at `output`.
    ///
    /// Every track is decoded before anything is written; the file is
    /// rendered to a `.part` sibling and renamed into place, so a failure
    /// leaves no output behind.
    pub fn mix(&self, tracks: &[PathBuf], transition: Duration, output: &Path) -> Result<MixReport> {
        if tracks.is_empty() {
            return Err(MixtapeError::InvalidRequest("track list is empty".into()));
        }

        let decoded = tracks
            .iter()
            .map(|path| decode::decode(path))
            .collect::<Result<Vec<DecodedTrack>>>()?;

        let sample_rate = decoded[0].sample_rate;
        let channels = decoded
            .iter()
            .map(|t| t.channels.min(2))
            .max()
            .unwrap_or(1);

        let conformed: Vec<Vec<f32>> = decoded
            .into_iter()
            .zip(tracks)
            .map(|(track, path)| {
                if track.sample_rate != sample_rate {
                    debug!(
                        path = %path.display(),
                        from = track.sample_rate,
                        to = sample_rate,
                        "resampling track"
                    );
                }
                track.conform(sample_rate, channels)
            })
            .collect();

        let plan = MixPlan::build(
            sample_rate,
            transition,
            tracks
                .iter()
                .cloned()
                .zip(conformed.iter().map(|s| (s.len() / channels as usize) as u64)),
        );
        if plan.tracks.len() > 1
            && plan.total_overlap_frames() < plan.requested_overlap_frames * (plan.tracks.len() as u64 - 1)
        {
            warn!(
                requested_ms = transition.as_millis() as u64,
                "transition clamped to fit short tracks"
            );
        }

        let rendered = render(&plan, &conformed, channels, self.curve);
        write_atomically(output, &rendered, sample_rate, channels)?;

        info!(
            output = %output.display(),
            tracks = plan.tracks.len(),
            overlap_ms = duration_of(plan.total_overlap_frames(), sample_rate).as_millis() as u64,
            duration_ms = plan.duration().as_millis() as u64,
            curve = %self.curve,
            "mix written"
        );

        Ok(MixReport {
            output: output.to_path_buf(),
            channels,
            plan,
        })
    }

    /// Compute the timeline `mix` would produce from stream headers alone.
    pub fn plan(&self, tracks: &[PathBuf], transition: Duration) -> Result<MixPlan> {
        let infos = tracks
            .iter()
            .map(|path| decode::probe(path))
            .collect::<Result<Vec<_>>>()?;
        let sample_rate = infos.first().map(|i| i.sample_rate).unwrap_or(0);

        Ok(MixPlan::build(
            sample_rate,
            transition,
            tracks.iter().cloned().zip(
                infos
                    .iter()
                    .map(|i| decode::resampled_len(i.frames, i.sample_rate, sample_rate)),
            ),
        ))
    }
}

/// Lay conformed tracks onto the plan's timeline, crossfading each boundary.
fn render(plan: &MixPlan, tracks: &[Vec<f32>], channels: u16, curve: FadeCurve) -> Vec<f32> {
    let ch = channels.max(1) as usize;
    let mut out: Vec<f32> = Vec::with_capacity(plan.total_frames as usize * ch);

    for (planned, samples) in plan.tracks.iter().zip(tracks) {
        let overlap = planned.overlap_frames as usize * ch;
        let start = planned.start_frame as usize * ch;
        debug_assert_eq!(start + overlap, out.len());

        curve.crossfade(&mut out[start..], &samples[..overlap], channels);
        out.extend_from_slice(&samples[overlap..]);
    }
    out
}

fn part_path(output: &Path) -> PathBuf {
    let mut name: OsString = output.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

fn write_atomically(output: &Path, samples: &[f32], sample_rate: u32, channels: u16) -> Result<()> {
    if let Some(parent) = output.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let part = part_path(output);
    let written = write_wav(&part, samples, sample_rate, channels)
        .and_then(|()| fs::rename(&part, output).map_err(MixtapeError::from));
    if written.is_err() {
        let _ = fs::remove_file(&part);
    }
    written
}

fn write_wav(path: &Path, samples: &[f32], sample_rate: u32, channels: u16) -> Result<()> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for &sample in samples {
        writer.write_sample(to_i16(sample))?;
    }
    writer.finalize()?;
    Ok(())
}

/// Symmetric 2^15 scale, the inverse of the decoder's integer conversion.
fn to_i16(sample: f32) -> i16 {
    (sample * 32768.0).round().clamp(i16::MIN as f32, i16::MAX as f32) as i16
}
