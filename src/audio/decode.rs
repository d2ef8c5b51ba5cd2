//! Symphonia-backed decoding into interleaved `f32` PCM.

use std::fs::File;
use std::io;
use std::path::Path;

use symphonia::core::audio::{AudioBufferRef, SampleBuffer, SignalSpec};
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::{MediaSourceStream, MediaSourceStreamOptions};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

use crate::error::{MixtapeError, Result};

/// Extensions the enabled symphonia formats can open. Keep in step with the
/// `symphonia` features in Cargo.toml.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "aac", "flac", "m4a", "mp3", "oga", "ogg", "wav", "wave",
];

/// Lowercase `raw` and strip any leading dot.
pub fn normalize_extension(raw: &str) -> String {
    raw.trim().trim_start_matches('.').to_ascii_lowercase()
}

/// Normalized extension of `path`, empty when it has none.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(normalize_extension)
        .unwrap_or_default()
}

/// Whether a decoder is available for `ext`.
pub fn is_supported_extension(ext: &str) -> bool {
    let ext = normalize_extension(ext);
    SUPPORTED_EXTENSIONS.contains(&ext.as_str())
}

/// Stream parameters of a track, without its samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackInfo {
    pub sample_rate: u32,
    pub channels: u16,
    pub frames: u64,
}

/// A fully decoded track.
#[derive(Debug, Clone)]
pub struct DecodedTrack {
    pub sample_rate: u32,
    pub channels: u16,
    /// Interleaved samples in [-1.0, 1.0].
    pub samples: Vec<f32>,
}

impl DecodedTrack {
    /// Number of frames, i.e. samples per channel.
    pub fn frames(&self) -> u64 {
        (self.samples.len() / self.channels.max(1) as usize) as u64
    }

    /// Stream parameters of the decoded samples.
    pub fn info(&self) -> TrackInfo {
        TrackInfo {
            sample_rate: self.sample_rate,
            channels: self.channels,
            frames: self.frames(),
        }
    }

    /// Bring the track to `channels` channels at `sample_rate`.
    pub fn conform(self, sample_rate: u32, channels: u16) -> Vec<f32> {
        let remapped = remap_channels(&self.samples, self.channels, channels);
        resample_linear(&remapped, channels, self.sample_rate, sample_rate)
    }
}

struct OpenedTrack {
    format: Box<dyn FormatReader>,
    track_id: u32,
    sample_rate: Option<u32>,
    channels: Option<u16>,
    n_frames: Option<u64>,
}

fn open(path: &Path) -> Result<OpenedTrack> {
    let ext = extension_of(path);
    if !is_supported_extension(&ext) {
        return Err(MixtapeError::UnsupportedExtension {
            path: path.to_path_buf(),
            extension: if ext.is_empty() { "<none>".into() } else { ext },
        });
    }

    let mut hint = Hint::new();
    hint.with_extension(&ext);

    let file = File::open(path).map_err(|e| MixtapeError::decode(path, e))?;
    let mss = MediaSourceStream::new(Box::new(file), MediaSourceStreamOptions::default());
    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| MixtapeError::decode(path, format!("probe failed: {e}")))?;

    let format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| MixtapeError::decode(path, "no audio track"))?;
    let track_id = track.id;
    let params = &track.codec_params;
    let sample_rate = params.sample_rate;
    let channels = params.channels.map(|c| c.count() as u16);
    let n_frames = params.n_frames;

    Ok(OpenedTrack {
        format,
        track_id,
        sample_rate,
        channels,
        n_frames,
    })
}

/// Read stream parameters, decoding the whole file only when the container
/// does not declare its length.
pub fn probe(path: &Path) -> Result<TrackInfo> {
    let opened = open(path)?;
    if let (Some(sample_rate), Some(channels), Some(frames)) =
        (opened.sample_rate, opened.channels, opened.n_frames)
        && sample_rate > 0
        && channels > 0
    {
        return Ok(TrackInfo {
            sample_rate,
            channels,
            frames,
        });
    }
    Ok(decode_opened(path, opened)?.info())
}

/// Decode every packet of the default track.
pub fn decode(path: &Path) -> Result<DecodedTrack> {
    let opened = open(path)?;
    decode_opened(path, opened)
}

fn decode_opened(path: &Path, opened: OpenedTrack) -> Result<DecodedTrack> {
    let OpenedTrack {
        mut format,
        track_id,
        mut sample_rate,
        mut channels,
        ..
    } = opened;

    let params = format
        .tracks()
        .iter()
        .find(|t| t.id == track_id)
        .map(|t| t.codec_params.clone())
        .ok_or_else(|| MixtapeError::decode(path, "default track disappeared"))?;
    let mut decoder = symphonia::default::get_codecs()
        .make(&params, &DecoderOptions::default())
        .map_err(|e| MixtapeError::decode(path, format!("decoder init failed: {e}")))?;

    let mut sample_buf: Option<SampleBuffer<f32>> = None;
    let mut samples = Vec::new();
    let mut skipped = 0usize;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(MixtapeError::decode(path, format!("read packet failed: {e}"))),
        };
        if packet.track_id() != track_id {
            continue;
        }
        match decoder.decode(&packet) {
            Ok(audio_buf) => {
                let spec = audio_buf.spec();
                sample_rate.get_or_insert(spec.rate);
                channels.get_or_insert(spec.channels.count() as u16);
                append_decoded(&mut sample_buf, &mut samples, audio_buf);
            }
            Err(SymphoniaError::DecodeError(_)) => skipped += 1,
            Err(SymphoniaError::ResetRequired) => decoder.reset(),
            Err(e) => return Err(MixtapeError::decode(path, format!("decode failed: {e}"))),
        }
    }

    let (Some(sample_rate), Some(channels)) = (sample_rate, channels) else {
        return Err(MixtapeError::decode(path, "no decodable audio"));
    };
    if sample_rate == 0 || channels == 0 || samples.is_empty() {
        return Err(MixtapeError::decode(path, "no decodable audio"));
    }
    if skipped > 0 {
        debug!(path = %path.display(), skipped, "skipped corrupt packets");
    }

    Ok(DecodedTrack {
        sample_rate,
        channels,
        samples,
    })
}

fn append_decoded(
    sample_buf: &mut Option<SampleBuffer<f32>>,
    out: &mut Vec<f32>,
    audio_buf: AudioBufferRef<'_>,
) {
    let spec = SignalSpec::new(audio_buf.spec().rate, audio_buf.spec().channels);
    let needed = audio_buf.capacity() * spec.channels.count();
    let needs_realloc = sample_buf
        .as_ref()
        .is_none_or(|buf| buf.capacity() < needed);
    if needs_realloc {
        *sample_buf = Some(SampleBuffer::<f32>::new(audio_buf.capacity() as u64, spec));
    }

    let Some(sample_buf) = sample_buf.as_mut() else {
        return;
    };
    sample_buf.copy_interleaved_ref(audio_buf);
    out.extend_from_slice(sample_buf.samples());
}

/// Convert interleaved samples between channel layouts. Mono is duplicated
/// into every output channel; wider sources fold even channels left and odd
/// channels right.
pub fn remap_channels(samples: &[f32], from: u16, to: u16) -> Vec<f32> {
    let from = from.max(1) as usize;
    let to = to.max(1) as usize;
    if from == to {
        return samples.to_vec();
    }

    let frames = samples.len() / from;
    let mut out = Vec::with_capacity(frames * to);
    for frame in samples.chunks_exact(from) {
        if from == 1 {
            out.extend(std::iter::repeat_n(frame[0], to));
        } else if to == 1 {
            out.push(frame.iter().sum::<f32>() / from as f32);
        } else {
            for c in 0..to {
                let (sum, count) = frame
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| i % to == c)
                    .fold((0.0f32, 0usize), |(s, n), (_, v)| (s + v, n + 1));
                out.push(if count == 0 { 0.0 } else { sum / count as f32 });
            }
        }
    }
    out
}

/// Number of frames `frames` becomes after conversion from `from` Hz to `to` Hz.
pub fn resampled_len(frames: u64, from: u32, to: u32) -> u64 {
    if from == to || from == 0 {
        return frames;
    }
    let (from, to) = (from as u128, to as u128);
    ((frames as u128 * to + from / 2) / from) as u64
}

/// Linear-interpolation sample rate conversion of interleaved audio.
pub fn resample_linear(samples: &[f32], channels: u16, from: u32, to: u32) -> Vec<f32> {
    if from == to || from == 0 || to == 0 {
        return samples.to_vec();
    }
    let channels = channels.max(1) as usize;
    let in_frames = samples.len() / channels;
    if in_frames == 0 {
        return Vec::new();
    }
    let out_frames = resampled_len(in_frames as u64, from, to) as usize;
    let step = from as f64 / to as f64;

    let mut out = Vec::with_capacity(out_frames * channels);
    for j in 0..out_frames {
        let pos = j as f64 * step;
        let i0 = (pos.floor() as usize).min(in_frames - 1);
        let i1 = (i0 + 1).min(in_frames - 1);
        let frac = (pos - i0 as f64) as f32;
        for c in 0..channels {
            let a = samples[i0 * channels + c];
            let b = samples[i1 * channels + c];
            out.push(a + (b - a) * frac);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::test_support::write_wav;

    #[test]
    fn extension_checks_are_case_insensitive() {
        assert_eq!(extension_of(Path::new("a/B.MP3")), "mp3");
        assert!(is_supported_extension(".FLAC"));
        assert!(!is_supported_extension("txt"));
        assert_eq!(extension_of(Path::new("noext")), "");
    }

    #[test]
    fn decodes_wav_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.wav");
        let samples: Vec<i16> = vec![0, 1000, -1000, 16384, -32768, 32767];
        write_wav(&path, 8000, 1, &samples);

        let track = decode(&path).unwrap();
        assert_eq!(track.sample_rate, 8000);
        assert_eq!(track.channels, 1);
        assert_eq!(track.frames(), 6);
        assert_eq!(track.samples[3], 0.5);
        assert_eq!(track.samples[4], -1.0);
    }

    #[test]
    fn probe_reads_header_length() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("b.wav");
        write_wav(&path, 8000, 2, &vec![0i16; 8000 * 2]);

        let info = probe(&path).unwrap();
        assert_eq!(
            info,
            TrackInfo {
                sample_rate: 8000,
                channels: 2,
                frames: 8000
            }
        );
    }

    #[test]
    fn garbage_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.mp3");
        std::fs::write(&path, b"definitely not audio").unwrap();

        let err = decode(&path).unwrap_err();
        assert!(matches!(err, MixtapeError::Decode { .. }));
        assert!(err.to_string().contains("broken.mp3"));
    }

    #[test]
    fn missing_file_is_decode_error() {
        let err = decode(Path::new("/nonexistent/track.wav")).unwrap_err();
        assert!(matches!(err, MixtapeError::Decode { .. }));
    }

    #[test]
    fn unsupported_extension_rejected_before_opening() {
        let err = decode(Path::new("notes.txt")).unwrap_err();
        assert!(matches!(err, MixtapeError::UnsupportedExtension { .. }));
    }

    #[test]
    fn aiff_is_not_accepted_without_a_demuxer() {
        assert!(!is_supported_extension("aiff"));
        assert!(!is_supported_extension("aif"));
        let err = probe(Path::new("take.aiff")).unwrap_err();
        assert!(matches!(
            err,
            MixtapeError::UnsupportedExtension { ref extension, .. } if extension == "aiff"
        ));
    }

    #[test]
    fn mono_is_duplicated_to_stereo() {
        assert_eq!(
            remap_channels(&[0.1, 0.2], 1, 2),
            vec![0.1, 0.1, 0.2, 0.2]
        );
    }

    #[test]
    fn surround_folds_to_stereo() {
        // L R C LFE: left = mean(L, C), right = mean(R, LFE)
        let out = remap_channels(&[1.0, 0.0, 0.0, 1.0], 4, 2);
        assert_eq!(out, vec![0.5, 0.5]);
    }

    #[test]
    fn stereo_downmixes_to_mono() {
        assert_eq!(remap_channels(&[1.0, 0.0, 0.5, 0.5], 2, 1), vec![0.5, 0.5]);
    }

    #[test]
    fn resample_doubles_length_and_interpolates() {
        let out = resample_linear(&[0.0, 1.0], 1, 1, 2);
        assert_eq!(out, vec![0.0, 0.5, 1.0, 1.0]);
        assert_eq!(resampled_len(44100, 44100, 48000), 48000);
        assert_eq!(resampled_len(1000, 8000, 8000), 1000);
    }

    #[test]
    fn conform_applies_both_conversions() {
        let track = DecodedTrack {
            sample_rate: 4000,
            channels: 1,
            samples: vec![0.25; 400],
        };
        let out = track.conform(8000, 2);
        assert_eq!(out.len(), 800 * 2);
        assert!(out.iter().all(|&s| s == 0.25));
    }
}
