//! Timeline arithmetic for a crossfaded mix.
//!
//! A [`MixPlan`] is derived entirely from the ordered track lengths, the
//! sample rate and the requested transition, so the same inputs always give
//! the same boundaries.

use std::ops::Range;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

/// One track's placement on the mixed timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedTrack {
    pub path: PathBuf,
    /// Length of the track at the plan's sample rate.
    pub frames: u64,
    /// First output frame this track contributes to.
    pub start_frame: u64,
    /// Frames shared with the previous track; zero for the first track.
    pub overlap_frames: u64,
}

impl PlannedTrack {
    /// Output frames over which this track fades in.
    pub fn fade_in_window(&self) -> Range<u64> {
        self.start_frame..self.start_frame + self.overlap_frames
    }
}

/// Where every track lands on the output timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MixPlan {
    /// Rate every frame count in the plan is expressed in.
    pub sample_rate: u32,
    /// Transition length before clamping.
    pub requested_overlap_frames: u64,
    pub tracks: Vec<PlannedTrack>,
    /// Length of the whole mix.
    pub total_frames: u64,
}

impl MixPlan {
    /// Lay out `tracks` (path, length in frames at `sample_rate`) end to end,
    /// overlapping each consecutive pair by the clamped transition.
    ///
    /// A track's fade-in and fade-out windows never overlap each other, so
    /// every track reaches full gain and at most two tracks sound at once.
    pub fn build(
        sample_rate: u32,
        transition: Duration,
        tracks: impl IntoIterator<Item = (PathBuf, u64)>,
    ) -> Self {
        let requested = frames_for(transition, sample_rate);
        let guard = guard_frames(sample_rate);

        let tracks: Vec<(PathBuf, u64)> = tracks.into_iter().collect();
        let last = tracks.len().saturating_sub(1);

        let mut planned: Vec<PlannedTrack> = Vec::with_capacity(tracks.len());
        let mut cursor = 0u64;
        for (i, (path, frames)) in tracks.into_iter().enumerate() {
            let overlap = match planned.last() {
                Some(prev) => {
                    // An interior track lends at most half of itself to its fade-in,
                    // the rest is left for the fade-out into the following track.
                    let head = if i == last { frames } else { frames / 2 };
                    let tail = prev.frames - prev.overlap_frames;
                    clamp_overlap(requested, tail, head, guard)
                }
                None => 0,
            };
            let start_frame = cursor - overlap;
            cursor = start_frame + frames;
            planned.push(PlannedTrack {
                path,
                frames,
                start_frame,
                overlap_frames: overlap,
            });
        }

        Self {
            sample_rate,
            requested_overlap_frames: requested,
            tracks: planned,
            total_frames: cursor,
        }
    }

    /// Running time of the whole mix.
    pub fn duration(&self) -> Duration {
        duration_of(self.total_frames, self.sample_rate)
    }

    /// Sum of all clamped overlaps.
    pub fn total_overlap_frames(&self) -> u64 {
        self.tracks.iter().map(|t| t.overlap_frames).sum()
    }

    /// Crossfade windows on the output timeline, one per track boundary.
    pub fn fade_windows(&self) -> Vec<Range<u64>> {
        self.tracks
            .iter()
            .skip(1)
            .map(PlannedTrack::fade_in_window)
            .collect()
    }

    /// Start offset of every track on the output timeline.
    pub fn start_times(&self) -> Vec<Duration> {
        self.tracks
            .iter()
            .map(|t| duration_of(t.start_frame, self.sample_rate))
            .collect()
    }
}

/// Overlap for one boundary: the requested length, but never more than the
/// shorter of the frames each neighbour can spare, minus `guard` frames.
pub fn clamp_overlap(requested: u64, prev_frames: u64, next_frames: u64, guard: u64) -> u64 {
    requested.min(prev_frames.min(next_frames).saturating_sub(guard))
}

/// One millisecond of audio, and never less than a single frame.
pub fn guard_frames(sample_rate: u32) -> u64 {
    (sample_rate as u64 / 1000).max(1)
}

/// Frames in `duration`, rounded to the nearest frame.
pub fn frames_for(duration: Duration, sample_rate: u32) -> u64 {
    let nanos = duration.as_nanos() * sample_rate as u128;
    ((nanos + 500_000_000) / 1_000_000_000) as u64
}

/// Duration of `frames`; zero when the rate is unknown.
pub fn duration_of(frames: u64, sample_rate: u32) -> Duration {
    if sample_rate == 0 {
        return Duration::ZERO;
    }
    let nanos = frames as u128 * 1_000_000_000 / sample_rate as u128;
    Duration::from_nanos(nanos as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = 1000;

    fn plan(transition_ms: u64, lengths_ms: &[u64]) -> MixPlan {
        MixPlan::build(
            RATE,
            Duration::from_millis(transition_ms),
            lengths_ms
                .iter()
                .enumerate()
                .map(|(i, ms)| (PathBuf::from(format!("{i}.wav")), *ms)),
        )
    }

    #[test]
    fn two_tracks_overlap_by_transition() {
        let plan = plan(1000, &[5000, 4000]);
        assert_eq!(plan.total_frames, 8000);
        assert_eq!(plan.duration(), Duration::from_millis(8000));
        assert_eq!(plan.fade_windows(), vec![4000..5000]);
        assert_eq!(plan.tracks[1].start_frame, 4000);
    }

    #[test]
    fn oversized_transition_is_clamped_below_shorter_track() {
        let plan = plan(10_000, &[3000, 3000]);
        assert_eq!(plan.tracks[1].overlap_frames, 2999);
        assert_eq!(plan.total_frames, 3001);
        assert!(plan.total_frames >= 3000);
    }

    #[test]
    fn short_interior_track_splits_between_its_fades() {
        let plan = plan(5000, &[10_000, 2000, 10_000]);
        assert_eq!(plan.tracks[1].overlap_frames, 999);
        assert_eq!(plan.tracks[2].overlap_frames, 1000);
        assert_eq!(plan.total_frames, 22_000 - 1999);

        // Track 2's fade-in ends before its fade-out starts.
        let windows = plan.fade_windows();
        assert!(windows[0].end < windows[1].start);
        // Track 1 is silent by the time track 3 starts.
        assert!(plan.tracks[0].frames <= plan.tracks[2].start_frame);
    }

    #[test]
    fn fade_windows_never_overlap() {
        let plan = plan(3000, &[500, 4000, 800, 6000, 1200, 300]);
        for pair in plan.tracks.windows(2) {
            let (track, next) = (&pair[0], &pair[1]);
            assert!(track.overlap_frames + next.overlap_frames < track.frames);
        }
        let windows = plan.fade_windows();
        assert!(windows.windows(2).all(|w| w[0].end <= w[1].start));
    }

    #[test]
    fn single_track_has_no_fades() {
        let plan = plan(1000, &[4321]);
        assert_eq!(plan.total_frames, 4321);
        assert!(plan.fade_windows().is_empty());
        assert_eq!(plan.total_overlap_frames(), 0);
    }

    #[test]
    fn zero_transition_concatenates() {
        let plan = plan(0, &[100, 200, 300]);
        assert_eq!(plan.total_frames, 600);
        assert_eq!(
            plan.start_times(),
            vec![
                Duration::ZERO,
                Duration::from_millis(100),
                Duration::from_millis(300)
            ]
        );
    }

    #[test]
    fn total_matches_sum_minus_overlaps() {
        let lengths = [7000, 1500, 900, 12_000, 5];
        let plan = plan(2000, &lengths);
        let sum: u64 = lengths.iter().sum();
        assert_eq!(plan.total_frames, sum - plan.total_overlap_frames());
        // A 5-frame track cannot overlap more than it has, minus the guard.
        assert_eq!(plan.tracks[4].overlap_frames, 4);
    }

    #[test]
    fn tiny_tracks_never_go_negative() {
        let plan = plan(1000, &[1, 1, 0, 1]);
        assert!(plan.tracks.iter().all(|t| t.overlap_frames == 0));
        assert_eq!(plan.total_frames, 3);
    }

    #[test]
    fn frame_conversions_round() {
        assert_eq!(frames_for(Duration::from_millis(1000), 44_100), 44_100);
        assert_eq!(frames_for(Duration::from_micros(11), 44_100), 0);
        assert_eq!(guard_frames(44_100), 44);
        assert_eq!(guard_frames(500), 1);
        assert_eq!(duration_of(22_050, 44_100), Duration::from_millis(500));
    }
}
