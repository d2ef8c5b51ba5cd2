//! Video description with a timestamped tracklist.
//!
//! Start times come from the [`MixPlan`], so they already account for the
//! crossfade overlaps.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::Serialize;

use crate::audio::MixPlan;

/// One tracklist line: where the track starts in the mix, and its title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TracklistEntry {
    pub start: Duration,
    pub title: String,
}

/// Text published alongside a mix video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Description {
    pub name: String,
    pub genre: String,
    pub total: Duration,
    pub tracklist: Vec<TracklistEntry>,
}

impl Description {
    /// Build the description from a mix timeline; titles come from file names.
    pub fn from_plan(name: &str, genre: &str, plan: &MixPlan) -> Self {
        let tracklist = plan
            .tracks
            .iter()
            .zip(plan.start_times())
            .map(|(track, start)| TracklistEntry {
                start,
                title: track_title(&track.path),
            })
            .collect();
        Self {
            name: name.trim().to_string(),
            genre: genre.trim().to_string(),
            total: plan.duration(),
            tracklist,
        }
    }
}

impl fmt::Display for Description {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} | {} Mix", self.name, self.genre)?;
        writeln!(f, "Running time: {}", format_timestamp(self.total))?;
        writeln!(f)?;
        writeln!(f, "Tracklist:")?;
        for entry in &self.tracklist {
            writeln!(f, "{} {}", format_timestamp(entry.start), entry.title)?;
        }
        Ok(())
    }
}

/// `MM:SS`, or `H:MM:SS` from one hour on. Fractions of a second are dropped.
pub fn format_timestamp(at: Duration) -> String {
    let secs = at.as_secs();
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m:02}:{s:02}")
    }
}

/// Human title from a file name: the stem with `_` and `-` runs as spaces.
pub fn track_title(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let words: Vec<&str> = stem
        .split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .collect();
    if words.is_empty() { stem } else { words.join(" ") }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn timestamps_switch_to_hours() {
        assert_eq!(format_timestamp(Duration::ZERO), "00:00");
        assert_eq!(format_timestamp(Duration::from_millis(65_900)), "01:05");
        assert_eq!(format_timestamp(Duration::from_secs(3600 + 61)), "1:01:01");
    }

    #[test]
    fn titles_come_from_file_stems() {
        assert_eq!(track_title(Path::new("up/01_-_Night_Drive.mp3")), "01 Night Drive");
        assert_eq!(track_title(Path::new("plain.wav")), "plain");
        assert_eq!(track_title(Path::new("___.wav")), "___");
    }

    #[test]
    fn tracklist_accounts_for_overlaps() {
        let plan = MixPlan::build(
            1000,
            Duration::from_secs(10),
            [
                (PathBuf::from("a_side.mp3"), 185_000),
                (PathBuf::from("b-side.mp3"), 200_000),
                (PathBuf::from("closer.mp3"), 60_000),
            ],
        );
        let description = Description::from_plan(" Summer ", "House", &plan);
        let text = description.to_string();
        assert_eq!(
            text,
            "Summer | House Mix\n\
             Running time: 07:05\n\
             \n\
             Tracklist:\n\
             00:00 a side\n\
             02:55 b side\n\
             06:05 closer\n"
        );
    }
}
