//! Command-line interface built on clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::audio::FadeCurve;

/// Crossfade a folder of tracks into one mixtape, and optionally a video.
#[derive(Debug, Parser)]
#[command(name = "mixtape", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (defaults to ./mixtape.toml when present).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Print results as JSON and emit logs as JSON lines.
    #[arg(long, global = true, default_value_t = false)]
    pub json: bool,

    /// Enable debug logging.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

/// Fade curve accepted on the command line, mapped to [`FadeCurve`].
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FadeArg {
    /// Straight-line gain ramps.
    Linear,
    /// Sine/cosine ramps with constant combined power.
    EqualPower,
}

impl From<FadeArg> for FadeCurve {
    fn from(arg: FadeArg) -> Self {
        match arg {
            FadeArg::Linear => FadeCurve::Linear,
            FadeArg::EqualPower => FadeCurve::EqualPower,
        }
    }
}

/// Subcommands of the `mixtape` binary.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Mix the tracks uploaded under one or more prefixes.
    Mix {
        /// Upload folder name; repeat to run several mixes concurrently.
        #[arg(long = "prefix", required = true)]
        prefixes: Vec<String>,

        /// Crossfade length in milliseconds.
        #[arg(long)]
        transition_ms: Option<u64>,

        /// Output file name inside the output directory.
        #[arg(long, default_value = "mixtape.wav")]
        output: String,

        /// Fade curve used across each transition.
        #[arg(long, value_enum)]
        fade: Option<FadeArg>,
    },

    /// Loop a still image over a rendered mix.
    Video {
        /// Image to show for the full length of the mix.
        #[arg(long)]
        image: PathBuf,

        /// Mix file name inside the output directory.
        #[arg(long, default_value = "mixtape.wav")]
        audio: String,

        /// Video file name inside the output directory.
        #[arg(long, default_value = "mixtape_vid.mp4")]
        output: String,
    },

    /// Print a description with a timestamped tracklist.
    Describe {
        #[arg(long)]
        prefix: String,

        /// Mixtape title.
        #[arg(long, default_value = "Mixtape")]
        name: String,

        #[arg(long, default_value = "Mix")]
        genre: String,

        /// Crossfade length in milliseconds.
        #[arg(long)]
        transition_ms: Option<u64>,
    },

    /// List the tracks of a prefix in mix order.
    Tracks {
        #[arg(long)]
        prefix: String,
    },
}

/// Output name for one of several concurrent mixes.
pub fn output_name_for(prefix: &str, output: &str, several: bool) -> String {
    if several {
        format!("{prefix}-{output}")
    } else {
        output.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_mix_with_several_prefixes() {
        let cli = Cli::parse_from([
            "mixtape",
            "mix",
            "--prefix",
            "a",
            "--prefix",
            "b",
            "--transition-ms",
            "2500",
            "--fade",
            "linear",
        ]);
        match cli.command {
            Command::Mix {
                prefixes,
                transition_ms,
                output,
                fade,
            } => {
                assert_eq!(prefixes, vec!["a", "b"]);
                assert_eq!(transition_ms, Some(2500));
                assert_eq!(output, "mixtape.wav");
                assert!(matches!(fade, Some(FadeArg::Linear)));
            }
            _ => panic!("expected Mix command"),
        }
    }

    #[test]
    fn negative_transition_is_rejected() {
        let result = Cli::try_parse_from(["mixtape", "mix", "--prefix", "a", "--transition-ms", "-5"]);
        assert!(result.is_err());
    }

    #[test]
    fn cli_parses_global_flags() {
        let cli = Cli::parse_from([
            "mixtape",
            "--json",
            "--verbose",
            "--config",
            "custom.toml",
            "tracks",
            "--prefix",
            "x",
        ]);
        assert!(cli.json);
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
    }

    #[test]
    fn video_defaults() {
        let cli = Cli::parse_from(["mixtape", "video", "--image", "cover.jpg"]);
        match cli.command {
            Command::Video { image, audio, output } => {
                assert_eq!(image, PathBuf::from("cover.jpg"));
                assert_eq!(audio, "mixtape.wav");
                assert_eq!(output, "mixtape_vid.mp4");
            }
            _ => panic!("expected Video command"),
        }
    }

    #[test]
    fn fade_arg_maps_to_curve() {
        assert_eq!(FadeCurve::from(FadeArg::EqualPower), FadeCurve::EqualPower);
    }

    #[test]
    fn several_outputs_are_prefixed() {
        assert_eq!(output_name_for("a", "mix.wav", true), "a-mix.wav");
        assert_eq!(output_name_for("a", "mix.wav", false), "mix.wav");
    }

    #[test]
    fn cli_verify() {
        Cli::command().debug_assert();
    }
}
