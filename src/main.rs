//! `mixtape` binary: loads configuration, submits jobs to a [`JobRunner`] and
//! reports their outcome until every submitted job is terminal.

use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::debug;

use mixtape::audio::AudioMixer;
use mixtape::cli::{Cli, Command, output_name_for};
use mixtape::config::MixtapeConfig;
use mixtape::description::Description;
use mixtape::jobs::{Job, JobId, JobRunner, MixRequest, VideoRequest};
use mixtape::sources::{DirectoryTrackSource, TrackSource};
use mixtape::ui::JobProgress;
use mixtape::video::{FfmpegComposer, VideoComposer};
use mixtape::{MixtapeError, logging};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.json);

    let mut config = match &cli.config {
        Some(path) => MixtapeConfig::load_from(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => MixtapeConfig::load().context("failed to load mixtape.toml")?,
    };
    debug!(?config, "configuration loaded");

    let source = DirectoryTrackSource::new(&config.upload_root, &config.allowed_extensions);

    match cli.command {
        Command::Mix {
            prefixes,
            transition_ms,
            output,
            fade,
        } => {
            if let Some(fade) = fade {
                config.fade_curve = fade.into();
            }
            let transition = transition_ms
                .map(Duration::from_millis)
                .unwrap_or_else(|| config.transition());
            let runner = JobRunner::new(source, FfmpegComposer::new(&config.ffmpeg_path), &config);

            let several = prefixes.len() > 1;
            let mut submitted = Vec::with_capacity(prefixes.len());
            for prefix in prefixes {
                let request = MixRequest {
                    output_name: output_name_for(&prefix, &output, several),
                    prefix: prefix.clone(),
                    transition,
                };
                let id = runner
                    .submit_mix(request)
                    .with_context(|| format!("rejected mix for `{prefix}`"))?;
                submitted.push((prefix, id));
            }
            await_jobs(&runner, &submitted, cli.json).await
        }
        Command::Video {
            image,
            audio,
            output,
        } => {
            let runner = JobRunner::new(source, FfmpegComposer::new(&config.ffmpeg_path), &config);
            let id = runner.submit_video(VideoRequest {
                image,
                audio_name: audio,
                output_name: output.clone(),
            })?;
            await_jobs(&runner, &[(output, id)], cli.json).await
        }
        Command::Describe {
            prefix,
            name,
            genre,
            transition_ms,
        } => {
            let transition = transition_ms
                .map(Duration::from_millis)
                .unwrap_or_else(|| config.transition());
            let tracks = source.list_tracks(&prefix)?;
            if tracks.is_empty() {
                bail!(MixtapeError::NoTracks(source.location(&prefix)));
            }
            let plan = AudioMixer::new(config.fade_curve).plan(&tracks, transition)?;
            let description = Description::from_plan(&name, &genre, &plan);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&description)?);
            } else {
                print!("{description}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Tracks { prefix } => {
            let tracks = source.list_tracks(&prefix)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&tracks)?);
            } else if tracks.is_empty() {
                println!("No audio files found in {}", source.location(&prefix).display());
            } else {
                for (i, track) in tracks.iter().enumerate() {
                    println!("{:>3}. {}", i + 1, track.display());
                }
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Poll the store until every submitted job is terminal, then report.
async fn await_jobs<S: TrackSource, V: VideoComposer>(
    runner: &JobRunner<S, V>,
    submitted: &[(String, JobId)],
    json: bool,
) -> Result<ExitCode> {
    let progress = JobProgress::start("submitting");
    let finished: Vec<Job> = loop {
        let jobs = submitted
            .iter()
            .map(|(_, id)| runner.get(*id))
            .collect::<Result<Vec<_>, _>>()?;
        progress.update(&jobs);
        if jobs.iter().all(|j| j.status.is_terminal()) {
            break jobs;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    };
    progress.finish();

    if json {
        progress.print_json(&finished);
    } else {
        for ((label, _), job) in submitted.iter().zip(&finished) {
            progress.print_job(label, job);
        }
    }

    let all_ok = finished.iter().all(|j| j.error.is_none());
    Ok(if all_ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
