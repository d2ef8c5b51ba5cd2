//! Background execution of mix and video jobs.
//!
//! Requests are validated synchronously; everything after that happens in a
//! spawned task whose progress is visible only through the [`JobStore`].

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::time::sleep;
use tracing::{Instrument, error, info, info_span, warn};

use super::job::{Job, JobId, JobKind, JobUpdate};
use super::locks::OutputLocks;
use super::store::JobStore;
use crate::audio::AudioMixer;
use crate::config::MixtapeConfig;
use crate::error::{MixtapeError, Result};
use crate::sources::{TrackSource, validate_prefix};
use crate::video::VideoComposer;

const POLL_INTERVAL: Duration = Duration::from_millis(25);
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "mov"];

/// Mix every track uploaded under `prefix` into `output_dir/output_name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MixRequest {
    /// Upload folder name under the upload root.
    pub prefix: String,
    /// Crossfade length between consecutive tracks.
    pub transition: Duration,
    /// File name in the output directory.
    pub output_name: String,
}

/// Loop `image` over the mix `output_dir/audio_name` into `output_dir/output_name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoRequest {
    /// Still image shown for the whole video.
    pub image: PathBuf,
    /// Mix file name in the output directory.
    pub audio_name: String,
    /// File name in the output directory.
    pub output_name: String,
}

/// Runs mix and video jobs in the background and records their progress.
///
/// Submission validates the request, registers a `pending` job and returns
/// immediately. Each job then runs as its own task: it waits for a
/// concurrency slot and for exclusive use of its output path, moves to
/// `running`, does its work and ends `completed` or `failed`. Errors and
/// panics stay inside the job that raised them.
pub struct JobRunner<S, V> {
    store: Arc<JobStore>,
    source: Arc<S>,
    composer: Arc<V>,
    mixer: AudioMixer,
    output_dir: PathBuf,
    max_transition: Duration,
    slots: Arc<Semaphore>,
    locks: Arc<OutputLocks>,
}

impl<S: TrackSource, V: VideoComposer> JobRunner<S, V> {
    /// A runner with its own empty store.
    pub fn new(source: S, composer: V, config: &MixtapeConfig) -> Self {
        Self::with_store(Arc::new(JobStore::new()), source, composer, config)
    }

    /// A runner recording into an existing `store`.
    pub fn with_store(store: Arc<JobStore>, source: S, composer: V, config: &MixtapeConfig) -> Self {
        Self {
            store,
            source: Arc::new(source),
            composer: Arc::new(composer),
            mixer: AudioMixer::new(config.fade_curve),
            output_dir: config.output_dir.clone(),
            max_transition: config.max_transition(),
            slots: Arc::new(Semaphore::new(config.max_concurrent_jobs.max(1))),
            locks: Arc::new(OutputLocks::new()),
        }
    }

    pub fn store(&self) -> &Arc<JobStore> {
        &self.store
    }

    /// Directory every job writes into.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Current snapshot of a job.
    pub fn get(&self, id: JobId) -> Result<Job> {
        self.store.get(id).ok_or(MixtapeError::JobNotFound(id))
    }

    /// Queue a mix job. Must be called from within a Tokio runtime.
    pub fn submit_mix(&self, request: MixRequest) -> Result<JobId> {
        validate_prefix(&request.prefix)?;
        validate_output_name(&request.output_name, &["wav"])?;
        if request.transition > self.max_transition {
            return Err(MixtapeError::TransitionTooLong {
                requested_ms: request.transition.as_millis() as u64,
                max_ms: self.max_transition.as_millis() as u64,
            });
        }

        let output = self.output_dir.join(&request.output_name);
        let id = self.store.create(JobKind::Mix);

        let source = Arc::clone(&self.source);
        let mixer = self.mixer;
        let target = output.clone();
        let work = async move {
            let span = tracing::Span::current();
            tokio::task::spawn_blocking(move || {
                let _entered = span.enter();
                mix_prefix(source.as_ref(), &mixer, &request.prefix, request.transition, &target)
            })
            .await
            .map_err(|e| MixtapeError::Internal(format!("mix task aborted: {e}")))?
        };

        self.spawn_job(id, JobKind::Mix, output, work);
        Ok(id)
    }

    /// Queue a video job. Must be called from within a Tokio runtime.
    pub fn submit_video(&self, request: VideoRequest) -> Result<JobId> {
        validate_output_name(&request.audio_name, &["wav"])?;
        validate_output_name(&request.output_name, VIDEO_EXTENSIONS)?;

        let audio = self.output_dir.join(&request.audio_name);
        let output = self.output_dir.join(&request.output_name);
        let id = self.store.create(JobKind::Video);

        let composer = Arc::clone(&self.composer);
        let image = request.image;
        let target = output.clone();
        let work = async move {
            if !tokio::fs::try_exists(&image).await.unwrap_or(false) {
                return Err(MixtapeError::MissingResource(image));
            }
            if !tokio::fs::try_exists(&audio).await.unwrap_or(false) {
                return Err(MixtapeError::MissingResource(audio));
            }
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            composer.compose(&image, &audio, &target).await?;
            Ok(target)
        };

        self.spawn_job(id, JobKind::Video, output, work);
        Ok(id)
    }

    /// Poll until the job reaches a terminal state.
    pub async fn wait(&self, id: JobId) -> Result<Job> {
        loop {
            let job = self.get(id)?;
            if job.status.is_terminal() {
                return Ok(job);
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    fn spawn_job<F>(&self, id: JobId, kind: JobKind, output: PathBuf, work: F)
    where
        F: Future<Output = Result<PathBuf>> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let slots = Arc::clone(&self.slots);
        let locks = Arc::clone(&self.locks);
        let span = info_span!("job", job_id = %id, %kind);

        tokio::spawn(
            async move {
                // Queued jobs stay `pending` until their output path is free, and only
                // then compete for a slot, so a job blocked on its path holds none.
                let _output_guard = locks.acquire(&output).await;
                let Ok(_permit) = slots.acquire_owned().await else {
                    error!("job runner closed before the job could start");
                    store.set_status(id, JobUpdate::Running);
                    store.set_status(id, JobUpdate::Failed("job runner shut down".into()));
                    return;
                };

                store.set_status(id, JobUpdate::Running);
                info!(output = %output.display(), "job started");

                let update = match tokio::spawn(work.in_current_span()).await {
                    Ok(Ok(path)) => {
                        info!(result = %path.display(), "job completed");
                        JobUpdate::Completed(path)
                    }
                    Ok(Err(e)) => {
                        warn!(error = %e, kind = %e.kind(), "job failed");
                        JobUpdate::Failed(e.report())
                    }
                    Err(e) => {
                        error!(error = %e, "job panicked");
                        JobUpdate::Failed(MixtapeError::Internal(format!("job aborted: {e}")).to_string())
                    }
                };
                store.set_status(id, update);
            }
            .instrument(span),
        );
    }
}

fn mix_prefix(
    source: &impl TrackSource,
    mixer: &AudioMixer,
    prefix: &str,
    transition: Duration,
    output: &Path,
) -> Result<PathBuf> {
    let tracks = source.list_tracks(prefix)?;
    if tracks.is_empty() {
        return Err(MixtapeError::NoTracks(source.location(prefix)));
    }
    info!(tracks = tracks.len(), transition_ms = transition.as_millis() as u64, "mixing");
    mixer.mix(&tracks, transition, output)?;
    Ok(output.to_path_buf())
}

/// Output names are plain file names with one of `extensions`.
pub fn validate_output_name(name: &str, extensions: &[&str]) -> Result<()> {
    let path = Path::new(name);
    let is_plain = !name.trim().is_empty()
        && !name.contains(['/', '\\'])
        && path.file_name().is_some_and(|f| f == name);
    if !is_plain {
        return Err(MixtapeError::InvalidRequest(format!(
            "output name `{name}` must be a plain file name"
        )));
    }
    let ext = crate::audio::decode::extension_of(path);
    if !extensions.contains(&ext.as_str()) {
        return Err(MixtapeError::InvalidRequest(format!(
            "output name `{name}` must end in .{}",
            extensions.join(" / .")
        )));
    }
    Ok(())
}
