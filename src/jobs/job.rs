//! Job records and the status state machine.
//!
//! A job only moves forward: `pending -> running -> completed | failed`.
//! [`Job::apply`] is the single place that enforces it.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{MixtapeError, Result};

/// Opaque job identifier, generated at submission time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    /// A fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// What a job produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Mix,
    Video,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobKind::Mix => write!(f, "mix"),
            JobKind::Video => write!(f, "video"),
        }
    }
}

/// Lifecycle status: `Pending -> Running -> {Completed | Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    /// Whether the job has finished, successfully or not.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Whether `self -> next` is an edge of the state machine.
    pub fn can_advance_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Running)
                | (JobStatus::Running, JobStatus::Completed)
                | (JobStatus::Running, JobStatus::Failed)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

/// A status change together with the payload that status requires.
///
/// Carrying the result path on `Completed` and the message on `Failed` keeps
/// "exactly one of result/error once terminal" true by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobUpdate {
    Running,
    Completed(PathBuf),
    Failed(String),
}

impl JobUpdate {
    /// Status the job is in after this update.
    pub fn status(&self) -> JobStatus {
        match self {
            JobUpdate::Running => JobStatus::Running,
            JobUpdate::Completed(_) => JobStatus::Completed,
            JobUpdate::Failed(_) => JobStatus::Failed,
        }
    }
}

/// A tracked unit of asynchronous work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub kind: JobKind,
    pub status: JobStatus,
    /// Output file; set exactly when `status` is `completed`.
    pub result: Option<PathBuf>,
    /// Failure message; set exactly when `status` is `failed`.
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Time of the last status change.
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// A new `pending` job of `kind`.
    pub fn new(kind: JobKind) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            kind,
            status: JobStatus::Pending,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a status change, refusing anything that is not a forward edge.
    pub fn apply(&mut self, update: JobUpdate) -> Result<()> {
        let next = update.status();
        if !self.status.can_advance_to(next) {
            return Err(MixtapeError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }

        match update {
            JobUpdate::Running => {}
            JobUpdate::Completed(path) => self.result = Some(path),
            JobUpdate::Failed(message) => {
                // A failed job must always explain itself.
                self.error = Some(if message.trim().is_empty() {
                    "unknown error".to_string()
                } else {
                    message
                });
            }
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_creation_defaults() {
        let job = Job::new(JobKind::Mix);
        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.result.is_none());
        assert!(job.error.is_none());
        assert_eq!(job.created_at, job.updated_at);
    }

    #[test]
    fn happy_path_sets_result_only() {
        let mut job = Job::new(JobKind::Mix);
        job.apply(JobUpdate::Running).unwrap();
        assert_eq!(job.status, JobStatus::Running);
        assert!(job.result.is_none() && job.error.is_none());

        job.apply(JobUpdate::Completed("output/mixtape.wav".into()))
            .unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.result.as_deref(), Some(std::path::Path::new("output/mixtape.wav")));
        assert!(job.error.is_none());
    }

    #[test]
    fn failure_sets_error_only() {
        let mut job = Job::new(JobKind::Video);
        job.apply(JobUpdate::Running).unwrap();
        job.apply(JobUpdate::Failed("boom".into())).unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.as_deref(), Some("boom"));
        assert!(job.result.is_none());
    }

    #[test]
    fn empty_failure_message_is_replaced() {
        let mut job = Job::new(JobKind::Mix);
        job.apply(JobUpdate::Running).unwrap();
        job.apply(JobUpdate::Failed("  ".into())).unwrap();
        assert_eq!(job.error.as_deref(), Some("unknown error"));
    }

    #[test]
    fn skipping_running_is_rejected() {
        let mut job = Job::new(JobKind::Mix);
        let err = job
            .apply(JobUpdate::Completed("x.wav".into()))
            .unwrap_err();
        assert!(matches!(
            err,
            MixtapeError::InvalidTransition {
                from: JobStatus::Pending,
                to: JobStatus::Completed
            }
        ));
        assert_eq!(job.status, JobStatus::Pending);
    }

    #[test]
    fn terminal_states_never_regress() {
        let mut job = Job::new(JobKind::Mix);
        job.apply(JobUpdate::Running).unwrap();
        job.apply(JobUpdate::Failed("bad".into())).unwrap();

        assert!(job.apply(JobUpdate::Running).is_err());
        assert!(job.apply(JobUpdate::Completed("x.wav".into())).is_err());
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.result.is_none());
    }

    #[test]
    fn status_display_and_order() {
        assert_eq!(JobStatus::Pending.to_string(), "pending");
        assert_eq!(JobStatus::Failed.to_string(), "failed");
        assert!(JobStatus::Pending < JobStatus::Running);
        assert!(JobStatus::Running < JobStatus::Completed);
        assert!(JobStatus::Completed.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
    }

    #[test]
    fn job_id_parses_back() {
        let id = JobId::new();
        let parsed: JobId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("not-a-uuid".parse::<JobId>().is_err());
    }

    #[test]
    fn job_serializes_snake_case_status() {
        let job = Job::new(JobKind::Video);
        let json = serde_json::to_value(&job).unwrap();
        assert_eq!(json["status"], "pending");
        assert_eq!(json["kind"], "video");
        assert_eq!(json["id"], job.id.to_string());
    }
}
