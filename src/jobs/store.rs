//! In-memory job registry.
//!
//! The outer map lock is only taken to insert or look up a record; each record
//! has its own mutex, so updates to different jobs do not contend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tracing::{debug, warn};

use super::job::{Job, JobId, JobKind, JobUpdate};

/// A registered job plus its position in submission order.
#[derive(Debug)]
struct Slot {
    seq: u64,
    job: Arc<Mutex<Job>>,
}

/// Thread-safe registry of every job submitted to a runner.
#[derive(Debug, Default)]
pub struct JobStore {
    jobs: RwLock<HashMap<JobId, Slot>>,
    next_seq: AtomicU64,
}

impl JobStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new `pending` job and return its identifier.
    pub fn create(&self, kind: JobKind) -> JobId {
        let job = Job::new(kind);
        let id = job.id;
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        jobs.insert(
            id,
            Slot {
                seq,
                job: Arc::new(Mutex::new(job)),
            },
        );
        drop(jobs);
        debug!(job_id = %id, %kind, "job created");
        id
    }

    /// Snapshot of a job, or `None` for an identifier that was never issued.
    pub fn get(&self, id: JobId) -> Option<Job> {
        let slot = self.slot(id)?;
        let job = slot.lock().unwrap_or_else(PoisonError::into_inner);
        Some(job.clone())
    }

    /// Apply a status change. Unknown ids and illegal transitions are logged
    /// and dropped; jobs are fire-and-forget so nothing is propagated.
    pub fn set_status(&self, id: JobId, update: JobUpdate) {
        let Some(slot) = self.slot(id) else {
            warn!(job_id = %id, status = %update.status(), "status update for unknown job");
            return;
        };
        let mut job = slot.lock().unwrap_or_else(PoisonError::into_inner);
        match job.apply(update) {
            Ok(()) => debug!(job_id = %id, status = %job.status, "job status updated"),
            Err(e) => warn!(job_id = %id, error = %e, "rejected job status update"),
        }
    }

    /// Snapshots of every job in submission order. Jobs created within the
    /// same clock tick keep the order `create` was called in.
    pub fn list(&self) -> Vec<Job> {
        let mut slots: Vec<(u64, Arc<Mutex<Job>>)> = self
            .jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(|slot| (slot.seq, Arc::clone(&slot.job)))
            .collect();
        slots.sort_by_key(|(seq, _)| *seq);
        slots
            .iter()
            .map(|(_, job)| job.lock().unwrap_or_else(PoisonError::into_inner).clone())
            .collect()
    }

    /// Number of jobs ever registered.
    pub fn len(&self) -> usize {
        self.jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no job has been registered yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, id: JobId) -> Option<Arc<Mutex<Job>>> {
        self.jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .map(|slot| Arc::clone(&slot.job))
    }
}
