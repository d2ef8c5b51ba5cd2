//! Asynchronous job tracking: records, the store that holds them, and the
//! runner that executes mix and video work in the background.

mod job;
mod locks;
mod runner;
mod store;

pub use job::{Job, JobId, JobKind, JobStatus, JobUpdate};
pub use locks::OutputLocks;
pub use runner::{JobRunner, MixRequest, VideoRequest, validate_output_name};
pub use store::JobStore;
