//! Per-output-path exclusion for jobs.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Serializes jobs that write to the same output path.
#[derive(Debug, Default)]
pub struct OutputLocks {
    paths: Mutex<HashMap<PathBuf, Arc<AsyncMutex<()>>>>,
}

impl OutputLocks {
    /// No paths held.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other job holds `path`, then hold it until the guard drops.
    pub async fn acquire(&self, path: &Path) -> OwnedMutexGuard<()> {
        let lock = {
            let mut paths = self.paths.lock().unwrap_or_else(PoisonError::into_inner);
            // Drop entries nobody is holding or waiting on.
            paths.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(paths.entry(path.to_path_buf()).or_default())
        };
        lock.lock_owned().await
    }
}
