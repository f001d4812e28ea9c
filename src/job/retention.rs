//! Removal of finished jobs once their retention period has passed.
//!
//! The orchestrator never deletes anything.  [`RetentionSweeper`] is the
//! separate cleanup collaborator: it drops expired registry entries together
//! with their job directories, and clears job directories left behind by an
//! earlier process.

use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};

use super::{JobId, JobRegistry};
use crate::config::StorageConfig;

/// Longest retention honoured; anything larger is treated as this.
const MAX_RETENTION_SECS: u64 = 100 * 365 * 24 * 60 * 60;

pub struct RetentionSweeper {
    registry: JobRegistry,
    results_dir: PathBuf,
    retention: Duration,
}

impl RetentionSweeper {
    pub fn new(registry: JobRegistry, results_dir: PathBuf, retention: Duration) -> Self {
        Self {
            registry,
            results_dir,
            retention: retention.min(Duration::from_secs(MAX_RETENTION_SECS)),
        }
    }

    pub fn from_config(registry: JobRegistry, storage: &StorageConfig) -> Self {
        Self::new(
            registry,
            storage.results_dir.clone(),
            Duration::from_secs(storage.retention_secs),
        )
    }

    /// Remove terminal jobs that finished more than the retention period
    /// before `now`.  Running jobs are never touched.
    pub fn sweep(&self, now: DateTime<Utc>) -> Vec<JobId> {
        // Bounded by MAX_RETENTION_SECS, so the cast cannot wrap.
        let cutoff = now - chrono::Duration::seconds(self.retention.as_secs() as i64);
        let mut removed = Vec::new();

        for id in self.registry.finished_before(cutoff) {
            let Some(job) = self.registry.remove(&id) else {
                continue;
            };
            match std::fs::remove_dir_all(&job.job_dir) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => log::warn!("retention: could not remove {}: {e}", job.job_dir.display()),
            }
            log::info!("retention: removed job {id}");
            removed.push(id);
        }

        removed
    }

    /// Remove job directories under the results directory that no registered
    /// job owns and that were last modified more than the retention period
    /// before `now`.
    ///
    /// Only directories named like a job id are considered.
    pub fn sweep_orphans(&self, now: SystemTime) -> std::io::Result<Vec<PathBuf>> {
        let cutoff = now.checked_sub(self.retention).unwrap_or(SystemTime::UNIX_EPOCH);
        let mut removed = Vec::new();

        let entries = match std::fs::read_dir(&self.results_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(removed),
            Err(e) => return Err(e),
        };

        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            let Some(id) = entry
                .file_name()
                .to_str()
                .and_then(|n| n.parse::<JobId>().ok())
            else {
                continue;
            };
            if self.registry.contains(&id) {
                continue;
            }
            let metadata = entry.metadata()?;
            if !metadata.is_dir() || metadata.modified()? >= cutoff {
                continue;
            }

            std::fs::remove_dir_all(&path)?;
            log::info!("retention: removed orphaned {}", path.display());
            removed.push(path);
        }

        Ok(removed)
    }
}
