//! The id-keyed job registry shared by the pipeline tasks and status readers.
//!
//! Every mutation goes through [`JobRegistry::update`], which runs the
//! closure under one lock acquisition.  Readers get owned snapshots, so a
//! reader can never observe a record half-way through an update.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

use super::{Job, JobId};

/// Thread-safe map of [`JobId`] → [`Job`].
///
/// Cheap to clone (`Arc` clone).  Never hold the guard across an `.await`.
#[derive(Debug, Clone, Default)]
pub struct JobRegistry {
    jobs: Arc<Mutex<HashMap<JobId, Job>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic inside an update closure must not take every other job down
    // with it, so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, HashMap<JobId, Job>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a job, replacing any record with the same id.
    pub fn insert(&self, job: Job) {
        self.lock().insert(job.id, job);
    }

    /// Owned copy of the job, if it exists.
    pub fn snapshot(&self, id: &JobId) -> Option<Job> {
        self.lock().get(id).cloned()
    }

    /// Run `f` on the job under the lock.  `None` when the id is unknown.
    pub fn update<R>(&self, id: &JobId, f: impl FnOnce(&mut Job) -> R) -> Option<R> {
        self.lock().get_mut(id).map(f)
    }

    /// Take the job out of the registry.
    pub fn remove(&self, id: &JobId) -> Option<Job> {
        self.lock().remove(id)
    }

    pub fn contains(&self, id: &JobId) -> bool {
        self.lock().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Terminal jobs that finished before `cutoff`.
    pub fn finished_before(&self, cutoff: DateTime<Utc>) -> Vec<JobId> {
        self.lock()
            .values()
            .filter(|j| j.is_terminal() && j.finished_at.is_some_and(|t| t < cutoff))
            .map(|j| j.id)
            .collect()
    }
}
