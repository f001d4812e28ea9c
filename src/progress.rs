use std::time::Duration;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use organ_midi::job::{Job, JobStatus};

/// Terminal progress bar that mirrors a job snapshot.
pub struct JobProgress {
    pb: ProgressBar,
}

impl JobProgress {
    pub fn new() -> Result<Self> {
        let pb = ProgressBar::new(100);
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} {prefix:>12} [{bar:40.cyan/blue}] {pos:>3}% {msg}",
            )?
            .progress_chars("#>-"),
        );
        pb.enable_steady_tick(Duration::from_millis(120));
        Ok(Self { pb })
    }

    pub fn update(&self, job: &Job) {
        self.pb.set_prefix(job.status.label());
        self.pb.set_position(u64::from(job.progress));
        self.pb.set_message(job.message.clone());
    }

    pub fn finish(&self, job: &Job) {
        self.update(job);
        if job.status == JobStatus::Complete {
            self.pb.finish_with_message("done");
        } else {
            self.pb
                .abandon_with_message(job.error.clone().unwrap_or_else(|| job.message.clone()));
        }
    }
}
