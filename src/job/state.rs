//! Job state machine and the job record.
//!
//! [`JobStatus`] drives the pipeline.  [`transition`] is the pure transition
//! function; the stage bodies in [`super::runner`] only ever move a job by
//! feeding it a [`JobEvent`].
//!
//! ```text
//! Queued ──Start──▶ Separating ──StemsSeparated──▶ Transcribing
//!        ──NotesTranscribed──▶ Merging ──Merged──▶ Complete
//! any non-terminal state ──Fail──▶ Failed
//! Complete / Failed: no outgoing transitions
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::separate::Stem;

/// Key of the merged file in [`Job::midi_paths`].
pub const COMBINED_KEY: &str = "combined";

// ---------------------------------------------------------------------------
// JobId
// ---------------------------------------------------------------------------

/// Opaque, unique job identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    /// A fresh random id.
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
        self.0.fmt(f)
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

// ---------------------------------------------------------------------------
// JobStatus
// ---------------------------------------------------------------------------

/// States of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Created; the pipeline task has not started yet.
    Queued,
    /// The separator is splitting the upload into stems.
    Separating,
    /// Stems are being transcribed one after another.
    Transcribing,
    /// The four note streams are being mapped and merged.
    Merging,
    /// All outputs are written.
    Complete,
    /// A stage failed; see [`Job::error`].
    Failed,
}

impl JobStatus {
    /// `true` for `Complete` and `Failed`.
    ///
    /// ```
    /// use organ_midi::job::JobStatus;
    ///
    /// assert!(!JobStatus::Queued.is_terminal());
    /// assert!(!JobStatus::Merging.is_terminal());
    /// assert!(JobStatus::Complete.is_terminal());
    /// assert!(JobStatus::Failed.is_terminal());
    /// ```
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Complete | JobStatus::Failed)
    }

    /// Lower-case label, as serialised.
    pub fn label(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Separating => "separating",
            JobStatus::Transcribing => "transcribing",
            JobStatus::Merging => "merging",
            JobStatus::Complete => "complete",
            JobStatus::Failed => "failed",
        }
    }
}

impl Default for JobStatus {
    fn default() -> Self {
        JobStatus::Queued
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// JobEvent / transition
// ---------------------------------------------------------------------------

/// What just happened to a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobEvent {
    /// The pipeline task picked the job up.
    Start,
    /// Separation produced all four stems.
    StemsSeparated,
    /// Every stem has been transcribed.
    NotesTranscribed,
    /// The combined file has been written.
    Merged,
    /// A stage failed.
    Fail,
}

/// A [`JobEvent`] that is not allowed in the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("job cannot go from {from} on {event:?}")]
pub struct InvalidTransition {
    pub from: JobStatus,
    pub event: JobEvent,
}

/// The pure transition function of the job state machine.
pub fn transition(from: JobStatus, event: JobEvent) -> Result<JobStatus, InvalidTransition> {
    use JobEvent as E;
    use JobStatus as S;

    match (from, event) {
        (S::Queued, E::Start) => Ok(S::Separating),
        (S::Separating, E::StemsSeparated) => Ok(S::Transcribing),
        (S::Transcribing, E::NotesTranscribed) => Ok(S::Merging),
        (S::Merging, E::Merged) => Ok(S::Complete),
        (s, E::Fail) if !s.is_terminal() => Ok(S::Failed),
        _ => Err(InvalidTransition { from, event }),
    }
}

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

/// The record of one uploaded file.
///
/// Held inside [`super::JobRegistry`]; readers only ever get clones.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Job {
    pub id: JobId,
    pub status: JobStatus,
    /// Percent complete.  Never decreases; reaches 100 only on `Complete`.
    pub progress: u8,
    /// Human-readable description of the current stage.
    pub message: String,
    /// The stored upload.
    pub source_path: PathBuf,
    /// Directory owning every file of this job.
    pub job_dir: PathBuf,
    /// Upload file name without extension.
    pub track_name: String,
    /// Stem audio files; empty until separation succeeds.
    pub stem_paths: BTreeMap<Stem, PathBuf>,
    /// Per-stem MIDI files plus [`COMBINED_KEY`].
    pub midi_paths: BTreeMap<String, PathBuf>,
    /// Failure description; only set when `status == Failed`.
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    /// When the job reached `Complete` or `Failed`.
    pub finished_at: Option<DateTime<Utc>>,
}

impl Job {
    /// A new job in `Queued` at 0 %.
    pub fn new(id: JobId, source_path: PathBuf, job_dir: PathBuf, track_name: String) -> Self {
        Self {
            id,
            status: JobStatus::Queued,
            progress: 0,
            message: "Queued".into(),
            source_path,
            job_dir,
            track_name,
            stem_paths: BTreeMap::new(),
            midi_paths: BTreeMap::new(),
            error: None,
            created_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Apply `event` through [`transition`].
    ///
    /// Entering `Complete` sets progress to 100.  Entering `Failed` withdraws
    /// every MIDI path so no partial output is published.
    pub fn apply(&mut self, event: JobEvent) -> Result<(), InvalidTransition> {
        self.status = transition(self.status, event)?;
        match self.status {
            JobStatus::Complete => {
                self.progress = 100;
                self.finished_at = Some(Utc::now());
            }
            JobStatus::Failed => {
                self.midi_paths.clear();
                self.finished_at = Some(Utc::now());
            }
            _ => {}
        }
        Ok(())
    }

    /// Move to `Failed` with `error`.
    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), InvalidTransition> {
        self.apply(JobEvent::Fail)?;
        let error = error.into();
        self.message = format!("Error: {error}");
        self.error = Some(error);
        Ok(())
    }

    /// Raise progress to `progress` and replace the stage message.
    ///
    /// Lower values are ignored; anything short of `Complete` stays below 100.
    pub fn advance(&mut self, progress: u8, message: impl Into<String>) {
        let ceiling = if self.status == JobStatus::Complete { 100 } else { 99 };
        self.progress = self.progress.max(progress.min(ceiling));
        self.message = message.into();
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = message.into();
    }

    /// The merged file, once the job is complete.
    pub fn combined_midi(&self) -> Option<&Path> {
        self.midi_paths.get(COMBINED_KEY).map(PathBuf::as_path)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STATUSES: [JobStatus; 6] = [
        JobStatus::Queued,
        JobStatus::Separating,
        JobStatus::Transcribing,
        JobStatus::Merging,
        JobStatus::Complete,
        JobStatus::Failed,
    ];

    const ALL_EVENTS: [JobEvent; 5] = [
        JobEvent::Start,
        JobEvent::StemsSeparated,
        JobEvent::NotesTranscribed,
        JobEvent::Merged,
        JobEvent::Fail,
    ];

    fn job() -> Job {
        Job::new(
            JobId::new(),
            PathBuf::from("/r/x/upload/song.wav"),
            PathBuf::from("/r/x"),
            "song".into(),
        )
    }

    // ---- transition ---

    #[test]
    fn happy_path_walks_every_stage() {
        let mut s = JobStatus::Queued;
        for (event, expected) in [
            (JobEvent::Start, JobStatus::Separating),
            (JobEvent::StemsSeparated, JobStatus::Transcribing),
            (JobEvent::NotesTranscribed, JobStatus::Merging),
            (JobEvent::Merged, JobStatus::Complete),
        ] {
            s = transition(s, event).expect("valid");
            assert_eq!(s, expected);
        }
    }

    #[test]
    fn fail_is_reachable_from_every_non_terminal_state() {
        for s in ALL_STATUSES.iter().filter(|s| !s.is_terminal()) {
            assert_eq!(transition(*s, JobEvent::Fail), Ok(JobStatus::Failed));
        }
    }

    #[test]
    fn terminal_states_have_no_outgoing_transitions() {
        for s in [JobStatus::Complete, JobStatus::Failed] {
            for e in ALL_EVENTS {
                assert_eq!(
                    transition(s, e),
                    Err(InvalidTransition { from: s, event: e })
                );
            }
        }
    }

    #[test]
    fn stages_cannot_be_skipped() {
        assert!(transition(JobStatus::Queued, JobEvent::Merged).is_err());
        assert!(transition(JobStatus::Separating, JobEvent::NotesTranscribed).is_err());
        assert!(transition(JobStatus::Transcribing, JobEvent::Start).is_err());
    }

    #[test]
    fn default_status_is_queued() {
        assert_eq!(JobStatus::default(), JobStatus::Queued);
    }

    #[test]
    fn status_serialises_lowercase() {
        let json = serde_json::to_string(&JobStatus::Transcribing).expect("json");
        assert_eq!(json, "\"transcribing\"");
        assert_eq!(JobStatus::Merging.to_string(), "merging");
    }

    // ---- JobId ---

    #[test]
    fn job_id_parses_its_own_display() {
        let id = JobId::new();
        assert_eq!(id.to_string().parse::<JobId>().expect("parse"), id);
        assert!("not-a-uuid".parse::<JobId>().is_err());
    }

    // ---- Job ---

    #[test]
    fn new_job_is_queued_at_zero() {
        let j = job();
        assert_eq!(j.status, JobStatus::Queued);
        assert_eq!(j.progress, 0);
        assert!(j.stem_paths.is_empty());
        assert!(j.midi_paths.is_empty());
        assert!(j.error.is_none());
        assert!(j.finished_at.is_none());
    }

    #[test]
    fn progress_never_decreases() {
        let mut j = job();
        j.apply(JobEvent::Start).expect("start");
        j.advance(40, "a");
        j.advance(10, "b");
        assert_eq!(j.progress, 40);
        assert_eq!(j.message, "b");
    }

    #[test]
    fn progress_stays_below_100_until_complete() {
        let mut j = job();
        j.apply(JobEvent::Start).expect("start");
        j.advance(100, "almost");
        assert_eq!(j.progress, 99);

        j.apply(JobEvent::StemsSeparated).expect("sep");
        j.apply(JobEvent::NotesTranscribed).expect("tr");
        j.apply(JobEvent::Merged).expect("merged");
        assert_eq!(j.progress, 100);
        assert!(j.finished_at.is_some());
    }

    #[test]
    fn fail_records_error_and_withdraws_midi() {
        let mut j = job();
        j.apply(JobEvent::Start).expect("start");
        j.apply(JobEvent::StemsSeparated).expect("sep");
        j.midi_paths.insert("drums".into(), PathBuf::from("/r/x/midi/drums.mid"));
        j.advance(47, "drums done");

        j.fail("vocals exploded").expect("fail");
        assert_eq!(j.status, JobStatus::Failed);
        assert_eq!(j.error.as_deref(), Some("vocals exploded"));
        assert!(j.midi_paths.is_empty());
        assert_eq!(j.progress, 47);
        assert!(j.finished_at.is_some());
        assert!(j.combined_midi().is_none());
    }

    #[test]
    fn failed_job_cannot_fail_again() {
        let mut j = job();
        j.fail("first").expect("fail");
        assert!(j.fail("second").is_err());
        assert_eq!(j.error.as_deref(), Some("first"));
    }

    #[test]
    fn job_serialises_stem_keys_by_name() {
        let mut j = job();
        j.stem_paths.insert(Stem::Vocals, PathBuf::from("/r/x/stems/song_vocals.wav"));
        let value = serde_json::to_value(&j).expect("json");
        assert_eq!(value["status"], "queued");
        assert_eq!(value["stem_paths"]["vocals"], "/r/x/stems/song_vocals.wav");
    }
}
