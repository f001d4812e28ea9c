//! Job orchestrator: drives one upload through separate → transcribe → merge.
//!
//! [`JobOrchestrator`] owns a [`JobRegistry`] handle and the two external
//! collaborators.  [`submit`](JobOrchestrator::submit) stores the upload,
//! registers a job and spawns [`run_pipeline`](JobOrchestrator::run_pipeline)
//! as its own tokio task.
//!
//! # Pipeline flow
//!
//! ```text
//! submit(bytes, name)
//!   └─▶ sniff codec, write <results>/<id>/upload/<name>     [queued]
//!         └─▶ spawn_blocking(separator.separate)            [separating 10 → 40]
//!               └─▶ for stem in drums, bass, vocals, other
//!                     spawn_blocking(transcriber.transcribe)
//!                     write midi/<stem>.mid                 [transcribing 47 55 62 70]
//!                     └─▶ map × 4 → merge → midi/combined.mid [merging 85]
//!                           └─▶                             [complete 100]
//! any stage error ──▶ [failed], error recorded, MIDI paths withdrawn
//! ```
//!
//! Both collaborators are blocking, so they run on
//! `tokio::task::spawn_blocking` and the runtime never stalls.  The registry
//! lock is only taken inside [`JobRegistry::update`], never across an await.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::audio::{AudioFormat, AudioFormatError};
use crate::config::AppConfig;
use crate::midi::{self, MidiError, Tempo};
use crate::separate::{track_name, SeparationError, Stem, StemPaths, StemSeparator};
use crate::transcribe::{NoteEvent, Transcriber, TranscriptionError};

use super::state::{InvalidTransition, Job, JobEvent, JobId, JobStatus, COMBINED_KEY};
use super::JobRegistry;

/// Progress once separation has started.
const PROGRESS_SEPARATING: u8 = 10;
/// Progress once all four stems exist.
const PROGRESS_SEPARATED: u8 = 40;
/// Progress span covered by the four transcriptions.
const PROGRESS_TRANSCRIBE_SPAN: usize = 30;
/// Progress once merging has started.
const PROGRESS_MERGING: u8 = 85;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors returned to callers of the orchestrator.
#[derive(Debug, Error)]
pub enum JobError {
    /// The upload is empty or not a supported codec.
    #[error("invalid input: {0}")]
    InvalidInput(#[from] AudioFormatError),

    /// No job with this id is registered.
    #[error("job {0} not found")]
    NotFound(JobId),

    /// The upload could not be written into the job directory.
    #[error("could not store upload: {0}")]
    Storage(#[from] std::io::Error),
}

/// A stage failure inside [`JobOrchestrator::run_pipeline`].
///
/// Never returned to callers; its message ends up in [`Job::error`].
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("separation failed: {0}")]
    Separation(#[from] SeparationError),

    #[error("transcription of {stem} failed: {source}")]
    Transcription {
        stem: Stem,
        source: TranscriptionError,
    },

    #[error("MIDI error: {0}")]
    Midi(#[from] MidiError),

    #[error("could not write {path}: {source}")]
    Storage {
        path: String,
        source: std::io::Error,
    },

    #[error(transparent)]
    State(#[from] InvalidTransition),

    /// Join failure or a job that vanished mid-run.
    #[error("internal error: {0}")]
    Internal(String),
}

// ---------------------------------------------------------------------------
// PipelineSettings
// ---------------------------------------------------------------------------

/// The part of [`AppConfig`] the orchestrator needs.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Parent of every per-job directory.
    pub results_dir: PathBuf,
    /// Timing of every MIDI file written.
    pub tempo: Tempo,
    /// Merge a failed stem as an empty track instead of failing the job.
    pub tolerate_stem_failures: bool,
}

impl PipelineSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            results_dir: config.storage.results_dir.clone(),
            tempo: config.midi.tempo(),
            tolerate_stem_failures: config.pipeline.tolerate_stem_failures,
        }
    }
}

// ---------------------------------------------------------------------------
// JobOrchestrator
// ---------------------------------------------------------------------------

/// Accepts uploads and runs each one as an independent background task.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use organ_midi::config::AppConfig;
/// use organ_midi::job::{JobOrchestrator, JobRegistry, PipelineSettings};
/// use organ_midi::separate::DemucsSeparator;
/// use organ_midi::transcribe::BasicPitchTranscriber;
///
/// # async fn example() {
/// let config = AppConfig::default();
/// let orchestrator = JobOrchestrator::new(
///     JobRegistry::new(),
///     Arc::new(DemucsSeparator::from_config(&config.separator)),
///     Arc::new(BasicPitchTranscriber::from_config(&config.transcriber)),
///     PipelineSettings::from_config(&config),
/// );
///
/// let bytes = std::fs::read("song.mp3").unwrap();
/// let id = orchestrator.submit(&bytes, "song.mp3").await.unwrap();
/// let job = orchestrator.get_status(&id).unwrap();
/// println!("{} {}%", job.status, job.progress);
/// # }
/// ```
#[derive(Clone)]
pub struct JobOrchestrator {
    registry: JobRegistry,
    separator: Arc<dyn StemSeparator>,
    transcriber: Arc<dyn Transcriber>,
    settings: Arc<PipelineSettings>,
}

impl JobOrchestrator {
    pub fn new(
        registry: JobRegistry,
        separator: Arc<dyn StemSeparator>,
        transcriber: Arc<dyn Transcriber>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            registry,
            separator,
            transcriber,
            settings: Arc::new(settings),
        }
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    // -----------------------------------------------------------------------
    // Public API
    // -----------------------------------------------------------------------

    /// Store `audio`, register a queued job and start its pipeline.
    ///
    /// Returns as soon as the job is registered.  Must be called from inside
    /// a tokio runtime.
    pub async fn submit(&self, audio: &[u8], file_name: &str) -> Result<JobId, JobError> {
        let format = AudioFormat::sniff(audio)?;

        let id = JobId::new();
        let job_dir = self.settings.results_dir.join(id.to_string());
        let upload_dir = job_dir.join("upload");
        tokio::fs::create_dir_all(&upload_dir).await?;

        let source_path = upload_dir.join(upload_file_name(file_name, format));
        tokio::fs::write(&source_path, audio).await?;

        let track = track_name(&source_path);
        self.registry.insert(Job::new(id, source_path, job_dir, track));
        log::info!("job {id}: queued ({format}, {} bytes)", audio.len());

        let this = self.clone();
        tokio::spawn(async move {
            this.run_pipeline(id).await;
        });

        Ok(id)
    }

    /// Owned snapshot of job `id`.
    pub fn get_status(&self, id: &JobId) -> Result<Job, JobError> {
        self.registry.snapshot(id).ok_or(JobError::NotFound(*id))
    }

    /// Run every stage for `id` and return the status it ends in.
    ///
    /// Only a `Queued` job is started; for any other job this is a no-op that
    /// returns the current status, so a second call never disturbs the run
    /// that owns the job.  Any stage error is recorded on the job, which moves
    /// to `Failed`.  Nothing is retried.
    pub async fn run_pipeline(&self, id: JobId) -> JobStatus {
        match self.claim(id) {
            Some(true) => {
                log::info!("job {id}: Separating audio into stems...");
                if let Err(e) = self.execute(id).await {
                    self.record_failure(id, &e);
                }
            }
            Some(false) => log::warn!("job {id}: pipeline already started, ignoring"),
            None => log::warn!("job {id}: not registered"),
        }
        self.registry
            .snapshot(&id)
            .map(|j| j.status)
            .unwrap_or(JobStatus::Failed)
    }

    /// Move a `Queued` job to `Separating` under one lock.  `Some(false)` when
    /// the job has already been started.
    fn claim(&self, id: JobId) -> Option<bool> {
        self.registry.update(&id, |j| {
            if j.status != JobStatus::Queued || j.apply(JobEvent::Start).is_err() {
                return false;
            }
            j.advance(PROGRESS_SEPARATING, "Separating audio into stems...");
            true
        })
    }

    // -----------------------------------------------------------------------
    // Stages
    // -----------------------------------------------------------------------

    async fn execute(&self, id: JobId) -> Result<(), PipelineError> {
        let job = self.registry.snapshot(&id).ok_or_else(|| vanished(id))?;
        let stems_dir = job.job_dir.join("stems");
        let midi_dir = job.job_dir.join("midi");

        // ── 1. Separate (already claimed) ────────────────────────────────
        create_dir(&stems_dir).await?;
        let stems = self.separate(&job.source_path, &stems_dir).await?;
        self.registry
            .update(&id, |j| {
                j.stem_paths = stems.iter().map(|(s, p)| (s, p.to_path_buf())).collect();
                j.advance(PROGRESS_SEPARATED, "Separated 4 stems");
            })
            .ok_or_else(|| vanished(id))?;

        // ── 2. Transcribe ────────────────────────────────────────────────
        self.step(
            id,
            JobEvent::StemsSeparated,
            PROGRESS_SEPARATED,
            "Converting stems to MIDI...",
        )?;
        create_dir(&midi_dir).await?;
        let notes = self.transcribe_all(id, &stems, &midi_dir).await?;

        // ── 3. Merge ─────────────────────────────────────────────────────
        self.step(
            id,
            JobEvent::NotesTranscribed,
            PROGRESS_MERGING,
            "Merging MIDI files...",
        )?;
        let tracks: Vec<_> = Stem::ALL
            .iter()
            .map(|&stem| midi::map_stem(stem, notes.get(&stem).map_or(&[][..], Vec::as_slice)))
            .collect();
        let bytes = midi::merge(&tracks, &self.settings.tempo)?;
        let combined = midi_dir.join("combined.mid");
        write_file(&combined, &bytes).await?;

        // ── 4. Complete ──────────────────────────────────────────────────
        self.registry
            .update(&id, |j| -> Result<(), InvalidTransition> {
                j.midi_paths.insert(COMBINED_KEY.to_string(), combined);
                j.apply(JobEvent::Merged)?;
                j.set_message("Processing completed successfully!");
                Ok(())
            })
            .ok_or_else(|| vanished(id))??;
        log::info!("job {id}: complete");
        Ok(())
    }

    async fn separate(&self, audio: &Path, out_dir: &Path) -> Result<StemPaths, PipelineError> {
        let separator = Arc::clone(&self.separator);
        let audio = audio.to_path_buf();
        let out_dir = out_dir.to_path_buf();

        let stems = tokio::task::spawn_blocking(move || separator.separate(&audio, &out_dir))
            .await
            .map_err(|e| PipelineError::Internal(e.to_string()))??;
        Ok(stems)
    }

    /// Transcribe each stem in canonical order, writing `midi/<stem>.mid`.
    async fn transcribe_all(
        &self,
        id: JobId,
        stems: &StemPaths,
        midi_dir: &Path,
    ) -> Result<BTreeMap<Stem, Vec<NoteEvent>>, PipelineError> {
        let mut all = BTreeMap::new();

        for (i, (stem, audio)) in stems.iter().enumerate() {
            let progress =
                PROGRESS_SEPARATED + ((i + 1) * PROGRESS_TRANSCRIBE_SPAN / Stem::ALL.len()) as u8;
            self.registry
                .update(&id, |j| j.set_message(format!("Converting {stem} to MIDI...")));

            let transcriber = Arc::clone(&self.transcriber);
            let audio = audio.to_path_buf();
            let outcome = tokio::task::spawn_blocking(move || transcriber.transcribe(&audio))
                .await
                .map_err(|e| PipelineError::Internal(e.to_string()))?;

            let notes = match outcome {
                Ok(notes) => notes,
                Err(source) if self.settings.tolerate_stem_failures => {
                    log::warn!("job {id}: {stem} transcription failed, merging it empty: {source}");
                    self.registry
                        .update(&id, |j| j.advance(progress, format!("Skipped {stem}")));
                    all.insert(stem, Vec::new());
                    continue;
                }
                Err(source) => return Err(PipelineError::Transcription { stem, source }),
            };

            let midi_path = midi_dir.join(format!("{stem}.mid"));
            let bytes = midi::write_notes(stem.name(), &notes, &self.settings.tempo)?;
            write_file(&midi_path, &bytes).await?;
            log::debug!("job {id}: {stem} → {} notes", notes.len());

            self.registry
                .update(&id, |j| {
                    j.midi_paths.insert(stem.name().to_string(), midi_path);
                    j.advance(progress, format!("Transcribed {stem}"));
                })
                .ok_or_else(|| vanished(id))?;
            all.insert(stem, notes);
        }

        Ok(all)
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// Apply `event` and set progress/message in one registry update.
    fn step(
        &self,
        id: JobId,
        event: JobEvent,
        progress: u8,
        message: &str,
    ) -> Result<(), PipelineError> {
        self.registry
            .update(&id, |j| -> Result<(), InvalidTransition> {
                j.apply(event)?;
                j.advance(progress, message);
                Ok(())
            })
            .ok_or_else(|| vanished(id))??;
        log::info!("job {id}: {message}");
        Ok(())
    }

    fn record_failure(&self, id: JobId, error: &PipelineError) {
        let message = error.to_string();
        log::error!("job {id}: {message}");
        let recorded = self.registry.update(&id, |j| j.fail(message.clone()));
        match recorded {
            Some(Ok(())) => {}
            Some(Err(e)) => log::warn!("job {id}: could not record failure: {e}"),
            None => log::warn!("job {id}: failed after leaving the registry"),
        }
    }
}

fn vanished(id: JobId) -> PipelineError {
    PipelineError::Internal(format!("job {id} is no longer registered"))
}

/// Final path component of `file_name`, or `upload.<ext>` when there is none.
fn upload_file_name(file_name: &str, format: AudioFormat) -> String {
    Path::new(file_name)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.starts_with('.'))
        .map(str::to_string)
        .unwrap_or_else(|| format!("upload.{}", format.extension()))
}

async fn create_dir(path: &Path) -> Result<(), PipelineError> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|source| PipelineError::Storage {
            path: path.display().to_string(),
            source,
        })
}

async fn write_file(path: &Path, bytes: &[u8]) -> Result<(), PipelineError> {
    tokio::fs::write(path, bytes)
        .await
        .map_err(|source| PipelineError::Storage {
            path: path.display().to_string(),
            source,
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use tempfile::{tempdir, TempDir};

    use super::*;

    const WAV: &[u8] = b"RIFF\x24\x00\x00\x00WAVEfmt ";

    // ---- Test doubles ---

    #[derive(Default)]
    struct StubSeparator {
        calls: AtomicUsize,
        fail: bool,
        delay: Option<Duration>,
    }

    impl StemSeparator for StubSeparator {
        fn separate(&self, _audio: &Path, out_dir: &Path) -> Result<StemPaths, SeparationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(d) = self.delay {
                std::thread::sleep(d);
            }
            if self.fail {
                return Err(SeparationError::Failed {
                    status: "exit status: 1".into(),
                    stderr: "model not found".into(),
                });
            }
            Ok(StemPaths::from_fn(|s| out_dir.join(format!("song_{s}.wav"))))
        }
    }

    #[derive(Default)]
    struct StubTranscriber {
        calls: AtomicUsize,
        fail_on: Option<Stem>,
        delay: Option<Duration>,
    }

    fn stem_of(audio: &Path) -> Option<Stem> {
        let name = audio.file_stem()?.to_str()?;
        Stem::ALL.into_iter().find(|s| name.ends_with(s.name()))
    }

    impl Transcriber for StubTranscriber {
        fn transcribe(&self, audio: &Path) -> Result<Vec<NoteEvent>, TranscriptionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(d) = self.delay {
                std::thread::sleep(d);
            }
            let stem = stem_of(audio);
            if stem.is_some() && stem == self.fail_on {
                return Err(TranscriptionError::Failed {
                    status: "exit status: 2".into(),
                    stderr: "no onsets".into(),
                });
            }
            Ok(match stem {
                Some(Stem::Drums) => vec![NoteEvent::new(38, 0.0, 0.5, 100)],
                Some(Stem::Bass) => vec![NoteEvent::new(40, 1.0, 1.0, 90)],
                Some(Stem::Vocals) => vec![NoteEvent::new(64, 0.5, 2.0, 80)],
                Some(Stem::Other) => vec![NoteEvent::new(60, 0.0, 3.0, 70)],
                None => Vec::new(),
            })
        }
    }

    fn orchestrator(
        dir: &TempDir,
        sep: Arc<StubSeparator>,
        tr: Arc<StubTranscriber>,
        tolerate: bool,
    ) -> JobOrchestrator {
        JobOrchestrator::new(
            JobRegistry::new(),
            sep,
            tr,
            PipelineSettings {
                results_dir: dir.path().to_path_buf(),
                tempo: Tempo::default(),
                tolerate_stem_failures: tolerate,
            },
        )
    }

    async fn wait_terminal(orc: &JobOrchestrator, id: &JobId) -> Job {
        for _ in 0..500 {
            let job = orc.get_status(id).expect("registered");
            if job.is_terminal() {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {id} did not finish");
    }

    // ---- submit / get_status ---

    #[tokio::test]
    async fn empty_upload_is_invalid_input() {
        let dir = tempdir().expect("tempdir");
        let orc = orchestrator(&dir, Default::default(), Default::default(), false);
        let err = orc.submit(&[], "song.wav").await.expect_err("rejected");
        assert!(matches!(err, JobError::InvalidInput(AudioFormatError::Empty)));
        assert!(orc.registry().is_empty());
    }

    #[tokio::test]
    async fn unknown_codec_is_invalid_input() {
        let dir = tempdir().expect("tempdir");
        let orc = orchestrator(&dir, Default::default(), Default::default(), false);
        let err = orc.submit(b"OggS\0\0\0\0", "song.ogg").await.expect_err("rejected");
        assert!(matches!(err, JobError::InvalidInput(AudioFormatError::Unrecognized)));
        assert!(orc.registry().is_empty());
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let dir = tempdir().expect("tempdir");
        let orc = orchestrator(&dir, Default::default(), Default::default(), false);
        let id = JobId::new();
        assert!(matches!(orc.get_status(&id), Err(JobError::NotFound(x)) if x == id));
    }

    #[tokio::test]
    async fn submit_stores_upload_under_job_dir() {
        let dir = tempdir().expect("tempdir");
        let orc = orchestrator(&dir, Default::default(), Default::default(), false);
        let id = orc.submit(WAV, "../../etc/song.wav").await.expect("submit");

        let job = orc.get_status(&id).expect("registered");
        assert_eq!(job.job_dir, dir.path().join(id.to_string()));
        assert_eq!(job.source_path, job.job_dir.join("upload").join("song.wav"));
        assert_eq!(job.track_name, "song");
        assert_eq!(std::fs::read(&job.source_path).expect("upload"), WAV);
    }

    #[test]
    fn nameless_upload_gets_a_generated_name() {
        assert_eq!(upload_file_name("", AudioFormat::Flac), "upload.flac");
        assert_eq!(upload_file_name("dir/", AudioFormat::Mp3), "dir");
        assert_eq!(upload_file_name("..", AudioFormat::Wav), "upload.wav");
    }

    // ---- run_pipeline ---

    #[tokio::test]
    async fn successful_run_publishes_every_output() {
        let dir = tempdir().expect("tempdir");
        let sep = Arc::new(StubSeparator::default());
        let tr = Arc::new(StubTranscriber::default());
        let orc = orchestrator(&dir, sep.clone(), tr.clone(), false);

        let id = orc.submit(WAV, "song.wav").await.expect("submit");
        let job = wait_terminal(&orc, &id).await;

        assert_eq!(job.status, JobStatus::Complete);
        assert_eq!(job.progress, 100);
        assert!(job.error.is_none());
        assert_eq!(job.stem_paths.len(), 4);
        assert_eq!(job.midi_paths.len(), 5);
        for key in ["drums", "bass", "vocals", "other", COMBINED_KEY] {
            assert!(job.midi_paths[key].exists(), "{key} written");
        }
        assert_eq!(sep.calls.load(Ordering::SeqCst), 1);
        assert_eq!(tr.calls.load(Ordering::SeqCst), 4);
        assert!(job.source_path.exists(), "upload is kept");

        let combined = std::fs::read(job.combined_midi().expect("combined")).expect("read");
        let tracks = midi::read_tracks(&combined).expect("parse");
        assert_eq!(tracks.len(), 4);
        // Drums collapse to the pedal kick.
        assert_eq!(tracks[0].notes[0].pitch, 36);
    }

    #[tokio::test]
    async fn per_stem_midi_keeps_transcribed_notes() {
        let dir = tempdir().expect("tempdir");
        let orc = orchestrator(&dir, Default::default(), Default::default(), false);

        let id = orc.submit(WAV, "song.wav").await.expect("submit");
        let job = wait_terminal(&orc, &id).await;

        let bytes = std::fs::read(&job.midi_paths["vocals"]).expect("read");
        let notes = midi::read_notes(&bytes).expect("parse");
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].pitch, 64);
        assert_eq!(notes[0].velocity, 80);
        assert!((notes[0].start - 0.5).abs() < 1e-3);
    }

    #[tokio::test]
    async fn separation_failure_stops_before_transcription() {
        let dir = tempdir().expect("tempdir");
        let sep = Arc::new(StubSeparator {
            fail: true,
            ..Default::default()
        });
        let tr = Arc::new(StubTranscriber::default());
        let orc = orchestrator(&dir, sep.clone(), tr.clone(), false);

        let id = orc.submit(WAV, "song.wav").await.expect("submit");
        let job = wait_terminal(&orc, &id).await;

        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.stem_paths.is_empty());
        assert!(job.midi_paths.is_empty());
        assert!(job.error.as_deref().unwrap_or("").contains("model not found"));
        assert_eq!(sep.calls.load(Ordering::SeqCst), 1);
        assert_eq!(tr.calls.load(Ordering::SeqCst), 0);
        assert!(job.progress < 100);
    }

    #[tokio::test]
    async fn one_failed_stem_fails_the_job() {
        let dir = tempdir().expect("tempdir");
        let tr = Arc::new(StubTranscriber {
            fail_on: Some(Stem::Vocals),
            ..Default::default()
        });
        let orc = orchestrator(&dir, Default::default(), tr.clone(), false);

        let id = orc.submit(WAV, "song.wav").await.expect("submit");
        let job = wait_terminal(&orc, &id).await;

        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.combined_midi().is_none());
        assert!(job.midi_paths.is_empty());
        assert_eq!(job.stem_paths.len(), 4);
        assert!(job.error.as_deref().unwrap_or("").contains("vocals"));
        // drums, bass, vocals; `other` is never attempted.
        assert_eq!(tr.calls.load(Ordering::SeqCst), 3);
        assert!(!job.job_dir.join("midi").join("combined.mid").exists());
    }

    #[tokio::test]
    async fn tolerated_stem_failure_merges_an_empty_track() {
        let dir = tempdir().expect("tempdir");
        let tr = Arc::new(StubTranscriber {
            fail_on: Some(Stem::Bass),
            ..Default::default()
        });
        let orc = orchestrator(&dir, Default::default(), tr.clone(), true);

        let id = orc.submit(WAV, "song.wav").await.expect("submit");
        let job = wait_terminal(&orc, &id).await;

        assert_eq!(job.status, JobStatus::Complete);
        assert!(!job.midi_paths.contains_key("bass"));
        assert_eq!(tr.calls.load(Ordering::SeqCst), 4);

        let combined = std::fs::read(job.combined_midi().expect("combined")).expect("read");
        let tracks = midi::read_tracks(&combined).expect("parse");
        assert_eq!(tracks.len(), 4);
        assert!(tracks[1].notes.is_empty());
        assert_eq!(tracks[1].program, Some(32));
    }

    #[tokio::test]
    async fn observed_progress_never_decreases() {
        let dir = tempdir().expect("tempdir");
        let sep = Arc::new(StubSeparator {
            delay: Some(Duration::from_millis(30)),
            ..Default::default()
        });
        let tr = Arc::new(StubTranscriber {
            delay: Some(Duration::from_millis(20)),
            ..Default::default()
        });
        let orc = orchestrator(&dir, sep, tr, false);

        let id = orc.submit(WAV, "song.wav").await.expect("submit");
        let mut seen = Vec::new();
        loop {
            let job = orc.get_status(&id).expect("registered");
            if job.progress == 100 {
                assert_eq!(job.status, JobStatus::Complete);
            }
            seen.push(job.progress);
            if job.is_terminal() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        assert!(seen.windows(2).all(|w| w[0] <= w[1]), "{seen:?}");
        assert_eq!(seen.last(), Some(&100));
        assert!(seen.len() > 2);
    }

    #[tokio::test]
    async fn concurrent_jobs_run_independently() {
        let dir = tempdir().expect("tempdir");
        let tr = Arc::new(StubTranscriber::default());
        let orc = orchestrator(&dir, Default::default(), tr.clone(), false);

        let a = orc.submit(WAV, "a.wav").await.expect("submit");
        let b = orc.submit(WAV, "b.wav").await.expect("submit");
        let (ja, jb) = (wait_terminal(&orc, &a).await, wait_terminal(&orc, &b).await);

        assert_ne!(ja.job_dir, jb.job_dir);
        assert_eq!(ja.status, JobStatus::Complete);
        assert_eq!(jb.status, JobStatus::Complete);
        assert_eq!(tr.calls.load(Ordering::SeqCst), 8);
    }

    #[tokio::test]
    async fn second_run_of_a_started_job_leaves_it_alone() {
        let dir = tempdir().expect("tempdir");
        let sep = Arc::new(StubSeparator {
            delay: Some(Duration::from_millis(300)),
            ..Default::default()
        });
        let orc = orchestrator(&dir, sep.clone(), Default::default(), false);

        let id = orc.submit(WAV, "song.wav").await.expect("submit");
        while orc.get_status(&id).expect("registered").status == JobStatus::Queued {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        assert_eq!(orc.run_pipeline(id).await, JobStatus::Separating);
        let during = orc.get_status(&id).expect("registered");
        assert_eq!(during.status, JobStatus::Separating);
        assert!(during.error.is_none());

        let job = wait_terminal(&orc, &id).await;
        assert_eq!(job.status, JobStatus::Complete);
        assert_eq!(job.progress, 100);
        assert_eq!(sep.calls.load(Ordering::SeqCst), 1);

        // Once complete, another run is still a no-op.
        assert_eq!(orc.run_pipeline(id).await, JobStatus::Complete);
        assert_eq!(sep.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn running_an_unknown_job_registers_nothing() {
        let dir = tempdir().expect("tempdir");
        let sep = Arc::new(StubSeparator::default());
        let orc = orchestrator(&dir, sep.clone(), Default::default(), false);

        assert_eq!(orc.run_pipeline(JobId::new()).await, JobStatus::Failed);
        assert!(orc.registry().is_empty());
        assert_eq!(sep.calls.load(Ordering::SeqCst), 0);
    }
}
