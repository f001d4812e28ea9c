//! Production transcriber that shells out to Spotify's Basic Pitch CLI.
//!
//! Basic Pitch writes `<out>/<audio stem>_basic_pitch.mid`.  The file is read
//! back with [`crate::midi::read_notes`] so the rest of the pipeline only ever
//! sees [`NoteEvent`]s.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::TranscriberConfig;
use crate::midi;

use super::{NoteEvent, TranscriptionError, Transcriber};

/// Suffix Basic Pitch appends to the input file stem.
const OUTPUT_SUFFIX: &str = "_basic_pitch.mid";

/// Runs `basic-pitch --save-midi <scratch> <audio>`.
#[derive(Debug, Clone)]
pub struct BasicPitchTranscriber {
    command: String,
}

impl BasicPitchTranscriber {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    pub fn from_config(config: &TranscriberConfig) -> Self {
        Self::new(&config.command)
    }

    fn output_path(scratch: &Path, audio: &Path) -> PathBuf {
        let base = audio
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("audio");
        scratch.join(format!("{base}{OUTPUT_SUFFIX}"))
    }
}

impl Transcriber for BasicPitchTranscriber {
    fn transcribe(&self, audio: &Path) -> Result<Vec<NoteEvent>, TranscriptionError> {
        // Basic Pitch refuses to overwrite, so every call gets a fresh directory.
        let scratch = tempfile::Builder::new()
            .prefix("basic-pitch")
            .tempdir()
            .map_err(|e| TranscriptionError::Io(e.to_string()))?;

        log::info!("transcribe: running {} on {}", self.command, audio.display());
        let output = Command::new(&self.command)
            .arg("--save-midi")
            .arg(scratch.path())
            .arg(audio)
            .output()
            .map_err(|e| TranscriptionError::Launch {
                command: self.command.clone(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(TranscriptionError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let midi_path = Self::output_path(scratch.path(), audio);
        if !midi_path.exists() {
            return Err(TranscriptionError::MissingOutput(
                midi_path.display().to_string(),
            ));
        }

        let bytes =
            std::fs::read(&midi_path).map_err(|e| TranscriptionError::Io(e.to_string()))?;
        let notes =
            midi::read_notes(&bytes).map_err(|e| TranscriptionError::InvalidMidi(e.to_string()))?;

        log::debug!(
            "transcribe: {} notes from {}",
            notes.len(),
            audio.display()
        );
        Ok(notes)
    }
}
