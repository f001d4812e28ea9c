//! Transcriber trait and error type.
//!
//! [`Transcriber`] is object-safe and `Send + Sync` so the pipeline can hold
//! it behind an `Arc<dyn Transcriber>` and call it from the blocking pool.

use std::path::Path;

use thiserror::Error;

use super::NoteEvent;

// ---------------------------------------------------------------------------
// TranscriptionError
// ---------------------------------------------------------------------------

/// All errors that can arise while turning a stem into notes.
#[derive(Debug, Clone, Error)]
pub enum TranscriptionError {
    /// The transcriber executable could not be started.
    #[error("could not launch transcriber `{command}`: {reason}")]
    Launch { command: String, reason: String },

    /// The transcriber ran but reported failure.
    #[error("transcriber exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    /// The transcriber finished without writing the expected MIDI file.
    #[error("transcriber wrote no MIDI file at {0}")]
    MissingOutput(String),

    /// The transcriber's MIDI output could not be parsed.
    #[error("transcriber output is not valid MIDI: {0}")]
    InvalidMidi(String),

    /// Scratch directory or file I/O failed.
    #[error("transcription I/O failed: {0}")]
    Io(String),
}

// ---------------------------------------------------------------------------
// Transcriber trait
// ---------------------------------------------------------------------------

/// Object-safe, thread-safe interface for audio-to-notes transcription.
///
/// # Contract
///
/// - `audio` is a readable audio file (a separated stem).
/// - The returned notes are ordered by onset time.
/// - Calls may block for a long time; callers run them on a blocking pool.
pub trait Transcriber: Send + Sync {
    /// Transcribe `audio` into note events.
    fn transcribe(&self, audio: &Path) -> Result<Vec<NoteEvent>, TranscriptionError>;
}

// Compile-time assertion: Box<dyn Transcriber> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn Transcriber>) {}
};
