//! Transcription: one stem in, a list of note events out.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use organ_midi::transcribe::{BasicPitchTranscriber, Transcriber};
//!
//! let transcriber = BasicPitchTranscriber::new("basic-pitch");
//! let notes = transcriber.transcribe(Path::new("stems/song_vocals.wav")).unwrap();
//! for n in &notes {
//!     println!("{} @ {:.2}s for {:.2}s", n.pitch, n.start, n.duration);
//! }
//! ```

pub mod basic_pitch;
pub mod engine;
pub mod note;

pub use basic_pitch::BasicPitchTranscriber;
pub use engine::{Transcriber, TranscriptionError};
pub use note::NoteEvent;
