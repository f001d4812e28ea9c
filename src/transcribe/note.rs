//! The note event produced by transcription.

use serde::{Deserialize, Serialize};

/// One transcribed note.  Times are absolute seconds from the start of the
/// source recording.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    /// MIDI key number, 0–127.
    pub pitch: u8,
    /// Onset in seconds.
    pub start: f64,
    /// Length in seconds.
    pub duration: f64,
    /// MIDI velocity, 0–127.
    pub velocity: u8,
}

impl NoteEvent {
    pub fn new(pitch: u8, start: f64, duration: f64, velocity: u8) -> Self {
        Self {
            pitch,
            start,
            duration,
            velocity,
        }
    }

    /// Release time in seconds.
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}
