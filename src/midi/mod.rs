//! MIDI: organ channel mapping, merging, and SMF read/write.
//!
//! # Flow
//!
//! ```text
//! Vec<NoteEvent> per stem
//!        │  map / map_stem        (channel, division, program, pitch, velocity)
//!        ▼
//! StemTrack × 4
//!        │  merge                 (one track per stem, shared tempo map)
//!        ▼
//! combined.mid  (SMF format 1)
//! ```
//!
//! # Quick start
//!
//! ```
//! use organ_midi::midi::{map, merge, Tempo};
//! use organ_midi::transcribe::NoteEvent;
//!
//! let tracks = vec![
//!     map("drums", &[NoteEvent::new(36, 0.0, 0.5, 100)]).unwrap(),
//!     map("bass", &[NoteEvent::new(40, 1.0, 1.0, 90)]).unwrap(),
//!     map("vocals", &[NoteEvent::new(64, 0.5, 2.0, 80)]).unwrap(),
//!     map("other", &[NoteEvent::new(60, 0.0, 3.0, 70)]).unwrap(),
//! ];
//! let bytes = merge(&tracks, &Tempo::default()).unwrap();
//! assert_eq!(&bytes[0..4], b"MThd");
//! ```

pub mod mapper;
pub mod merger;
pub mod reader;
pub mod timing;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use mapper::{
    map, map_stem, policy, Division, PitchTransform, StemPolicy, StemTrack, VelocityCurve,
};
pub use merger::{merge, write_notes, TRACK_COUNT};
pub use reader::{read_notes, read_tracks, MidiTrack};
pub use timing::{Tempo, TempoMap};

// ---------------------------------------------------------------------------
// MidiError
// ---------------------------------------------------------------------------

/// Errors from mapping, merging, or reading MIDI.
#[derive(Debug, Clone, Error)]
pub enum MidiError {
    /// The stem name has no entry in the channel policy.
    #[error("unknown stem `{0}` (expected drums, bass, vocals or other)")]
    UnknownStem(String),

    /// The merger was not given four tracks on four distinct channels.
    #[error("incomplete track set: {0}")]
    IncompleteTrackSet(String),

    /// The bytes are not a Standard MIDI File.
    #[error("could not parse MIDI: {0}")]
    Parse(String),

    /// SMPTE timecode files are not supported.
    #[error("SMPTE timecode MIDI files are not supported")]
    UnsupportedTiming,

    /// Serialising the file failed.
    #[error("could not encode MIDI: {0}")]
    Encode(String),
}
