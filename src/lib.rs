//! Organ MIDI: turn a mixed recording into a four-channel organ MIDI file.
//!
//! ```text
//! upload ──▶ separate ──▶ 4 stems ──▶ transcribe ──▶ notes per stem
//!                                                        │
//!                         combined.mid ◀── merge ◀── map to organ channels
//! ```
//!
//! - [`audio`]: codec sniffing and the upload gate
//! - [`config`]: `settings.toml` and platform paths
//! - [`job`]: job state machine, registry and orchestrator
//! - [`midi`]: channel mapping, merging, SMF read/write
//! - [`separate`]: the stem separator seam and its demucs implementation
//! - [`transcribe`]: the transcriber seam and its basic-pitch implementation

pub mod audio;
pub mod config;
pub mod job;
pub mod midi;
pub mod separate;
pub mod transcribe;
