//! Organ channel mapping.
//!
//! Every stem has exactly one [`StemPolicy`]: the MIDI channel it plays on,
//! the organ division it is registered to, the program number, a pitch
//! transform that keeps it playable on that division, and a velocity curve
//! that balances the divisions against each other.
//!
//! | stem   | ch | division | program | pitch                       | velocity        |
//! |--------|----|----------|---------|-----------------------------|-----------------|
//! | drums  | 0  | Pedal    | 0       | every hit on C2 (36)        | ×0.7, 30–60     |
//! | bass   | 1  | Pedal    | 32      | octave-transposed into 36–67 | ×0.8, 50–80     |
//! | vocals | 2  | Swell    | 1       | clamped to 60–96            | ×0.9, 60–90     |
//! | other  | 3  | Great    | 1       | unchanged                   | ×0.8, 40–85     |
//!
//! Timing is never touched: onset and duration pass through unmodified and
//! input order is preserved.

use std::fmt;

use crate::separate::Stem;
use crate::transcribe::NoteEvent;

use super::MidiError;

// ---------------------------------------------------------------------------
// Division
// ---------------------------------------------------------------------------

/// A manual or pedal group of pipe-organ registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Division {
    Great,
    Swell,
    Pedal,
}

impl Division {
    pub fn name(&self) -> &'static str {
        match self {
            Division::Great => "Great",
            Division::Swell => "Swell",
            Division::Pedal => "Pedal",
        }
    }
}

impl fmt::Display for Division {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// PitchTransform
// ---------------------------------------------------------------------------

/// How a stem's pitches are moved onto its division.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PitchTransform {
    /// Every note sounds this one key.
    Collapse(u8),
    /// Transpose the whole line down by whole octaves until its highest note
    /// is at or below `ceiling`; notes then below `floor` fold up by octaves.
    Register { floor: u8, ceiling: u8 },
    /// Clamp each pitch into `low..=high`.
    Clamp { low: u8, high: u8 },
    /// Leave pitches alone.
    Identity,
}

impl PitchTransform {
    /// Whole-octave shift applied to the line, negative meaning down.
    fn octave_shift(&self, notes: &[NoteEvent]) -> i8 {
        match *self {
            PitchTransform::Register { ceiling, .. } => {
                let highest = notes.iter().map(|n| n.pitch).max().unwrap_or(0);
                if highest <= ceiling {
                    0
                } else {
                    let excess = (highest - ceiling) as i16;
                    -(((excess + 11) / 12) as i8)
                }
            }
            _ => 0,
        }
    }

    fn apply(&self, pitch: u8, octave_shift: i8) -> u8 {
        match *self {
            PitchTransform::Collapse(key) => key,
            PitchTransform::Register { floor, .. } => {
                let mut p = pitch as i16 + 12 * octave_shift as i16;
                while p < floor as i16 {
                    p += 12;
                }
                p.min(127) as u8
            }
            PitchTransform::Clamp { low, high } => pitch.clamp(low, high),
            PitchTransform::Identity => pitch,
        }
    }
}

// ---------------------------------------------------------------------------
// VelocityCurve
// ---------------------------------------------------------------------------

/// Scale, truncate, then clamp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VelocityCurve {
    pub scale: f64,
    pub min: u8,
    pub max: u8,
}

impl VelocityCurve {
    pub fn apply(&self, velocity: u8) -> u8 {
        let scaled = (velocity as f64 * self.scale) as i64;
        scaled.clamp(self.min as i64, self.max as i64) as u8
    }
}

// ---------------------------------------------------------------------------
// StemPolicy
// ---------------------------------------------------------------------------

/// The fixed channel/instrument assignment for one stem.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StemPolicy {
    pub channel: u8,
    pub division: Division,
    pub program: u8,
    pub pitch: PitchTransform,
    pub velocity: VelocityCurve,
}

/// Lowest key of a 32-note pedalboard (C2).
pub const PEDAL_LOWEST: u8 = 36;
/// Highest key of a 32-note pedalboard (G4).
pub const PEDAL_HIGHEST: u8 = 67;

/// The policy for `stem`.  Total over [`Stem`]; there is no default entry.
pub fn policy(stem: Stem) -> StemPolicy {
    match stem {
        Stem::Drums => StemPolicy {
            channel: 0,
            division: Division::Pedal,
            program: 0,
            pitch: PitchTransform::Collapse(PEDAL_LOWEST),
            velocity: VelocityCurve {
                scale: 0.7,
                min: 30,
                max: 60,
            },
        },
        Stem::Bass => StemPolicy {
            channel: 1,
            division: Division::Pedal,
            program: 32,
            pitch: PitchTransform::Register {
                floor: PEDAL_LOWEST,
                ceiling: PEDAL_HIGHEST,
            },
            velocity: VelocityCurve {
                scale: 0.8,
                min: 50,
                max: 80,
            },
        },
        Stem::Vocals => StemPolicy {
            channel: 2,
            division: Division::Swell,
            program: 1,
            pitch: PitchTransform::Clamp { low: 60, high: 96 },
            velocity: VelocityCurve {
                scale: 0.9,
                min: 60,
                max: 90,
            },
        },
        Stem::Other => StemPolicy {
            channel: 3,
            division: Division::Great,
            program: 1,
            pitch: PitchTransform::Identity,
            velocity: VelocityCurve {
                scale: 0.8,
                min: 40,
                max: 85,
            },
        },
    }
}

// ---------------------------------------------------------------------------
// StemTrack
// ---------------------------------------------------------------------------

/// A note sequence annotated with its output channel and program.
#[derive(Debug, Clone, PartialEq)]
pub struct StemTrack {
    pub stem: Stem,
    /// `"<Division> - <Stem>"`, written as the MIDI track name.
    pub name: String,
    pub channel: u8,
    pub program: u8,
    pub octave_shift: i8,
    pub notes: Vec<NoteEvent>,
}

/// Map the notes of the stem called `stem_name`.
///
/// ```
/// use organ_midi::midi::map;
/// use organ_midi::transcribe::NoteEvent;
///
/// let track = map("vocals", &[NoteEvent::new(64, 0.5, 2.0, 80)]).unwrap();
/// assert_eq!(track.channel, 2);
/// assert_eq!(track.name, "Swell - Vocals");
/// assert!(map("kazoo", &[]).is_err());
/// ```
pub fn map(stem_name: &str, notes: &[NoteEvent]) -> Result<StemTrack, MidiError> {
    let stem =
        Stem::from_name(stem_name).ok_or_else(|| MidiError::UnknownStem(stem_name.to_string()))?;
    Ok(map_stem(stem, notes))
}

/// Map the notes of `stem`.
pub fn map_stem(stem: Stem, notes: &[NoteEvent]) -> StemTrack {
    let p = policy(stem);
    let octave_shift = p.pitch.octave_shift(notes);

    let notes = notes
        .iter()
        .map(|n| NoteEvent {
            pitch: p.pitch.apply(n.pitch, octave_shift),
            velocity: p.velocity.apply(n.velocity),
            ..*n
        })
        .collect();

    StemTrack {
        stem,
        name: format!("{} - {}", p.division, stem.title()),
        channel: p.channel,
        program: p.program,
        octave_shift,
        notes,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
